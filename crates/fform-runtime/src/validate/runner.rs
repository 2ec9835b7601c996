#![forbid(unsafe_code)]

//! Rule execution for a single field.
//!
//! # Policies
//!
//! - [`ValidateFirst::All`]: every rule runs (concurrently); every failure is
//!   reported in rule order.
//! - [`ValidateFirst::First`]: rules run one after another; the first
//!   failure ends the pass.
//! - [`ValidateFirst::Parallel`]: every rule runs concurrently; only the
//!   failure of the lowest-indexed failing rule is reported, regardless of
//!   which one finished first.
//!
//! # Messages
//!
//! A failure reports, in order of preference: its own message, the rule's
//! message, or the `default` template. Rule messages and templates get
//! `${name}` (the path joined with `.`) and the field's message variables
//! substituted.

use std::rc::Rc;

use fform_core::messages::interpolate;
use fform_core::{NamePath, ValidateMessages, Value};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};

use crate::config::ValidateOptions;
use crate::rule::{Rule, RuleFailure, RuleInput, ValidateFirst};

/// Everything a pass needs, captured when validation starts.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub path: NamePath,
    pub value: Option<Value>,
    pub values: Value,
    pub validate_first: ValidateFirst,
    pub message_variables: Vec<(String, String)>,
}

/// Run `rules` against the context and resolve to the error messages.
///
/// Rules are first narrowed to those that apply to `options.trigger_name`.
pub fn validate_rules(
    context: RuleContext,
    rules: &[Rule],
    options: &ValidateOptions,
) -> LocalBoxFuture<'static, Vec<String>> {
    let trigger = options.trigger_name.as_deref();
    let rules: Vec<Rule> = rules
        .iter()
        .filter(|rule| rule.applies_to(trigger))
        .cloned()
        .collect();
    let messages = options
        .validate_messages
        .clone()
        .unwrap_or_else(|| Rc::new(ValidateMessages::default()));

    async move {
        if rules.is_empty() {
            return Vec::new();
        }
        let input = RuleInput {
            path: context.path.clone(),
            value: context.value.clone(),
            values: context.values.clone(),
            messages: Rc::clone(&messages),
        };

        match context.validate_first {
            ValidateFirst::First => {
                for rule in &rules {
                    if let Err(failure) = rule.run(input.clone()).await {
                        return vec![describe(&failure, rule, &context, &messages)];
                    }
                }
                Vec::new()
            }
            ValidateFirst::All | ValidateFirst::Parallel => {
                let outcomes = join_all(rules.iter().map(|rule| rule.run(input.clone()))).await;
                let mut failures = rules
                    .iter()
                    .zip(outcomes)
                    .filter_map(|(rule, outcome)| outcome.err().map(|failure| (rule, failure)));

                if context.validate_first == ValidateFirst::Parallel {
                    failures
                        .next()
                        .map(|(rule, failure)| describe(&failure, rule, &context, &messages))
                        .into_iter()
                        .collect()
                } else {
                    failures
                        .map(|(rule, failure)| describe(&failure, rule, &context, &messages))
                        .collect()
                }
            }
        }
    }
    .boxed_local()
}

fn describe(
    failure: &RuleFailure,
    rule: &Rule,
    context: &RuleContext,
    messages: &ValidateMessages,
) -> String {
    if let Some(message) = &failure.message {
        return message.clone();
    }
    let name = context.path.to_string();
    let vars = || {
        std::iter::once(("name", name.as_str())).chain(
            context
                .message_variables
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    };
    if let Some(template) = rule.message() {
        return interpolate(template, vars());
    }
    messages
        .format("default", vars())
        .unwrap_or_else(|| format!("Validation error on field {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fform_core::path;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::executor::block_on;
    use futures::task::LocalSpawnExt;
    use std::cell::{Cell, RefCell};

    fn context(value: i32, validate_first: ValidateFirst) -> RuleContext {
        RuleContext {
            path: path!["user", "age"],
            value: Some(Value::from(value)),
            values: Value::empty_map(),
            validate_first,
            message_variables: Vec::new(),
        }
    }

    fn fail(message: &'static str) -> Rule {
        Rule::sync(move |_| Err(RuleFailure::message(message)))
    }

    fn pass() -> Rule {
        Rule::sync(|_| Ok(()))
    }

    #[test]
    fn all_collects_every_failure_in_order() {
        let rules = [fail("a"), pass(), fail("b")];
        let errors = block_on(validate_rules(
            context(1, ValidateFirst::All),
            &rules,
            &ValidateOptions::default(),
        ));
        assert_eq!(errors, vec!["a", "b"]);
    }

    #[test]
    fn first_stops_after_first_failure() {
        let calls = Rc::new(Cell::new(0));
        let counted = {
            let calls = Rc::clone(&calls);
            Rule::sync(move |_| {
                calls.set(calls.get() + 1);
                Ok(())
            })
        };
        let rules = [pass(), fail("first"), counted, fail("second")];
        let errors = block_on(validate_rules(
            context(1, ValidateFirst::First),
            &rules,
            &ValidateOptions::default(),
        ));
        assert_eq!(errors, vec!["first"]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn parallel_reports_lowest_index_even_if_it_finishes_last() {
        let (slow_tx, slow_rx) = oneshot::channel::<()>();
        let slow_rx = RefCell::new(Some(slow_rx));
        let slow_fail = Rule::new(move |_| {
            let rx = slow_rx.borrow_mut().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Err(RuleFailure::message("slow"))
            }
        });
        let rules = [pass(), slow_fail, fail("fast")];

        let mut pool = LocalPool::new();
        let result = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&result);
        let fut = validate_rules(
            context(1, ValidateFirst::Parallel),
            &rules,
            &ValidateOptions::default(),
        );
        pool.spawner()
            .spawn_local(async move {
                *sink.borrow_mut() = Some(fut.await);
            })
            .unwrap();

        pool.run_until_stalled();
        assert!(result.borrow().is_none());

        slow_tx.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(result.borrow().clone(), Some(vec!["slow".to_string()]));
    }

    #[test]
    fn trigger_name_narrows_rules() {
        let rules = [fail("change").with_trigger(["onChange"]), fail("blur").with_trigger(["onBlur"])];
        let options = ValidateOptions::default().trigger("onBlur");
        let errors = block_on(validate_rules(context(1, ValidateFirst::All), &rules, &options));
        assert_eq!(errors, vec!["blur"]);
    }

    #[test]
    fn message_fallbacks() {
        let rule_message = Rule::sync(|_| Err(RuleFailure::new())).with_message("${name} must be ${min}+");
        let bare = Rule::sync(|_| Err(RuleFailure::new()));
        let mut ctx = context(1, ValidateFirst::All);
        ctx.message_variables = vec![("min".into(), "18".into())];

        let options = ValidateOptions::default()
            .messages(ValidateMessages::empty().with("default", "bad ${name}"));
        let errors = block_on(validate_rules(ctx, &[rule_message, bare], &options));
        assert_eq!(errors, vec!["user.age must be 18+", "bad user.age"]);
    }

    #[test]
    fn no_applicable_rules_passes() {
        let errors = block_on(validate_rules(
            context(1, ValidateFirst::All),
            &[],
            &ValidateOptions::default(),
        ));
        assert!(errors.is_empty());
    }
}
