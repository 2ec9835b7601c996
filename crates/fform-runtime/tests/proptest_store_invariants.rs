//! Property-based invariant tests for the form store.
//!
//! 1. Resetting twice yields the same store as resetting once
//! 2. Touched state reflects exactly the fields that were changed
//! 3. A shared path keeps its value until its last entity unregisters
//! 4. Of several back-to-back sessions only the last resolves `Ok`

use fform_core::{NamePath, Value};
use fform_runtime::{Field, FieldProps, FormConfig, FormStore, Rule, ValidateOptions};
use futures::executor::LocalPool;
use proptest::prelude::*;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

// ── Strategies ───────────────────────────────────────────────────────

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-100i32..100).prop_map(Value::from),
        "[a-z]{1,4}".prop_map(Value::String),
    ]
}

fn arb_edits() -> impl Strategy<Value = Vec<(usize, Value)>> {
    proptest::collection::vec((0..NAMES.len(), arb_leaf()), 0..12)
}

fn arb_initial() -> impl Strategy<Value = Value> {
    proptest::collection::btree_map(
        proptest::sample::select(NAMES.to_vec()),
        arb_leaf(),
        0..NAMES.len(),
    )
    .prop_map(|entries| Value::map(entries))
}

fn mounted_fields(form: &FormStore) -> Vec<Field> {
    NAMES
        .iter()
        .map(|name| {
            let field = Field::new(form, FieldProps::new(*name));
            field.mount();
            field
        })
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Reset idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reset_twice_equals_reset_once(initial in arb_initial(), edits in arb_edits()) {
        let pool = LocalPool::new();
        let form = FormStore::with_config(
            pool.spawner(),
            FormConfig::new().initial_values(initial.clone()),
        );
        let fields = mounted_fields(&form);
        for (index, value) in edits {
            fields[index].trigger_change(Some(value));
        }

        form.reset_fields(None);
        let once = form.get_all_values();
        form.reset_fields(None);
        prop_assert_eq!(form.get_all_values(), once.clone());
        prop_assert_eq!(once, initial);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Touched semantics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn touched_matches_changed_fields(changed in proptest::collection::btree_set(0..NAMES.len(), 0..=NAMES.len())) {
        let pool = LocalPool::new();
        let form = FormStore::new(pool.spawner());
        let fields = mounted_fields(&form);
        prop_assert!(!form.is_fields_touched(None, false));

        for index in &changed {
            fields[*index].trigger_change(Some(Value::from(*index)));
        }
        prop_assert_eq!(form.is_fields_touched(None, false), !changed.is_empty());
        prop_assert_eq!(form.is_fields_touched(None, true), changed.len() == NAMES.len());
        for (index, name) in NAMES.iter().enumerate() {
            prop_assert_eq!(
                form.is_field_touched(&NamePath::from(*name)),
                changed.contains(&index)
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Shared paths survive partial unregistration
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shared_path_cleared_only_by_last_unregister(
        order in (1usize..5).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let pool = LocalPool::new();
        let form = FormStore::with_config(pool.spawner(), FormConfig::new().preserve(false));
        let path = NamePath::from("x");
        let fields: Vec<Field> = order
            .iter()
            .map(|_| {
                let field = Field::new(&form, FieldProps::new("x"));
                field.mount();
                field
            })
            .collect();
        fields[0].trigger_change(Some(Value::from("shared")));

        for (step, index) in order.iter().enumerate() {
            fields[*index].unmount();
            let expected = if step + 1 == order.len() {
                None
            } else {
                Some(Value::from("shared"))
            };
            prop_assert_eq!(form.get_field_value(&path), expected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Only the latest session commits
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn only_latest_session_resolves_ok(sessions in 1usize..6) {
        let mut pool = LocalPool::new();
        let form = FormStore::new(pool.spawner());
        let field = Field::new(&form, FieldProps::new("a").rule(Rule::sync(|_| Ok(()))));
        field.mount();

        let handles: Vec<_> = (0..sessions)
            .map(|_| form.validate_fields(None, ValidateOptions::default()))
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|handle| pool.run_until(handle)).collect();

        for (index, outcome) in outcomes.iter().enumerate() {
            if index + 1 == sessions {
                prop_assert!(outcome.is_ok());
            } else {
                prop_assert!(outcome.as_ref().is_err_and(|err| err.out_of_date));
            }
        }
    }
}
