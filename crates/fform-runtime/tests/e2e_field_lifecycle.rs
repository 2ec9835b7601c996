//! Field registration, meta and reset scenarios.

mod support;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fform_runtime::{
    Callbacks, Field, FieldData, FieldProps, FormConfig, FormStore, NameList, Value,
};
use futures::executor::LocalPool;
use serde_json::json;
use support::{capture, form, path, store};

#[test]
fn touched_only_after_first_change() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let a = Field::new(&form, FieldProps::new("a"));
    let b = Field::new(&form, FieldProps::new("b"));
    a.mount();
    b.mount();
    assert!(!form.is_fields_touched(None, false));

    a.trigger_change(Some(Value::from(1)));
    assert!(form.is_fields_touched(None, false));
    assert!(!form.is_fields_touched(None, true));
    assert!(form.is_field_touched(&path!["a"]));
    assert!(!form.is_field_touched(&path!["b"]));

    b.trigger_change(Some(Value::from(2)));
    assert!(form.is_fields_touched(None, true));
}

#[test]
fn touched_groups_by_prefix() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let name = Field::new(&form, FieldProps::new(path!["user", "name"]));
    let age = Field::new(&form, FieldProps::new(path!["user", "age"]));
    let note = Field::new(&form, FieldProps::new("note"));
    name.mount();
    age.mount();
    note.mount();

    name.trigger_change(Some(Value::from("ada")));
    assert!(form.is_fields_touched(Some(&[path!["user"]]), false));
    assert!(!form.is_fields_touched(Some(&[path!["user"], path!["note"]]), true));

    note.trigger_change(Some(Value::from("hi")));
    assert!(form.is_fields_touched(Some(&[path!["user"], path!["note"]]), true));
}

#[test]
fn unregister_keeps_value_while_another_entity_covers_it() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let first = Field::new(&form, FieldProps::new("x").preserve(false));
    let second = Field::new(&form, FieldProps::new("x").preserve(false));
    first.mount();
    second.mount();
    first.trigger_change(Some(Value::from("kept")));

    first.unmount();
    assert_eq!(form.get_field_value(&path!["x"]), Some(Value::from("kept")));

    second.unmount();
    assert_eq!(form.get_field_value(&path!["x"]), None);
    assert_eq!(form.get_all_values(), Value::empty_map());
}

#[test]
fn unregister_restores_initial_value() {
    let pool = LocalPool::new();
    let form = FormStore::with_config(
        pool.spawner(),
        FormConfig::new().initial_values(store(json!({ "x": "init" }))),
    );
    let x = Field::new(&form, FieldProps::new("x"));
    x.mount();
    x.trigger_change(Some(Value::from("edited")));
    x.unmount();
    assert_eq!(form.get_field_value(&path!["x"]), Some(Value::from("init")));
}

#[test]
fn preserve_keeps_value_after_unmount() {
    let pool = LocalPool::new();
    let form = FormStore::with_config(pool.spawner(), FormConfig::new().preserve(true));
    let kept = Field::new(&form, FieldProps::new("kept"));
    let dropped = Field::new(&form, FieldProps::new("dropped").preserve(false));
    kept.mount();
    dropped.mount();
    kept.trigger_change(Some(Value::from(1)));
    dropped.trigger_change(Some(Value::from(2)));

    kept.unmount();
    dropped.unmount();
    assert_eq!(form.get_all_values(), store(json!({ "kept": 1 })));
}

#[test]
fn conflicting_field_initial_values_apply_neither() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let (events, _guard) = capture();

    let first = Field::new(&form, FieldProps::new("x").initial_value("one"));
    let second = Field::new(&form, FieldProps::new("x").initial_value("two"));
    first.mount();
    second.mount();

    form.reset_fields(None);
    assert_eq!(form.get_field_value(&path!["x"]), None);
    assert!(
        events
            .warnings()
            .contains(&"conflicting_initial_value".to_string())
    );
}

#[test]
fn form_initial_values_shadow_field_initial_value() {
    let pool = LocalPool::new();
    let form = FormStore::with_config(
        pool.spawner(),
        FormConfig::new().initial_values(store(json!({ "x": "form" }))),
    );
    let (events, _guard) = capture();
    let x = Field::new(&form, FieldProps::new("x").initial_value("field"));
    x.mount();

    assert_eq!(form.get_field_value(&path!["x"]), Some(Value::from("form")));
    assert_eq!(events.warnings(), vec!["shadowed_initial_value".to_string()]);
}

#[test]
fn reset_is_idempotent_and_reapplies_field_initial_values() {
    let pool = LocalPool::new();
    let form = FormStore::with_config(
        pool.spawner(),
        FormConfig::new().initial_values(store(json!({ "a": 1 }))),
    );
    let a = Field::new(&form, FieldProps::new("a"));
    let b = Field::new(&form, FieldProps::new("b").initial_value("seed"));
    a.mount();
    b.mount();
    a.trigger_change(Some(Value::from(9)));
    b.trigger_change(Some(Value::from("typed")));

    form.reset_fields(None);
    let once = form.get_all_values();
    form.reset_fields(None);
    assert_eq!(form.get_all_values(), once);
    assert_eq!(once, store(json!({ "a": 1, "b": "seed" })));
    assert!(!a.is_touched());
    assert_eq!(a.reset_count(), 2);
}

#[test]
fn scoped_reset_leaves_other_fields_alone() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let a = Field::new(&form, FieldProps::new("a"));
    let b = Field::new(&form, FieldProps::new("b"));
    a.mount();
    b.mount();
    a.trigger_change(Some(Value::from(1)));
    b.trigger_change(Some(Value::from(2)));

    form.reset_fields(Some(&[path!["a"]]));
    assert_eq!(form.get_all_values(), store(json!({ "b": 2 })));
    assert!(!a.is_touched());
    assert!(b.is_touched());
}

#[test]
fn set_fields_writes_value_and_meta() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let a = Field::new(&form, FieldProps::new("a"));
    a.mount();

    form.set_fields(vec![
        FieldData::new("a").value("v").touched(true).errors(["server says no"]),
        FieldData::new("ghost").value(1),
    ]);
    assert_eq!(a.value(), Some(Value::from("v")));
    assert!(a.is_touched());
    assert_eq!(a.errors(), vec!["server says no".to_string()]);
    assert_eq!(form.get_field_value(&path!["ghost"]), Some(Value::from(1)));

    let snapshot = form.get_fields();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].errors, vec!["server says no".to_string()]);
}

#[test]
fn set_fields_value_merges_and_touches_changed_fields() {
    let pool = LocalPool::new();
    let form = FormStore::with_config(
        pool.spawner(),
        FormConfig::new().initial_values(store(json!({ "user": { "name": "ada", "age": 36 } }))),
    );
    let name = Field::new(&form, FieldProps::new(path!["user", "name"]));
    let age = Field::new(&form, FieldProps::new(path!["user", "age"]));
    name.mount();
    age.mount();

    form.set_fields_value(&store(json!({ "user": { "age": 37 } })));
    assert_eq!(
        form.get_all_values(),
        store(json!({ "user": { "name": "ada", "age": 37 } }))
    );
    assert!(age.is_touched());
    assert!(!name.is_touched());
}

#[test]
fn get_fields_value_projects_and_filters() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let a = Field::new(&form, FieldProps::new("a"));
    let b = Field::new(&form, FieldProps::new("b"));
    let item = Field::new(&form, FieldProps::new(0).prefix("list").list_field(true));
    a.mount();
    b.mount();
    item.mount();
    form.set_fields_value(&store(json!({ "a": 1, "b": 2, "list": ["x"], "extra": true })));
    a.trigger_change(Some(Value::from(10)));

    assert_eq!(
        form.get_fields_value(NameList::Registered, None),
        store(json!({ "a": 10, "b": 2 }))
    );

    let only_a = |meta: &fform_runtime::Meta| meta.name == path!["a"];
    assert_eq!(
        form.get_fields_value(NameList::All, Some(&only_a)),
        store(json!({ "a": 10 }))
    );
    assert_eq!(
        form.get_fields_value(
            NameList::Paths(vec![path!["extra"], path!["b"]]),
            Some(&|meta: &fform_runtime::Meta| meta.touched)
        ),
        store(json!({ "b": 2 }))
    );
}

#[test]
fn callbacks_see_changed_and_all_values() {
    let pool = LocalPool::new();
    let seen_values = Rc::new(RefCell::new(Vec::new()));
    let seen_fields = Rc::new(RefCell::new(Vec::new()));
    let values_sink = Rc::clone(&seen_values);
    let fields_sink = Rc::clone(&seen_fields);
    let form = FormStore::with_config(
        pool.spawner(),
        FormConfig::new().callbacks(
            Callbacks::new()
                .on_values_change(move |changed, all| {
                    values_sink.borrow_mut().push((changed.clone(), all.clone()));
                })
                .on_fields_change(move |changed, all| {
                    fields_sink.borrow_mut().push((changed.len(), all.len()));
                }),
        ),
    );
    let a = Field::new(&form, FieldProps::new("a"));
    let b = Field::new(&form, FieldProps::new("b"));
    a.mount();
    b.mount();
    b.trigger_change(Some(Value::from(2)));
    a.trigger_change(Some(Value::from(1)));

    let last = seen_values.borrow().last().cloned();
    assert_eq!(
        last,
        Some((store(json!({ "a": 1 })), store(json!({ "a": 1, "b": 2 }))))
    );
    assert_eq!(seen_fields.borrow().last().copied(), Some((1, 2)));
}

#[test]
fn disabling_subscription_falls_back_to_root_signal() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let roots = Rc::new(Cell::new(0));
    let counter = Rc::clone(&roots);
    form.set_force_root_update(move || counter.set(counter.get() + 1));
    let a = Field::new(&form, FieldProps::new("a"));
    a.mount();

    form.use_subscribe(false);
    let before = a.render_count();
    form.set_fields_value(&store(json!({ "a": 1 })));
    assert_eq!(a.render_count(), before);
    assert_eq!(roots.get(), 1);

    form.use_subscribe(true);
    form.set_fields_value(&store(json!({ "a": 2 })));
    assert_eq!(a.render_count(), before + 1);
    assert_eq!(roots.get(), 1);
}

#[test]
fn registering_twice_keeps_one_entry() {
    let pool = LocalPool::new();
    let form = form(&pool);
    let a = Field::new(&form, FieldProps::new("a"));
    let entity = a.entity();
    let _first = form.register_field(entity.clone());
    let _second = form.register_field(entity);
    assert_eq!(form.get_fields().len(), 1);
}
