mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{apply_patch, assert_replays};
use json_patch_observer::{Observer, ObserverError, Operation, TrapState, Value};
use serde_json::json;
use tracing_test::traced_test;

#[test]
fn pop_removes_in_descending_order() {
    let before = json!({"items": ["a", "b", "c"]});
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();
    let items = root.child("items").unwrap();

    assert_eq!(items.pop().unwrap(), Value::from("c"));
    assert_eq!(items.pop().unwrap(), Value::from("b"));

    let ops = observer.generate().unwrap();
    assert_eq!(
        ops,
        vec![Operation::remove("/items/2"), Operation::remove("/items/1")]
    );
    let mut replayed = before;
    apply_patch(&mut replayed, &ops).unwrap();
    assert_eq!(replayed, json!({"items": ["a"]}));
}

#[test]
fn pop_on_empty_array_emits_nothing() {
    let observer = Observer::new(json!([])).unwrap();
    let root = observer.observe(true, None).unwrap();
    assert_eq!(root.pop().unwrap(), Value::Undefined);
    assert_eq!(root.shift().unwrap(), Value::Undefined);
    assert!(observer.generate().unwrap().is_empty());
}

#[test]
fn new_array_cells_replace_after_push() {
    let observer = Observer::new(json!([{"id": 1, "name": "Ted"}])).unwrap();
    let root = observer.observe(true, None).unwrap();

    assert_eq!(root.push(json!({"id": 2, "name": "Jerry"})).unwrap(), 2);
    assert_eq!(
        observer.generate().unwrap(),
        vec![Operation::add("/1", json!({"id": 2, "name": "Jerry"}))]
    );

    root.child(0).unwrap().set("id", 3).unwrap();
    root.child(1).unwrap().set("id", 4).unwrap();
    assert_eq!(
        observer.generate().unwrap(),
        vec![
            Operation::replace("/0/id", json!(3)),
            Operation::replace("/1/id", json!(4)),
        ]
    );
}

#[test]
fn shift_refreshes_paths() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let observer = Observer::new(json!({"arr": [{"name": "omar"}, {"name": "ali"}]})).unwrap();
    let root = observer
        .observe_with(true, move |op| sink.borrow_mut().push(op.clone()))
        .unwrap();
    let arr = root.child("arr").unwrap();

    arr.shift().unwrap();
    assert_eq!(seen.borrow().len(), 2);
    let first = arr.child(0).unwrap();
    assert_eq!(first.get("name").unwrap(), Value::from("ali"));

    first.set("name", "steve").unwrap();
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(
        seen.borrow().last(),
        Some(&Operation::replace("/arr/0/name", json!("steve")))
    );
}

#[test]
fn moving_an_element_changes_its_path() {
    let before = json!({"arrayOfArrays": [[{"item1": "item1"}], [{"item2": "item2"}]]});
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();
    let item2 = root
        .child("arrayOfArrays")
        .unwrap()
        .child(1)
        .unwrap()
        .child(0)
        .unwrap();

    item2.set("item2", "item2 modified").unwrap();
    root.child("arrayOfArrays").unwrap().shift().unwrap();
    item2.set("item2", "item2 modified again").unwrap();

    let ops = observer.generate().unwrap();
    assert_eq!(
        ops.first(),
        Some(&Operation::replace(
            "/arrayOfArrays/1/0/item2",
            json!("item2 modified")
        ))
    );
    assert_eq!(
        ops.last(),
        Some(&Operation::replace(
            "/arrayOfArrays/0/0/item2",
            json!("item2 modified again")
        ))
    );
    let mut replayed = before;
    apply_patch(&mut replayed, &ops).unwrap();
    assert_eq!(replayed, root.to_json().unwrap());
}

#[test]
fn shifted_out_element_is_detached() {
    let observer = Observer::new(json!({"arr": [{"n": 0}, {"n": 1}]})).unwrap();
    let root = observer.observe(true, None).unwrap();
    let arr = root.child("arr").unwrap();
    let first = arr.child(0).unwrap();

    arr.shift().unwrap();
    observer.generate().unwrap();

    assert_eq!(first.state(), TrapState::Detached);
    assert_eq!(first.metadata().unwrap(), None);
    first.set("n", 10).unwrap();
    assert!(observer.generate().unwrap().is_empty());
}

#[test]
fn unshift_and_splice_replay() {
    let before = json!({"list": [{"id": 1}, {"id": 2}, {"id": 3}]});
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();
    let list = root.child("list").unwrap();
    let third = list.child(2).unwrap();

    assert_eq!(list.unshift([json!({"id": 0})]).unwrap(), 4);
    let removed = list.splice(1, 2, [json!({"id": 9})]).unwrap();
    assert_eq!(removed.len(), 2);
    list.insert(0, "head").unwrap();
    third.set("seen", true).unwrap();

    assert_eq!(
        list.to_json().unwrap(),
        json!(["head", {"id": 0}, {"id": 9}, {"id": 3, "seen": true}])
    );
    assert_eq!(third.metadata().unwrap().unwrap().path, "/list/3");
    assert_replays(&observer, &before);
}

#[test]
fn remove_returns_the_element() {
    let before = json!(["a", "b", "c"]);
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();

    assert_eq!(root.remove(0).unwrap(), Value::from("a"));
    assert_eq!(root.to_json().unwrap(), json!(["b", "c"]));
    assert_replays(&observer, &before);
}

#[test]
fn inner_delete_leaves_a_null_hole() {
    let before = json!([1, 2, 3]);
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();

    assert!(root.delete(1).unwrap());
    assert!(!root.delete(7).unwrap());
    assert_eq!(root.get(1).unwrap(), Value::Undefined);
    assert_eq!(root.len().unwrap(), 3);
    assert_eq!(
        observer.generate().unwrap(),
        vec![Operation::replace("/1", json!(null))]
    );

    root.set(1, 5).unwrap();
    assert_eq!(
        observer.generate().unwrap(),
        vec![Operation::replace("/1", json!(5))]
    );
}

#[test]
fn writing_past_the_end_backfills() {
    let before = json!([1]);
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();

    root.set(3, "x").unwrap();
    assert_eq!(root.to_json().unwrap(), json!([1, null, null, "x"]));
    assert_replays(&observer, &before);
}

#[test]
fn writing_far_past_the_end_backfills_every_slot() {
    let observer = Observer::new(json!({"list": []})).unwrap();
    let root = observer.observe(true, None).unwrap();
    let list = root.child("list").unwrap();

    list.set(100_000usize, 1).unwrap();

    let ops = observer.generate().unwrap();
    assert_eq!(ops.len(), 100_001);
    assert!(ops[..100_000]
        .iter()
        .enumerate()
        .all(|(i, op)| *op == Operation::add(format!("/list/{i}"), json!(null))));
    assert_eq!(ops[100_000], Operation::add("/list/100000", json!(1)));
    assert_eq!(list.len().unwrap(), 100_001);
    assert_eq!(list.get(100_000usize).unwrap(), Value::from(1));
}

#[test]
fn set_len_shrinks_and_grows() {
    let before = json!([1, 2, 3, 4]);
    let observer = Observer::new(before.clone()).unwrap();
    let root = observer.observe(true, None).unwrap();

    root.set_len(1).unwrap();
    assert_eq!(
        observer.generate().unwrap(),
        vec![
            Operation::remove("/3"),
            Operation::remove("/2"),
            Operation::remove("/1"),
        ]
    );

    root.set("length", 3).unwrap();
    assert_eq!(
        observer.generate().unwrap(),
        vec![Operation::add("/1", json!(null)), Operation::add("/2", json!(null))]
    );
    assert_eq!(root.to_json().unwrap(), json!([1, null, null]));

    assert_eq!(
        root.set("length", "long").unwrap_err(),
        ObserverError::InvalidLength("String(\"long\")".to_string())
    );
}

#[test]
fn array_methods_require_an_array() {
    let observer = Observer::new(json!({"a": 1})).unwrap();
    let root = observer.observe(true, None).unwrap();
    assert_eq!(root.pop().unwrap_err(), ObserverError::NotAnArray);
    assert_eq!(root.set_len(0).unwrap_err(), ObserverError::NotAnArray);
}

#[traced_test]
#[test]
fn array_props_emit_nothing_and_warn_once() {
    let observer = Observer::new(json!([])).unwrap();
    let root = observer.observe(true, None).unwrap();

    root.set("lastName", "Wester").unwrap();
    root.set("lastName", "Wester Jr.").unwrap();

    assert!(observer.generate().unwrap().is_empty());
    assert_eq!(root.get("lastName").unwrap(), Value::from("Wester Jr."));
    assert!(logs_contain(
        "a non-integer property ('lastName') was set on an array; no patch is emitted"
    ));
    logs_assert(|lines: &[&str]| {
        match lines
            .iter()
            .filter(|line| line.contains("non-integer property ('lastName')"))
            .count()
        {
            1 => Ok(()),
            n => Err(format!("expected one warning, got {n}")),
        }
    });
}

#[traced_test]
#[test]
fn object_array_props_are_not_tracked() {
    let observer = Observer::new(json!([])).unwrap();
    let root = observer.observe(true, None).unwrap();

    root.set("person", json!({"name": "Albert"})).unwrap();
    let person = root.child("person").unwrap();
    person.set("name", "Joachim").unwrap();

    assert!(logs_contain("the object value is not tracked"));
    assert_eq!(person.state(), TrapState::Passthrough);
    assert_eq!(person.metadata().unwrap(), None);
    assert_eq!(person.get("name").unwrap(), Value::from("Joachim"));
    assert!(observer.generate().unwrap().is_empty());
}
