//! Integration tests for the widget tree, layout properties and input emitters.

use std::sync::Arc;

use flexion_core::{
    Component, ComponentClass, ComponentTreeDebug, Event, Loop, ReactionSpec, TickReport,
    Validator, Value,
};
use flexion_widgets::float_pair::{self, FloatPair};
use flexion_widgets::widget::{self, children, create_widget, parent, widget_class};
use flexion_widgets::{KeyEvent, KeyboardModifiers, MouseButton, PointerEvent, WheelEvent};
use parking_lot::Mutex;
use proptest::prelude::*;

fn flush() -> TickReport {
    Loop::current().flush().unwrap()
}

fn new_widget(title: &str) -> Component {
    widget_class().unwrap().create_with([("title", title)]).unwrap()
}

fn child_of(parent: &Component, title: &str) -> Component {
    create_widget(&widget_class().unwrap(), Some(parent), [("title", title)]).unwrap()
}

fn titles(widget: &Component) -> Vec<String> {
    children(widget)
        .iter()
        .map(|c| c.get("title").unwrap().to_string())
        .collect()
}

#[test]
fn test_explicit_parent_is_applied_on_construction() {
    let root = new_widget("root");
    let a = child_of(&root, "a");
    let b = child_of(&root, "b");
    assert_eq!(parent(&a), Some(root.clone()));
    assert_eq!(parent(&b), Some(root.clone()));
    assert_eq!(titles(&root), vec!["a", "b"]);
    assert!(parent(&root).is_none());
}

#[test]
fn test_active_widget_becomes_parent() {
    let root = new_widget("root");
    let lp = Loop::current();
    let guard = lp.activate(&root);
    let a = new_widget("a");
    drop(guard);
    let b = new_widget("b");

    assert_eq!(parent(&a), Some(root.clone()));
    assert!(parent(&b).is_none());
}

#[test]
fn test_non_widget_active_component_is_ignored() {
    let scope = ComponentClass::builder("Scope").build().unwrap().create().unwrap();
    let _guard = Loop::current().activate(&scope);
    let w = new_widget("orphan");
    assert!(parent(&w).is_none());
}

#[test]
fn test_set_parent_positions() {
    let root = new_widget("root");
    for title in ["a", "b", "c"] {
        child_of(&root, title);
    }
    let d = new_widget("d");

    d.invoke("set_parent", vec![Value::from(&root), Value::from(0)]).unwrap();
    flush();
    assert_eq!(titles(&root), vec!["d", "a", "b", "c"]);

    d.invoke("set_parent", vec![Value::from(&root), Value::from(-1)]).unwrap();
    flush();
    assert_eq!(titles(&root), vec!["a", "b", "c", "d"]);

    d.invoke("set_parent", vec![Value::from(&root), Value::from(-2)]).unwrap();
    flush();
    assert_eq!(titles(&root), vec!["a", "b", "d", "c"]);

    d.invoke("set_parent", vec![Value::from(&root), Value::from(99)]).unwrap();
    flush();
    assert_eq!(titles(&root), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_reparenting_updates_both_parents() {
    let first = new_widget("first");
    let second = new_widget("second");
    let w = child_of(&first, "w");

    w.invoke("set_parent", vec![Value::from(&second)]).unwrap();
    flush();
    assert!(children(&first).is_empty());
    assert_eq!(children(&second), vec![w.clone()]);
    assert_eq!(parent(&w), Some(second.clone()));

    w.invoke("set_parent", vec![Value::Null]).unwrap();
    flush();
    assert!(children(&second).is_empty());
    assert!(parent(&w).is_none());
}

#[test]
fn test_same_parent_without_position_is_silent() {
    let events = Arc::new(Mutex::new(Vec::<Event>::new()));
    let sink = events.clone();
    let root = new_widget("root");
    let w = child_of(&root, "w");
    root.react(ReactionSpec::new("watch", ["children"], move |_, batch| {
        sink.lock().extend(batch.iter().cloned());
        Ok(())
    }))
    .unwrap();

    w.invoke("set_parent", vec![Value::from(&root)]).unwrap();
    flush();
    assert!(events.lock().is_empty());
}

#[test]
fn test_parent_cycles_are_rejected() {
    let root = new_widget("root");
    let child = child_of(&root, "child");
    let grandchild = child_of(&child, "grandchild");

    root.invoke("set_parent", vec![Value::from(&grandchild)]).unwrap();
    root.invoke("set_parent", vec![Value::from(&root)]).unwrap();
    let report = flush();
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.error.is_validation()));
    assert!(parent(&root).is_none());
}

#[test]
fn test_parent_must_be_a_widget() {
    let w = new_widget("w");
    let plain = ComponentClass::builder("Plain").build().unwrap().create().unwrap();
    w.invoke("set_parent", vec![Value::from(&plain)]).unwrap();
    w.invoke("set_parent", vec![Value::Null, Value::from("first")]).unwrap();
    let report = flush();
    assert_eq!(report.failures.len(), 2);
    assert!(parent(&w).is_none());

    let err = create_widget(&widget_class().unwrap(), Some(&plain), Vec::<(String, Value)>::new())
        .unwrap_err();
    assert!(matches!(err, flexion_core::Error::Construction { .. }));
    let err = create_widget(
        &ComponentClass::builder("NotAWidget").build().unwrap(),
        None,
        Vec::<(String, Value)>::new(),
    )
    .unwrap_err();
    assert!(matches!(err, flexion_core::Error::Construction { .. }));
}

#[test]
fn test_tree_properties_are_not_settable() {
    let root = new_widget("root");
    let w = new_widget("w");
    assert!(w.set("parent", &root).unwrap_err().is_access());
    assert!(w.set("children", Value::tuple([&root])).unwrap_err().is_access());
    assert!(w.set("size", 3).unwrap_err().is_access());
    let err = widget_class().unwrap().create_with([("parent", &root)]).unwrap_err();
    assert!(matches!(err, flexion_core::Error::Construction { .. }));
}

#[test]
fn test_dispose_releases_from_parent() {
    let root = new_widget("root");
    let a = child_of(&root, "a");
    let b = child_of(&root, "b");

    a.dispose();
    assert_eq!(children(&root), vec![b.clone()]);
    assert!(parent(&a).is_none());
    assert!(a.is_disposed());
    assert!(flush().is_clean());
}

#[test]
fn test_dispose_cascades_to_children() {
    let root = new_widget("root");
    let child = child_of(&root, "child");
    let grandchild = child_of(&child, "grandchild");

    root.dispose();
    assert!(child.is_disposed());
    assert!(grandchild.is_disposed());
    assert!(children(&root).is_empty());
    assert!(children(&child).is_empty());
    assert!(parent(&grandchild).is_none());
}

#[test]
fn test_float_pair_properties() {
    let w = widget_class()
        .unwrap()
        .create_with([("flex", Value::from(2))])
        .unwrap();
    assert_eq!(w.get("flex").unwrap(), float_pair::value(2.0, 2.0));
    assert_eq!(w.get("base_size").unwrap(), float_pair::value(32.0, 32.0));
    assert_eq!(w.get("size").unwrap(), float_pair::value(0.0, 0.0));

    w.set("pos", Value::list([Value::from(10), Value::from("20.5")])).unwrap();
    w.set("pos", "left").unwrap();
    let report = flush();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.is_validation());
    assert_eq!(float_pair::get(&w.get("pos").unwrap()), Some((10.0, 20.5)));
}

#[test]
fn test_host_reports_size() {
    let w = new_widget("w");
    w.invoke("set_size", vec![Value::from(640), Value::from(480)]).unwrap();
    flush();
    assert_eq!(w.get("size").unwrap(), float_pair::value(640.0, 480.0));

    w.invoke("set_size", vec![Value::tuple([1.0, 2.0])]).unwrap();
    flush();
    assert_eq!(w.get("size").unwrap(), float_pair::value(1.0, 2.0));

    w.invoke("set_size", vec![]).unwrap();
    assert_eq!(flush().failures.len(), 1);
}

#[test]
fn test_reaction_follows_parent_size() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = sizes.clone();
    let first = new_widget("first");
    let second = new_widget("second");
    let w = child_of(&first, "w");
    w.react(ReactionSpec::new("track", ["parent.size"], move |_, batch| {
        sink.lock().extend(
            batch
                .iter()
                .filter(|e| e.name == "size")
                .filter_map(|e| e.new_value().and_then(float_pair::get)),
        );
        Ok(())
    }))
    .unwrap();

    first.invoke("set_size", vec![Value::from(100), Value::from(50)]).unwrap();
    flush();
    w.invoke("set_parent", vec![Value::from(&second)]).unwrap();
    first.invoke("set_size", vec![Value::from(1), Value::from(1)]).unwrap();
    second.invoke("set_size", vec![Value::from(300), Value::from(200)]).unwrap();
    flush();

    assert_eq!(*sizes.lock(), vec![(100.0, 50.0), (300.0, 200.0)]);
}

fn record_emits(w: &Component, names: &'static [&'static str]) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    w.react(ReactionSpec::new("inputs", names.iter().copied(), move |_, batch| {
        sink.lock().extend(batch.iter().cloned());
        Ok(())
    }))
    .unwrap();
    events
}

#[test]
fn test_pointer_emitters() {
    let w = new_widget("w");
    let events = record_emits(&w, &["pointer_down", "pointer_move", "wheel"]);

    let press = PointerEvent::at(5.0, 6.0)
        .with_button(MouseButton::Left)
        .with_modifiers(KeyboardModifiers::SHIFT);
    widget::pointer_down(&w, press.clone()).unwrap();
    widget::pointer_move(&w, press.clone()).unwrap();
    widget::wheel(
        &w,
        WheelEvent {
            pointer: press.clone(),
            hscroll: 0.0,
            vscroll: -3.0,
        },
    )
    .unwrap();
    flush();

    let events = events.lock();
    let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["pointer_down", "pointer_move", "wheel"]);

    let down = PointerEvent::from_payload(events[0].payload().unwrap()).unwrap();
    assert_eq!(down, press);
    let moved = PointerEvent::from_payload(events[1].payload().unwrap()).unwrap();
    assert_eq!(moved.button, None);
    assert_eq!(moved.buttons, vec![MouseButton::Left]);
    let scrolled = WheelEvent::from_payload(events[2].payload().unwrap()).unwrap();
    assert_eq!(scrolled.vscroll, -3.0);
    assert_eq!(scrolled.pointer.button, None);
}

#[test]
fn test_key_emitters() {
    let w = new_widget("w");
    let events = record_emits(&w, &["key_down", "key_press", "key_up"]);

    let key = KeyEvent::new("a").with_modifiers(KeyboardModifiers::CTRL);
    widget::key_down(&w, key.clone()).unwrap();
    widget::key_press(&w, key.clone()).unwrap();
    widget::key_up(&w, key.clone()).unwrap();
    flush();

    let events = events.lock();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].get("key"), Some(&Value::from("a")));
    assert_eq!(events[2].get("modifiers"), Some(&Value::tuple(["Ctrl"])));
    assert_eq!(KeyEvent::from_payload(events[1].payload().unwrap()), Some(key));
}

#[test]
fn test_emitters_require_typed_events() {
    let w = new_widget("w");
    let err = w.call_emitter("pointer_down", &[Value::from(1)]).unwrap_err();
    assert!(err.is_validation());
    let err = w.call_emitter("key_up", &[]).unwrap_err();
    assert!(err.is_validation());

    w.dispose();
    assert!(widget::pointer_up(&w, PointerEvent::at(0.0, 0.0)).unwrap_err().is_disposed());
}

#[test]
fn test_tree_debug_shows_children() {
    let root = new_widget("root");
    let a = child_of(&root, "a");
    let b = child_of(&a, "b");
    let output = ComponentTreeDebug::new().format_subtree(&root);
    assert_eq!(output.lines().count(), 3);
    assert!(output.contains(a.name()));
    assert!(output.contains(b.name()));
}

proptest! {
    #[test]
    fn prop_float_pair_is_idempotent(x in -1e9f64..1e9, y in -1e9f64..1e9, broadcast in any::<bool>()) {
        let input = if broadcast { Value::from(x) } else { Value::tuple([x, y]) };
        let once = FloatPair.validate(input).unwrap();
        prop_assert_eq!(FloatPair.validate(once.clone()).unwrap(), once.clone());
        let (a, b) = float_pair::get(&once).unwrap();
        prop_assert_eq!(a, x);
        prop_assert_eq!(b, if broadcast { x } else { y });
    }
}
