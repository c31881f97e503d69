//! Integration tests for reaction batching, paths, emitters and the loop.

use std::sync::Arc;

use flexion_core::{
    Change, Component, ComponentClass, Error, Event, Loop, LoopConfig, Mutation, Payload,
    PropertySpec, ReactionSpec, Value,
};
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<Event>>>;

fn recorder(log: &Log) -> impl Fn(&Component, &[Event]) -> flexion_core::Result<()> + Send + Sync + 'static {
    let log = log.clone();
    move |_, events| {
        log.lock().push(Event::new(
            flexion_core::ComponentId::from_raw(0),
            "batch",
            Change::Emit(Payload::from([("size".to_string(), Value::from(events.len()))])),
        ));
        log.lock().extend(events.iter().cloned());
        Ok(())
    }
}

/// Split a recorded log into batches of events.
fn batches(log: &Log) -> Vec<Vec<Event>> {
    let mut out: Vec<Vec<Event>> = Vec::new();
    for event in log.lock().iter() {
        if event.name == "batch" {
            out.push(Vec::new());
        } else if let Some(batch) = out.last_mut() {
            batch.push(event.clone());
        }
    }
    out
}

fn counter_class() -> ComponentClass {
    ComponentClass::builder("Counter")
        .property(PropertySpec::int("count").settable(true))
        .property(PropertySpec::list("items").settable(true))
        .property(PropertySpec::int("other").settable(true))
        .action("fill", |c, _| {
            c.mutate("items", Mutation::insert(0, [5, 6]))?;
            c.mutate("items", Mutation::insert(0, [1, 2]))?;
            c.mutate("items", Mutation::insert(2, [3, 4]))
        })
        .action("double", |c, _| {
            let count = c.get("count")?.as_int().unwrap_or(0);
            c.mutate("count", Mutation::set(count * 2))
        })
        .build()
        .unwrap()
}

#[test]
fn test_mutations_in_one_tick_are_batched() {
    let log: Log = Arc::default();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("on_count", ["count"], recorder(&log)))
        .unwrap();

    for i in 1..=4 {
        c.set("count", i).unwrap();
    }
    let report = Loop::current().flush().unwrap();
    assert_eq!(report.reactions_run, 1);

    let batches = batches(&log);
    assert_eq!(batches.len(), 1);
    let new_values: Vec<i64> = batches[0]
        .iter()
        .filter_map(|e| e.new_value().and_then(Value::as_int))
        .collect();
    assert_eq!(new_values, vec![1, 2, 3, 4]);
    assert_eq!(batches[0][1].old_value(), Some(&Value::Int(1)));
}

#[test]
fn test_insert_events_in_order() {
    let log: Log = Arc::default();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("on_items", ["items"], recorder(&log)))
        .unwrap();

    c.invoke("fill", vec![]).unwrap();
    Loop::current().flush().unwrap();

    assert_eq!(c.get("items").unwrap(), Value::list([1, 2, 3, 4, 5, 6]));
    let batches = batches(&log);
    assert_eq!(batches.len(), 1);
    let inserts: Vec<(usize, Vec<Value>)> = batches[0]
        .iter()
        .map(|e| match &e.change {
            Change::Insert { index, objects } => (*index, objects.clone()),
            other => panic!("unexpected change {other:?}"),
        })
        .collect();
    assert_eq!(
        inserts,
        vec![
            (0, vec![Value::from(5), Value::from(6)]),
            (0, vec![Value::from(1), Value::from(2)]),
            (2, vec![Value::from(3), Value::from(4)]),
        ]
    );
}

#[test]
fn test_actions_run_in_enqueue_order() {
    let c = counter_class().create().unwrap();
    c.set("count", 3).unwrap();
    c.invoke("double", vec![]).unwrap();
    c.set("count", 10).unwrap();
    c.invoke("double", vec![]).unwrap();
    Loop::current().iter().unwrap();
    assert_eq!(c.get("count").unwrap(), Value::Int(20));
}

#[test]
fn test_reactions_see_the_whole_tick() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("snapshot", ["count", "other"], move |c, events| {
        sink.lock().push((
            events.len(),
            c.get("count")?.as_int(),
            c.get("other")?.as_int(),
        ));
        Ok(())
    }))
    .unwrap();

    c.set("count", 1).unwrap();
    c.set("other", 2).unwrap();
    Loop::current().flush().unwrap();
    assert_eq!(*seen.lock(), vec![(2, Some(1), Some(2))]);
}

#[test]
fn test_unchanged_set_produces_no_event() {
    let log: Log = Arc::default();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("on_count", ["count"], recorder(&log)))
        .unwrap();
    c.set("count", 0).unwrap();
    let report = Loop::current().flush().unwrap();
    assert_eq!(report.reactions_run, 0);
    assert!(log.lock().is_empty());
}

#[test]
fn test_reactions_cannot_mutate() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("cheat", ["count"], move |c, _| {
        let result = c.mutate("other", Mutation::set(1));
        sink.lock().push(result.clone());
        result
    }))
    .unwrap();

    c.set("count", 5).unwrap();
    let report = Loop::current().flush().unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.is_access());
    assert!(errors.lock()[0].as_ref().unwrap_err().is_access());
    assert_eq!(c.get("other").unwrap(), Value::Int(0));
}

#[test]
fn test_reactions_request_changes_through_actions() {
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("follow", ["count"], |c, events| {
        if let Some(value) = events.last().and_then(Event::new_value) {
            c.set("other", value.clone())?;
        }
        Ok(())
    }))
    .unwrap();

    c.set("count", 7).unwrap();
    let first = Loop::current().iter().unwrap();
    assert_eq!(first.reactions_run, 1);
    assert_eq!(c.get("other").unwrap(), Value::Int(0));
    assert!(Loop::current().has_pending());

    Loop::current().iter().unwrap();
    assert_eq!(c.get("other").unwrap(), Value::Int(7));
}

#[test]
fn test_failing_reaction_does_not_stop_others() {
    let log: Log = Arc::default();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("broken", ["count"], |_, _| {
        Err(Error::reaction("broken", "boom"))
    }))
    .unwrap();
    c.react(ReactionSpec::new("fine", ["count"], recorder(&log)))
        .unwrap();

    c.set("count", 1).unwrap();
    let report = Loop::current().flush().unwrap();
    assert_eq!(report.reactions_run, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].context.ends_with(".broken"));
    assert_eq!(batches(&log).len(), 1);
}

fn node_class() -> ComponentClass {
    ComponentClass::builder("Node")
        .property(PropertySpec::component("other").settable(true))
        .property(PropertySpec::int("value").settable(true))
        .action("point_and_bump", |c, args| {
            let target = args
                .first()
                .and_then(Value::as_component)
                .cloned()
                .ok_or_else(|| Error::validation("other", "expected a component"))?;
            c.mutate("other", Mutation::set(&target))?;
            target.mutate("value", Mutation::set(99))
        })
        .build()
        .unwrap()
}

fn names_and_sources(events: &[Event]) -> Vec<(String, flexion_core::ComponentId)> {
    events.iter().map(|e| (e.name.clone(), e.source)).collect()
}

#[test]
fn test_related_path_follows_link() {
    let class = node_class();
    let a = class.create().unwrap();
    let b = class.create().unwrap();
    let c = class.create().unwrap();
    let log: Log = Arc::default();
    a.react(ReactionSpec::new("watch", ["other.value"], recorder(&log)))
        .unwrap();
    let lp = Loop::current();

    a.set("other", &b).unwrap();
    lp.flush().unwrap();
    b.set("value", 5).unwrap();
    lp.flush().unwrap();
    a.set("other", &c).unwrap();
    lp.flush().unwrap();
    b.set("value", 6).unwrap();
    lp.flush().unwrap();
    c.set("value", 7).unwrap();
    lp.flush().unwrap();

    let got: Vec<_> = batches(&log).iter().map(|b| names_and_sources(b)).collect();
    assert_eq!(
        got,
        vec![
            vec![("other".to_string(), a.id())],
            vec![("value".to_string(), b.id())],
            vec![("other".to_string(), a.id())],
            vec![("value".to_string(), c.id())],
        ]
    );
    assert_eq!(b.subscriber_count("value"), 0);
    assert_eq!(c.subscriber_count("value"), 1);
}

#[test]
fn test_resubscription_is_immediate() {
    let class = node_class();
    let a = class.create().unwrap();
    let b = class.create().unwrap();
    let log: Log = Arc::default();
    a.react(ReactionSpec::new("watch", ["other.value"], recorder(&log)))
        .unwrap();

    a.invoke("point_and_bump", vec![Value::from(&b)]).unwrap();
    Loop::current().flush().unwrap();

    let got = batches(&log);
    assert_eq!(got.len(), 1);
    assert_eq!(
        names_and_sources(&got[0]),
        vec![("other".to_string(), a.id()), ("value".to_string(), b.id())]
    );
}

#[test]
fn test_path_checked_at_build() {
    let err = ComponentClass::builder("Broken")
        .property(PropertySpec::int("value"))
        .reaction(ReactionSpec::new("bad", ["missing"], |_, _| Ok(())))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Construction { .. }));

    let err = ComponentClass::builder("Broken")
        .property(PropertySpec::int("value"))
        .reaction(ReactionSpec::new("bad", ["value.size"], |_, _| Ok(())))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Construction { .. }));
}

fn clicker_class() -> ComponentClass {
    ComponentClass::builder("Clicker")
        .property(PropertySpec::int("clicks"))
        .emitter("pointer_down", |_, args| {
            let mut payload = Payload::new();
            payload.insert(
                "button".to_string(),
                args.first().cloned().unwrap_or(Value::Int(1)),
            );
            Ok(payload)
        })
        .build()
        .unwrap()
}

#[test]
fn test_emitter_delivers_payload() {
    let log: Log = Arc::default();
    let c = clicker_class().create().unwrap();
    c.react(ReactionSpec::new("on_down", ["pointer_down"], recorder(&log)))
        .unwrap();

    let payload = c.call_emitter("pointer_down", &[Value::from(2)]).unwrap();
    assert_eq!(payload.get("button"), Some(&Value::Int(2)));
    c.call_emitter("pointer_down", &[]).unwrap();
    Loop::current().flush().unwrap();

    let got = batches(&log);
    assert_eq!(got.len(), 1);
    let buttons: Vec<_> = got[0].iter().filter_map(|e| e.get("button").cloned()).collect();
    assert_eq!(buttons, vec![Value::Int(2), Value::Int(1)]);
    assert!(!got[0][0].is_mutation());
}

#[test]
fn test_emit_requires_declared_emitter() {
    let c = clicker_class().create().unwrap();
    assert!(c.emit("clicks", Payload::new()).unwrap_err().is_access());
    assert!(c.call_emitter("nope", &[]).unwrap_err().is_access());
    assert!(c.emit("pointer_down", Payload::new()).is_ok());
}

#[test]
fn test_implicit_reaction_tracks_reads() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let sink = runs.clone();
    let class = ComponentClass::builder("Doubler")
        .property(PropertySpec::int("foo").settable(true))
        .property(PropertySpec::int("bar").settable(true))
        .reaction(ReactionSpec::implicit("watch_foo", move |c, _| {
            sink.lock().push(c.get("foo")?.as_int().unwrap_or_default());
            Ok(())
        }))
        .build()
        .unwrap();

    let c = class.create().unwrap();
    assert_eq!(*runs.lock(), vec![0]);

    c.set("foo", 2).unwrap();
    Loop::current().flush().unwrap();
    assert_eq!(*runs.lock(), vec![0, 2]);

    c.set("bar", 5).unwrap();
    Loop::current().flush().unwrap();
    assert_eq!(*runs.lock(), vec![0, 2]);
    assert_eq!(c.subscriber_count("foo"), 1);
    assert_eq!(c.subscriber_count("bar"), 0);
}

#[test]
fn test_disconnect_runtime_reaction() {
    let log: Log = Arc::default();
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("on_count", ["count"], recorder(&log)))
        .unwrap();
    assert!(c.reaction_connected("on_count"));

    c.set("count", 1).unwrap();
    assert!(c.disconnect_reaction("on_count"));
    Loop::current().flush().unwrap();

    assert!(log.lock().is_empty());
    assert!(!c.reaction_connected("on_count"));
    assert!(!c.disconnect_reaction("on_count"));
    assert_eq!(c.subscriber_count("count"), 0);
}

#[test]
fn test_action_recursion_limit() {
    let class = ComponentClass::builder("Spinner")
        .action("spin", |c, _| c.invoke("spin", vec![]))
        .build()
        .unwrap();
    let c = class.create().unwrap();
    let lp = Loop::current();
    lp.set_config(LoopConfig::default().with_max_actions_per_tick(50));

    c.invoke("spin", vec![]).unwrap();
    let err = lp.iter().unwrap_err();
    assert!(matches!(err, Error::Recursion { limit: 50, .. }));
    assert!(!lp.has_pending());
    lp.reset();
}

#[test]
fn test_flush_tick_limit() {
    let c = counter_class().create().unwrap();
    c.react(ReactionSpec::new("feedback", ["count"], |c, _| {
        let count = c.get("count")?.as_int().unwrap_or(0);
        c.set("count", count + 1)
    }))
    .unwrap();
    let lp = Loop::current();
    lp.set_config(LoopConfig::default().with_max_ticks_per_flush(5));

    c.set("count", 1).unwrap();
    let err = lp.flush().unwrap_err();
    assert!(err.is_recursion());
    assert!(!lp.has_pending());
    assert_eq!(c.get("count").unwrap(), Value::Int(5));
    lp.reset();
}

#[test]
fn test_host_waker() {
    let wakes = Arc::new(Mutex::new(0));
    let counter = wakes.clone();
    let lp = Loop::current();
    lp.set_waker(move || *counter.lock() += 1);

    let c = counter_class().create().unwrap();
    c.set("count", 1).unwrap();
    c.set("count", 2).unwrap();
    assert_eq!(*wakes.lock(), 1);
    lp.flush().unwrap();
    lp.reset();
}
