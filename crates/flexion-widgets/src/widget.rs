//! The base widget component class.
//!
//! Widgets form a tree through the `parent` and `children` properties, which
//! are kept consistent by the `set_parent` action. Neither is settable
//! directly.
//!
//! A widget created while another widget is the active component becomes its
//! child, so subclasses can build their children from an init hook:
//!
//! ```
//! use flexion_core::{ComponentClass, Value};
//! use flexion_widgets::widget::{self, widget_class};
//!
//! let panel = ComponentClass::builder("Panel")
//!     .extends(&widget_class().unwrap())
//!     .init(|_panel| {
//!         widget_class()?.create_with([("title", "first")])?;
//!         widget_class()?.create_with([("title", "second")])?;
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let p = panel.create().unwrap();
//! let titles: Vec<Value> = widget::children(&p)
//!     .iter()
//!     .map(|child| child.get("title").unwrap())
//!     .collect();
//! assert_eq!(titles, vec![Value::from("first"), Value::from("second")]);
//! ```
//!
//! Disposing a widget disposes its children first and removes it from its
//! parent.

use std::any::Any;
use std::sync::OnceLock;

use flexion_core::{
    ActionSpec, Component, ComponentClass, EmitterSpec, Error, Loop, Mutation, Payload,
    PropertySpec, Result, Validator, Value,
};

use crate::float_pair::{self, FloatPair};
use crate::input::{KeyEvent, PointerEvent, WheelEvent};

/// Name of the widget class.
pub const CLASS_NAME: &str = "Widget";

const TARGET: &str = "flexion_widgets::widget";

static WIDGET: OnceLock<ComponentClass> = OnceLock::new();

/// The widget class, built on first use.
pub fn widget_class() -> Result<ComponentClass> {
    if let Some(class) = WIDGET.get() {
        return Ok(class.clone());
    }
    let class = build_class()?;
    Ok(WIDGET.get_or_init(|| class).clone())
}

/// Whether a component is a widget (of any subclass).
pub fn is_widget(component: &Component) -> bool {
    WIDGET
        .get()
        .is_some_and(|widget| component.class().is_subclass_of(widget))
}

/// Create a widget of `class` under an explicit parent.
///
/// `class` must be the widget class or a subclass of it. With no parent the
/// widget is attached to the active widget, if there is one.
pub fn create_widget<I, K, V>(
    class: &ComponentClass,
    parent: Option<&Component>,
    initial: I,
) -> Result<Component>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    if !class.is_subclass_of(&widget_class()?) {
        return Err(Error::construction(
            class.name(),
            format!("not a subclass of {CLASS_NAME}"),
        ));
    }
    let Some(parent) = parent else {
        return class.create_with(initial);
    };
    if !is_widget(parent) {
        return Err(Error::construction(
            class.name(),
            format!("parent {} is not a widget", parent.name()),
        ));
    }
    let _active = Loop::current().activate(parent);
    class.create_with(initial)
}

/// The parent of a widget, if any.
pub fn parent(widget: &Component) -> Option<Component> {
    widget.get("parent").ok()?.as_component().cloned()
}

/// The children of a widget, in order.
pub fn children(widget: &Component) -> Vec<Component> {
    widget
        .get("children")
        .ok()
        .and_then(|children| children.items())
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_component)
        .cloned()
        .collect()
}

/// Feed a pointer press to a widget.
pub fn pointer_down(widget: &Component, event: PointerEvent) -> Result<Payload> {
    send(widget, "pointer_down", event)
}

/// Feed a pointer release to a widget.
pub fn pointer_up(widget: &Component, event: PointerEvent) -> Result<Payload> {
    send(widget, "pointer_up", event)
}

/// Feed a pointer move to a widget. The changed button is dropped.
pub fn pointer_move(widget: &Component, event: PointerEvent) -> Result<Payload> {
    send(widget, "pointer_move", event)
}

/// Feed a wheel scroll to a widget. The changed button is dropped.
pub fn wheel(widget: &Component, event: WheelEvent) -> Result<Payload> {
    send(widget, "wheel", event)
}

/// Feed a key press to a widget.
pub fn key_down(widget: &Component, event: KeyEvent) -> Result<Payload> {
    send(widget, "key_down", event)
}

/// Feed a key release to a widget.
pub fn key_up(widget: &Component, event: KeyEvent) -> Result<Payload> {
    send(widget, "key_up", event)
}

/// Feed a character-producing key press to a widget.
pub fn key_press(widget: &Component, event: KeyEvent) -> Result<Payload> {
    send(widget, "key_press", event)
}

fn send<T: Any + Send + Sync>(widget: &Component, emitter: &str, event: T) -> Result<Payload> {
    widget.call_emitter(emitter, &[Value::opaque(event)])
}

fn event_arg<T: Any + Clone>(args: &[Value], kind: &str) -> Result<T> {
    args.first()
        .and_then(Value::as_opaque::<T>)
        .cloned()
        .ok_or_else(|| Error::validation(kind, format!("expected a {kind} argument")))
}

/// Accepts null or a widget instance.
struct WidgetRef;

impl Validator for WidgetRef {
    fn name(&self) -> &str {
        CLASS_NAME
    }

    fn default_value(&self) -> Value {
        Value::Null
    }

    fn validate(&self, value: Value) -> Result<Value> {
        match &value {
            Value::Null => Ok(value),
            Value::Component(c) if is_widget(c) => Ok(value),
            Value::Component(c) => Err(Error::validation(
                CLASS_NAME,
                format!("expected a widget, got a {}", c.class().name()),
            )),
            other => Err(Error::validation(
                CLASS_NAME,
                format!("expected a widget or null, got {}", other.type_name()),
            )),
        }
    }
}

fn build_class() -> Result<ComponentClass> {
    let pointer = |name: &str, keep_button: bool| {
        EmitterSpec::new(name, move |_, args| {
            let mut event: PointerEvent = event_arg(args, "PointerEvent")?;
            if !keep_button {
                event.button = None;
            }
            Ok(event.into_payload())
        })
    };
    let key = |name: &str| {
        EmitterSpec::new(name, |_, args| {
            Ok(event_arg::<KeyEvent>(args, "KeyEvent")?.into_payload())
        })
    };

    ComponentClass::builder(CLASS_NAME)
        .property(
            PropertySpec::string("container")
                .settable(true)
                .with_doc("Id of the host element a root widget is shown in."),
        )
        .property(
            PropertySpec::custom("parent", WidgetRef)
                .with_doc("The parent widget, or null. Changed through `set_parent`."),
        )
        .property(PropertySpec::tuple("children").with_doc("The child widgets, in order."))
        .property(
            PropertySpec::string("title")
                .settable(true)
                .with_doc("Title shown by containers such as tab panels."),
        )
        .property(
            PropertySpec::string("icon")
                .settable(true)
                .with_doc("Icon url or data uri."),
        )
        .property(
            PropertySpec::string("css_class")
                .settable(true)
                .with_doc("Space separated style classes."),
        )
        .property(
            PropertySpec::custom("flex", FloatPair)
                .settable(true)
                .with_doc("Horizontal and vertical stretch factors in layouts."),
        )
        .property(
            PropertySpec::custom("pos", FloatPair)
                .settable(true)
                .with_doc("Position in absolute layouts."),
        )
        .property(
            PropertySpec::custom("base_size", FloatPair)
                .with_default(float_pair::value(32.0, 32.0))
                .settable(true)
                .with_doc("Size used by layouts that do not stretch the widget."),
        )
        .property(
            PropertySpec::custom("size", FloatPair)
                .with_doc("Actual size, reported by the host through `set_size`."),
        )
        .property(
            PropertySpec::any("tabindex")
                .settable(true)
                .with_doc("Keyboard focus order, or null when not focusable."),
        )
        .action_spec(
            ActionSpec::new("set_parent", set_parent)
                .with_doc("Move the widget under a new parent (or null), optionally at a position."),
        )
        .action_spec(
            ActionSpec::new("set_size", set_size)
                .with_doc("Record the size the host gave the widget."),
        )
        .emitter_spec(pointer("pointer_down", true))
        .emitter_spec(pointer("pointer_up", true))
        .emitter_spec(pointer("pointer_move", false))
        .emitter("wheel", |_, args| {
            let mut event: WheelEvent = event_arg(args, "WheelEvent")?;
            event.pointer.button = None;
            Ok(event.into_payload())
        })
        .emitter_spec(key("key_down"))
        .emitter_spec(key("key_up"))
        .emitter_spec(key("key_press"))
        .init(attach_to_active)
        .on_dispose(release)
        .build()
}

fn attach_to_active(widget: &Component) -> Result<()> {
    let active = Loop::current().active_components();
    let parent = active
        .iter()
        .rev()
        .find(|c| !c.ptr_eq(widget))
        .filter(|c| is_widget(c));
    match parent {
        Some(parent) => widget.invoke("set_parent", vec![Value::from(parent)]),
        None => Ok(()),
    }
}

fn set_parent(widget: &Component, args: &[Value]) -> Result<()> {
    let new_parent = WidgetRef.validate(args.first().cloned().unwrap_or_default())?;
    let pos = match args.get(1) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_int().ok_or_else(|| {
            Error::validation(
                "set_parent",
                format!("position must be an integer, got {}", v.type_name()),
            )
        })?),
    };

    let old_parent = widget.get("parent")?;
    if pos.is_none() && old_parent == new_parent {
        return Ok(());
    }
    if let Some(parent) = new_parent.as_component() {
        if is_ancestor(widget, parent) {
            return Err(Error::validation(
                "set_parent",
                format!("{} cannot be a descendant of itself", widget.name()),
            ));
        }
    }

    widget.mutate("parent", Mutation::set(new_parent.clone()))?;
    if let Some(old) = old_parent.as_component() {
        if old_parent != new_parent {
            old.mutate("children", Mutation::set(Value::tuple(without(old, widget))))?;
        }
    }
    if let Some(parent) = new_parent.as_component() {
        let mut children = without(parent, widget);
        let index = insert_index(children.len(), pos);
        children.insert(index, Value::from(widget));
        parent.mutate("children", Mutation::set(Value::tuple(children)))?;
    }
    tracing::debug!(
        target: TARGET,
        widget = %widget.name(),
        parent = %new_parent,
        ?pos,
        "reparented"
    );
    Ok(())
}

fn set_size(widget: &Component, args: &[Value]) -> Result<()> {
    let size = match args {
        [pair] => pair.clone(),
        [w, h] => Value::tuple([w.clone(), h.clone()]),
        _ => {
            return Err(Error::validation(
                "set_size",
                format!("expected a size or a width and height, got {} arguments", args.len()),
            ));
        }
    };
    widget.mutate("size", Mutation::set(size))
}

fn release(widget: &Component) -> Result<()> {
    for child in children_of(widget) {
        child.dispose();
    }
    widget.mutate("children", Mutation::set(Value::tuple(Vec::<Value>::new())))?;

    let Some(parent) = widget.peek("parent").and_then(|p| p.as_component().cloned()) else {
        return Ok(());
    };
    if parent.is_alive() {
        parent.mutate("children", Mutation::set(Value::tuple(without(&parent, widget))))?;
    }
    widget.mutate("parent", Mutation::set(Value::Null))
}

/// Whether `widget` is `candidate` or one of its ancestors.
fn is_ancestor(widget: &Component, candidate: &Component) -> bool {
    let mut current = Some(candidate.clone());
    while let Some(node) = current {
        if node.ptr_eq(widget) {
            return true;
        }
        current = node.peek("parent").and_then(|p| p.as_component().cloned());
    }
    false
}

fn children_of(widget: &Component) -> Vec<Component> {
    widget
        .peek("children")
        .and_then(|children| children.items())
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_component)
        .cloned()
        .collect()
}

fn without(parent: &Component, child: &Component) -> Vec<Value> {
    children_of(parent)
        .into_iter()
        .filter(|c| !c.ptr_eq(child))
        .map(Value::from)
        .collect()
}

/// Where a child lands among `len` siblings. Negative positions count from
/// the end, `-1` meaning last.
fn insert_index(len: usize, pos: Option<i64>) -> usize {
    match pos {
        None => len,
        Some(p) if p >= 0 => usize::try_from(p).map_or(len, |p| p.min(len)),
        Some(p) => {
            let from_end = usize::try_from(p.unsigned_abs()).unwrap_or(usize::MAX);
            (len + 1).saturating_sub(from_end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_index() {
        assert_eq!(insert_index(3, None), 3);
        assert_eq!(insert_index(3, Some(0)), 0);
        assert_eq!(insert_index(3, Some(10)), 3);
        assert_eq!(insert_index(3, Some(-1)), 3);
        assert_eq!(insert_index(3, Some(-2)), 2);
        assert_eq!(insert_index(3, Some(-4)), 0);
        assert_eq!(insert_index(3, Some(-100)), 0);
        assert_eq!(insert_index(0, Some(-1)), 0);
    }

    #[test]
    fn test_widget_ref_rejects_other_components() {
        let class = widget_class().unwrap();
        let w = class.create().unwrap();
        assert!(WidgetRef.validate(Value::from(&w)).is_ok());
        assert!(WidgetRef.validate(Value::Null).is_ok());

        let plain = ComponentClass::builder("Plain").build().unwrap().create().unwrap();
        assert!(WidgetRef.validate(Value::from(&plain)).unwrap_err().is_validation());
        assert!(WidgetRef.validate(Value::from(1)).is_err());
    }

    #[test]
    fn test_class_introspection() {
        let class = widget_class().unwrap();
        assert!(class.action("set_parent").is_some());
        assert!(class.action("set_children").is_none());
        assert!(!class.property("size").unwrap().is_settable());
        assert_eq!(
            class.property("base_size").unwrap().default_value(),
            float_pair::value(32.0, 32.0)
        );
        assert_eq!(class.emitters().len(), 7);
    }
}
