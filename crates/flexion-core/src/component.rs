//! Component classes and their instances.
//!
//! A [`ComponentClass`] is a runtime description of a kind of component: its
//! properties, actions, emitters, reactions and lifecycle hooks. It is built
//! once with [`ComponentClass::builder`] and then instantiated any number of
//! times. Every settable property `foo` gets a generated `set_foo` action
//! unless the class declares its own.
//!
//! A [`Component`] is a cheap, clonable handle to one instance. Handles can be
//! sent across threads, but the component belongs to the thread that created
//! it: its actions, mutations, emitters and reactions go through that
//! thread's loop, and other threads get an access error
//! (see [`crate::thread_check`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use flexion_core::{ComponentClass, Loop, PropertySpec, ReactionSpec};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let class = ComponentClass::builder("Thermometer")
//!     .property(PropertySpec::float("celsius").settable(true))
//!     .reaction(ReactionSpec::new("log", ["celsius"], move |_, events| {
//!         sink.lock().push(events.len());
//!         Ok(())
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let t = class.create().unwrap();
//! t.set("celsius", 20).unwrap();
//! t.set("celsius", 21.5).unwrap();
//! Loop::current().flush().unwrap();
//!
//! assert_eq!(t.get("celsius").unwrap().as_float(), Some(21.5));
//! assert_eq!(*seen.lock(), vec![2]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use slotmap::SlotMap;

use crate::action::{ActionSpec, Task};
use crate::emitter::EmitterSpec;
use crate::error::{Error, Result};
use crate::event::{Change, Event, Payload};
use crate::event_loop::Loop;
use crate::logging::targets;
use crate::mutation::{self, Mutation};
use crate::property::PropertySpec;
use crate::reaction::{
    Path, Reaction, ReactionId, ReactionRef, ReactionSpec, Source, Subscriber, Target, resolve_targets,
};
use crate::thread_check::ThreadAffinity;
use crate::value::Value;

/// A unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Wrap a raw id. Ids obtained this way need not refer to a live component.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw u64 value of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_component_id() -> ComponentId {
    ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A lifecycle callback: class initialization or disposal.
pub type Hook = Arc<dyn Fn(&Component) -> Result<()> + Send + Sync>;

struct ClassInner {
    name: String,
    base: Option<ComponentClass>,
    properties: Vec<PropertySpec>,
    index: HashMap<String, usize>,
    declared_actions: Vec<ActionSpec>,
    actions: Vec<ActionSpec>,
    emitters: Vec<EmitterSpec>,
    reactions: Vec<ReactionSpec>,
    reaction_paths: Vec<Vec<Path>>,
    init: Vec<Hook>,
    dispose: Vec<Hook>,
}

/// The runtime description of a kind of component.
#[derive(Clone)]
pub struct ComponentClass(Arc<ClassInner>);

impl ComponentClass {
    /// Start declaring a class.
    pub fn builder(name: impl Into<String>) -> ComponentClassBuilder {
        ComponentClassBuilder::new(name)
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The class this one extends, if any.
    pub fn base(&self) -> Option<&ComponentClass> {
        self.0.base.as_ref()
    }

    /// Whether `self` is `other` or extends it, directly or indirectly.
    pub fn is_subclass_of(&self, other: &ComponentClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.ptr_eq(other) {
                return true;
            }
            current = class.base();
        }
        false
    }

    /// Whether both handles describe the same class.
    pub fn ptr_eq(&self, other: &ComponentClass) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Look up a property declaration.
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.index_of(name).map(|i| &self.0.properties[i])
    }

    /// All property declarations, in declaration order.
    pub fn properties(&self) -> &[PropertySpec] {
        &self.0.properties
    }

    /// All property names, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.0.properties.iter().map(PropertySpec::name).collect()
    }

    /// Look up an action, including generated setters.
    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.0.actions.iter().find(|a| a.name() == name)
    }

    /// All actions, including generated setters.
    pub fn actions(&self) -> &[ActionSpec] {
        &self.0.actions
    }

    /// Look up an emitter.
    pub fn emitter(&self, name: &str) -> Option<&EmitterSpec> {
        self.0.emitters.iter().find(|e| e.name() == name)
    }

    /// All emitters.
    pub fn emitters(&self) -> &[EmitterSpec] {
        &self.0.emitters
    }

    /// All class-level reactions.
    pub fn reactions(&self) -> &[ReactionSpec] {
        &self.0.reactions
    }

    /// Instantiate with default values.
    pub fn create(&self) -> Result<Component> {
        self.create_with(Vec::<(String, Value)>::new())
    }

    /// Instantiate, supplying initial values for settable properties.
    ///
    /// Construction proceeds as follows:
    ///
    /// 1. Every property starts at its default; defaults produce no events.
    /// 2. Class reactions are connected.
    /// 3. Each initial value is applied as a mutation, producing the events a
    ///    set would produce.
    /// 4. Init hooks run with the new component on the active stack.
    /// 5. If anything was applied or scheduled and no tick is in progress,
    ///    one loop iteration runs so the component is consistent on return.
    ///
    /// Naming a property that does not exist or is not settable is a
    /// construction error. A failing initial value or init hook disposes the
    /// half-built component and returns the error.
    pub fn create_with<I, K, V>(&self, initial: I) -> Result<Component>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let initial: Vec<(String, Value)> = initial
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        for (name, _) in &initial {
            match self.property(name) {
                Some(spec) if spec.is_settable() => {}
                Some(_) => {
                    return Err(Error::construction(
                        self.name(),
                        format!("property '{name}' is not settable"),
                    ));
                }
                None => {
                    return Err(Error::construction(
                        self.name(),
                        format!("no property named '{name}'"),
                    ));
                }
            }
        }

        let values = self
            .0
            .properties
            .iter()
            .map(PropertySpec::initial_value)
            .collect::<Result<Vec<_>>>()?;
        let id = next_component_id();
        let component = Component(Arc::new(ComponentInner {
            id,
            name: format!("{}{}", self.name(), id.as_u64()),
            class: self.clone(),
            values: RwLock::new(values),
            reactions: Mutex::new(SlotMap::with_key()),
            subscribers: Mutex::new(HashMap::new()),
            state: Mutex::new(Lifecycle::Alive),
            affinity: ThreadAffinity::current(),
        }));
        tracing::trace!(target: targets::COMPONENT, ?id, class = self.name(), "created component");

        let lp = Loop::current();
        let mut needs_tick = !initial.is_empty() || !self.0.init.is_empty();
        for (spec, paths) in self.0.reactions.iter().zip(&self.0.reaction_paths) {
            needs_tick |= spec.is_implicit();
            component.connect_reaction(&lp, spec, paths.clone());
        }

        let applied = lp.run_as_processing(|| {
            initial
                .into_iter()
                .try_for_each(|(name, value)| component.mutate(&name, Mutation::Set(value)))
        });
        if let Err(error) = applied {
            component.dispose();
            return Err(error);
        }

        let active = lp.activate(&component);
        let initialized = self.0.init.iter().try_for_each(|hook| hook(&component));
        drop(active);
        if let Err(error) = initialized {
            component.dispose();
            return Err(error);
        }

        if needs_tick && !lp.is_iterating() {
            lp.iter()?;
        }
        Ok(component)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.0.index.get(name).copied()
    }
}

impl PartialEq for ComponentClass {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ComponentClass {}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.0.name)
            .field("base", &self.base().map(ComponentClass::name))
            .field("properties", &self.property_names())
            .finish()
    }
}

/// Declares a [`ComponentClass`].
///
/// Declaring something with a name already used by the same kind of
/// declaration replaces it in place; this is how a subclass overrides what it
/// inherited through [`extends`](Self::extends).
pub struct ComponentClassBuilder {
    name: String,
    base: Option<ComponentClass>,
    properties: Vec<PropertySpec>,
    actions: Vec<ActionSpec>,
    emitters: Vec<EmitterSpec>,
    reactions: Vec<ReactionSpec>,
    init: Vec<Hook>,
    dispose: Vec<Hook>,
}

fn upsert<T>(items: &mut Vec<T>, item: T, name: impl Fn(&T) -> &str) {
    match items.iter().position(|existing| name(existing) == name(&item)) {
        Some(i) => items[i] = item,
        None => items.push(item),
    }
}

impl ComponentClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            properties: Vec::new(),
            actions: Vec::new(),
            emitters: Vec::new(),
            reactions: Vec::new(),
            init: Vec::new(),
            dispose: Vec::new(),
        }
    }

    /// Inherit every declaration of `base`.
    ///
    /// Instances of the new class pass component-reference checks for `base`.
    /// Inherited hooks run before the ones declared here.
    pub fn extends(mut self, base: &ComponentClass) -> Self {
        for spec in base.properties() {
            upsert(&mut self.properties, spec.clone(), PropertySpec::name);
        }
        for spec in &base.0.declared_actions {
            upsert(&mut self.actions, spec.clone(), ActionSpec::name);
        }
        for spec in base.emitters() {
            upsert(&mut self.emitters, spec.clone(), EmitterSpec::name);
        }
        for spec in base.reactions() {
            upsert(&mut self.reactions, spec.clone(), ReactionSpec::name);
        }
        self.init.extend(base.0.init.iter().cloned());
        self.dispose.extend(base.0.dispose.iter().cloned());
        self.base = Some(base.clone());
        self
    }

    /// Declare a property.
    pub fn property(mut self, spec: PropertySpec) -> Self {
        upsert(&mut self.properties, spec, PropertySpec::name);
        self
    }

    /// Declare an action.
    pub fn action<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Component, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.action_spec(ActionSpec::new(name, body))
    }

    /// Declare an action from a prepared spec.
    pub fn action_spec(mut self, spec: ActionSpec) -> Self {
        upsert(&mut self.actions, spec, ActionSpec::name);
        self
    }

    /// Declare an emitter.
    pub fn emitter<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Component, &[Value]) -> Result<Payload> + Send + Sync + 'static,
    {
        self.emitter_spec(EmitterSpec::new(name, body))
    }

    /// Declare an emitter from a prepared spec.
    pub fn emitter_spec(mut self, spec: EmitterSpec) -> Self {
        upsert(&mut self.emitters, spec, EmitterSpec::name);
        self
    }

    /// Declare a reaction connected on every instance.
    pub fn reaction(mut self, spec: ReactionSpec) -> Self {
        upsert(&mut self.reactions, spec, ReactionSpec::name);
        self
    }

    /// Add an init hook, run once per instance after initial values are applied.
    pub fn init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Component) -> Result<()> + Send + Sync + 'static,
    {
        self.init.push(Arc::new(hook));
        self
    }

    /// Add a disposal hook, run once when an instance is disposed.
    ///
    /// Hooks may mutate properties, on this component or others.
    pub fn on_dispose<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Component) -> Result<()> + Send + Sync + 'static,
    {
        self.dispose.push(Arc::new(hook));
        self
    }

    /// Check the declarations and build the class.
    pub fn build(self) -> Result<ComponentClass> {
        let name = self.name;
        let fail = |message: String| Error::construction(name.clone(), message);

        let mut index = HashMap::new();
        for (i, spec) in self.properties.iter().enumerate() {
            spec.initial_value()
                .map_err(|e| fail(format!("default of '{}' is invalid: {e}", spec.name())))?;
            index.insert(spec.name().to_string(), i);
        }
        for action in &self.actions {
            if index.contains_key(action.name()) {
                return Err(fail(format!(
                    "action '{}' clashes with a property",
                    action.name()
                )));
            }
        }
        for emitter in &self.emitters {
            if index.contains_key(emitter.name())
                || self.actions.iter().any(|a| a.name() == emitter.name())
            {
                return Err(fail(format!(
                    "emitter '{}' clashes with a property or action",
                    emitter.name()
                )));
            }
        }

        let mut actions = self.actions.clone();
        for spec in self.properties.iter().filter(|p| p.is_settable()) {
            let setter = spec.setter_name();
            if !actions.iter().any(|a| a.name() == setter) {
                actions.push(generated_setter(spec));
            }
        }

        let mut class = ComponentClass(Arc::new(ClassInner {
            name: name.clone(),
            base: self.base,
            properties: self.properties,
            index,
            declared_actions: self.actions,
            actions,
            emitters: self.emitters,
            reactions: Vec::new(),
            reaction_paths: Vec::new(),
            init: self.init,
            dispose: self.dispose,
        }));

        let mut reaction_paths = Vec::with_capacity(self.reactions.len());
        for spec in &self.reactions {
            let paths = spec.resolve_paths(&class).map_err(|e| match e {
                Error::Construction { message, .. } => {
                    fail(format!("reaction '{}': {message}", spec.name()))
                }
                other => other,
            })?;
            reaction_paths.push(paths);
        }
        // No other handle to the class exists yet.
        if let Some(inner) = Arc::get_mut(&mut class.0) {
            inner.reactions = self.reactions;
            inner.reaction_paths = reaction_paths;
        }

        tracing::debug!(
            target: targets::COMPONENT,
            class = %name,
            properties = class.0.properties.len(),
            actions = class.0.actions.len(),
            reactions = class.0.reactions.len(),
            "built component class"
        );
        Ok(class)
    }
}

fn generated_setter(spec: &PropertySpec) -> ActionSpec {
    let property = spec.name().to_string();
    ActionSpec::new(spec.setter_name(), move |component, args| match args {
        [value] => component.mutate(&property, Mutation::Set(value.clone())),
        _ => Err(Error::validation(
            property.as_str(),
            format!("setter takes exactly 1 argument, got {}", args.len()),
        )),
    })
    .with_doc(format!("Set the value of '{}'.", spec.name()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Alive,
    Disposing,
    Disposed,
}

pub(crate) struct ComponentInner {
    id: ComponentId,
    name: String,
    class: ComponentClass,
    values: RwLock<Vec<Value>>,
    reactions: Mutex<SlotMap<ReactionId, Reaction>>,
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    state: Mutex<Lifecycle>,
    affinity: ThreadAffinity,
}

/// Handle to a component instance.
///
/// Equality and hashing are by identity. Handles are `Send + Sync`, but a
/// component belongs to the thread that created it: from any other thread
/// only reads succeed.
#[derive(Clone)]
pub struct Component(Arc<ComponentInner>);

impl Component {
    pub(crate) fn from_inner(inner: Arc<ComponentInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<ComponentInner> {
        Arc::downgrade(&self.0)
    }

    /// The unique id.
    pub fn id(&self) -> ComponentId {
        self.0.id
    }

    /// A readable name: the class name followed by the id, e.g. `"Widget12"`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The component's class.
    pub fn class(&self) -> &ComponentClass {
        &self.0.class
    }

    /// The thread whose loop runs this component's actions and reactions.
    pub fn affinity(&self) -> ThreadAffinity {
        self.0.affinity
    }

    fn ensure_owner_thread(&self, what: impl FnOnce() -> String) -> Result<()> {
        self.0.affinity.check(what)
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether the component is neither disposed nor being disposed.
    pub fn is_alive(&self) -> bool {
        *self.0.state.lock() == Lifecycle::Alive
    }

    /// Whether the component has been disposed.
    pub fn is_disposed(&self) -> bool {
        *self.0.state.lock() == Lifecycle::Disposed
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(Error::disposed(self.name()))
        }
    }

    /// Read a property's current value.
    ///
    /// Inside an implicit reaction the read is recorded as a dependency.
    /// Collection values are shared: in-place changes to a returned list
    /// change the stored value.
    pub fn get(&self, name: &str) -> Result<Value> {
        let value = self.peek(name).ok_or_else(|| {
            Error::access(
                format!("read '{name}' on {}", self.name()),
                "no such property",
            )
        })?;
        Loop::current().record_read(self, name);
        Ok(value)
    }

    /// Read a property without recording a dependency.
    pub fn peek(&self, name: &str) -> Option<Value> {
        let index = self.0.class.index_of(name)?;
        Some(self.0.values.read()[index].clone())
    }

    /// A snapshot of all property values, in declaration order.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let values = self.0.values.read();
        self.0
            .class
            .properties()
            .iter()
            .zip(values.iter())
            .map(|(spec, value)| (spec.name().to_string(), value.clone()))
            .collect()
    }

    /// Request a new value for a settable property.
    ///
    /// This queues the property's `set_<name>` action; the value changes when
    /// the loop next drains its queue.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let spec = self.0.class.property(name).ok_or_else(|| {
            Error::access(
                format!("set '{name}' on {}", self.name()),
                "no such property",
            )
        })?;
        if !spec.is_settable() {
            return Err(Error::access(
                format!("set '{name}' on {}", self.name()),
                "property is not settable",
            ));
        }
        self.invoke(&spec.setter_name(), vec![value.into()])
    }

    /// Queue an action with a snapshot of its arguments.
    pub fn invoke(&self, action: &str, args: Vec<Value>) -> Result<()> {
        self.ensure_owner_thread(|| format!("invoke '{action}' on {}", self.name()))?;
        self.ensure_alive()?;
        let spec = self.0.class.action(action).ok_or_else(|| {
            Error::access(
                format!("invoke '{action}' on {}", self.name()),
                "no such action",
            )
        })?;
        Loop::current().enqueue(Task::Action {
            component: self.clone(),
            name: action.to_string(),
            body: spec.body(),
            args,
        });
        Ok(())
    }

    /// Change a property's stored value and notify subscribed reactions.
    ///
    /// Only allowed while the loop is processing actions (or constructing a
    /// component). A `Set` that leaves the value unchanged, and sequence
    /// mutations that touch no items, produce no event.
    pub fn mutate(&self, name: &str, mutation: Mutation) -> Result<()> {
        self.ensure_owner_thread(|| format!("mutate '{name}' on {}", self.name()))?;
        let lp = Loop::current();
        if !lp.is_processing() {
            let reason = if lp.is_reacting() {
                "reactions must request changes through actions"
            } else {
                "mutations are only allowed while the loop processes actions"
            };
            return Err(Error::access(
                format!("mutate '{name}' on {}", self.name()),
                reason,
            ));
        }
        if self.is_disposed() {
            return Err(Error::disposed(self.name()));
        }
        let index = self.0.class.index_of(name).ok_or_else(|| {
            Error::access(
                format!("mutate '{name}' on {}", self.name()),
                "no such property",
            )
        })?;
        let spec = &self.0.class.0.properties[index];
        let mutation = mutation::validate(spec, mutation)?;
        let change = {
            let mut values = self.0.values.write();
            mutation::apply(spec, &mut values[index], mutation)?
        };
        let Some(change) = change else {
            return Ok(());
        };
        tracing::trace!(
            target: targets::PROPERTY,
            component = %self.name(),
            property = name,
            change = change.kind(),
            "mutated"
        );
        self.deliver(&lp, Event::new(self.id(), name, change));
        Ok(())
    }

    /// Deliver an emitter event with the given payload.
    pub fn emit(&self, name: &str, payload: Payload) -> Result<()> {
        self.ensure_owner_thread(|| format!("emit '{name}' on {}", self.name()))?;
        self.ensure_alive()?;
        if self.0.class.emitter(name).is_none() {
            return Err(Error::access(
                format!("emit '{name}' on {}", self.name()),
                "no such emitter",
            ));
        }
        tracing::trace!(target: targets::COMPONENT, component = %self.name(), emitter = name, "emit");
        self.deliver(&Loop::current(), Event::new(self.id(), name, Change::Emit(payload)));
        Ok(())
    }

    /// Run an emitter's body and deliver the payload it returns.
    pub fn call_emitter(&self, name: &str, args: &[Value]) -> Result<Payload> {
        self.ensure_owner_thread(|| format!("call emitter '{name}' on {}", self.name()))?;
        self.ensure_alive()?;
        let body = self
            .0
            .class
            .emitter(name)
            .map(EmitterSpec::body)
            .ok_or_else(|| {
                Error::access(
                    format!("call emitter '{name}' on {}", self.name()),
                    "no such emitter",
                )
            })?;
        let payload = body(self, args)?;
        self.emit(name, payload.clone())?;
        Ok(payload)
    }

    /// Connect a reaction to this live component.
    pub fn react(&self, spec: ReactionSpec) -> Result<ReactionId> {
        self.ensure_owner_thread(|| format!("connect '{}' on {}", spec.name(), self.name()))?;
        self.ensure_alive()?;
        let paths = spec.resolve_paths(&self.0.class)?;
        Ok(self.connect_reaction(&Loop::current(), &spec, paths))
    }

    /// Disconnect every reaction with the given name. Returns whether any was
    /// found; always `false` off the owning thread.
    pub fn disconnect_reaction(&self, name: &str) -> bool {
        if !self.0.affinity.is_same_thread() {
            tracing::warn!(
                target: targets::REACTION,
                component = %self.name(),
                reaction = name,
                "disconnect from foreign thread ignored"
            );
            return false;
        }
        let removed: Vec<(ReactionId, Reaction)> = {
            let mut reactions = self.0.reactions.lock();
            let ids: Vec<ReactionId> = reactions
                .iter()
                .filter(|(_, r)| r.name == name)
                .map(|(id, _)| id)
                .collect();
            ids.into_iter()
                .filter_map(|id| reactions.remove(id).map(|r| (id, r)))
                .collect()
        };
        let found = !removed.is_empty();
        for (id, reaction) in removed {
            self.unsubscribe_all(id, reaction.sources);
        }
        if found {
            tracing::trace!(target: targets::REACTION, component = %self.name(), reaction = name, "disconnected");
        }
        found
    }

    /// Whether a reaction with the given name is connected.
    pub fn reaction_connected(&self, name: &str) -> bool {
        self.0.reactions.lock().values().any(|r| r.name == name)
    }

    /// Names of all connected reactions.
    pub fn reaction_names(&self) -> Vec<String> {
        self.0.reactions.lock().values().map(|r| r.name.clone()).collect()
    }

    /// Dispose the component.
    ///
    /// Runs disposal hooks, disconnects the component's reactions and drops
    /// every subscription made through it. Afterwards actions, mutations and
    /// emitters fail with a disposed error; reads still work. Disposing twice
    /// is a no-op.
    ///
    /// Hooks run with mutations allowed, so a component can detach itself
    /// from the components that reference it.
    ///
    /// Only the owning thread can dispose; elsewhere this logs an error and
    /// leaves the component alive.
    pub fn dispose(&self) {
        if let Err(error) = self.ensure_owner_thread(|| format!("dispose {}", self.name())) {
            tracing::error!(target: targets::COMPONENT, %error, "dispose refused");
            return;
        }
        {
            let mut state = self.0.state.lock();
            if *state != Lifecycle::Alive {
                return;
            }
            *state = Lifecycle::Disposing;
        }
        tracing::debug!(target: targets::COMPONENT, component = %self.name(), "disposing");

        let lp = Loop::current();
        for hook in &self.0.class.0.dispose {
            if let Err(error) = lp.run_as_processing(|| hook(self)) {
                tracing::warn!(
                    target: targets::COMPONENT,
                    component = %self.name(),
                    %error,
                    "dispose hook failed"
                );
            }
        }

        let reactions = std::mem::take(&mut *self.0.reactions.lock());
        for (id, reaction) in reactions {
            self.unsubscribe_all(id, reaction.sources);
        }
        self.0.subscribers.lock().clear();
        *self.0.state.lock() = Lifecycle::Disposed;
    }

    fn connect_reaction(&self, lp: &Loop, spec: &ReactionSpec, paths: Vec<Path>) -> ReactionId {
        let reaction = Reaction::new(spec, paths);
        let implicit = reaction.implicit;
        let id = self.0.reactions.lock().insert(reaction);
        if implicit {
            self.push_event(lp, id, None);
        } else {
            self.resubscribe(id);
        }
        tracing::trace!(
            target: targets::REACTION,
            component = %self.name(),
            reaction = spec.name(),
            implicit,
            "connected"
        );
        id
    }

    fn deliver(&self, lp: &Loop, event: Event) {
        let subscribers = {
            let mut table = self.0.subscribers.lock();
            match table.get_mut(&event.name) {
                Some(list) => {
                    list.retain(|s| s.owner.strong_count() > 0);
                    list.clone()
                }
                None => return,
            }
        };

        let mut relink = Vec::new();
        for subscriber in subscribers {
            let Some(owner) = subscriber.owner.upgrade() else {
                continue;
            };
            let owner = Component(owner);
            owner.push_event(lp, subscriber.reaction, Some(event.clone()));
            if subscriber.link {
                relink.push((owner, subscriber.reaction));
            }
        }
        for (owner, id) in relink {
            owner.resubscribe(id);
        }
    }

    fn push_event(&self, lp: &Loop, id: ReactionId, event: Option<Event>) {
        let schedule = {
            let mut reactions = self.0.reactions.lock();
            let Some(reaction) = reactions.get_mut(id) else {
                return;
            };
            if let Some(event) = event {
                reaction.pending.push(event);
            }
            !std::mem::replace(&mut reaction.scheduled, true)
        };
        if schedule {
            lp.schedule(ReactionRef {
                owner: self.downgrade(),
                id,
            });
        }
    }

    pub(crate) fn clear_pending(&self, id: ReactionId) {
        if let Some(reaction) = self.0.reactions.lock().get_mut(id) {
            reaction.pending.clear();
            reaction.scheduled = false;
        }
    }

    /// Invoke a scheduled reaction. Returns `None` if there was nothing to run.
    pub(crate) fn run_reaction(&self, lp: &Loop, id: ReactionId) -> Option<(String, Result<()>)> {
        let (callback, events, implicit, name) = {
            let mut reactions = self.0.reactions.lock();
            let reaction = reactions.get_mut(id)?;
            reaction.scheduled = false;
            let events = std::mem::take(&mut reaction.pending);
            if events.is_empty() && !reaction.implicit {
                return None;
            }
            (
                reaction.callback.clone(),
                events,
                reaction.implicit,
                reaction.name.clone(),
            )
        };
        if !self.is_alive() {
            return None;
        }

        let context = format!("{}.{}", self.name(), name);
        tracing::trace!(target: targets::REACTION, reaction = %context, events = events.len(), "reacting");
        let result = if implicit {
            lp.begin_tracking();
            let result = callback(self, &events);
            let reads = lp.end_tracking();
            let targets = reads
                .into_iter()
                .filter_map(|source| {
                    source.component.upgrade().map(|inner| Target {
                        component: Component(inner),
                        name: source.name,
                        link: false,
                    })
                })
                .collect();
            self.replace_sources(id, targets);
            result
        } else {
            callback(self, &events)
        };
        Some((context, result))
    }

    fn resubscribe(&self, id: ReactionId) {
        let paths = match self.0.reactions.lock().get(id) {
            Some(reaction) if !reaction.implicit => reaction.paths.clone(),
            _ => return,
        };
        let targets = resolve_targets(self, &paths);
        self.replace_sources(id, targets);
    }

    fn replace_sources(&self, id: ReactionId, targets: Vec<Target>) {
        let previous = match self.0.reactions.lock().get_mut(id) {
            Some(reaction) => std::mem::take(&mut reaction.sources),
            None => return,
        };
        self.unsubscribe_all(id, previous);

        let owner = self.downgrade();
        let mut sources = Vec::with_capacity(targets.len());
        for target in targets {
            if target.component.0.affinity != self.0.affinity {
                tracing::warn!(
                    target: targets::REACTION,
                    component = %self.name(),
                    source = %target.component.name(),
                    property = %target.name,
                    "not subscribing to a component owned by another thread"
                );
                continue;
            }
            let subscriber = Subscriber {
                owner: owner.clone(),
                reaction: id,
                link: target.link,
            };
            if target.component.add_subscriber(&target.name, subscriber) {
                sources.push(Source {
                    component: target.component.downgrade(),
                    name: target.name,
                });
            }
        }

        match self.0.reactions.lock().get_mut(id) {
            Some(reaction) => reaction.sources = sources,
            None => self.unsubscribe_all(id, sources),
        }
    }

    fn unsubscribe_all(&self, id: ReactionId, sources: Vec<Source>) {
        let owner = self.downgrade();
        for source in sources {
            if let Some(inner) = source.component.upgrade() {
                Component(inner).remove_subscriber(&source.name, &owner, id);
            }
        }
    }

    fn add_subscriber(&self, name: &str, subscriber: Subscriber) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut table = self.0.subscribers.lock();
        let list = table.entry(name.to_string()).or_default();
        match list
            .iter_mut()
            .find(|s| s.is(&subscriber.owner, subscriber.reaction))
        {
            Some(existing) => existing.link |= subscriber.link,
            None => list.push(subscriber),
        }
        true
    }

    fn remove_subscriber(&self, name: &str, owner: &Weak<ComponentInner>, id: ReactionId) {
        let mut table = self.0.subscribers.lock();
        if let Some(list) = table.get_mut(name) {
            list.retain(|s| !s.is(owner, id));
            if list.is_empty() {
                table.remove(name);
            }
        }
    }

    /// Number of reactions subscribed to `name` on this component.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.0
            .subscribers
            .lock()
            .get(name)
            .map_or(0, |list| list.iter().filter(|s| s.owner.strong_count() > 0).count())
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name())
    }
}

static_assertions::assert_impl_all!(Component: Send, Sync);
static_assertions::assert_impl_all!(ComponentClass: Send, Sync);
