//! The event loop: action queue, batched reactions and the active-component stack.
//!
//! Every thread has its own [`Loop`], reached with [`Loop::current`]. A
//! component is served only by the loop of the thread that created it. Nothing
//! runs on its own; a host (or a test) drives the loop by calling
//! [`Loop::iter`] to run one tick or [`Loop::flush`] to run ticks until no
//! work remains.
//!
//! A tick has two phases:
//!
//! 1. **Drain**: queued actions (and [`call_soon`](Loop::call_soon) closures)
//!    run in FIFO order. Actions run with the processing flag set, so they may
//!    mutate properties; actions they invoke are appended to the same queue
//!    and run in this phase as well. Each effective mutation produces an event
//!    that is appended to the pending batch of every subscribed reaction.
//! 2. **React**: every reaction that received events runs exactly once, in
//!    the order it was first scheduled, with its whole batch. Reactions run
//!    without the processing flag; changes they request via actions are picked
//!    up by the next tick.
//!
//! # Example
//!
//! ```
//! use flexion_core::{ComponentClass, Loop, PropertySpec};
//!
//! let class = ComponentClass::builder("Counter")
//!     .property(PropertySpec::int("count").settable(true))
//!     .build()
//!     .unwrap();
//! let counter = class.create().unwrap();
//!
//! counter.set("count", 3).unwrap();
//! assert_eq!(counter.get("count").unwrap().as_int(), Some(0));
//!
//! Loop::current().iter().unwrap();
//! assert_eq!(counter.get("count").unwrap().as_int(), Some(3));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::action::Task;
use crate::component::Component;
use crate::config::LoopConfig;
use crate::error::{Error, Result};
use crate::logging::targets;
use crate::reaction::{ReactionRef, Source};

thread_local! {
    static CURRENT: Loop = Loop::new();
}

/// A failure recorded during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// What failed, e.g. `"MyObject3.set_foo"` or `"MyObject3.on_foo"`.
    pub context: String,
    /// The error it returned.
    pub error: Error,
}

/// Summary of one or more ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Ticks run.
    pub ticks: usize,
    /// Actions run, including failed ones.
    pub actions_run: usize,
    /// Deferred closures run.
    pub calls_run: usize,
    /// Reactions invoked.
    pub reactions_run: usize,
    /// Failed actions and reactions, in the order they failed.
    pub failures: Vec<Failure>,
}

impl TickReport {
    /// Whether every action and reaction succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, other: TickReport) {
        self.ticks += other.ticks;
        self.actions_run += other.actions_run;
        self.calls_run += other.calls_run;
        self.reactions_run += other.reactions_run;
        self.failures.extend(other.failures);
    }
}

/// Raises a flag for the guard's lifetime, restoring the previous value.
struct FlagGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

type Waker = Rc<dyn Fn()>;

struct LoopInner {
    config: Cell<LoopConfig>,
    queue: RefCell<VecDeque<Task>>,
    dirty: RefCell<Vec<ReactionRef>>,
    iterating: Cell<bool>,
    processing: Cell<bool>,
    reacting: Cell<bool>,
    active: RefCell<Vec<Component>>,
    tracking: RefCell<Option<Vec<Source>>>,
    waker: RefCell<Option<Waker>>,
}

/// Handle to the current thread's event loop.
#[derive(Clone)]
pub struct Loop(Rc<LoopInner>);

impl Loop {
    fn new() -> Self {
        Self(Rc::new(LoopInner {
            config: Cell::new(LoopConfig::default()),
            queue: RefCell::new(VecDeque::new()),
            dirty: RefCell::new(Vec::new()),
            iterating: Cell::new(false),
            processing: Cell::new(false),
            reacting: Cell::new(false),
            active: RefCell::new(Vec::new()),
            tracking: RefCell::new(None),
            waker: RefCell::new(None),
        }))
    }

    /// The loop of the calling thread.
    pub fn current() -> Self {
        CURRENT.with(Loop::clone)
    }

    /// The active safety bounds.
    pub fn config(&self) -> LoopConfig {
        self.0.config.get()
    }

    /// Replace the safety bounds.
    pub fn set_config(&self, config: LoopConfig) {
        self.0.config.set(config);
    }

    /// Register a callback invoked when work becomes pending on an idle loop.
    ///
    /// The callback must not iterate the loop itself; it should arrange for
    /// the host to call [`iter`](Self::iter) soon.
    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        *self.0.waker.borrow_mut() = Some(Rc::new(waker));
    }

    /// Remove the waker callback.
    pub fn clear_waker(&self) {
        self.0.waker.borrow_mut().take();
    }

    /// Whether a tick is in progress.
    pub fn is_iterating(&self) -> bool {
        self.0.iterating.get()
    }

    /// Whether mutations are currently allowed.
    pub fn is_processing(&self) -> bool {
        self.0.processing.get()
    }

    /// Whether reactions are currently being invoked.
    pub fn is_reacting(&self) -> bool {
        self.0.reacting.get()
    }

    /// Whether any action, deferred call or reaction is waiting.
    pub fn has_pending(&self) -> bool {
        !self.0.queue.borrow().is_empty() || !self.0.dirty.borrow().is_empty()
    }

    /// Number of queued actions and deferred calls.
    pub fn pending_actions(&self) -> usize {
        self.0.queue.borrow().len()
    }

    /// Number of reactions waiting for the reacting phase.
    pub fn pending_reactions(&self) -> usize {
        self.0.dirty.borrow().len()
    }

    /// Queue a closure to run in FIFO order with actions, outside the processing flag.
    pub fn call_soon(&self, f: impl FnOnce() + 'static) {
        self.enqueue(Task::Call(Box::new(f)));
    }

    /// Run one tick: drain the queue, then invoke dirty reactions.
    ///
    /// Action and reaction failures are logged and collected in the report;
    /// they do not stop the tick. Exceeding
    /// [`LoopConfig::max_actions_per_tick`] discards the queue, skips the
    /// reacting phase and returns [`Error::Recursion`].
    #[tracing::instrument(skip(self), target = "flexion_core::event_loop", level = "trace")]
    pub fn iter(&self) -> Result<TickReport> {
        if self.0.iterating.get() {
            return Err(Error::access(
                "iterate the loop",
                "a tick is already in progress on this thread",
            ));
        }
        let _iterating = FlagGuard::raise(&self.0.iterating);
        let mut report = TickReport {
            ticks: 1,
            ..TickReport::default()
        };

        self.drain(&mut report)?;
        self.react(&mut report);

        tracing::trace!(
            target: targets::EVENT_LOOP,
            actions = report.actions_run,
            reactions = report.reactions_run,
            failures = report.failures.len(),
            "tick complete"
        );
        Ok(report)
    }

    /// Run ticks until nothing is pending.
    ///
    /// Returns [`Error::Recursion`] when work is still pending after
    /// [`LoopConfig::max_ticks_per_flush`] ticks; the remaining work is dropped.
    pub fn flush(&self) -> Result<TickReport> {
        let limit = self.config().max_ticks_per_flush;
        let mut total = TickReport::default();
        loop {
            total.absorb(self.iter()?);
            if !self.has_pending() {
                return Ok(total);
            }
            if total.ticks >= limit {
                self.discard_pending();
                tracing::error!(
                    target: targets::EVENT_LOOP,
                    limit,
                    "work still pending after tick limit, discarding"
                );
                return Err(Error::Recursion {
                    limit,
                    phase: "flushing ticks",
                });
            }
        }
    }

    /// Drop all queued work, the active stack and any waker.
    ///
    /// Components are left as they are. Mostly useful between tests.
    pub fn reset(&self) {
        self.discard_pending();
        self.0.active.borrow_mut().clear();
        self.0.tracking.borrow_mut().take();
        self.clear_waker();
        self.0.config.set(LoopConfig::default());
    }

    /// The component on top of the active stack.
    pub fn active_component(&self) -> Option<Component> {
        self.0.active.borrow().last().cloned()
    }

    /// The active stack, bottom first.
    pub fn active_components(&self) -> Vec<Component> {
        self.0.active.borrow().clone()
    }

    /// Push `component` onto the active stack until the guard is dropped.
    pub fn activate(&self, component: &Component) -> ActiveGuard {
        let mut active = self.0.active.borrow_mut();
        active.push(component.clone());
        tracing::trace!(
            target: targets::EVENT_LOOP,
            component = %component.name(),
            depth = active.len(),
            "activated"
        );
        ActiveGuard {
            lp: self.clone(),
            depth: active.len(),
        }
    }

    pub(crate) fn enqueue(&self, task: Task) {
        let was_idle = !self.has_pending();
        tracing::trace!(target: targets::ACTION, task = %task.describe(), "queued");
        self.0.queue.borrow_mut().push_back(task);
        if was_idle {
            self.wake();
        }
    }

    pub(crate) fn schedule(&self, reaction: ReactionRef) {
        let was_idle = !self.has_pending();
        self.0.dirty.borrow_mut().push(reaction);
        if was_idle {
            self.wake();
        }
    }

    /// Run `f` with mutations allowed, e.g. to apply construction-time values.
    pub(crate) fn run_as_processing<R>(&self, f: impl FnOnce() -> R) -> R {
        let _processing = FlagGuard::raise(&self.0.processing);
        f()
    }

    pub(crate) fn begin_tracking(&self) {
        *self.0.tracking.borrow_mut() = Some(Vec::new());
    }

    pub(crate) fn end_tracking(&self) -> Vec<Source> {
        self.0.tracking.borrow_mut().take().unwrap_or_default()
    }

    pub(crate) fn record_read(&self, component: &Component, name: &str) {
        if let Some(reads) = self.0.tracking.borrow_mut().as_mut() {
            let source = Source {
                component: component.downgrade(),
                name: name.to_string(),
            };
            if !reads.iter().any(|s| s.same_as(&source)) {
                reads.push(source);
            }
        }
    }

    fn wake(&self) {
        if self.0.iterating.get() {
            return;
        }
        let waker = self.0.waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    fn discard_pending(&self) {
        let dropped: Vec<Task> = self.0.queue.borrow_mut().drain(..).collect();
        let dirty: Vec<ReactionRef> = self.0.dirty.borrow_mut().drain(..).collect();
        for reaction in dirty {
            if let Some(owner) = reaction.owner.upgrade() {
                Component::from_inner(owner).clear_pending(reaction.id);
            }
        }
        drop(dropped);
    }

    fn drain(&self, report: &mut TickReport) -> Result<()> {
        let limit = self.config().max_actions_per_tick;
        let mut count = 0usize;
        loop {
            let Some(task) = self.0.queue.borrow_mut().pop_front() else {
                return Ok(());
            };
            count += 1;
            if count > limit {
                drop(task);
                self.discard_pending();
                tracing::error!(
                    target: targets::EVENT_LOOP,
                    limit,
                    "action limit exceeded, discarding queue"
                );
                return Err(Error::Recursion {
                    limit,
                    phase: "draining actions",
                });
            }

            match task {
                Task::Action {
                    component,
                    name,
                    body,
                    args,
                } => {
                    report.actions_run += 1;
                    let result = {
                        let _processing = FlagGuard::raise(&self.0.processing);
                        component.ensure_alive().and_then(|()| body(&component, &args))
                    };
                    if let Err(error) = result {
                        let context = format!("{}.{}", component.name(), name);
                        tracing::warn!(
                            target: targets::ACTION,
                            action = %context,
                            %error,
                            "action failed"
                        );
                        report.failures.push(Failure { context, error });
                    }
                }
                Task::Call(call) => {
                    report.calls_run += 1;
                    call();
                }
            }
        }
    }

    fn react(&self, report: &mut TickReport) {
        let dirty: Vec<ReactionRef> = std::mem::take(&mut *self.0.dirty.borrow_mut());
        if dirty.is_empty() {
            return;
        }
        let _reacting = FlagGuard::raise(&self.0.reacting);
        for reaction in dirty {
            let Some(owner) = reaction.owner.upgrade() else {
                continue;
            };
            let owner = Component::from_inner(owner);
            let Some((context, result)) = owner.run_reaction(self, reaction.id) else {
                continue;
            };
            report.reactions_run += 1;
            if let Err(error) = result {
                tracing::error!(
                    target: targets::REACTION,
                    reaction = %context,
                    %error,
                    "reaction failed"
                );
                report.failures.push(Failure { context, error });
            }
        }
    }
}

impl fmt::Debug for Loop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loop")
            .field("iterating", &self.0.iterating.get())
            .field("processing", &self.0.processing.get())
            .field("reacting", &self.0.reacting.get())
            .field("pending_actions", &self.pending_actions())
            .field("pending_reactions", &self.pending_reactions())
            .finish()
    }
}

/// Keeps a component on the active stack; pops it when dropped.
#[must_use = "the component is deactivated as soon as the guard is dropped"]
pub struct ActiveGuard {
    lp: Loop,
    depth: usize,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = self.lp.0.active.borrow_mut();
        active.truncate(self.depth.saturating_sub(1));
    }
}
