//! Core of Flexion, a reactive component system.
//!
//! This crate provides:
//!
//! - **Properties**: typed, validated slots declared on a [`ComponentClass`]
//!   ([`PropertySpec`], [`PropertyKind`], custom [`Validator`]s)
//! - **Actions**: named, queued requests that are the only way to change state
//! - **Mutations**: the low-level changes actions apply, including incremental
//!   sequence edits ([`Mutation`])
//! - **Reactions**: callbacks that run once per tick with every [`Event`] they
//!   received, subscribed by path (`"foo"`, `"parent.size"`) or by read tracking
//! - **Emitters**: event sources that carry a [`Payload`]
//! - **Event loop**: a per-thread [`Loop`] separating the action and reaction
//!   phases, plus the active-component stack
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use flexion_core::{ComponentClass, Loop, Mutation, PropertySpec, ReactionSpec, Value};
//!
//! let totals = Arc::new(Mutex::new(Vec::new()));
//! let sink = totals.clone();
//!
//! let cart = ComponentClass::builder("Cart")
//!     .property(PropertySpec::list("items"))
//!     .action("add", |cart, args| {
//!         let len = cart.get("items")?.items().map_or(0, |items| items.len());
//!         cart.mutate("items", Mutation::insert(len, args.iter().cloned()))
//!     })
//!     .reaction(ReactionSpec::new("total", ["items"], move |cart, _events| {
//!         let total: i64 = cart
//!             .get("items")?
//!             .items()
//!             .unwrap_or_default()
//!             .iter()
//!             .filter_map(Value::as_int)
//!             .sum();
//!         sink.lock().push(total);
//!         Ok(())
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let c = cart.create().unwrap();
//! c.invoke("add", vec![Value::from(3)]).unwrap();
//! c.invoke("add", vec![Value::from(4), Value::from(5)]).unwrap();
//! Loop::current().flush().unwrap();
//!
//! // One reaction run for both actions.
//! assert_eq!(*totals.lock(), vec![12]);
//! ```

pub mod action;
pub mod component;
pub mod config;
pub mod emitter;
mod error;
pub mod event;
pub mod event_loop;
pub mod logging;
pub mod mutation;
pub mod property;
pub mod reaction;
pub mod thread_check;
pub mod value;

pub use action::{ActionFn, ActionSpec};
pub use component::{Component, ComponentClass, ComponentClassBuilder, ComponentId, Hook};
pub use config::LoopConfig;
pub use emitter::{EmitterFn, EmitterSpec};
pub use error::{Error, Result};
pub use event::{Change, Event, Payload};
pub use event_loop::{ActiveGuard, Failure, Loop, TickReport};
pub use logging::{ComponentTreeDebug, TreeFormatOptions, TreeStyle};
pub use mutation::Mutation;
pub use property::{PropertyKind, PropertySpec, Validator};
pub use reaction::{Path, ReactionFn, ReactionId, ReactionSpec};
pub use thread_check::ThreadAffinity;
pub use value::{List, Value};
