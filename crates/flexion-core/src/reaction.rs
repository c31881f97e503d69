//! Reactions: batched callbacks bound to event paths.
//!
//! A reaction subscribes to one or more paths:
//!
//! - `"prop"`: changes of a property (or emissions of an emitter) on the
//!   owning component;
//! - `"related.prop"`: changes of `prop` on whatever component the owner's
//!   `related` property references. Paths may chain further
//!   (`"parent.parent.size"`). When a link property changes, the reaction is
//!   resubscribed immediately and also receives the link's own event.
//!
//! Reactions never run while events arrive. Each event is appended to the
//! reaction's pending batch and the reaction is scheduled on the loop; during
//! the reacting phase of the tick it is invoked once with every event it
//! accumulated, oldest first.
//!
//! A reaction declared with [`ReactionSpec::implicit`] has no paths. It runs
//! once after it is connected, records every property it reads through
//! [`Component::get`], and is re-run whenever one of those properties changes.

use std::fmt;
use std::sync::{Arc, Weak};

use slotmap::new_key_type;

use crate::component::{Component, ComponentClass, ComponentInner};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::property::PropertyKind;

new_key_type! {
    /// Identifies a reaction within its owning component.
    pub struct ReactionId;
}

/// The body of a reaction.
pub type ReactionFn = Arc<dyn Fn(&Component, &[Event]) -> Result<()> + Send + Sync>;

/// A dotted subscription path such as `"size"` or `"parent.size"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a dotted path. Empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::construction(
                "reaction",
                format!("invalid path {path:?}: empty segment"),
            ));
        }
        Ok(Self { segments })
    }

    /// All segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The component-reference properties walked before the leaf.
    pub fn links(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The final property or emitter name.
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Whether the path names something on the owner itself.
    pub fn is_local(&self) -> bool {
        self.segments.len() == 1
    }

    /// Check the path against the owner's class, following typed links.
    pub(crate) fn check(&self, class: &ComponentClass) -> Result<()> {
        let mut current = Some(class.clone());
        for (i, segment) in self.segments.iter().enumerate() {
            let Some(class) = current.take() else {
                // Untyped link: nothing more can be checked statically.
                return Ok(());
            };
            let is_leaf = i + 1 == self.segments.len();
            match class.property(segment) {
                Some(spec) if !is_leaf => match spec.kind() {
                    PropertyKind::Component(allowed) => current = allowed.clone(),
                    PropertyKind::Any | PropertyKind::Custom(_) => {}
                    other => {
                        return Err(Error::construction(
                            class.name(),
                            format!(
                                "path {self}: '{segment}' is a {} property, not a component reference",
                                other.name()
                            ),
                        ));
                    }
                },
                Some(_) => {}
                None if is_leaf && class.emitter(segment).is_some() => {}
                None => {
                    return Err(Error::construction(
                        class.name(),
                        format!("path {self}: no property or emitter named '{segment}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Declaration of a reaction.
#[derive(Clone)]
pub struct ReactionSpec {
    name: String,
    paths: Vec<String>,
    callback: ReactionFn,
}

impl ReactionSpec {
    /// Declare a reaction to explicit paths.
    pub fn new<I, S, F>(name: impl Into<String>, paths: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Component, &[Event]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            callback: Arc::new(callback),
        }
    }

    /// Declare a reaction whose dependencies are the properties it reads.
    pub fn implicit<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Component, &[Event]) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, Vec::<String>::new(), callback)
    }

    /// The reaction name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared paths, as written.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether dependencies are tracked by reads.
    pub fn is_implicit(&self) -> bool {
        self.paths.is_empty()
    }

    /// Parse and check the paths against the owner's class.
    pub(crate) fn resolve_paths(&self, class: &ComponentClass) -> Result<Vec<Path>> {
        self.paths
            .iter()
            .map(|raw| {
                let path = Path::parse(raw)?;
                path.check(class)?;
                Ok(path)
            })
            .collect()
    }

    pub(crate) fn callback(&self) -> ReactionFn {
        self.callback.clone()
    }
}

impl fmt::Debug for ReactionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionSpec")
            .field("name", &self.name)
            .field("paths", &self.paths)
            .finish()
    }
}

/// A place a reaction is subscribed: an event name on some component.
#[derive(Clone)]
pub(crate) struct Source {
    pub(crate) component: Weak<ComponentInner>,
    pub(crate) name: String,
}

impl Source {
    pub(crate) fn same_as(&self, other: &Source) -> bool {
        self.name == other.name && Weak::ptr_eq(&self.component, &other.component)
    }
}

/// A reaction subscribed to an event name, as recorded on the source.
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) owner: Weak<ComponentInner>,
    pub(crate) reaction: ReactionId,
    /// The subscription is a path link: an event means "resubscribe".
    pub(crate) link: bool,
}

impl Subscriber {
    pub(crate) fn is(&self, owner: &Weak<ComponentInner>, reaction: ReactionId) -> bool {
        self.reaction == reaction && Weak::ptr_eq(&self.owner, owner)
    }
}

/// A reaction scheduled on the loop.
#[derive(Clone)]
pub(crate) struct ReactionRef {
    pub(crate) owner: Weak<ComponentInner>,
    pub(crate) id: ReactionId,
}

/// Runtime state of a connected reaction. Disconnecting removes it.
pub(crate) struct Reaction {
    pub(crate) name: String,
    pub(crate) paths: Vec<Path>,
    pub(crate) implicit: bool,
    pub(crate) callback: ReactionFn,
    pub(crate) pending: Vec<Event>,
    pub(crate) scheduled: bool,
    pub(crate) sources: Vec<Source>,
}

impl Reaction {
    pub(crate) fn new(spec: &ReactionSpec, paths: Vec<Path>) -> Self {
        Self {
            name: spec.name().to_string(),
            implicit: spec.is_implicit(),
            paths,
            callback: spec.callback(),
            pending: Vec::new(),
            scheduled: false,
            sources: Vec::new(),
        }
    }
}

/// One subscription to place while resolving paths.
pub(crate) struct Target {
    pub(crate) component: Component,
    pub(crate) name: String,
    pub(crate) link: bool,
}

/// Walk `paths` from `owner`, collecting the subscriptions they need.
///
/// A link whose value is not a component (typically `null`) ends that path.
/// Duplicate targets are merged; a target is a link if any path uses it as one.
pub(crate) fn resolve_targets(owner: &Component, paths: &[Path]) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();
    let mut push = |component: &Component, name: &str, link: bool| {
        if let Some(existing) = targets
            .iter_mut()
            .find(|t| t.name == name && t.component.ptr_eq(component))
        {
            existing.link |= link;
        } else {
            targets.push(Target {
                component: component.clone(),
                name: name.to_string(),
                link,
            });
        }
    };

    for path in paths {
        let mut current = Some(owner.clone());
        for link in path.links() {
            let Some(component) = current.take() else { break };
            push(&component, link, true);
            current = component
                .peek(link)
                .and_then(|value| value.as_component().cloned());
        }
        if let Some(component) = current {
            push(&component, path.leaf(), false);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse() {
        let path = Path::parse("parent.size").unwrap();
        assert_eq!(path.links(), ["parent".to_string()]);
        assert_eq!(path.leaf(), "size");
        assert!(!path.is_local());
        assert_eq!(path.to_string(), "parent.size");

        let local = Path::parse("foo").unwrap();
        assert!(local.is_local());
        assert!(local.links().is_empty());
    }

    #[test]
    fn test_path_rejects_empty_segments() {
        assert!(Path::parse("").is_err());
        assert!(Path::parse("parent.").is_err());
        assert!(Path::parse(".size").is_err());
    }

    #[test]
    fn test_spec_implicit_has_no_paths() {
        let spec = ReactionSpec::implicit("watch", |_, _| Ok(()));
        assert!(spec.is_implicit());
        let spec = ReactionSpec::new("on_foo", ["foo"], |_, _| Ok(()));
        assert!(!spec.is_implicit());
        assert_eq!(spec.paths(), ["foo".to_string()]);
    }
}
