//! Logging and debugging facilities for Flexion.
//!
//! Flexion is instrumented with the `tracing` crate and never installs a
//! subscriber itself. To see what the loop is doing, install one in your
//! application and filter on the [`targets`] below:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("flexion_core::event_loop=trace,flexion_core::reaction=debug")
//!     .init();
//! ```
//!
//! [`ComponentTreeDebug`] renders a component and its property values, and
//! walks component trees formed by a tuple-of-components property such as a
//! widget's `children`.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use crate::component::{Component, ComponentId};
use crate::value::Value;

/// Target names for log filtering.
pub mod targets {
    /// Crate-wide target.
    pub const CORE: &str = "flexion_core";
    /// Ticks, queue draining and the active stack.
    pub const EVENT_LOOP: &str = "flexion_core::event_loop";
    /// Class building, construction, emission and disposal.
    pub const COMPONENT: &str = "flexion_core::component";
    /// Property mutations.
    pub const PROPERTY: &str = "flexion_core::property";
    /// Reaction connection and invocation.
    pub const REACTION: &str = "flexion_core::reaction";
    /// Action queueing and failures.
    pub const ACTION: &str = "flexion_core::action";
}

/// Style options for tree output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Indentation only.
    Compact,
}

/// Configuration for [`ComponentTreeDebug`].
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show component ids.
    pub show_ids: bool,
    /// Whether to show class names.
    pub show_classes: bool,
    /// Whether to list property values under each node.
    pub show_properties: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// The tuple property holding child components.
    pub children_property: String,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_classes: true,
            show_properties: false,
            max_depth: None,
            children_property: "children".to_string(),
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including property values.
    pub fn detailed() -> Self {
        Self {
            show_properties: true,
            ..Default::default()
        }
    }

    /// Component names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_classes: false,
            show_properties: false,
            ..Default::default()
        }
    }
}

/// Renders component trees for debugging.
#[derive(Debug, Clone, Default)]
pub struct ComponentTreeDebug {
    options: TreeFormatOptions,
}

impl ComponentTreeDebug {
    /// A renderer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Render `root` and everything reachable through the children property.
    ///
    /// A component that is already on the path from `root` is printed once
    /// more with a `<cycle>` marker and not descended into.
    pub fn format_subtree(&self, root: &Component) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_node(&mut output, root, &mut Vec::new(), &mut HashSet::new());
        output
    }

    /// Render one component's property values, one per line.
    pub fn format_properties(component: &Component) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{} ({})", component.name(), component.class().name());
        for (name, value) in component.snapshot() {
            let _ = writeln!(output, "  .{name} = {value}");
        }
        output
    }

    fn write_node(
        &self,
        out: &mut String,
        component: &Component,
        last_flags: &mut Vec<bool>,
        path: &mut HashSet<ComponentId>,
    ) -> fmt::Result {
        let depth = last_flags.len();
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        out.push_str(&self.prefix(last_flags));
        out.push_str(component.name());
        if self.options.show_ids {
            write!(out, " [{}]", component.id())?;
        }
        if self.options.show_classes {
            write!(out, " ({})", component.class().name())?;
        }
        if component.is_disposed() {
            out.push_str(" <disposed>");
        }
        if path.contains(&component.id()) {
            out.push_str(" <cycle>\n");
            return Ok(());
        }
        out.push('\n');

        if self.options.show_properties {
            let indent = self.continuation(last_flags);
            for (name, value) in component.snapshot() {
                if name == self.options.children_property {
                    continue;
                }
                writeln!(out, "{indent}  .{name} = {value}")?;
            }
        }

        let children: Vec<Component> = component
            .peek(&self.options.children_property)
            .and_then(|value| value.items())
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_component)
            .cloned()
            .collect();
        let count = children.len();
        path.insert(component.id());
        for (i, child) in children.iter().enumerate() {
            last_flags.push(i + 1 == count);
            let written = self.write_node(out, child, last_flags, path);
            last_flags.pop();
            written?;
        }
        path.remove(&component.id());
        Ok(())
    }

    fn glyphs(&self) -> (&'static str, &'static str, &'static str) {
        match self.options.style {
            TreeStyle::Ascii => ("|  ", "+- ", "`- "),
            TreeStyle::Unicode => ("\u{2502}  ", "\u{251c}\u{2500} ", "\u{2514}\u{2500} "),
            TreeStyle::Compact => ("  ", "  ", "  "),
        }
    }

    fn prefix(&self, last_flags: &[bool]) -> String {
        let Some((&is_last, ancestors)) = last_flags.split_last() else {
            return String::new();
        };
        let (branch, tee, corner) = self.glyphs();
        let mut prefix = String::new();
        for &ancestor_last in ancestors {
            prefix.push_str(if ancestor_last { "   " } else { branch });
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }

    fn continuation(&self, last_flags: &[bool]) -> String {
        let (branch, _, _) = self.glyphs();
        last_flags
            .iter()
            .map(|&last| if last { "   " } else { branch })
            .collect()
    }
}
