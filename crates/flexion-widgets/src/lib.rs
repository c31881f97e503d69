//! Base widget component for Flexion.
//!
//! Provides the [`Widget`](widget::widget_class) component class: a tree of
//! widgets linked through `parent` and `children`, layout hints as float
//! pairs, and emitters for pointer and keyboard input. Rendering is left to
//! the host, which reports sizes through `set_size` and feeds input through
//! the functions in [`widget`].
//!
//! # Example
//!
//! ```
//! use flexion_core::Loop;
//! use flexion_widgets::{widget, widget_class};
//!
//! let class = widget_class().unwrap();
//! let root = class.create().unwrap();
//! let child = widget::create_widget(&class, Some(&root), [("title", "child")]).unwrap();
//!
//! assert_eq!(widget::parent(&child), Some(root.clone()));
//! assert_eq!(widget::children(&root), vec![child.clone()]);
//!
//! child.dispose();
//! Loop::current().flush().unwrap();
//! assert!(widget::children(&root).is_empty());
//! ```

pub mod float_pair;
pub mod input;
pub mod widget;

pub use float_pair::FloatPair;
pub use input::{KeyEvent, KeyboardModifiers, MouseButton, PointerEvent, WheelEvent};
pub use widget::{create_widget, is_widget, widget_class};
