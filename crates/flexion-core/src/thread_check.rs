//! Thread affinity for components.
//!
//! Every component belongs to the thread that created it, and only that
//! thread's [`Loop`](crate::Loop) may schedule or run work for it. Handles can
//! still be sent to other threads, which may read property values but get an
//! access error for anything that would queue actions, mutate, emit or change
//! subscriptions.
//!
//! ```
//! use flexion_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_same_thread());
//! assert!(affinity.check(|| "poke".to_string()).is_ok());
//!
//! std::thread::spawn(move || {
//!     assert!(!affinity.is_same_thread());
//!     assert!(affinity.check(|| "poke".to_string()).unwrap_err().is_access());
//! })
//! .join()
//! .unwrap();
//! ```

use std::thread::ThreadId;

use crate::error::{Error, Result};

/// The thread an object is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The bound thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the bound one.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// An access error naming `what` unless called from the bound thread.
    pub fn check(&self, what: impl FnOnce() -> String) -> Result<()> {
        if self.is_same_thread() {
            return Ok(());
        }
        Err(self.wrong_thread(what()))
    }

    #[cold]
    #[inline(never)]
    fn wrong_thread(&self, what: String) -> Error {
        let current = std::thread::current();
        Error::access(
            what,
            format!(
                "owned by thread {:?}, called from \"{}\" ({:?})",
                self.thread_id,
                current.name().unwrap_or("<unnamed>"),
                current.id()
            ),
        )
    }
}
