use alloc::string::{String, ToString};
use core::any::Any;

use thiserror::Error;

/// A failure raised by a caller-supplied visitor during a traversal.
///
/// Faults never reach the caller of the traversal; they are logged and the
/// traversal moves on to the next entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitFault {
    /// The visitor panicked.
    #[error("visitor panicked: {message}")]
    Panicked { message: String },
}

impl VisitFault {
    /// Build a fault from the payload returned by `catch_unwind`.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        VisitFault::Panicked { message }
    }
}
