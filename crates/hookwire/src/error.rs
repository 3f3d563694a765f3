//! Unified error type for hookwire.

use hookwire_codec::WireError;
use hookwire_marker::{DeclarationError, HookError, Role};

/// Top-level error for a decode or encode call.
///
/// Declaration and wire errors from the sub-crates convert automatically
/// through `#[from]`, so the pipeline can use `?` on them. The remaining
/// variants come from running hooks.
#[derive(Debug, thiserror::Error)]
pub enum HookwireError {
    /// The type's declaration is invalid (role conflict, duplicate outer
    /// key, blank key, inheritance cycle).
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// The wire document (or the value being encoded) is the problem.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A hook returned an error. The operation was abandoned and the
    /// instance dropped.
    #[error("{role} hook {ty}::{member} failed: {source}")]
    Hook {
        ty: &'static str,
        member: &'static str,
        role: Role,
        source: HookError,
    },

    /// The type has context-inject hooks but no context was supplied.
    #[error("{ty}::{member} needs a context value, but none was supplied")]
    MissingContext {
        ty: &'static str,
        member: &'static str,
    },

    /// The supplied context isn't the type a context-inject hook expects.
    #[error("{ty}::{member} expects a context of type {expected}")]
    ContextMismatch {
        ty: &'static str,
        member: &'static str,
        expected: &'static str,
    },
}

impl HookwireError {
    /// The role whose hook failed, if this is a hook error.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Hook { role, .. } => Some(*role),
            Self::MissingContext { .. } | Self::ContextMismatch { .. } => {
                Some(Role::ContextInject)
            }
            _ => None,
        }
    }
}
