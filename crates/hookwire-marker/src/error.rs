//! Error types for the marker registry.
//!
//! These are usage errors: they mean a type's declaration is wrong, not
//! that a particular wire document is. They surface the first time the
//! type is inspected and keep surfacing until the declaration is fixed.

use crate::{Role, TypeDescriptor};

/// A declaration that violates the marker registry's rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    /// The same member of one declaring type was registered twice.
    ///
    /// A member carries at most one role: a field can't be both a wrapped
    /// object and a wrapped array, and a method can't be both a
    /// pre-encode and a post-decode hook. Registering the same name twice
    /// under one role is reported the same way.
    #[error("member `{member}` of {ty} is declared as both {first} and {second}")]
    RoleConflict {
        ty: TypeDescriptor,
        member: &'static str,
        first: Role,
        second: Role,
    },

    /// Two wrapped fields read the same outer wire key.
    #[error("{ty} declares more than one wrapped field for outer key `{outer_key}`")]
    DuplicateOuterKey {
        ty: TypeDescriptor,
        outer_key: &'static str,
    },

    /// A member name, outer key, or embedded key is blank.
    #[error("member `{member}` of {ty} has an empty name or key")]
    EmptyKey {
        ty: TypeDescriptor,
        member: &'static str,
    },

    /// Following `inherit` from `ty` reaches `base`, which is already on
    /// the inheritance path.
    #[error("{ty} inherits from {base}, which is already one of its ancestors")]
    InheritanceCycle {
        ty: TypeDescriptor,
        base: TypeDescriptor,
    },

    /// `base` is reached through `inherit` more than once, directly or
    /// through two different bases. Its members would run twice.
    #[error("{ty} inherits from {base}, which is already inherited elsewhere in the hierarchy")]
    DuplicateBase {
        ty: TypeDescriptor,
        base: TypeDescriptor,
    },
}

/// A member was asked to run under a role it doesn't carry.
///
/// Returned by [`Member::invoke`](crate::Member::invoke) and
/// [`Member::inject`](crate::Member::inject) instead of silently doing
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("member `{member}` is a {role} member and can't run as {expected}")]
pub struct RoleMismatch {
    pub member: &'static str,
    pub role: Role,
    pub expected: &'static str,
}
