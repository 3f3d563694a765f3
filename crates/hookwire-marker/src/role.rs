//! Lifecycle roles and type descriptors.

use std::any::TypeId;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role: where in the lifecycle a member runs
// ---------------------------------------------------------------------------

/// The lifecycle point a member is attached to.
///
/// Each role constrains the member's shape:
///
/// | Role | Shape |
/// |------|-------|
/// | `PreEncode` | `Fn(&mut T) -> HookResult` |
/// | `PostDecode` | `Fn(&mut T) -> HookResult` |
/// | `ContextInject` | `Fn(&mut T, &C) -> HookResult` |
/// | `WrappedObjectField` | field + outer key + embedded key + target `V` |
/// | `WrappedArrayField` | field + outer key + embedded key + element `E` |
///
/// The shapes are enforced by the [`Declaration`](crate::Declaration)
/// builder signatures, so a member with the wrong arity cannot be
/// registered at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum Role {
    /// Runs on the instance right before the base codec serializes it.
    PreEncode,

    /// Runs on a freshly decoded instance.
    PostDecode,

    /// Runs after decode with an externally supplied context value.
    ContextInject,

    /// A field whose wire value is JSON text embedding an object.
    WrappedObjectField,

    /// A field whose wire value is JSON text embedding an array.
    WrappedArrayField,
}

impl Role {
    /// Every role, in a fixed order.
    pub const ALL: [Role; 5] = [
        Role::PreEncode,
        Role::PostDecode,
        Role::ContextInject,
        Role::WrappedObjectField,
        Role::WrappedArrayField,
    ];

    /// Returns `true` for callable roles (everything but wrapped fields).
    pub fn is_hook(self) -> bool {
        matches!(self, Self::PreEncode | Self::PostDecode | Self::ContextInject)
    }

    /// Returns `true` for the two wrapped-field roles.
    pub fn is_wrapped(self) -> bool {
        matches!(self, Self::WrappedObjectField | Self::WrappedArrayField)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreEncode => write!(f, "PreEncode"),
            Self::PostDecode => write!(f, "PostDecode"),
            Self::ContextInject => write!(f, "ContextInject"),
            Self::WrappedObjectField => write!(f, "WrappedObjectField"),
            Self::WrappedArrayField => write!(f, "WrappedArrayField"),
        }
    }
}

// ---------------------------------------------------------------------------
// TypeDescriptor: which concrete type is being decoded/encoded
// ---------------------------------------------------------------------------

/// Identifies a concrete type. Immutable once resolved.
///
/// `TypeId` is the cache key; the name is only used for diagnostics, so
/// it is never compared.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Resolves the descriptor for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the described type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name, e.g. `my_sdk::match::MatchSummary`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path, e.g. `MatchSummary`.
    ///
    /// Generic arguments are kept as-is: `a::Page<b::Item>` becomes
    /// `Page<b::Item>`.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

/// Strips the module path from a `std::any::type_name` result.
///
/// Works for types that aren't `'static` too, which is why it takes the
/// name rather than a type parameter.
pub fn short_type_name(name: &'static str) -> &'static str {
    let head_end = name.find('<').unwrap_or(name.len());
    let start = name[..head_end].rfind("::").map_or(0, |i| i + 2);
    &name[start..]
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl std::hash::Hash for TypeDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
