//! Marker registry for hookwire.
//!
//! This crate defines how a data record tells the codec pipeline which of
//! its members take part in the decode/encode lifecycle:
//!
//! - **Roles** ([`Role`]): the closed set of lifecycle points a member can
//!   be attached to (pre-encode, post-decode, context injection, wrapped
//!   object field, wrapped array field).
//! - **Declarations** ([`Hooked`], [`Declaration`]): the builder a type
//!   fills in once to register its hooks, wrapped fields, and bases.
//! - **Members** ([`Member`], [`WrappedField`]): the resolved,
//!   cheap-to-call descriptors that the inspection cache stores.
//!
//! # Where it fits
//!
//! ```text
//! Lifecycle adapter (hookwire)  ← runs members at the right time
//!     ↕
//! Inspection cache (hookwire-inspect)  ← resolves + memoizes member lists
//!     ↕
//! Marker registry (this crate)  ← what a type declares
//! ```
//!
//! Arity and argument types of hooks are enforced by the compiler through
//! the builder signatures. Everything else (role conflicts, duplicate
//! keys, inheritance cycles) is checked by [`validate_members`] the first
//! time a type is inspected.

mod declaration;
mod error;
mod member;
mod role;

pub use declaration::{Ancestor, Declaration, Hooked};
pub use error::{DeclarationError, RoleMismatch};
pub use member::{
    validate_members, HookError, HookResult, InjectError, Member, Shape,
    WrappedField, WrappedFieldSpec,
};
pub use role::{short_type_name, Role, TypeDescriptor};
