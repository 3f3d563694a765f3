//! Member descriptors: the resolved, callable form of a declaration.
//!
//! A [`Member`] pairs a name and declaring type with an invocation thunk.
//! Thunks are `Arc<dyn Fn ...>`, so cloning a member list is cheap and a
//! cached list can be shared across threads and called repeatedly.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{DeclarationError, Role, RoleMismatch, TypeDescriptor};

/// The error a hook returns to abort a decode or encode.
///
/// Boxed so record authors can use whatever error type they already have.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What every hook returns.
pub type HookResult = Result<(), HookError>;

pub(crate) type HookFn<T> = Arc<dyn Fn(&mut T) -> HookResult + Send + Sync>;
pub(crate) type InjectFn<T> =
    Arc<dyn Fn(&mut T, &dyn Any) -> Result<(), InjectError> + Send + Sync>;
pub(crate) type AssignFn<T> =
    Arc<dyn Fn(&mut T, Value) -> Result<(), serde_json::Error> + Send + Sync>;
pub(crate) type ResetFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;
pub(crate) type ExtractFn<T> =
    Arc<dyn Fn(&mut T) -> Result<Value, serde_json::Error> + Send + Sync>;

/// A projection from an outer value to one of its parts.
///
/// Used both for field accessors and for reaching a base type embedded
/// in a derived one.
pub(crate) type Lens<T, B> = Arc<dyn Fn(&mut T) -> &mut B + Send + Sync>;

/// Why a context-inject member could not run.
#[derive(Debug)]
pub enum InjectError {
    /// The hook itself failed.
    Hook(HookError),

    /// The supplied context is not the type the hook was declared with.
    ContextMismatch { expected: &'static str },
}

// ---------------------------------------------------------------------------
// Wrapped fields
// ---------------------------------------------------------------------------

/// The shape of the value embedded in a wrapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

/// Static description of a wrapped field.
///
/// On the wire the field looks like
/// `"<outer_key>": "{\"<embedded_key>\": <value>}"`, and `field` is the
/// member that receives `<value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedFieldSpec {
    /// Name of the member that holds the decoded value.
    pub field: &'static str,
    /// Key of the string-valued field in the wire object.
    pub outer_key: &'static str,
    /// Key inside the embedded document that holds the real value.
    pub embedded_key: &'static str,
    /// Object or array.
    pub shape: Shape,
    /// The decoded value is always the empty sequence; wire content is
    /// never parsed.
    pub constant: bool,
    /// Array elements stay untyped `serde_json::Value` trees.
    pub raw: bool,
}

impl WrappedFieldSpec {
    /// The role this spec registers under.
    pub fn role(&self) -> Role {
        match self.shape {
            Shape::Object => Role::WrappedObjectField,
            Shape::Array => Role::WrappedArrayField,
        }
    }
}

/// A wrapped field together with typed access to the member it fills.
pub struct WrappedField<T> {
    spec: WrappedFieldSpec,
    assign: AssignFn<T>,
    reset: ResetFn<T>,
    extract: ExtractFn<T>,
}

impl<T> WrappedField<T> {
    pub(crate) fn new(
        spec: WrappedFieldSpec,
        assign: AssignFn<T>,
        reset: ResetFn<T>,
        extract: ExtractFn<T>,
    ) -> Self {
        Self {
            spec,
            assign,
            reset,
            extract,
        }
    }

    pub fn spec(&self) -> &WrappedFieldSpec {
        &self.spec
    }

    /// Decodes `value` into the member.
    ///
    /// # Errors
    /// Returns the `serde_json` error when `value` doesn't match the
    /// member's type.
    pub fn assign(
        &self,
        target: &mut T,
        value: Value,
    ) -> Result<(), serde_json::Error> {
        (self.assign)(target, value)
    }

    /// Puts the member back to its default (for constant arrays, the
    /// constant itself: an empty sequence).
    pub fn reset(&self, target: &mut T) {
        (self.reset)(target)
    }

    /// Serializes the member's current value.
    pub fn extract(&self, target: &mut T) -> Result<Value, serde_json::Error> {
        (self.extract)(target)
    }
}

impl<T> Clone for WrappedField<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            assign: Arc::clone(&self.assign),
            reset: Arc::clone(&self.reset),
            extract: Arc::clone(&self.extract),
        }
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

pub(crate) enum Thunk<T> {
    PreEncode(HookFn<T>),
    PostDecode(HookFn<T>),
    ContextInject {
        context: &'static str,
        inject: InjectFn<T>,
    },
    Wrapped(WrappedField<T>),
}

impl<T> Clone for Thunk<T> {
    fn clone(&self) -> Self {
        match self {
            Self::PreEncode(f) => Self::PreEncode(Arc::clone(f)),
            Self::PostDecode(f) => Self::PostDecode(Arc::clone(f)),
            Self::ContextInject { context, inject } => Self::ContextInject {
                context: *context,
                inject: Arc::clone(inject),
            },
            Self::Wrapped(w) => Self::Wrapped(w.clone()),
        }
    }
}

/// One member of a type that carries a role.
///
/// `declared_by` is the type whose `declare` registered the member, which
/// for inherited members is the base type, not the type being decoded.
pub struct Member<T> {
    name: &'static str,
    declared_by: TypeDescriptor,
    thunk: Thunk<T>,
}

impl<T> Member<T> {
    pub(crate) fn new(
        name: &'static str,
        declared_by: TypeDescriptor,
        thunk: Thunk<T>,
    ) -> Self {
        Self {
            name,
            declared_by,
            thunk,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared_by(&self) -> TypeDescriptor {
        self.declared_by
    }

    pub fn role(&self) -> Role {
        match &self.thunk {
            Thunk::PreEncode(_) => Role::PreEncode,
            Thunk::PostDecode(_) => Role::PostDecode,
            Thunk::ContextInject { .. } => Role::ContextInject,
            Thunk::Wrapped(w) => w.spec.role(),
        }
    }

    /// Runs a zero-argument hook (`PreEncode` or `PostDecode`).
    ///
    /// # Errors
    /// The hook's own error, or a [`RoleMismatch`] for a member of any
    /// other role. `target` is not touched in that case.
    pub fn invoke(&self, target: &mut T) -> HookResult {
        match &self.thunk {
            Thunk::PreEncode(f) | Thunk::PostDecode(f) => f(target),
            _ => Err(self.mismatch("a PreEncode or PostDecode hook").into()),
        }
    }

    /// Runs a context-inject hook with `context`.
    ///
    /// # Errors
    /// [`InjectError::ContextMismatch`] for the wrong context type, or
    /// [`InjectError::Hook`] carrying the hook's error or a
    /// [`RoleMismatch`] for a member of any other role.
    pub fn inject(
        &self,
        target: &mut T,
        context: &dyn Any,
    ) -> Result<(), InjectError> {
        match &self.thunk {
            Thunk::ContextInject { inject, .. } => inject(target, context),
            _ => Err(InjectError::Hook(
                self.mismatch("a ContextInject hook").into(),
            )),
        }
    }

    fn mismatch(&self, expected: &'static str) -> RoleMismatch {
        RoleMismatch {
            member: self.name,
            role: self.role(),
            expected,
        }
    }

    /// The context type a context-inject hook expects.
    pub fn context_type(&self) -> Option<&'static str> {
        match &self.thunk {
            Thunk::ContextInject { context, .. } => Some(*context),
            _ => None,
        }
    }

    /// The wrapped-field half of this member, if it is one.
    pub fn wrapped(&self) -> Option<&WrappedField<T>> {
        match &self.thunk {
            Thunk::Wrapped(w) => Some(w),
            _ => None,
        }
    }
}

impl<T: 'static> Member<T> {
    /// Re-targets this member at an outer type `D` that embeds `T`.
    ///
    /// Every thunk is wrapped so it first projects `&mut D` to `&mut T`.
    pub(crate) fn lift<D: 'static>(self, lens: &Lens<D, T>) -> Member<D> {
        let thunk = match self.thunk {
            Thunk::PreEncode(f) => Thunk::PreEncode(lift_hook(f, lens)),
            Thunk::PostDecode(f) => Thunk::PostDecode(lift_hook(f, lens)),
            Thunk::ContextInject { context, inject } => {
                let lens = Arc::clone(lens);
                Thunk::ContextInject {
                    context,
                    inject: Arc::new(move |d: &mut D, ctx: &dyn Any| {
                        inject(lens(d), ctx)
                    }),
                }
            }
            Thunk::Wrapped(w) => {
                let (assign, reset, extract) = (w.assign, w.reset, w.extract);
                let (l1, l2, l3) =
                    (Arc::clone(lens), Arc::clone(lens), Arc::clone(lens));
                Thunk::Wrapped(WrappedField {
                    spec: w.spec,
                    assign: Arc::new(move |d: &mut D, v: Value| {
                        assign(l1(d), v)
                    }),
                    reset: Arc::new(move |d: &mut D| reset(l2(d))),
                    extract: Arc::new(move |d: &mut D| extract(l3(d))),
                })
            }
        };
        Member {
            name: self.name,
            declared_by: self.declared_by,
            thunk,
        }
    }
}

fn lift_hook<D: 'static, T: 'static>(
    f: HookFn<T>,
    lens: &Lens<D, T>,
) -> HookFn<D> {
    let lens = Arc::clone(lens);
    Arc::new(move |d: &mut D| f(lens(d)))
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            declared_by: self.declared_by,
            thunk: self.thunk.clone(),
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("declared_by", &self.declared_by)
            .field("role", &self.role())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks a fully flattened member list of `owner` (own and inherited
/// members, every role).
///
/// # Errors
/// - [`DeclarationError::EmptyKey`] for a blank name, outer key, or
///   embedded key.
/// - [`DeclarationError::RoleConflict`] when one declaring type registers
///   the same member name twice.
/// - [`DeclarationError::DuplicateOuterKey`] when two wrapped fields read
///   the same outer key.
pub fn validate_members<T>(
    owner: TypeDescriptor,
    members: &[Member<T>],
) -> Result<(), DeclarationError> {
    let mut seen: HashMap<(TypeDescriptor, &'static str), Role> =
        HashMap::new();
    let mut outer_keys: HashMap<&'static str, &'static str> = HashMap::new();

    for member in members {
        let blank = member.name.trim().is_empty()
            || member.wrapped().is_some_and(|w| {
                w.spec.outer_key.trim().is_empty()
                    || w.spec.embedded_key.trim().is_empty()
            });
        if blank {
            return Err(DeclarationError::EmptyKey {
                ty: member.declared_by,
                member: member.name,
            });
        }

        let role = member.role();
        if let Some(first) = seen.insert((member.declared_by, member.name), role)
        {
            return Err(DeclarationError::RoleConflict {
                ty: member.declared_by,
                member: member.name,
                first,
                second: role,
            });
        }

        if let Some(w) = member.wrapped() {
            if outer_keys.insert(w.spec.outer_key, w.spec.field).is_some() {
                return Err(DeclarationError::DuplicateOuterKey {
                    ty: owner,
                    outer_key: w.spec.outer_key,
                });
            }
        }
    }

    Ok(())
}
