//! The declaration surface record authors use.
//!
//! A type opts into the pipeline by implementing [`Hooked`]. Its
//! `declare` fills in a [`Declaration`] once; the inspection cache turns
//! that into member lists and never asks again.
//!
//! ```rust
//! use hookwire_marker::{Declaration, HookResult, Hooked};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Meta {
//!     a: i64,
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Summary {
//!     kills: u32,
//!     deaths: u32,
//!     #[serde(skip)]
//!     ratio: f64,
//!     #[serde(skip)]
//!     meta: Option<Meta>,
//! }
//!
//! impl Summary {
//!     fn derive_ratio(&mut self) -> HookResult {
//!         self.ratio = f64::from(self.kills) / f64::from(self.deaths.max(1));
//!         Ok(())
//!     }
//! }
//!
//! impl Hooked for Summary {
//!     fn declare(decl: &mut Declaration<Self>) {
//!         decl.post_decode("derive_ratio", Self::derive_ratio)
//!             .wrapped_object("meta", "meta_j", "Inner", |s: &mut Self| &mut s.meta);
//!     }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::member::{Lens, Thunk};
use crate::{
    HookResult, InjectError, Member, Shape, TypeDescriptor, WrappedField,
    WrappedFieldSpec,
};

/// A type that takes part in the decode/encode lifecycle.
///
/// `declare` must be deterministic: the cache may call it more than once
/// (racing first lookups, and again after a failed validation) and
/// expects the same result every time.
pub trait Hooked: Sized + Send + Sync + 'static {
    /// Registers this type's hooks, wrapped fields, and bases.
    fn declare(decl: &mut Declaration<Self>);
}

/// A base type reached through [`Declaration::inherit`].
///
/// Expanding it calls the base's `declare` and lifts the result into the
/// derived type. Expansion is deferred so the inspection cache can detect
/// cycles before recursing.
pub struct Ancestor<T: 'static> {
    base: TypeDescriptor,
    expand: Box<dyn FnOnce() -> Declaration<T>>,
}

impl<T: 'static> Ancestor<T> {
    pub fn base(&self) -> TypeDescriptor {
        self.base
    }

    /// Declares the base and lifts it into `T`.
    pub fn expand(self) -> Declaration<T> {
        (self.expand)()
    }
}

/// Everything one type registers, in declaration order.
pub struct Declaration<T: 'static> {
    owner: TypeDescriptor,
    ancestors: Vec<Ancestor<T>>,
    members: Vec<Member<T>>,
}

impl<T: 'static> Default for Declaration<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Declaration<T> {
    /// An empty declaration owned by `T`.
    pub fn new() -> Self {
        Self::owned_by(TypeDescriptor::of::<T>())
    }

    fn owned_by(owner: TypeDescriptor) -> Self {
        Self {
            owner,
            ancestors: Vec::new(),
            members: Vec::new(),
        }
    }

    /// The type whose `declare` produced this declaration.
    ///
    /// For a lifted base declaration this is the base type.
    pub fn owner(&self) -> TypeDescriptor {
        self.owner
    }

    /// Splits the declaration into its bases and its own members.
    pub fn into_parts(self) -> (Vec<Ancestor<T>>, Vec<Member<T>>) {
        (self.ancestors, self.members)
    }

    // -- Hooks -------------------------------------------------------------

    /// Registers a hook that runs right before the base codec serializes
    /// the instance. It may mutate the instance to prepare wire state.
    pub fn pre_encode<F>(&mut self, name: &'static str, hook: F) -> &mut Self
    where
        F: Fn(&mut T) -> HookResult + Send + Sync + 'static,
    {
        self.push(name, Thunk::PreEncode(Arc::new(hook)))
    }

    /// Registers a hook that runs on every freshly decoded instance.
    pub fn post_decode<F>(&mut self, name: &'static str, hook: F) -> &mut Self
    where
        F: Fn(&mut T) -> HookResult + Send + Sync + 'static,
    {
        self.push(name, Thunk::PostDecode(Arc::new(hook)))
    }

    /// Registers a hook that receives the context value passed to
    /// `decode_with_context`.
    ///
    /// The hook only runs when the supplied context is a `C`; any other
    /// context type is reported as a mismatch, never silently skipped.
    pub fn context_inject<C, F>(
        &mut self,
        name: &'static str,
        hook: F,
    ) -> &mut Self
    where
        C: Any,
        F: Fn(&mut T, &C) -> HookResult + Send + Sync + 'static,
    {
        let context = std::any::type_name::<C>();
        let inject = move |target: &mut T, ctx: &dyn Any| {
            match ctx.downcast_ref::<C>() {
                Some(ctx) => hook(target, ctx).map_err(InjectError::Hook),
                None => Err(InjectError::ContextMismatch { expected: context }),
            }
        };
        self.push(
            name,
            Thunk::ContextInject {
                context,
                inject: Arc::new(inject),
            },
        )
    }

    // -- Wrapped fields ----------------------------------------------------

    /// Registers a field whose wire value is JSON text embedding an object
    /// under `embedded_key`.
    ///
    /// The field itself should be `#[serde(skip)]` so the base codec leaves
    /// it alone; it stays at `V::default()` when the wrapper or the
    /// embedded key is missing.
    pub fn wrapped_object<V, F>(
        &mut self,
        field: &'static str,
        outer_key: &'static str,
        embedded_key: &'static str,
        access: F,
    ) -> &mut Self
    where
        V: Serialize + DeserializeOwned + Default + 'static,
        F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let spec = spec(field, outer_key, embedded_key, Shape::Object);
        let access: Lens<T, V> = Arc::new(access);
        self.push_wrapped(spec, typed(access))
    }

    /// Registers a field whose wire value is JSON text embedding an array
    /// under `embedded_key`. Elements decode as `E`.
    pub fn wrapped_array<E, F>(
        &mut self,
        field: &'static str,
        outer_key: &'static str,
        embedded_key: &'static str,
        access: F,
    ) -> &mut Self
    where
        E: Serialize + DeserializeOwned + 'static,
        F: Fn(&mut T) -> &mut Vec<E> + Send + Sync + 'static,
    {
        let spec = spec(field, outer_key, embedded_key, Shape::Array);
        let access: Lens<T, Vec<E>> = Arc::new(access);
        self.push_wrapped(spec, typed(access))
    }

    /// Like [`wrapped_array`](Self::wrapped_array), but the decoded value
    /// is always the empty sequence and the wire value is never parsed.
    ///
    /// Meant for wrappers the backend always sends empty, where parsing
    /// would only waste time or trip over unexpected content.
    pub fn wrapped_constant_array<E, F>(
        &mut self,
        field: &'static str,
        outer_key: &'static str,
        embedded_key: &'static str,
        access: F,
    ) -> &mut Self
    where
        E: Serialize + DeserializeOwned + 'static,
        F: Fn(&mut T) -> &mut Vec<E> + Send + Sync + 'static,
    {
        let mut spec = spec(field, outer_key, embedded_key, Shape::Array);
        spec.constant = true;
        let access: Lens<T, Vec<E>> = Arc::new(access);
        self.push_wrapped(spec, typed(access))
    }

    /// Like [`wrapped_array`](Self::wrapped_array), but elements are kept
    /// as untyped `serde_json::Value` trees.
    pub fn wrapped_raw_array<F>(
        &mut self,
        field: &'static str,
        outer_key: &'static str,
        embedded_key: &'static str,
        access: F,
    ) -> &mut Self
    where
        F: Fn(&mut T) -> &mut Vec<Value> + Send + Sync + 'static,
    {
        let mut spec = spec(field, outer_key, embedded_key, Shape::Array);
        spec.raw = true;

        let access: Lens<T, Vec<Value>> = Arc::new(access);
        let (_, reset, extract) = typed(Arc::clone(&access));
        let assign = Arc::new(move |target: &mut T, value: Value| -> Result<(), serde_json::Error> {
            // No element-type-directed decode: an array is taken as-is.
            *access(target) = match value {
                Value::Array(items) => items,
                other => serde_json::from_value(other)?,
            };
            Ok(())
        });
        self.push_wrapped(spec, (assign, reset, extract))
    }

    // -- Inheritance -------------------------------------------------------

    /// Makes `B`'s members part of this type, reached through `project`.
    ///
    /// Rust has no inheritance, so a "derived" record embeds its base
    /// (usually with `#[serde(flatten)]`) and points the pipeline at it.
    /// Inherited members always come before this type's own members.
    pub fn inherit<B, F>(&mut self, project: F) -> &mut Self
    where
        B: Hooked,
        F: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        let lens: Lens<T, B> = Arc::new(project);
        self.ancestors.push(Ancestor {
            base: TypeDescriptor::of::<B>(),
            expand: Box::new(move || {
                let mut base = Declaration::<B>::new();
                B::declare(&mut base);
                base.lift(lens)
            }),
        });
        self
    }

    // -- Internals ---------------------------------------------------------

    fn push(&mut self, name: &'static str, thunk: Thunk<T>) -> &mut Self {
        self.members.push(Member::new(name, self.owner, thunk));
        self
    }

    fn push_wrapped(
        &mut self,
        spec: WrappedFieldSpec,
        (assign, reset, extract): Thunks<T>,
    ) -> &mut Self {
        let name = spec.field;
        let field = WrappedField::new(spec, assign, reset, extract);
        self.push(name, Thunk::Wrapped(field))
    }

    /// Re-targets this (base) declaration at a derived type `D`.
    fn lift<D: 'static>(self, lens: Lens<D, T>) -> Declaration<D> {
        let ancestors = self
            .ancestors
            .into_iter()
            .map(|ancestor| {
                let lens = Arc::clone(&lens);
                Ancestor {
                    base: ancestor.base,
                    expand: Box::new(move || ancestor.expand().lift(lens))
                        as Box<dyn FnOnce() -> Declaration<D>>,
                }
            })
            .collect();
        let members = self.members.into_iter().map(|m| m.lift(&lens)).collect();

        Declaration {
            owner: self.owner,
            ancestors,
            members,
        }
    }
}

type Thunks<T> = (
    crate::member::AssignFn<T>,
    crate::member::ResetFn<T>,
    crate::member::ExtractFn<T>,
);

fn spec(
    field: &'static str,
    outer_key: &'static str,
    embedded_key: &'static str,
    shape: Shape,
) -> WrappedFieldSpec {
    WrappedFieldSpec {
        field,
        outer_key,
        embedded_key,
        shape,
        constant: false,
        raw: false,
    }
}

/// Builds serde-directed thunks for a member of type `V`.
fn typed<T, V>(access: Lens<T, V>) -> Thunks<T>
where
    T: 'static,
    V: Serialize + DeserializeOwned + Default + 'static,
{
    let (a, r, e) = (Arc::clone(&access), Arc::clone(&access), access);
    (
        Arc::new(move |target: &mut T, value: Value| -> Result<(), serde_json::Error> {
            *a(target) = serde_json::from_value(value)?;
            Ok(())
        }),
        Arc::new(move |target: &mut T| *r(target) = V::default()),
        Arc::new(move |target: &mut T| serde_json::to_value(&*e(target))),
    )
}
