//! `Pipeline` builder and the decode/encode lifecycle.
//!
//! This is the entry point the rest of an SDK calls. It ties the layers
//! together: inspection cache → base codec → wrapped fields → hooks.
//!
//! # Decode, step by step
//!
//! ```text
//! profile (cached)  ──passthrough?──▶ base decode, done
//!     │
//!     ▼
//! base decode → wrapped objects → wrapped arrays → PostDecode → ContextInject
//! ```
//!
//! Wrapped fields are `#[serde(skip)]` members. Right after the base
//! decode they're filled from the same already-parsed tree by a direct
//! outer-key lookup, so the object is never walked a second time.
//!
//! # Encode
//!
//! ```text
//! PreEncode (may mutate) → base encode → wrapped fields rewrapped
//! ```
//!
//! # Nested values
//!
//! For the length of each call the pipeline is registered on the current
//! thread, so `Hooked` values nested below the outermost one (fields
//! declared with `hookwire::nested`, or typed [`Wired`](crate::Wired))
//! run through the same cache and settings. See [`crate::nested`].
//!
//! Any failure ends the call. The instance is dropped, hooks that already
//! ran are not undone, and the inspection cache is left as it was.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use hookwire_codec::{
    decode_wrapped, encode_wrapped, wire_object, wire_object_mut, Codec,
    JsonCodec, WrappedConfig,
};
use hookwire_inspect::{InspectionCache, Profile};
use hookwire_marker::{Hooked, InjectError, Member, Role, TypeDescriptor};

use crate::nested::Scope;
use crate::HookwireError;

/// Wrapped object fields are applied before wrapped array fields.
const WRAPPED_ROLES: [Role; 2] = [Role::WrappedObjectField, Role::WrappedArrayField];

/// How one decode call treats context-inject members.
#[derive(Clone, Copy)]
enum Context<'a> {
    /// Plain `decode`: context-inject members are left untouched.
    Skip,

    /// A context-aware entry point. `None` is a usage error when the type
    /// has context-inject members.
    Supplied(Option<&'a dyn Any>),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Pipeline`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use hookwire::prelude::*;
///
/// let pipeline = Pipeline::builder()
///     .cache(Arc::new(InspectionCache::new()))
///     .wrapped_config(WrappedConfig {
///         constant_policy: ConstantPolicy::Warn,
///         ..WrappedConfig::default()
///     })
///     .build();
/// assert_eq!(pipeline.wrapped_config().constant_policy, ConstantPolicy::Warn);
/// ```
pub struct PipelineBuilder<C: Codec = JsonCodec> {
    codec: C,
    cache: Option<Arc<InspectionCache>>,
    config: WrappedConfig,
}

impl PipelineBuilder {
    /// Creates a builder with the JSON codec, the shared cache, and the
    /// default wrapped-field settings.
    pub fn new() -> Self {
        Self {
            codec: JsonCodec,
            cache: None,
            config: WrappedConfig::default(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> PipelineBuilder<C> {
    /// Uses `cache` instead of the process-wide one.
    pub fn cache(mut self, cache: Arc<InspectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Swaps the base codec.
    pub fn codec<D: Codec>(self, codec: D) -> PipelineBuilder<D> {
        PipelineBuilder {
            codec,
            cache: self.cache,
            config: self.config,
        }
    }

    /// Sets the wrapped-field configuration.
    pub fn wrapped_config(mut self, config: WrappedConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Pipeline<C> {
        Pipeline {
            codec: self.codec,
            cache: self.cache.unwrap_or_else(InspectionCache::shared),
            config: self.config,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Decodes and encodes [`Hooked`] types, running their hooks and wrapped
/// fields around a base [`Codec`].
///
/// `Pipeline` is `Send + Sync` and cheap to clone: clones share the same
/// inspection cache.
///
/// Types that don't implement `Hooked` don't go through here at all; use
/// the base codec ([`codec`](Self::codec)) for them directly.
#[derive(Clone)]
pub struct Pipeline<C: Codec = JsonCodec> {
    codec: C,
    cache: Arc<InspectionCache>,
    config: WrappedConfig,
}

impl Pipeline {
    /// A pipeline with the JSON codec, the process-wide cache, and default
    /// settings.
    pub fn new() -> Self {
        PipelineBuilder::new().build()
    }

    /// Creates a new builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> Pipeline<C> {
    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn cache(&self) -> &Arc<InspectionCache> {
        &self.cache
    }

    pub fn wrapped_config(&self) -> &WrappedConfig {
        &self.config
    }

    // -- Decode ------------------------------------------------------------

    /// Decodes `T` without a context value.
    ///
    /// Context-inject members are left untouched: they never see a
    /// substituted default. Use [`decode_with_context`] when the type
    /// needs one.
    ///
    /// [`decode_with_context`]: Self::decode_with_context
    ///
    /// # Errors
    /// - [`HookwireError::Declaration`] if `T`'s declaration is invalid.
    /// - [`HookwireError::Wire`] if the tree doesn't decode as `T` or a
    ///   wrapped field is malformed.
    /// - [`HookwireError::Hook`] if a post-decode hook fails.
    pub fn decode<T>(&self, tree: &Value) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
    {
        self.run_decode(tree, Context::Skip)
    }

    /// Decodes `T`, then hands `context` to every context-inject member.
    ///
    /// # Errors
    /// Everything [`decode`](Self::decode) reports, plus
    /// [`HookwireError::ContextMismatch`] when a member was declared for a
    /// different context type, and [`HookwireError::Hook`] when one fails.
    pub fn decode_with_context<T, X>(
        &self,
        tree: &Value,
        context: &X,
    ) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
        X: Any,
    {
        let context: &dyn Any = context;
        self.run_decode(tree, Context::Supplied(Some(context)))
    }

    /// Like [`decode_with_context`](Self::decode_with_context), for callers
    /// that may or may not hold a context.
    ///
    /// # Errors
    /// With `None`, returns [`HookwireError::MissingContext`] before
    /// decoding anything if `T` has context-inject members.
    pub fn decode_with_optional_context<T>(
        &self,
        tree: &Value,
        context: Option<&dyn Any>,
    ) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
    {
        self.run_decode(tree, Context::Supplied(context))
    }

    /// Parses `data` and decodes `T` from it.
    ///
    /// # Errors
    /// [`WireError::Syntax`](hookwire_codec::WireError::Syntax) for bytes
    /// that aren't JSON, otherwise as [`decode`](Self::decode).
    pub fn decode_slice<T>(&self, data: &[u8]) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
    {
        let tree = self.codec.parse(data)?;
        self.decode(&tree)
    }

    /// Parses `data` and decodes `T` from it with `context`.
    ///
    /// # Errors
    /// As [`decode_slice`](Self::decode_slice) and
    /// [`decode_with_context`](Self::decode_with_context).
    pub fn decode_slice_with_context<T, X>(
        &self,
        data: &[u8],
        context: &X,
    ) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
        X: Any,
    {
        let tree = self.codec.parse(data)?;
        self.decode_with_context(&tree, context)
    }

    // -- Encode ------------------------------------------------------------

    /// Runs pre-encode hooks on `value`, encodes it, and rewraps its
    /// wrapped fields.
    ///
    /// Takes `&mut T` because pre-encode hooks may prepare wire state on
    /// the instance.
    ///
    /// # Errors
    /// - [`HookwireError::Hook`] if a pre-encode hook fails.
    /// - [`HookwireError::Wire`] if the value can't be serialized, or
    ///   declares wrapped fields but doesn't serialize as an object.
    pub fn encode<T>(&self, value: &mut T) -> Result<Value, HookwireError>
    where
        T: Hooked + Serialize,
    {
        let ty = TypeDescriptor::of::<T>();
        let profile = self.cache.profile::<T>()?;
        let _scope = self.enter_scope();
        if profile.is_passthrough() {
            return Ok(self.codec.encode(&*value)?);
        }

        self.run_hooks(Role::PreEncode, value)?;

        let mut tree = self.codec.encode(&*value)?;
        if profile.has_wrapped_fields() {
            let object = wire_object_mut(ty, &mut tree)?;
            for role in WRAPPED_ROLES {
                for member in self.cache.members_for::<T>(role)?.iter() {
                    if let Some(field) = member.wrapped() {
                        encode_wrapped(ty, field, value, object)?;
                    }
                }
            }
        }

        tracing::trace!(%ty, "encoded");
        Ok(tree)
    }

    /// Encodes `value` and renders it as bytes.
    ///
    /// # Errors
    /// As [`encode`](Self::encode).
    pub fn encode_to_vec<T>(&self, value: &mut T) -> Result<Vec<u8>, HookwireError>
    where
        T: Hooked + Serialize,
    {
        let tree = self.encode(value)?;
        Ok(self.codec.render(&tree)?)
    }

    // -- Internals ---------------------------------------------------------

    fn run_decode<T>(
        &self,
        tree: &Value,
        context: Context<'_>,
    ) -> Result<T, HookwireError>
    where
        T: Hooked + DeserializeOwned,
    {
        let ty = TypeDescriptor::of::<T>();
        let profile = self.cache.profile::<T>()?;

        if let Context::Supplied(None) = context {
            self.require_no_context_members::<T>(&profile)?;
        }

        let _scope = self.enter_scope();
        let mut value: T = self.codec.decode(tree)?;
        if profile.is_passthrough() {
            return Ok(value);
        }

        if profile.has_wrapped_fields() {
            let object = wire_object(ty, tree)?;
            for role in WRAPPED_ROLES {
                for member in self.cache.members_for::<T>(role)?.iter() {
                    if let Some(field) = member.wrapped() {
                        decode_wrapped(ty, field, object, &mut value, &self.config)?;
                    }
                }
            }
        }

        self.run_hooks(Role::PostDecode, &mut value)?;

        match context {
            Context::Supplied(Some(context)) if profile.context_inject > 0 => {
                self.inject(&mut value, context)?;
            }
            Context::Skip if profile.context_inject > 0 => {
                tracing::trace!(
                    %ty,
                    members = profile.context_inject,
                    "decoded without context, context-inject members untouched"
                );
            }
            _ => {}
        }

        tracing::trace!(%ty, "decoded");
        Ok(value)
    }

    /// Registers this pipeline for nested values. They arrive as trees the
    /// outer codec already parsed, so the registered copy uses JSON.
    fn enter_scope(&self) -> Scope {
        Scope::enter(Pipeline {
            codec: JsonCodec,
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        })
    }

    fn run_hooks<T: Hooked>(
        &self,
        role: Role,
        value: &mut T,
    ) -> Result<(), HookwireError> {
        for member in self.cache.members_for::<T>(role)?.iter() {
            member
                .invoke(value)
                .map_err(|source| hook_failed(member, role, source))?;
        }
        Ok(())
    }

    fn inject<T: Hooked>(
        &self,
        value: &mut T,
        context: &dyn Any,
    ) -> Result<(), HookwireError> {
        for member in self.cache.members_for::<T>(Role::ContextInject)?.iter() {
            member.inject(value, context).map_err(|e| match e {
                InjectError::Hook(source) => {
                    hook_failed(member, Role::ContextInject, source)
                }
                InjectError::ContextMismatch { expected } => {
                    HookwireError::ContextMismatch {
                        ty: member.declared_by().short_name(),
                        member: member.name(),
                        expected,
                    }
                }
            })?;
        }
        Ok(())
    }

    fn require_no_context_members<T: Hooked>(
        &self,
        profile: &Profile,
    ) -> Result<(), HookwireError> {
        if profile.context_inject == 0 {
            return Ok(());
        }
        let members = self.cache.members_for::<T>(Role::ContextInject)?;
        match members.first() {
            Some(first) => Err(HookwireError::MissingContext {
                ty: first.declared_by().short_name(),
                member: first.name(),
            }),
            None => Ok(()),
        }
    }
}

impl<C: Codec + fmt::Debug> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("codec", &self.codec)
            .field("cached_entries", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Attributes a hook failure to the type that declared the hook.
fn hook_failed<T>(
    member: &Member<T>,
    role: Role,
    source: hookwire_marker::HookError,
) -> HookwireError {
    let ty = member.declared_by();
    tracing::debug!(%ty, %role, member = member.name(), error = %source, "hook failed");
    HookwireError::Hook {
        ty: ty.short_name(),
        member: member.name(),
        role,
        source,
    }
}
