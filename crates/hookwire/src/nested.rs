//! Lifecycle dispatch for `Hooked` values nested inside other values.
//!
//! A [`Pipeline`] only sees the outermost type. Anything below it is
//! decoded by serde, which knows nothing about hooks or wrapped fields. A
//! field opts its value back into the lifecycle in one of two ways:
//!
//! - `#[serde(with = "hookwire::nested")]` on a `T: Hooked` field, or
//!   `hookwire::nested::vec` / `hookwire::nested::option` on `Vec<T>` and
//!   `Option<T>` fields. The field keeps its plain type.
//! - [`Wired<T>`] as the field type. This is also how a wrapped field's
//!   target gets hooks of its own: declare the member as
//!   `Option<Wired<V>>` or `Vec<Wired<E>>`.
//!
//! Nested values run through the pipeline whose call is in progress on
//! the current thread (same cache, same wrapped-field settings), or
//! through the process-wide cache with default settings when serde is
//! driven directly. They are decoded without a context: a parent that
//! needs to hand its context down does so from its own context-inject
//! hook.
//!
//! Encoding a nested value works on a clone, since pre-encode hooks take
//! `&mut T` and serde only lends `&T`.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use serde::de::{self, DeserializeOwned};
use serde::ser;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use hookwire_marker::Hooked;

use crate::{HookwireError, Pipeline};

std::thread_local! {
    /// Pipelines with a call in progress on this thread, innermost last.
    static ACTIVE: RefCell<Vec<Pipeline>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a pipeline on this thread's stack for the length of one call.
pub(crate) struct Scope {
    // Thread-local stack entry: must be dropped on the thread that pushed it.
    _not_send: PhantomData<*const ()>,
}

impl Scope {
    pub(crate) fn enter(pipeline: Pipeline) -> Self {
        ACTIVE.with_borrow_mut(|stack| stack.push(pipeline));
        Self { _not_send: PhantomData }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        ACTIVE.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

/// The innermost pipeline with a call in progress, or the default one.
fn active() -> Pipeline {
    ACTIVE
        .with_borrow(|stack| stack.last().cloned())
        .unwrap_or_default()
}

/// Runs the decode lifecycle for a nested `T`.
pub fn decode_nested<T>(tree: &Value) -> Result<T, HookwireError>
where
    T: Hooked + DeserializeOwned,
{
    active().decode(tree)
}

/// Runs the encode lifecycle for a nested `T` on a clone of `value`.
pub fn encode_nested<T>(value: &T) -> Result<Value, HookwireError>
where
    T: Hooked + Serialize + Clone,
{
    active().encode(&mut value.clone())
}

// ---------------------------------------------------------------------------
// serde `with` adapters
// ---------------------------------------------------------------------------

/// `#[serde(with = "hookwire::nested")]` for a `T: Hooked` field.
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Hooked + DeserializeOwned,
{
    let tree = Value::deserialize(deserializer)?;
    decode_nested(&tree).map_err(de::Error::custom)
}

/// `#[serde(with = "hookwire::nested")]` for a `T: Hooked` field.
pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Hooked + Serialize + Clone,
{
    encode_nested(value)
        .map_err(ser::Error::custom)?
        .serialize(serializer)
}

/// `#[serde(with = "hookwire::nested::vec")]` for a `Vec<T>` field.
pub mod vec {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Hooked + DeserializeOwned,
    {
        let items = Vec::<Wired<T>>::deserialize(deserializer)?;
        Ok(items.into_iter().map(Wired::into_inner).collect())
    }

    pub fn serialize<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Hooked + Serialize + Clone,
    {
        let trees = values
            .iter()
            .map(encode_nested)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ser::Error::custom)?;
        trees.serialize(serializer)
    }
}

/// `#[serde(default, with = "hookwire::nested::option")]` for an
/// `Option<T>` field. `null` decodes as `None` without running anything.
pub mod option {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Hooked + DeserializeOwned,
    {
        let item = Option::<Wired<T>>::deserialize(deserializer)?;
        Ok(item.map(Wired::into_inner))
    }

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Hooked + Serialize + Clone,
    {
        match value {
            Some(inner) => super::serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wired
// ---------------------------------------------------------------------------

/// A `Hooked` value whose serde impls run the full lifecycle.
///
/// # Example
///
/// ```rust
/// use hookwire::prelude::*;
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Ban {
///     champion_id: u32,
///     #[serde(skip)]
///     label: String,
/// }
///
/// impl Hooked for Ban {
///     fn declare(decl: &mut Declaration<Self>) {
///         decl.post_decode("label", |b: &mut Ban| {
///             b.label = format!("champion #{}", b.champion_id);
///             Ok(())
///         });
///     }
/// }
///
/// let bans: Vec<Wired<Ban>> = serde_json::from_value(json!([{"champion_id": 157}])).unwrap();
/// assert_eq!(bans[0].label, "champion #157");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wired<T>(pub T);

impl<T> Wired<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Wired<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Wired<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Wired<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for Wired<T>
where
    T: Hooked + DeserializeOwned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(Wired)
    }
}

impl<T> Serialize for Wired<T>
where
    T: Hooked + Serialize + Clone,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}
