//! The wrapped-value codec.
//!
//! Some backend fields carry a whole JSON document as a string, with the
//! value we actually want stored under a key inside that document:
//!
//! ```text
//! { "meta_j": "{\"Inner\": {\"a\": 1}}" }
//!    └ outer key   └ embedded key
//! ```
//!
//! Decoding unwraps `meta_j` → parses the text → takes `Inner` → decodes
//! it into the field. Encoding does the mirror image.
//!
//! Missing wrappers are normal (the backend omits them freely) and leave
//! the field at its default. Broken wrappers are not: malformed text or
//! the wrong JSON kind fails the whole decode, attributed to the field and
//! outer key.

use serde_json::{Map, Value};

use hookwire_marker::{Shape, TypeDescriptor, WrappedField, WrappedFieldSpec};

use crate::error::kind;
use crate::{ConstantPolicy, WireError, WrappedConfig};

/// What a wrapper yielded for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// No wrapper, `null`, blank text, or no embedded key: keep the
    /// default.
    Absent,

    /// The field is a constant array; assign the constant.
    Constant,

    /// The embedded value, already checked against the field's shape.
    Present(Value),
}

/// Extracts the embedded value for `spec` from a wire object.
///
/// # Errors
/// - [`WireError::Shape`] when the outer value isn't a string, the
///   embedded document isn't an object, or an array field's embedded
///   value isn't an array.
/// - [`WireError::MalformedEmbedded`] when the string isn't valid JSON.
pub fn unwrap_field(
    ty: TypeDescriptor,
    spec: &WrappedFieldSpec,
    object: &Map<String, Value>,
    config: &WrappedConfig,
) -> Result<Unwrapped, WireError> {
    if spec.constant {
        if config.constant_policy == ConstantPolicy::Warn {
            warn_if_discarding(ty, spec, object);
        }
        return Ok(Unwrapped::Constant);
    }

    let shape_error = |expected, found| WireError::Shape {
        ty: ty.short_name(),
        field: spec.field,
        outer_key: spec.outer_key,
        expected,
        found,
    };

    let text = match object.get(spec.outer_key) {
        None | Some(Value::Null) => return Ok(Unwrapped::Absent),
        Some(Value::String(text)) => text,
        Some(other) => {
            return Err(shape_error("a string holding JSON", kind(other)));
        }
    };

    if config.blank_is_absent && text.trim().is_empty() {
        return Ok(Unwrapped::Absent);
    }

    let document: Value =
        serde_json::from_str(text).map_err(|source| {
            WireError::MalformedEmbedded {
                ty: ty.short_name(),
                field: spec.field,
                outer_key: spec.outer_key,
                source,
            }
        })?;

    let mut document = match document {
        Value::Object(map) => map,
        other => {
            return Err(shape_error("an embedded JSON object", kind(&other)));
        }
    };

    let value = match document.remove(spec.embedded_key) {
        None | Some(Value::Null) => return Ok(Unwrapped::Absent),
        Some(value) => value,
    };

    if spec.shape == Shape::Array && !value.is_array() {
        return Err(shape_error("an embedded array", kind(&value)));
    }

    Ok(Unwrapped::Present(value))
}

/// Wraps a serialized field value for the wire.
///
/// Returns `None` for `null` (the outer key is then left out entirely),
/// otherwise the JSON text of `{embedded_key: value}` as a string value.
///
/// # Errors
/// Returns [`WireError::Encode`] if the document can't be rendered.
pub fn wrap_field(
    ty: TypeDescriptor,
    spec: &WrappedFieldSpec,
    value: Value,
) -> Result<Option<Value>, WireError> {
    if value.is_null() {
        return Ok(None);
    }

    let mut document = Map::new();
    document.insert(spec.embedded_key.to_owned(), value);

    let text = serde_json::to_string(&Value::Object(document)).map_err(
        |source| WireError::Encode {
            ty: ty.short_name(),
            source,
        },
    )?;
    Ok(Some(Value::String(text)))
}

/// Decodes one wrapped field of `target` from its wire object.
///
/// # Errors
/// Everything [`unwrap_field`] reports, plus [`WireError::Field`] when the
/// embedded value doesn't fit the field's type.
pub fn decode_wrapped<T>(
    ty: TypeDescriptor,
    field: &WrappedField<T>,
    object: &Map<String, Value>,
    target: &mut T,
    config: &WrappedConfig,
) -> Result<(), WireError> {
    let spec = field.spec();
    match unwrap_field(ty, spec, object, config)? {
        Unwrapped::Absent => Ok(()),
        Unwrapped::Constant => {
            field.reset(target);
            Ok(())
        }
        Unwrapped::Present(value) => {
            field.assign(target, value).map_err(|source| WireError::Field {
                ty: ty.short_name(),
                field: spec.field,
                outer_key: spec.outer_key,
                embedded_key: spec.embedded_key,
                source,
            })
        }
    }
}

/// Encodes one wrapped field of `target` into its wire object.
///
/// # Errors
/// Returns [`WireError::Encode`] if the field can't be serialized.
pub fn encode_wrapped<T>(
    ty: TypeDescriptor,
    field: &WrappedField<T>,
    target: &mut T,
    object: &mut Map<String, Value>,
) -> Result<(), WireError> {
    let spec = field.spec();
    let value = field.extract(target).map_err(|source| WireError::Encode {
        ty: ty.short_name(),
        source,
    })?;

    if let Some(text) = wrap_field(ty, spec, value)? {
        object.insert(spec.outer_key.to_owned(), text);
    }
    Ok(())
}

/// Borrows the wire object of a type that declares wrapped fields.
///
/// # Errors
/// Returns [`WireError::NotAnObject`] for any other kind of JSON value.
pub fn wire_object(
    ty: TypeDescriptor,
    tree: &Value,
) -> Result<&Map<String, Value>, WireError> {
    tree.as_object().ok_or_else(|| not_an_object(ty, tree))
}

/// Mutable counterpart of [`wire_object`], used when encoding.
///
/// # Errors
/// Returns [`WireError::NotAnObject`] for any other kind of JSON value.
pub fn wire_object_mut(
    ty: TypeDescriptor,
    tree: &mut Value,
) -> Result<&mut Map<String, Value>, WireError> {
    let err = not_an_object(ty, tree);
    match tree {
        Value::Object(map) => Ok(map),
        _ => Err(err),
    }
}

fn not_an_object(ty: TypeDescriptor, tree: &Value) -> WireError {
    WireError::NotAnObject {
        ty: ty.short_name(),
        found: kind(tree),
    }
}

/// Wire content a constant array is about to drop.
#[derive(Debug, PartialEq)]
enum Discard {
    /// The embedded value held this many items.
    Items(usize),
    /// The wrapper text isn't JSON; the parser's message.
    Unparseable(String),
}

/// What a constant array would discard from `object`, if anything.
fn discarded_content(
    spec: &WrappedFieldSpec,
    object: &Map<String, Value>,
) -> Option<Discard> {
    let Some(Value::String(text)) = object.get(spec.outer_key) else {
        return None;
    };
    if text.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(document) => match document.get(spec.embedded_key) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Array(items)) => Some(Discard::Items(items.len())),
            Some(_) => Some(Discard::Items(1)),
        },
        Err(e) => Some(Discard::Unparseable(e.to_string())),
    }
}

/// Logs when a constant array is about to drop real content.
///
/// Best effort: anything unparseable is reported too, but never fails.
fn warn_if_discarding(
    ty: TypeDescriptor,
    spec: &WrappedFieldSpec,
    object: &Map<String, Value>,
) {
    match discarded_content(spec, object) {
        Some(Discard::Items(discarded)) => {
            tracing::warn!(
                %ty,
                field = spec.field,
                outer_key = spec.outer_key,
                discarded,
                "constant wrapped array ignored non-empty wire content"
            );
        }
        Some(Discard::Unparseable(error)) => {
            tracing::warn!(
                %ty,
                field = spec.field,
                outer_key = spec.outer_key,
                %error,
                "constant wrapped array ignored unparseable wire content"
            );
        }
        None => {}
    }
}
