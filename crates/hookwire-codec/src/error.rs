//! Error types for the codec layer.
//!
//! A `WireError` means the document on the wire (or the value being
//! encoded) is the problem, not the type's declaration. Every variant
//! names the type, and the wrapped-field variants also name the field and
//! outer key, so a failure in a large response can be traced to one
//! member.

/// Errors that can occur while converting between values and JSON trees.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The raw bytes are not a JSON document at all.
    #[error("response is not valid JSON: {source}")]
    Syntax { source: serde_json::Error },

    /// The base codec couldn't serialize the value.
    #[error("encode of {ty} failed: {source}")]
    Encode {
        ty: &'static str,
        source: serde_json::Error,
    },

    /// The base codec couldn't deserialize the tree.
    ///
    /// Common causes: missing required fields or wrong data types.
    #[error("decode of {ty} failed: {source}")]
    Decode {
        ty: &'static str,
        source: serde_json::Error,
    },

    /// The string under a wrapper's outer key is not valid JSON.
    #[error("{ty}.{field}: wrapped text under `{outer_key}` is not valid JSON: {source}")]
    MalformedEmbedded {
        ty: &'static str,
        field: &'static str,
        outer_key: &'static str,
        source: serde_json::Error,
    },

    /// A wrapper or the value inside it has the wrong JSON kind.
    #[error("{ty}.{field}: expected {expected} under `{outer_key}`, found {found}")]
    Shape {
        ty: &'static str,
        field: &'static str,
        outer_key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The embedded value has the right kind but doesn't fit the field.
    #[error("{ty}.{field}: `{outer_key}`/`{embedded_key}` doesn't match the field type: {source}")]
    Field {
        ty: &'static str,
        field: &'static str,
        outer_key: &'static str,
        embedded_key: &'static str,
        source: serde_json::Error,
    },

    /// The type declares wrapped fields but its wire form isn't an object.
    #[error("{ty} declares wrapped fields, but its JSON form is {found}, not an object")]
    NotAnObject {
        ty: &'static str,
        found: &'static str,
    },
}

/// Names the kind of a JSON value for error messages.
pub(crate) fn kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
