//! Settings for the wrapped-value codec.

use serde::{Deserialize, Serialize};

/// What to do with the wire value of a constant wrapped array.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConstantPolicy {
    /// Never look at the wire value; always assign the constant.
    #[default]
    Ignore,

    /// Still assign the constant, but parse a present wire value and log a
    /// warning when non-empty content is being thrown away.
    Warn,
}

/// Configuration for the wrapped-value codec.
///
/// Every field has a default, so a partial config (or none at all)
/// deserializes fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrappedConfig {
    /// Handling of constant wrapped arrays.
    pub constant_policy: ConstantPolicy,

    /// Treat an empty or whitespace-only wrapper string like a missing
    /// wrapper. When `false` it's reported as malformed JSON.
    pub blank_is_absent: bool,
}

impl Default for WrappedConfig {
    fn default() -> Self {
        Self {
            constant_policy: ConstantPolicy::Ignore,
            blank_is_absent: true,
        }
    }
}
