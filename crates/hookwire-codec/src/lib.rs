//! Codecs for hookwire.
//!
//! This crate holds what the lifecycle adapter needs to touch the wire:
//!
//! - **Base codec** ([`Codec`] trait, [`JsonCodec`]): plain serde
//!   conversion between Rust values and `serde_json::Value` trees.
//! - **Wrapped-value codec** ([`decode_wrapped`], [`encode_wrapped`]):
//!   fields whose wire value is a JSON document embedded as a string,
//!   with the real value under a key inside that document.
//! - **Errors** ([`WireError`]): what can go wrong with a wire document.
//!
//! ```text
//! {"meta_j": "{\"Inner\":{\"a\":1}}"}   ──decode──▶   meta = Meta { a: 1 }
//!   outer key   embedded key                           field
//! ```

mod codec;
mod config;
mod error;
mod wrapped;

pub use codec::{Codec, JsonCodec};
pub use config::{ConstantPolicy, WrappedConfig};
pub use error::WireError;
pub use wrapped::{
    decode_wrapped, encode_wrapped, unwrap_field, wire_object, wire_object_mut,
    wrap_field, Unwrapped,
};
