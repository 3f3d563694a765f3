//! # Hookwire
//!
//! Decode/encode lifecycle hooks and wrapped JSON fields for serde types.
//!
//! Backend responses are plain JSON records, but some of them need a
//! little help on the way in or out:
//!
//! - a derived field computed after decode (`PostDecode`),
//! - wire state prepared before encode (`PreEncode`),
//! - a live session handle attached after decode (`ContextInject`),
//! - a field whose wire value is a JSON document stored as a string, with
//!   the real value under a key inside it (wrapped fields).
//!
//! A type registers those once by implementing [`Hooked`](prelude::Hooked),
//! and a [`Pipeline`] runs them around the base codec. `Hooked` values
//! nested inside other records opt in per field through [`nested`] or
//! [`Wired`].
//!
//! ## Quick Start
//!
//! ```rust
//! use hookwire::prelude::*;
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Inner {
//!     a: i64,
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Summary {
//!     kills: u32,
//!     #[serde(skip)]
//!     meta: Option<Inner>,
//! }
//!
//! impl Hooked for Summary {
//!     fn declare(decl: &mut Declaration<Self>) {
//!         decl.wrapped_object("meta", "meta_j", "Inner", |s: &mut Self| &mut s.meta);
//!     }
//! }
//!
//! let pipeline = Pipeline::new();
//! let wire = json!({"kills": 3, "meta_j": "{\"Inner\":{\"a\":1}}"});
//!
//! let summary: Summary = pipeline.decode(&wire).unwrap();
//! assert_eq!(summary.meta, Some(Inner { a: 1 }));
//! ```

mod error;
pub mod nested;
mod pipeline;

pub use error::HookwireError;
pub use nested::Wired;
pub use pipeline::{Pipeline, PipelineBuilder};

/// Re-exports of the sub-crates, for callers that need more than the
/// prelude.
pub use hookwire_codec as codec;
pub use hookwire_inspect as inspect;
pub use hookwire_marker as marker;

/// Everything a record author or SDK call site usually needs.
pub mod prelude {
    pub use crate::{HookwireError, Pipeline, PipelineBuilder, Wired};
    pub use hookwire_codec::{
        Codec, ConstantPolicy, JsonCodec, WireError, WrappedConfig,
    };
    pub use hookwire_inspect::{InspectionCache, Profile};
    pub use hookwire_marker::{
        Declaration, DeclarationError, HookError, HookResult, Hooked, Role,
    };
}
