//! Inspection cache for hookwire.
//!
//! Given a concrete [`Hooked`](hookwire_marker::Hooked) type, the cache
//! walks its declaration (and its bases'), validates it, and memoizes the
//! ordered member list for each [`Role`](hookwire_marker::Role). Every
//! `(type, role)` pair is walked at most once per cache; later lookups are
//! a map read and an `Arc` clone.
//!
//! # Ordering
//!
//! Inherited members come first, base-to-derived. Several bases follow
//! the order of their `inherit` calls. Within one type, members keep
//! declaration order.

mod cache;
mod walk;

pub use cache::{InspectionCache, MemberList, Profile};
