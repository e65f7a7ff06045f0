//! Markup normalization for embedded course HTML.
//!
//! Remote records carry their bodies as HTML fragments whose image
//! references point back at the content source. [`Normalizer`] rewrites
//! such a fragment so the downstream renderer can consume it: images are
//! fetched and re-pointed at local files, markup quirks the renderer
//! mishandles are smoothed out, and the mutated tree is serialized back
//! to text.

pub mod error;
mod normalize;

pub use crate::normalize::{NormalizePolicy, Normalizer};
