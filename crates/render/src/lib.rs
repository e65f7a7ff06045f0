//! Document assembly for coursebook.
//!
//! Takes the caller's selected content items, builds a uniform fragment
//! story for each (glossary, wiki, or database), and drives the layout
//! engine to produce one paginated PDF with a running footer. Everything
//! here is synchronous and sequential by design: items are processed in
//! caller order, one at a time, with all network fetches for an item
//! finished before the next item starts.

pub mod error;

mod assemble;
mod flow;
mod fragment;
mod layout;
mod section;

pub use crate::assemble::{Assembler, ExportJob};
pub use crate::flow::fragments_from_html;
pub use crate::fragment::{Fragment, Span, SpanStyle};
pub use crate::section::SectionBuilder;
