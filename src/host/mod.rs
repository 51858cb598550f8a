//! Headless host model: the document/element seam the toolkit operates
//! against. Boxes and stylesheets are inputs supplied by the embedder; this
//! crate never performs layout.

/// The document and element model.
pub mod document;
/// Selector matching against elements.
pub mod selector;
/// Stylesheet and rule model.
pub mod stylesheet;

pub use document::{Document, ElementData, ElementId, PointerRecord, VendorPrefix};
pub use selector::Selector;
pub use stylesheet::{KeyText, KeyframeStop, KeyframesRule, SheetRule, StyleRule, Stylesheet};
