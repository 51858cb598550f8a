//! Style accessor: computed/inline reads, normalized writes, transactional
//! mutation, stylesheet introspection, and the CSS value model.

/// Computed/inline style reads and transactional writes.
pub mod accessor;
/// Stylesheet caching and keyframe resolution.
pub mod sheets;
/// CSS transform rule parsing and representation.
pub mod transform;
/// The CSS value model and property normalization.
pub mod value;

pub use accessor::{
    StyleTransaction, Vendorize, css_compute, css_measure_async, css_read, css_read_async,
    css_read_inline, css_read_inline_all, css_read_one, css_read_pseudo, css_transaction,
    css_write, css_write_async, css_write_one, css_write_with, vendorize,
};
pub use sheets::{
    NamedKeyframes, SheetCache, css_read_keyframes, css_read_stylesheet, css_var_read,
    resolve_easing,
};
pub use transform::TransformRule;
pub use value::{AUTO_PX, CssValue, SideValues, StyleMap, autopx, destructure_shorthand, is_auto_px, normalize_prop};
