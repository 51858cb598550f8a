//! Pure rectangle geometry: rect derivation over tagged targets,
//! intersection/union/delta/proximity math, and placement-directive
//! parsing. No state; reads only already-computed layout.

/// Intersection, union, delta, and proximity math.
pub mod intersect;
/// Placement-directive parsing and evaluation.
pub mod placement;
/// Rectangle derivation and geometry primitives.
pub mod rect;

pub use intersect::{
    AxisProximity, Delta, DeltaAngle, Intersection, Proximity, Union, delta, delta_angle,
    intersection, proximity, union,
};
pub use placement::{
    Placement, PlacementKeyword, Predicate, eval_predicates, parse_placement,
    parse_placement_strict,
};
pub use rect::{
    EdgeOffsets, OffsetOrigin, Rect, Target, offsets_of, positioning_offsets, rect_at_offsets,
    rect_of, scroll_parent, scrolls, size_of, z_height,
};
