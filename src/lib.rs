//! Kinetic is a headless UI motion toolkit: reactive-style DOM element
//! state, a keyframe animation engine synchronized to the frame-render
//! cycle, a geometry/placement solver, and a read/write-phased frame
//! scheduler.
//!
//! The public API is stage-oriented:
//!
//! - Build a [`Stage`] over a [`host::Document`] the embedder populates
//! - Register work against the scheduler's read/write phases
//! - Create [`Anim`]s over elements and drive them through [`Stage::tick`]
//!
//! The crate never performs layout and never touches a real display; boxes
//! are inputs and the embedder's display-sync callback drives the clock.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod anim;
mod foundation;
/// Rectangle geometry and placement math.
pub mod geometry;
/// The headless document model the toolkit operates against.
pub mod host;
/// Frame scheduler with read/write phases.
pub mod reflow;
/// Placement solver built atop the geometry engine.
pub mod solver;
mod stage;
/// Style accessor and CSS value model.
pub mod style;

pub use crate::foundation::core::{Axes, Axis, Edge, Point, Size, Travel, Vec2};
pub use crate::foundation::error::{KineticError, KineticResult};

pub use crate::anim::{
    Anim, Ease, Effect, Fill, Keyframe, PlayState, PlaybackParams, Player, PlayerHandle, Timeline,
};
pub use crate::geometry::{
    Delta, DeltaAngle, Intersection, OffsetOrigin, Placement, PlacementKeyword, Proximity, Rect,
    Target, Union, delta, intersection, proximity, rect_of, union,
};
pub use crate::host::{Document, ElementData, ElementId, PointerRecord, Stylesheet};
pub use crate::reflow::{Promise, Reflow, Step};
pub use crate::solver::{
    AxisSpec, Coords, PlacementOptions, ScrollReport, coords_at_rect, offset_to, scroll_to,
    translate_to,
};
pub use crate::stage::Stage;
pub use crate::style::{CssValue, StyleMap, TransformRule};
