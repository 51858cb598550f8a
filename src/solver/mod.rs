//! Placement solver: converts placement directives into translate, offset,
//! or scroll targets that move one element relative to another.

use std::collections::BTreeMap;

use kurbo::Point;

use crate::foundation::core::{Axis, Edge};
use crate::foundation::error::KineticResult;
use crate::geometry::intersect::Intersection;
use crate::geometry::placement::{Placement, PlacementKeyword, eval_predicates, parse_placement};
use crate::geometry::rect::{OffsetOrigin, Rect, Target, positioning_offsets, rect_of, scroll_parent, scrolls};
use crate::host::document::ElementId;
use crate::stage::Stage;
use crate::style::accessor::css_read_one;
use crate::style::transform::TransformRule;
use crate::style::value::{CssValue, StyleMap};

/// Per-axis placement request.
#[derive(Clone, Debug, Default)]
pub enum AxisSpec {
    /// Leave this axis untouched.
    Skip,
    /// Center alignment (no directive given).
    #[default]
    Default,
    /// An explicit directive (`"end-20%"`, `"before"`, ...).
    Directive(Placement),
}

impl From<&str> for AxisSpec {
    fn from(expr: &str) -> Self {
        Self::Directive(parse_placement(expr))
    }
}

/// Options shared by the solver entry points.
#[derive(Clone, Debug, Default)]
pub struct PlacementOptions {
    /// Horizontal placement.
    pub x: AxisSpec,
    /// Vertical placement.
    pub y: AxisSpec,
    /// Alternate measurement anchor: intersect this element's rect with
    /// the reference instead of the moved element's own rect.
    pub using: Option<ElementId>,
    /// Flip which edge `before`/`after` anchor offsets to.
    pub alternate_anchors: bool,
    /// Explicit scroll container for [`scroll_to`]; defaults to the
    /// nearest scrollable ancestor.
    pub scroll_anchor: Option<ElementId>,
}

impl PlacementOptions {
    /// Directive-from-text convenience for both axes.
    pub fn axes(x: impl Into<AxisSpec>, y: impl Into<AxisSpec>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            ..Self::default()
        }
    }
}

/// Per-axis displacement output of [`coords_at_rect`].
#[derive(Clone, Debug)]
pub struct Coords {
    /// Signed horizontal displacement, when requested.
    pub x: Option<f64>,
    /// Signed vertical displacement, when requested.
    pub y: Option<f64>,
    /// The parsed alignment that produced each displacement.
    pub alignment: Alignment,
    /// The intersection the displacements derive from.
    pub intersection: Intersection,
}

impl Coords {
    /// Axis accessor.
    pub fn axis(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// Parsed per-axis alignment.
#[derive(Clone, Debug, Default)]
pub struct Alignment {
    /// Horizontal directive.
    pub x: Option<Placement>,
    /// Vertical directive.
    pub y: Option<Placement>,
}

/// Signed displacement that moves `target`, per each axis's placement
/// directive, to sit placed against `rect`, measured through the
/// intersection of the two (or of `options.using` with `rect`).
/// `before`/`after` push fully outside the reference bounds on that edge,
/// `start`/`end` align flush to it, the default aligns centers; directive
/// predicates are added after the base placement value.
#[tracing::instrument(skip_all)]
pub fn coords_at_rect(
    stage: &Stage,
    target: Target<'_>,
    rect: Rect,
    options: &PlacementOptions,
) -> KineticResult<Coords> {
    let doc = stage.document();
    let measured = match options.using {
        Some(using) => Target::Element(using),
        None => target,
    };
    let inter = crate::geometry::intersect::intersection(
        rect_of(doc, measured, OffsetOrigin::Page)?,
        rect,
    );

    let mut coords = Coords {
        x: None,
        y: None,
        alignment: Alignment::default(),
        intersection: inter,
    };
    for axis in [Axis::X, Axis::Y] {
        let spec = match axis {
            Axis::X => &options.x,
            Axis::Y => &options.y,
        };
        let placement = match spec {
            AxisSpec::Skip => continue,
            AxisSpec::Default => Placement::default(),
            AxisSpec::Directive(p) => p.clone(),
        };
        let rect1_len = inter.rect1.length(axis);
        let start = inter.edge(axis.start_edge());
        let end = inter.edge(axis.end_edge());
        let base = match placement.keyword {
            Some(PlacementKeyword::Before) => -(start + rect1_len),
            Some(PlacementKeyword::After) => end + rect1_len,
            Some(PlacementKeyword::Start) => -start,
            Some(PlacementKeyword::End) => end,
            Some(PlacementKeyword::Center) | None => match axis {
                Axis::X => inter.delta.x,
                Axis::Y => inter.delta.y,
            },
        };
        let value = base + eval_predicates(&placement.predicates, rect1_len);
        match axis {
            Axis::X => {
                coords.x = Some(value);
                coords.alignment.x = Some(placement);
            }
            Axis::Y => {
                coords.y = Some(value);
                coords.alignment.y = Some(placement);
            }
        }
    }
    Ok(coords)
}

/// From/to pair plus the in-flight decomposition against current state.
#[derive(Clone, Debug)]
pub struct Motion<T, P> {
    /// Start value for a fresh animation.
    pub from: T,
    /// Target value for a fresh animation.
    pub to: T,
    /// The same journey measured from the current state.
    pub current: Current<T, P>,
}

/// In-flight decomposition: where the element is, what remains, and how
/// far along each component already is.
#[derive(Clone, Debug)]
pub struct Current<T, P> {
    /// Current value.
    pub from: T,
    /// Remaining displacement.
    pub to: T,
    /// Per-component progress in `[0, 1]`.
    pub progress: P,
}

/// Translate report: transform values for building an animation.
pub type TranslateReport = Motion<TransformRule, BTreeMap<Axis, f64>>;

/// Offset report: CSS offset property maps (`auto` for untouched edges).
pub type OffsetReport = Motion<StyleMap, BTreeMap<Edge, f64>>;

/// Scroll positions of a scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollPosition {
    /// `scrollLeft` target.
    pub scroll_left: f64,
    /// `scrollTop` target.
    pub scroll_top: f64,
}

/// Scroll report plus the container it applies to (`None` = viewport).
#[derive(Clone, Debug)]
pub struct ScrollReport {
    /// The journey.
    pub motion: Motion<ScrollPosition, BTreeMap<Axis, f64>>,
    /// Scroll container; `None` means the viewport.
    pub container: Option<ElementId>,
}

fn component_progress(current: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    (current / total).abs()
}

/// Compute the transform-translate target that places `el` against
/// `reference`, folding in the element's active translate.
pub fn translate_to(
    stage: &Stage,
    el: ElementId,
    reference: Target<'_>,
    options: &PlacementOptions,
) -> KineticResult<TranslateReport> {
    let doc = stage.document();
    let reference_rect = rect_of(doc, reference, OffsetOrigin::Page)?;
    let coords = coords_at_rect(stage, Target::Element(el), reference_rect, options)?;

    let active = match css_read_one(stage, el, "transform")? {
        CssValue::Transform(rule) => rule,
        _ => TransformRule::identity(),
    };
    let at = active.translate_or_zero();

    let mut from = [0.0f64; 2];
    let mut to = [0.0f64; 2];
    let mut current_from = [0.0f64; 2];
    let mut current_to = [0.0f64; 2];
    let mut progress = BTreeMap::new();
    for (i, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        match coords.axis(axis) {
            Some(c) => {
                from[i] = 0.0;
                to[i] = c + at[i];
                current_from[i] = at[i];
                current_to[i] = c;
                progress.insert(axis, component_progress(at[i], c + at[i]));
            }
            None => {
                from[i] = at[i];
                to[i] = at[i];
                current_from[i] = at[i];
                current_to[i] = at[i];
                progress.insert(axis, 0.0);
            }
        }
    }
    let rule = |t: [f64; 2]| TransformRule {
        translate: Some(t),
        ..TransformRule::default()
    };
    Ok(Motion {
        from: rule(from),
        to: rule(to),
        current: Current {
            from: rule(current_from),
            to: rule(current_to),
            progress,
        },
    })
}

/// Compute the CSS offset targets (`left`/`top`/`right`/`bottom`) that
/// place `el` against `reference`, choosing the edge per the alignment
/// keyword (flipped by `alternate_anchors`) and folding in the element's
/// resolved positioning offsets.
pub fn offset_to(
    stage: &Stage,
    el: ElementId,
    reference: Target<'_>,
    options: &PlacementOptions,
) -> KineticResult<OffsetReport> {
    let doc = stage.document();
    let reference_rect = rect_of(doc, reference, OffsetOrigin::Page)?;
    let coords = coords_at_rect(stage, Target::Element(el), reference_rect, options)?;

    let mut targets: BTreeMap<Edge, f64> = BTreeMap::new();
    for axis in [Axis::X, Axis::Y] {
        let Some(value) = coords.axis(axis) else {
            continue;
        };
        let keyword = match axis {
            Axis::X => coords.alignment.x.as_ref(),
            Axis::Y => coords.alignment.y.as_ref(),
        }
        .and_then(|p| p.keyword);
        let start = axis.start_edge();
        let end = axis.end_edge();
        let (edge, signed) = match keyword {
            Some(PlacementKeyword::Before) => {
                if options.alternate_anchors {
                    (start, value)
                } else {
                    (end, -value)
                }
            }
            Some(PlacementKeyword::After) => {
                if options.alternate_anchors {
                    (end, -value)
                } else {
                    (start, value)
                }
            }
            Some(PlacementKeyword::End) => (end, -value),
            _ => (start, value),
        };
        targets.insert(edge, signed);
    }

    let anchors: Vec<Edge> = targets.keys().copied().collect();
    let current_offsets = positioning_offsets(stage, el, &anchors)?;

    let mut report = Motion {
        from: StyleMap::new(),
        to: StyleMap::new(),
        current: Current {
            from: StyleMap::new(),
            to: StyleMap::new(),
            progress: BTreeMap::new(),
        },
    };
    for edge in Edge::shorthand_order() {
        let name = edge.css_name().to_owned();
        match targets.get(&edge) {
            Some(&displacement) => {
                let at = current_offsets.get(&edge).copied().unwrap_or(0.0);
                report.from.insert(name.clone(), CssValue::Px(0.0));
                report
                    .to
                    .insert(name.clone(), CssValue::Px(displacement + at));
                report
                    .current
                    .from
                    .insert(name.clone(), CssValue::Px(at));
                report
                    .current
                    .to
                    .insert(name, CssValue::Px(displacement));
                report
                    .current
                    .progress
                    .insert(edge, component_progress(at, displacement + at));
            }
            None => {
                let auto = CssValue::Keyword("auto".into());
                report.from.insert(name.clone(), auto.clone());
                report.to.insert(name.clone(), auto.clone());
                report.current.from.insert(name.clone(), auto.clone());
                report.current.to.insert(name, auto);
            }
        }
    }
    Ok(report)
}

/// Compute the scroll position that brings `el` to the reference inside
/// its nearest scrollable ancestor (or `options.scroll_anchor`). Returns
/// `None` when that container cannot scroll.
pub fn scroll_to(
    stage: &Stage,
    el: ElementId,
    reference: Target<'_>,
    options: &PlacementOptions,
) -> KineticResult<Option<ScrollReport>> {
    let doc = stage.document();
    let container = match options.scroll_anchor {
        Some(anchor) => Some(anchor),
        None => scroll_parent(stage, el)?,
    };
    if !scrolls(doc, container)? {
        return Ok(None);
    }

    let reference_rect = rect_of(doc, reference, OffsetOrigin::Page)?;
    let coords = coords_at_rect(stage, Target::Element(el), reference_rect, options)?;

    let at: Point = match container {
        None => doc.page_scroll(),
        Some(c) => doc.with_element(c, |e| e.scroll)?,
    };
    let current = [at.x, at.y];

    let mut from = ScrollPosition::default();
    let mut to = ScrollPosition::default();
    let mut current_from = ScrollPosition::default();
    let mut current_to = ScrollPosition::default();
    let mut progress = BTreeMap::new();
    for (i, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        let set = |pos: &mut ScrollPosition, v: f64| match axis {
            Axis::X => pos.scroll_left = v,
            Axis::Y => pos.scroll_top = v,
        };
        match coords.axis(axis) {
            Some(c) => {
                set(&mut from, 0.0);
                set(&mut to, c + current[i]);
                set(&mut current_from, current[i]);
                set(&mut current_to, c);
                progress.insert(axis, component_progress(current[i], c + current[i]));
            }
            None => {
                set(&mut from, current[i]);
                set(&mut to, current[i]);
                set(&mut current_from, current[i]);
                set(&mut current_to, current[i]);
                progress.insert(axis, 0.0);
            }
        }
    }
    Ok(Some(ScrollReport {
        motion: Motion {
            from,
            to,
            current: Current {
                from: current_from,
                to: current_to,
                progress,
            },
        },
        container,
    }))
}
