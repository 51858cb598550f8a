use crate::foundation::core::{Axes, Axis, Edge, Travel};
use crate::geometry::rect::Rect;

/// The overlap (possibly empty) between two rects, plus signed edge gaps.
///
/// Gap sign convention: positive means `rect1` sits inside that edge of
/// `rect2`'s frame, negative means it has crossed out. Consumers key
/// animation state off these fields; names and signs are part of the
/// public contract.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Intersection {
    /// `rect1.left - rect2.left`.
    pub left: f64,
    /// `rect1.top - rect2.top`.
    pub top: f64,
    /// `rect2.right - rect1.right`.
    pub right: f64,
    /// `rect2.bottom - rect1.bottom`.
    pub bottom: f64,
    /// Overlap width, clamped to `>= 0`.
    pub width: f64,
    /// Overlap height, clamped to `>= 0`.
    pub height: f64,
    /// First input.
    pub rect1: Rect,
    /// Second input.
    pub rect2: Rect,
    /// Center-to-center vector.
    pub delta: Delta,
}

impl Intersection {
    /// Signed gap at `edge`.
    pub fn edge(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Left => self.left,
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
        }
    }
}

/// Compute the intersection of two rects.
pub fn intersection(rect1: Rect, rect2: Rect) -> Intersection {
    let leftline = rect1.left.max(rect2.left);
    let rightline = rect1.right().min(rect2.right());
    let topline = rect1.top.max(rect2.top);
    let bottomline = rect1.bottom().min(rect2.bottom());
    Intersection {
        left: rect1.left - rect2.left,
        top: rect1.top - rect2.top,
        right: rect2.right() - rect1.right(),
        bottom: rect2.bottom() - rect1.bottom(),
        width: if rightline > leftline {
            rightline - leftline
        } else {
            0.0
        },
        height: if bottomline > topline {
            bottomline - topline
        } else {
            0.0
        },
        rect1,
        rect2,
        delta: delta(rect1, rect2, false),
    }
}

/// The bounding rect covering both inputs, with the same companion fields
/// as [`Intersection`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Union {
    /// Minimum left edge.
    pub left: f64,
    /// Minimum top edge.
    pub top: f64,
    /// Maximum right edge.
    pub right: f64,
    /// Maximum bottom edge.
    pub bottom: f64,
    /// Covering width.
    pub width: f64,
    /// Covering height.
    pub height: f64,
    /// First input.
    pub rect1: Rect,
    /// Second input.
    pub rect2: Rect,
    /// Center-to-center vector.
    pub delta: Delta,
}

impl Union {
    /// The covering rect.
    pub fn rect(&self) -> Rect {
        Rect {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }
}

/// Compute the union of two rects.
pub fn union(rect1: Rect, rect2: Rect) -> Union {
    let left = rect1.left.min(rect2.left);
    let top = rect1.top.min(rect2.top);
    let right = rect1.right().max(rect2.right());
    let bottom = rect1.bottom().max(rect2.bottom());
    Union {
        left,
        top,
        right,
        bottom,
        width: right - left,
        height: bottom - top,
        rect1,
        rect2,
        delta: delta(rect1, rect2, false),
    }
}

/// Vector between the centers of two rects. Positive components mean the
/// target (`rect2`) is ahead of `rect1`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Delta {
    /// Horizontal center distance.
    pub x: f64,
    /// Vertical center distance.
    pub y: f64,
    /// Euclidean center distance.
    pub z: f64,
    /// Angle decomposition, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<DeltaAngle>,
}

/// Angle decomposition of a [`Delta`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeltaAngle {
    /// Angle of elevation, in degrees.
    pub angle: f64,
    /// Angle of depression (complement), in degrees.
    pub angle2: f64,
    /// Whether the vector is closer to horizontal than 45°.
    pub is_horizontal: bool,
    /// Whether the vector is closer to vertical than 45°.
    pub is_vertical: bool,
}

/// Compute the center-to-center delta, optionally with its angle
/// decomposition.
pub fn delta(rect1: Rect, rect2: Rect, with_angle: bool) -> Delta {
    let c1 = rect1.center();
    let c2 = rect2.center();
    let x = c2.x - c1.x;
    let y = c2.y - c1.y;
    let z = x.hypot(y);
    let mut d = Delta {
        x,
        y,
        z,
        angle: None,
    };
    if with_angle {
        d.angle = Some(delta_angle(&d));
    }
    d
}

/// Angle decomposition of an existing delta. The elevation falls back from
/// `atan(y/x)` through `acos(x/z)` to `asin(y/z)` as components degenerate,
/// so a zero-length delta classifies as horizontal.
pub fn delta_angle(d: &Delta) -> DeltaAngle {
    let by_tangent = d.y / d.x;
    let elevation_rad = if by_tangent.is_finite() {
        by_tangent.atan()
    } else if (d.x / d.z).is_finite() {
        (d.x / d.z).acos()
    } else if (d.y / d.z).is_finite() {
        (d.y / d.z).asin()
    } else {
        0.0
    };
    let elevation = elevation_rad.to_degrees();
    let depression = 180.0 - 90.0 - elevation;
    DeltaAngle {
        angle: elevation,
        angle2: depression,
        is_horizontal: elevation.abs() < 45.0,
        is_vertical: depression.abs() < 45.0,
    }
}

/// Per-axis proximity percentages between two rects.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AxisProximity {
    /// Travel direction inferred from the previous sample.
    pub moving: Travel,
    /// Entering percentage, direction-normalized.
    pub percentage_in: f64,
    /// Exiting percentage, direction-normalized.
    pub percentage_out: f64,
    /// Passing-through percentage, direction-normalized.
    pub percentage_pass: f64,
    /// Containment percentage; negative when `rect1` is the larger rect.
    pub percentage_contained: f64,
}

/// Proximity classification between two rects, the engine behind
/// intersection-driven animation triggers (scroll-linked effects).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Proximity {
    /// Intersection snapshot the percentages derive from.
    pub intersection: Intersection,
    /// Horizontal percentages, when requested.
    pub x: Option<AxisProximity>,
    /// Vertical percentages, when requested.
    pub y: Option<AxisProximity>,
}

impl Proximity {
    /// Axis accessor.
    pub fn axis(&self, axis: Axis) -> Option<&AxisProximity> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
        }
    }
}

/// Compute percentage proximity between two rects on the requested axes.
///
/// The travel direction is classified by comparing the current and
/// previous intersection's leading edge; with no previous sample the
/// direction defaults to positive, which flips the sense of the
/// percentages on a first call; callers are expected to thread the prior
/// result back in.
pub fn proximity(
    rect1: Rect,
    rect2: Rect,
    axes: Axes,
    previous: Option<&Proximity>,
) -> Proximity {
    let inter = intersection(rect1, rect2);
    let mut out = Proximity {
        intersection: inter,
        x: None,
        y: None,
    };
    for axis in axes.iter() {
        let data = axis_proximity(&inter, rect1, rect2, axis, previous);
        match axis {
            Axis::X => out.x = Some(data),
            Axis::Y => out.y = Some(data),
        }
    }
    out
}

fn axis_proximity(
    inter: &Intersection,
    rect1: Rect,
    rect2: Rect,
    axis: Axis,
    previous: Option<&Proximity>,
) -> AxisProximity {
    let start = axis.start_edge();
    let end = axis.end_edge();
    let before = inter.edge(start);
    let after = inter.edge(end);
    let rect1_len = rect1.length(axis);
    let rect2_len = rect2.length(axis);

    let moving = match previous {
        Some(prev) => {
            let prev_before = prev.intersection.edge(start);
            if prev_before > before {
                Travel::Negative
            } else if prev_before < before {
                Travel::Positive
            } else {
                prev.axis(axis).map(|a| a.moving).unwrap_or(Travel::Positive)
            }
        }
        None => Travel::Positive,
    };

    // Cross-in: leading edge has reached the far line, trailing edge has
    // not yet left it.
    let percentage_in = if before <= rect2_len && after <= 0.0 {
        (rect1_len - after.abs()) / rect1_len
    } else if after > 0.0 {
        1.0
    } else {
        0.0
    };

    // Cross-out: leading edge has reached the near line.
    let percentage_out = if before <= 0.0 && after <= rect2_len {
        before.abs() / rect1_len
    } else if after > rect2_len {
        1.0
    } else {
        0.0
    };

    // Cross-pass: progress across the whole combined span.
    let percentage_pass = if before <= rect2_len && after <= rect2_len {
        let total_distance = rect2_len + rect1_len;
        let current_pass = before + rect1_len;
        (total_distance - current_pass) / total_distance
    } else if after > rect2_len {
        1.0
    } else {
        0.0
    };

    // Containment: either rect1 covering rect2, or rect1 moving within it.
    let percentage_contained = if rect1_len > rect2_len {
        if before <= 0.0 && after <= 0.0 {
            before.abs() / (rect1_len - rect2_len)
        } else if after > 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        let span = rect2_len - rect1_len;
        if before >= 0.0 && after >= 0.0 {
            if span > 0.0 { after / span } else { 1.0 }
        } else if before < 0.0 {
            1.0
        } else {
            0.0
        }
    };

    // Percentages are phrased for negative travel; complement them for
    // positive travel so "in" keeps meaning "entering" either way.
    let (percentage_in, percentage_out, percentage_pass, percentage_contained) = match moving {
        Travel::Negative => (
            percentage_in,
            percentage_out,
            percentage_pass,
            percentage_contained,
        ),
        Travel::Positive => (
            1.0 - percentage_out,
            1.0 - percentage_in,
            1.0 - percentage_pass,
            1.0 - percentage_contained,
        ),
    };
    let percentage_contained = if rect1_len > rect2_len {
        -percentage_contained
    } else {
        percentage_contained
    };

    AxisProximity {
        moving,
        percentage_in,
        percentage_out,
        percentage_pass,
        percentage_contained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn overlap_is_clamped_non_negative() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(100.0, 100.0, 10.0, 10.0);
        let i = intersection(a, b);
        assert_eq!(i.width, 0.0);
        assert_eq!(i.height, 0.0);
    }

    #[test]
    fn edge_gaps_are_signed() {
        let outer = rect(0.0, 0.0, 100.0, 100.0);
        let inner = rect(10.0, 20.0, 30.0, 40.0);
        let i = intersection(inner, outer);
        assert_eq!(i.left, 10.0);
        assert_eq!(i.top, 20.0);
        assert_eq!(i.right, 60.0);
        assert_eq!(i.bottom, 40.0);
        assert_eq!((i.width, i.height), (30.0, 40.0));
    }

    #[test]
    fn union_contains_both_inputs() {
        let a = rect(-5.0, 2.0, 10.0, 10.0);
        let b = rect(50.0, -20.0, 10.0, 80.0);
        let u = union(a, b);
        assert!(u.rect().contains_rect(&a));
        assert!(u.rect().contains_rect(&b));
    }

    #[test]
    fn delta_of_rect_with_itself_is_zero() {
        let a = rect(13.0, 7.0, 20.0, 30.0);
        let d = delta(a, a, false);
        assert_eq!((d.x, d.y, d.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn delta_angle_classifies_at_45_degrees() {
        let flat = delta(rect(0.0, 0.0, 0.0, 0.0), rect(100.0, 10.0, 0.0, 0.0), true);
        let angle = flat.angle.unwrap();
        assert!(angle.is_horizontal);
        assert!(!angle.is_vertical);

        let steep = delta(rect(0.0, 0.0, 0.0, 0.0), rect(10.0, 100.0, 0.0, 0.0), true);
        let angle = steep.angle.unwrap();
        assert!(angle.is_vertical);
        assert!(!angle.is_horizontal);
    }

    #[test]
    fn vertical_delta_angle_is_90_degrees() {
        let d = delta(rect(0.0, 0.0, 0.0, 0.0), rect(0.0, 50.0, 0.0, 0.0), true);
        let angle = d.angle.unwrap();
        assert!((angle.angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn proximity_in_is_monotonic_over_a_positive_sweep() {
        // rect1 travels left-to-right from fully before to fully after the
        // anchor; percentage_in must rise monotonically from 0 to 1.
        let anchor = rect(500.0, 0.0, 100.0, 100.0);
        let mut previous: Option<Proximity> = None;
        let mut last_in = 0.0f64;
        for step in 0..200 {
            let mover = rect(step as f64 * 5.0, 0.0, 100.0, 100.0);
            let p = proximity(mover, anchor, Axes::X, previous.as_ref());
            let axis = p.x.unwrap();
            if previous.is_some() {
                assert_eq!(axis.moving, Travel::Positive);
                assert!(
                    axis.percentage_in >= last_in - 1e-9,
                    "step {step}: {} < {last_in}",
                    axis.percentage_in
                );
            }
            last_in = axis.percentage_in;
            previous = Some(p);
        }
        assert!((last_in - 1.0).abs() < 1e-9);
    }

    #[test]
    fn proximity_defaults_to_positive_travel_without_history() {
        let anchor = rect(0.0, 0.0, 100.0, 100.0);
        let mover = rect(300.0, 0.0, 50.0, 50.0);
        let p = proximity(mover, anchor, Axes::Both, None);
        assert_eq!(p.x.unwrap().moving, Travel::Positive);
        assert_eq!(p.y.unwrap().moving, Travel::Positive);
    }
}
