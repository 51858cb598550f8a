use crate::foundation::error::{KineticError, KineticResult};

pub use kurbo::{Point, Vec2};

/// One of the two screen axes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

impl Axis {
    /// The box edge where this axis starts (`left` / `top`).
    pub fn start_edge(self) -> Edge {
        match self {
            Self::X => Edge::Left,
            Self::Y => Edge::Top,
        }
    }

    /// The box edge where this axis ends (`right` / `bottom`).
    pub fn end_edge(self) -> Edge {
        match self {
            Self::X => Edge::Right,
            Self::Y => Edge::Bottom,
        }
    }

    /// CSS length property measured along this axis.
    pub fn length_prop(self) -> &'static str {
        match self {
            Self::X => "width",
            Self::Y => "height",
        }
    }

    /// CSS scroll offset property along this axis.
    pub fn scroll_prop(self) -> &'static str {
        match self {
            Self::X => "scroll-left",
            Self::Y => "scroll-top",
        }
    }
}

/// Axis selection for operations that can run on one or both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Axes {
    /// Horizontal only.
    X,
    /// Vertical only.
    Y,
    /// Both axes.
    #[default]
    Both,
}

impl Axes {
    /// Whether the selection includes `axis`.
    pub fn contains(self, axis: Axis) -> bool {
        matches!(
            (self, axis),
            (Self::Both, _) | (Self::X, Axis::X) | (Self::Y, Axis::Y)
        )
    }

    /// Iterate the selected axes in `x, y` order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        [Axis::X, Axis::Y]
            .into_iter()
            .filter(move |a| self.contains(*a))
    }
}

/// One of the four box edges.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Leading horizontal edge.
    Left,
    /// Leading vertical edge.
    Top,
    /// Trailing horizontal edge.
    Right,
    /// Trailing vertical edge.
    Bottom,
}

impl Edge {
    /// The opposite edge on the same axis.
    pub fn inverse(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }

    /// The axis this edge bounds.
    pub fn axis(self) -> Axis {
        match self {
            Self::Left | Self::Right => Axis::X,
            Self::Top | Self::Bottom => Axis::Y,
        }
    }

    /// CSS offset property name for this edge.
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }

    /// All four edges in CSS shorthand order (`top right bottom left`).
    pub fn shorthand_order() -> [Edge; 4] {
        [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left]
    }
}

/// A width/height pair in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in pixels, `>= 0`.
    pub width: f64,
    /// Height in pixels, `>= 0`.
    pub height: f64,
}

impl Size {
    /// Create a validated size with non-negative dimensions.
    pub fn new(width: f64, height: f64) -> KineticResult<Self> {
        if width < 0.0 || height < 0.0 {
            return Err(KineticError::geometry("Size dimensions must be >= 0"));
        }
        Ok(Self { width, height })
    }

    /// Length along `axis`.
    pub fn along(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }
}

/// Travel direction along an axis, as observed between two proximity samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Travel {
    /// Motion toward increasing coordinates.
    Positive,
    /// Motion toward decreasing coordinates.
    Negative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_selection_filters() {
        assert!(Axes::Both.contains(Axis::X));
        assert!(Axes::Both.contains(Axis::Y));
        assert!(!Axes::X.contains(Axis::Y));
        assert_eq!(Axes::Y.iter().collect::<Vec<_>>(), vec![Axis::Y]);
    }

    #[test]
    fn edge_inverse_round_trips() {
        for edge in Edge::shorthand_order() {
            assert_eq!(edge.inverse().inverse(), edge);
            assert_eq!(edge.inverse().axis(), edge.axis());
        }
    }

    #[test]
    fn size_rejects_negative_dimensions() {
        assert!(Size::new(-1.0, 0.0).is_err());
        assert!(Size::new(10.0, 20.0).is_ok());
    }
}
