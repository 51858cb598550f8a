use kurbo::Point;

use crate::foundation::core::{Axis, Edge, Size};
use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::{Document, ElementId, PointerRecord};
use crate::stage::Stage;
use crate::style::accessor::css_read;
use crate::style::value::CssValue;

/// An axis-aligned rectangle in CSS pixels.
///
/// `right`/`bottom` are never stored; they are always recomputed from the
/// position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// Left offset.
    pub left: f64,
    /// Top offset.
    pub top: f64,
    /// Width, `>= 0`.
    pub width: f64,
    /// Height, `>= 0`.
    pub height: f64,
}

impl Rect {
    /// The zero rect.
    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Create a validated rect with non-negative dimensions.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> KineticResult<Self> {
        if width < 0.0 || height < 0.0 {
            return Err(KineticError::geometry("Rect dimensions must be >= 0"));
        }
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }

    /// Derived right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Derived bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Length along `axis`.
    pub fn length(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    /// Leading offset along `axis`.
    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.left,
            Axis::Y => self.top,
        }
    }

    /// Size component.
    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether `other` lies entirely within this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Convert to a kurbo rect.
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(self.left, self.top, self.right(), self.bottom())
    }

    /// Convert from a kurbo rect.
    pub fn from_kurbo(r: kurbo::Rect) -> Self {
        Self {
            left: r.x0,
            top: r.y0,
            width: (r.x1 - r.x0).max(0.0),
            height: (r.y1 - r.y0).max(0.0),
        }
    }
}

/// What a rect is being derived for.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    /// A document element; offsets come from its bounding box.
    Element(ElementId),
    /// A pointer/gesture event; size is always zero.
    Pointer(&'a PointerRecord),
    /// The viewport; size is the inner width/height.
    Viewport,
    /// An already-computed rect, passed through.
    Rect(Rect),
}

impl From<ElementId> for Target<'_> {
    fn from(id: ElementId) -> Self {
        Target::Element(id)
    }
}

impl From<Rect> for Target<'_> {
    fn from(rect: Rect) -> Self {
        Target::Rect(rect)
    }
}

/// Which coordinate frame offsets are resolved against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OffsetOrigin {
    /// No offsets: a size-only reading (offsets come back as zero).
    None,
    /// The target's own local frame: an element's containing block, a
    /// pointer's offset coordinates.
    Local,
    /// Viewport-relative.
    Viewport,
    /// Page-absolute (scroll-adjusted). The default.
    #[default]
    Page,
    /// Relative to the given element's box.
    Element(ElementId),
}

/// Derive a rect for `target` with offsets resolved against `origin`.
///
/// An element with a `Local` origin but no containing block degrades to a
/// page-absolute reading.
pub fn rect_of(doc: &Document, target: Target<'_>, origin: OffsetOrigin) -> KineticResult<Rect> {
    let mut origin = origin;
    let mut rect = match target {
        Target::Pointer(p) => {
            let at = match origin {
                OffsetOrigin::Viewport | OffsetOrigin::Element(_) => p.client,
                OffsetOrigin::Local => p.offset,
                OffsetOrigin::Page => p.page,
                OffsetOrigin::None => Point::ZERO,
            };
            Rect {
                left: at.x,
                top: at.y,
                width: 0.0,
                height: 0.0,
            }
        }
        Target::Viewport => {
            let size = doc.viewport();
            let at = match origin {
                OffsetOrigin::Viewport | OffsetOrigin::Local | OffsetOrigin::Element(_) => {
                    Point::ZERO
                }
                OffsetOrigin::Page => doc.page_scroll(),
                OffsetOrigin::None => Point::ZERO,
            };
            Rect {
                left: at.x,
                top: at.y,
                width: size.width,
                height: size.height,
            }
        }
        Target::Element(el) => {
            let mut rect = doc.bounding_client_rect(el)?;
            match origin {
                OffsetOrigin::Local => match doc.with_element(el, |e| e.offset_parent)? {
                    Some(parent) => origin = OffsetOrigin::Element(parent),
                    None => {
                        origin = OffsetOrigin::Page;
                        let scroll = doc.page_scroll();
                        rect.left += scroll.x;
                        rect.top += scroll.y;
                    }
                },
                OffsetOrigin::Page => {
                    let scroll = doc.page_scroll();
                    rect.left += scroll.x;
                    rect.top += scroll.y;
                }
                OffsetOrigin::None => {
                    rect.left = 0.0;
                    rect.top = 0.0;
                }
                OffsetOrigin::Viewport | OffsetOrigin::Element(_) => {}
            }
            rect
        }
        Target::Rect(r) => r,
    };
    if let OffsetOrigin::Element(context) = origin {
        let ctx = doc.bounding_client_rect(context)?;
        rect.left -= ctx.left;
        rect.top -= ctx.top;
    }
    Ok(rect)
}

/// The element's size, without forcing an offset read.
pub fn size_of(doc: &Document, el: ElementId) -> KineticResult<Size> {
    Ok(rect_of(doc, Target::Element(el), OffsetOrigin::None)?.size())
}

/// The element's offsets in the given frame, without its size.
pub fn offsets_of(doc: &Document, el: ElementId, origin: OffsetOrigin) -> KineticResult<Point> {
    let rect = rect_of(doc, Target::Element(el), origin)?;
    Ok(Point::new(rect.left, rect.top))
}

/// Hypothetical CSS offsets, one per edge, used by [`rect_at_offsets`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeOffsets {
    /// `left` offset.
    pub left: Option<f64>,
    /// `top` offset.
    pub top: Option<f64>,
    /// `right` offset.
    pub right: Option<f64>,
    /// `bottom` offset.
    pub bottom: Option<f64>,
}

/// Simulate, without effecting, the rect the element would occupy at the
/// given CSS offsets under its current position mode. Statically positioned
/// elements are returned unmoved.
pub fn rect_at_offsets(stage: &Stage, el: ElementId, offsets: EdgeOffsets) -> KineticResult<Rect> {
    let doc = stage.document();
    let mut rect = rect_of(doc, Target::Element(el), OffsetOrigin::Page)?;
    let position = css_read_keyword(stage, el, "position")?;
    if position == "static" {
        return Ok(rect);
    }
    let anchor_rect = match position.as_str() {
        "absolute" => {
            let parent = doc.with_element(el, |e| e.offset_parent)?;
            match parent {
                Some(p) => Some(rect_of(doc, Target::Element(p), OffsetOrigin::Page)?),
                None => None,
            }
        }
        "fixed" => {
            rect.top = 0.0;
            rect.left = 0.0;
            Some(rect_of(doc, Target::Viewport, OffsetOrigin::Page)?)
        }
        _ => None,
    };
    if position == "absolute" {
        if let Some(anchor) = anchor_rect {
            rect.top = anchor.top;
            rect.left = anchor.left;
        }
    }
    rect.top = match (offsets.top, offsets.bottom) {
        (Some(top), _) => rect.top + top,
        (None, Some(bottom)) => match anchor_rect {
            Some(anchor) => anchor.bottom() - (rect.height + bottom),
            None => rect.top - bottom,
        },
        (None, None) => 0.0,
    };
    rect.left = match (offsets.left, offsets.right) {
        (Some(left), _) => rect.left + left,
        (None, Some(right)) => match anchor_rect {
            Some(anchor) => anchor.right() - (rect.width + right),
            None => rect.left - right,
        },
        (None, None) => 0.0,
    };
    Ok(rect)
}

/// The element's `left`/`top`/`right`/`bottom` with `auto` resolved per the
/// element's position mode: `relative` mirrors the opposite side with
/// inverted sign, `fixed` intersects with the viewport, `absolute`
/// intersects with the containing block. Concrete values pass through a
/// numeric parse.
pub fn positioning_offsets(
    stage: &Stage,
    el: ElementId,
    anchors: &[Edge],
) -> KineticResult<std::collections::BTreeMap<Edge, f64>> {
    use crate::geometry::intersect::intersection;

    let doc = stage.document();
    let mut props: Vec<&str> = Edge::shorthand_order().iter().map(|e| e.css_name()).collect();
    props.push("position");
    let current = css_read(stage, el, &props)?;
    let position = match current.get("position") {
        Some(CssValue::Keyword(k)) => k.clone(),
        _ => "static".to_owned(),
    };

    let mut anchor_intersection = None;
    let mut out = std::collections::BTreeMap::new();
    for &edge in anchors {
        let value = current
            .get(edge.css_name())
            .cloned()
            .unwrap_or_else(|| CssValue::Keyword("auto".into()));
        let resolved = if value.is_auto() {
            match position.as_str() {
                "relative" => -current
                    .get(edge.inverse().css_name())
                    .and_then(CssValue::to_f64_lossy)
                    .unwrap_or(0.0),
                "fixed" => {
                    if anchor_intersection.is_none() {
                        anchor_intersection = Some(intersection(
                            rect_of(doc, Target::Element(el), OffsetOrigin::Page)?,
                            rect_of(doc, Target::Viewport, OffsetOrigin::Page)?,
                        ));
                    }
                    anchor_intersection.as_ref().map(|i| i.edge(edge)).unwrap_or(0.0)
                }
                "absolute" => {
                    if anchor_intersection.is_none() {
                        let parent = doc
                            .with_element(el, |e| e.offset_parent)?
                            .ok_or_else(|| {
                                KineticError::geometry("absolute element has no containing block")
                            })?;
                        anchor_intersection = Some(intersection(
                            rect_of(doc, Target::Element(el), OffsetOrigin::Page)?,
                            rect_of(doc, Target::Element(parent), OffsetOrigin::Page)?,
                        ));
                    }
                    anchor_intersection.as_ref().map(|i| i.edge(edge)).unwrap_or(0.0)
                }
                _ => 0.0,
            }
        } else {
            value.to_f64_lossy().unwrap_or(0.0)
        };
        out.insert(edge, resolved);
    }
    Ok(out)
}

/// Nearest scrollable ancestor by overflow style. Static ancestors are
/// skipped for absolutely positioned elements; fixed elements scroll with
/// nothing. Falls back to the viewport.
pub fn scroll_parent(stage: &Stage, el: ElementId) -> KineticResult<Option<ElementId>> {
    let doc = stage.document();
    let position = css_read_keyword(stage, el, "position")?;
    if position == "fixed" {
        return Ok(None);
    }
    let exclude_static = position == "absolute";
    let mut cursor = doc.with_element(el, |e| e.parent)?;
    while let Some(parent) = cursor {
        let style = css_read(stage, parent, &["position", "overflow", "overflow-x", "overflow-y"])?;
        let pos = match style.get("position") {
            Some(CssValue::Keyword(k)) => k.clone(),
            _ => "static".to_owned(),
        };
        if !(exclude_static && pos == "static") {
            let overflowing = ["overflow", "overflow-x", "overflow-y"].iter().any(|p| {
                matches!(style.get(*p), Some(CssValue::Keyword(k)) if k == "auto" || k == "scroll")
            });
            if overflowing {
                return Ok(Some(parent));
            }
        }
        cursor = doc.with_element(parent, |e| e.parent)?;
    }
    Ok(None)
}

/// Whether the container can actually scroll: its content overflows its
/// box. `None` means the viewport, which scrolls when the document extent
/// exceeds it.
pub fn scrolls(doc: &Document, container: Option<ElementId>) -> KineticResult<bool> {
    match container {
        None => Ok(doc.scroll_extent().height > doc.viewport().height
            || doc.scroll_extent().width > doc.viewport().width),
        Some(el) => doc.with_element(el, |e| {
            e.scroll_size.height > e.border_box.height || e.scroll_size.width > e.border_box.width
        }),
    }
}

/// Highest z-index attained by the element's direct children.
pub fn z_height(stage: &Stage, el: ElementId) -> KineticResult<i32> {
    let mut z = 0i32;
    for child in stage.document().children(el) {
        let v = css_read_keyword(stage, child, "z-index")?;
        if let Ok(parsed) = v.parse::<i32>() {
            z = z.max(parsed);
        }
    }
    Ok(z)
}

fn css_read_keyword(stage: &Stage, el: ElementId, prop: &str) -> KineticResult<String> {
    let map = css_read(stage, el, &[prop])?;
    Ok(match map.get(prop) {
        Some(CssValue::Keyword(k)) => k.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::document::ElementData;

    fn doc_with(rect: Rect) -> (std::rc::Rc<Document>, ElementId) {
        let doc = Document::new();
        let id = doc.insert(ElementData {
            border_box: rect,
            ..ElementData::default()
        });
        (doc, id)
    }

    #[test]
    fn element_rect_is_scroll_adjusted_by_default() {
        let (doc, id) = doc_with(Rect {
            left: 10.0,
            top: 20.0,
            width: 30.0,
            height: 40.0,
        });
        doc.set_page_scroll(Point::new(100.0, 200.0));
        let page = rect_of(&doc, Target::Element(id), OffsetOrigin::Page).unwrap();
        assert_eq!((page.left, page.top), (110.0, 220.0));
        let viewport = rect_of(&doc, Target::Element(id), OffsetOrigin::Viewport).unwrap();
        assert_eq!((viewport.left, viewport.top), (10.0, 20.0));
    }

    #[test]
    fn element_rect_relative_to_containing_block() {
        let doc = Document::new();
        let parent = doc.insert(ElementData {
            border_box: Rect {
                left: 100.0,
                top: 100.0,
                width: 400.0,
                height: 400.0,
            },
            ..ElementData::default()
        });
        let child = doc.insert(ElementData {
            border_box: Rect {
                left: 130.0,
                top: 150.0,
                width: 10.0,
                height: 10.0,
            },
            offset_parent: Some(parent),
            ..ElementData::default()
        });
        let local = rect_of(&doc, Target::Element(child), OffsetOrigin::Local).unwrap();
        assert_eq!((local.left, local.top), (30.0, 50.0));
    }

    #[test]
    fn pointer_rect_has_zero_size() {
        let doc = Document::new();
        let pointer = PointerRecord {
            client: Point::new(5.0, 6.0),
            page: Point::new(105.0, 206.0),
            offset: Point::new(1.0, 2.0),
            screen: Point::ZERO,
        };
        let page = rect_of(&doc, Target::Pointer(&pointer), OffsetOrigin::Page).unwrap();
        assert_eq!((page.left, page.top, page.width, page.height), (105.0, 206.0, 0.0, 0.0));
        let local = rect_of(&doc, Target::Pointer(&pointer), OffsetOrigin::Local).unwrap();
        assert_eq!((local.left, local.top), (1.0, 2.0));
    }

    #[test]
    fn viewport_rect_uses_inner_size() {
        let doc = Document::new();
        doc.set_viewport(crate::foundation::core::Size {
            width: 800.0,
            height: 600.0,
        });
        doc.set_page_scroll(Point::new(0.0, 250.0));
        let frame = rect_of(&doc, Target::Viewport, OffsetOrigin::Viewport).unwrap();
        assert_eq!((frame.left, frame.top, frame.width, frame.height), (0.0, 0.0, 800.0, 600.0));
        let page = rect_of(&doc, Target::Viewport, OffsetOrigin::Page).unwrap();
        assert_eq!((page.left, page.top), (0.0, 250.0));
    }

    #[test]
    fn size_only_reading_zeroes_offsets() {
        let (doc, id) = doc_with(Rect {
            left: 10.0,
            top: 20.0,
            width: 30.0,
            height: 40.0,
        });
        let r = rect_of(&doc, Target::Element(id), OffsetOrigin::None).unwrap();
        assert_eq!((r.left, r.top, r.width, r.height), (0.0, 0.0, 30.0, 40.0));
        assert_eq!(size_of(&doc, id).unwrap().width, 30.0);
    }

    #[test]
    fn rect_validation_rejects_negative_size() {
        assert!(Rect::new(0.0, 0.0, -1.0, 0.0).is_err());
    }
}
