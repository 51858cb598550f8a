use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use kurbo::Point;

use crate::foundation::core::Size;
use crate::foundation::error::{KineticError, KineticResult};
use crate::geometry::rect::Rect;
use crate::host::selector::Selector;
use crate::host::stylesheet::{SheetRule, Stylesheet};
use crate::style::value::{CssValue, StyleMap};

/// Index-based handle to an element in a [`Document`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub u32);

/// Per-element state the toolkit reads and writes.
///
/// Boxes are layout *inputs* in viewport coordinates (the host's layout
/// engine, or the test, supplies them); this crate never runs layout.
#[derive(Clone, Debug)]
pub struct ElementData {
    /// Tag name for selector matching.
    pub tag: String,
    /// `id` attribute.
    pub id: Option<String>,
    /// Class list.
    pub classes: Vec<String>,
    /// Parent element.
    pub parent: Option<ElementId>,
    /// Containing block for positioned offsets.
    pub offset_parent: Option<ElementId>,
    /// Border box in viewport coordinates, before inline overrides.
    pub border_box: Rect,
    /// Natural content size, used when a dimension resolves to `auto`.
    pub content_size: Size,
    /// Scrollable extent of this element's content.
    pub scroll_size: Size,
    /// Current scroll offsets.
    pub scroll: Point,
    /// Inline style declarations.
    pub inline: StyleMap,
    /// Animation overlay, written by players; wins over inline style.
    pub animated: StyleMap,
}

impl Default for ElementData {
    fn default() -> Self {
        Self {
            tag: "div".to_owned(),
            id: None,
            classes: Vec::new(),
            parent: None,
            offset_parent: None,
            border_box: Rect::ZERO,
            content_size: Size::default(),
            scroll_size: Size::default(),
            scroll: Point::ZERO,
            inline: StyleMap::new(),
            animated: StyleMap::new(),
        }
    }
}

/// Pointer-event coordinates in the host's four coordinate spaces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerRecord {
    /// Viewport-relative position.
    pub client: Point,
    /// Position relative to the event target's padding box.
    pub offset: Point,
    /// Page-absolute position (scroll-adjusted).
    pub page: Point,
    /// Screen-absolute position.
    pub screen: Point,
}

/// Host-reported vendor prefix for the current style engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorPrefix {
    /// CSS-form prefix, e.g. `-webkit-`.
    pub css: String,
    /// API-form prefix, e.g. `webkit`.
    pub api: String,
}

impl Default for VendorPrefix {
    fn default() -> Self {
        Self {
            css: "-webkit-".to_owned(),
            api: "webkit".to_owned(),
        }
    }
}

/// The headless document: element arena, viewport state, stylesheets, and
/// the vendor/support data the style accessor consults.
///
/// Interior mutability keeps the document shareable (`Rc`) across the
/// scheduler, players, and callers on the single UI thread.
#[derive(Debug, Default)]
pub struct Document {
    elements: RefCell<Vec<ElementData>>,
    stylesheets: RefCell<Vec<Stylesheet>>,
    viewport: Cell<Size>,
    page_scroll: Cell<Point>,
    scroll_extent: Cell<Size>,
    vendor: RefCell<VendorPrefix>,
    unsupported: RefCell<BTreeSet<String>>,
    vars: RefCell<BTreeMap<String, CssValue>>,
}

impl Document {
    /// Create an empty shared document with a default desktop viewport.
    pub fn new() -> Rc<Self> {
        let doc = Self::default();
        doc.viewport.set(Size {
            width: 1024.0,
            height: 768.0,
        });
        Rc::new(doc)
    }

    /// Insert an element, returning its handle.
    pub fn insert(&self, el: ElementData) -> ElementId {
        let mut elements = self.elements.borrow_mut();
        elements.push(el);
        ElementId((elements.len() - 1) as u32)
    }

    /// Clone out an element's state.
    pub fn element(&self, id: ElementId) -> KineticResult<ElementData> {
        self.with_element(id, Clone::clone)
    }

    /// Run `f` against an element's state.
    pub fn with_element<R>(
        &self,
        id: ElementId,
        f: impl FnOnce(&ElementData) -> R,
    ) -> KineticResult<R> {
        let elements = self.elements.borrow();
        let el = elements
            .get(id.0 as usize)
            .ok_or_else(|| KineticError::host(format!("no element {id:?}")))?;
        Ok(f(el))
    }

    /// Mutate an element's state.
    pub fn update<R>(
        &self,
        id: ElementId,
        f: impl FnOnce(&mut ElementData) -> R,
    ) -> KineticResult<R> {
        let mut elements = self.elements.borrow_mut();
        let el = elements
            .get_mut(id.0 as usize)
            .ok_or_else(|| KineticError::host(format!("no element {id:?}")))?;
        Ok(f(el))
    }

    /// Ids of `parent`'s direct children.
    pub fn children(&self, parent: ElementId) -> Vec<ElementId> {
        self.elements
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, el)| el.parent == Some(parent))
            .map(|(i, _)| ElementId(i as u32))
            .collect()
    }

    /// Viewport size.
    pub fn viewport(&self) -> Size {
        self.viewport.get()
    }

    /// Replace the viewport size.
    pub fn set_viewport(&self, size: Size) {
        self.viewport.set(size);
    }

    /// Current page scroll position.
    pub fn page_scroll(&self) -> Point {
        self.page_scroll.get()
    }

    /// Set the page scroll position.
    pub fn set_page_scroll(&self, scroll: Point) {
        self.page_scroll.set(scroll);
    }

    /// Scrollable extent of the whole document.
    pub fn scroll_extent(&self) -> Size {
        self.scroll_extent.get()
    }

    /// Set the document scroll extent.
    pub fn set_scroll_extent(&self, size: Size) {
        self.scroll_extent.set(size);
    }

    /// One inline declaration, if present.
    pub fn inline_value(&self, id: ElementId, prop: &str) -> KineticResult<Option<CssValue>> {
        self.with_element(id, |el| el.inline.get(prop).cloned())
    }

    /// Set one inline declaration.
    pub fn set_inline(&self, id: ElementId, prop: &str, value: CssValue) -> KineticResult<()> {
        self.update(id, |el| {
            el.inline.insert(prop.to_owned(), value);
        })
    }

    /// Remove one inline declaration.
    pub fn remove_inline(&self, id: ElementId, prop: &str) -> KineticResult<()> {
        self.update(id, |el| {
            el.inline.remove(prop);
        })
    }

    /// Replace the element's animation overlay.
    pub fn set_animated_overlay(&self, id: ElementId, overlay: StyleMap) -> KineticResult<()> {
        self.update(id, |el| el.animated = overlay)
    }

    /// Clear the element's animation overlay (native cancel semantics: the
    /// visual state reverts to the underlying styles).
    pub fn clear_animated_overlay(&self, id: ElementId) -> KineticResult<()> {
        self.update(id, |el| el.animated.clear())
    }

    /// Effective declaration for `prop`: animation overlay wins over inline.
    pub fn effective_value(&self, id: ElementId, prop: &str) -> KineticResult<Option<CssValue>> {
        self.with_element(id, |el| {
            el.animated.get(prop).or_else(|| el.inline.get(prop)).cloned()
        })
    }

    /// The element's bounding box in viewport coordinates.
    ///
    /// Inline/animated `width`/`height` override the layout box (`auto`
    /// resolves to the natural content size) and an effective translate
    /// shifts the box, so style writes are observable without a layout
    /// engine in the loop.
    pub fn bounding_client_rect(&self, id: ElementId) -> KineticResult<Rect> {
        self.with_element(id, |el| {
            let mut rect = el.border_box;
            let effective = |prop: &str| el.animated.get(prop).or_else(|| el.inline.get(prop));
            for (prop, target) in [("width", 0u8), ("height", 1u8)] {
                match effective(prop) {
                    Some(CssValue::Px(v)) => {
                        if target == 0 {
                            rect.width = v.max(0.0);
                        } else {
                            rect.height = v.max(0.0);
                        }
                    }
                    Some(v) if v.is_auto() => {
                        if target == 0 {
                            rect.width = el.content_size.width;
                        } else {
                            rect.height = el.content_size.height;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(CssValue::Transform(rule)) = effective("transform") {
                let [tx, ty] = rule.translate_or_zero();
                rect.left += tx;
                rect.top += ty;
            }
            rect
        })
    }

    /// Append a stylesheet after the existing ones.
    pub fn push_stylesheet(&self, sheet: Stylesheet) {
        self.stylesheets.borrow_mut().push(sheet);
    }

    /// Walk every rule of every stylesheet in declaration order (or
    /// reversed), stopping early when `f` returns `true`.
    pub fn each_rule(&self, reversed: bool, f: &mut dyn FnMut(&SheetRule) -> bool) {
        let sheets = self.stylesheets.borrow();
        let mut visit = |sheet: &Stylesheet| -> bool {
            for rule in &sheet.rules {
                if f(rule) {
                    return true;
                }
            }
            false
        };
        if reversed {
            for sheet in sheets.iter().rev() {
                if visit(sheet) {
                    return;
                }
            }
        } else {
            for sheet in sheets.iter() {
                if visit(sheet) {
                    return;
                }
            }
        }
    }

    /// Whether `id` matches `selector` in the given pseudo context.
    pub fn matches(
        &self,
        id: ElementId,
        selector: &Selector,
        pseudo: Option<&str>,
    ) -> KineticResult<bool> {
        self.with_element(id, |el| selector.matches(el, pseudo))
    }

    /// The host's vendor prefix.
    pub fn vendor(&self) -> VendorPrefix {
        self.vendor.borrow().clone()
    }

    /// Replace the vendor prefix description.
    pub fn set_vendor(&self, vendor: VendorPrefix) {
        *self.vendor.borrow_mut() = vendor;
    }

    /// Whether the style engine supports `prop` as written.
    pub fn supports(&self, prop: &str) -> bool {
        !self.unsupported.borrow().contains(prop)
    }

    /// Mark `prop` as unsupported in its unprefixed form.
    pub fn mark_unsupported(&self, prop: &str) {
        self.unsupported.borrow_mut().insert(prop.to_owned());
    }

    /// Set a root custom property (`--name`).
    pub fn set_var(&self, name: &str, value: CssValue) {
        self.vars
            .borrow_mut()
            .insert(name.trim_start_matches("--").to_owned(), value);
    }

    /// Read a root custom property by bare name.
    pub fn custom_property(&self, name: &str) -> Option<CssValue> {
        self.vars
            .borrow()
            .get(name.trim_start_matches("--"))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_rect_honors_style_overrides() {
        let doc = Document::new();
        let id = doc.insert(ElementData {
            border_box: Rect {
                left: 10.0,
                top: 20.0,
                width: 100.0,
                height: 50.0,
            },
            content_size: Size {
                width: 240.0,
                height: 80.0,
            },
            ..ElementData::default()
        });

        assert_eq!(doc.bounding_client_rect(id).unwrap().width, 100.0);

        doc.set_inline(id, "width", CssValue::Px(60.0)).unwrap();
        assert_eq!(doc.bounding_client_rect(id).unwrap().width, 60.0);

        doc.set_inline(id, "width", CssValue::Keyword("auto".into()))
            .unwrap();
        assert_eq!(doc.bounding_client_rect(id).unwrap().width, 240.0);

        doc.set_inline(
            id,
            "transform",
            CssValue::Transform(crate::style::transform::TransformRule {
                translate: Some([5.0, -5.0]),
                ..Default::default()
            }),
        )
        .unwrap();
        let rect = doc.bounding_client_rect(id).unwrap();
        assert_eq!((rect.left, rect.top), (15.0, 15.0));
    }

    #[test]
    fn animation_overlay_wins_over_inline() {
        let doc = Document::new();
        let id = doc.insert(ElementData::default());
        doc.set_inline(id, "opacity", CssValue::Number(1.0)).unwrap();
        let mut overlay = StyleMap::new();
        overlay.insert("opacity".into(), CssValue::Number(0.25));
        doc.set_animated_overlay(id, overlay).unwrap();
        assert_eq!(
            doc.effective_value(id, "opacity").unwrap(),
            Some(CssValue::Number(0.25))
        );
        doc.clear_animated_overlay(id).unwrap();
        assert_eq!(
            doc.effective_value(id, "opacity").unwrap(),
            Some(CssValue::Number(1.0))
        );
    }

    #[test]
    fn unknown_element_errors() {
        let doc = Document::new();
        assert!(doc.element(ElementId(3)).is_err());
    }
}
