use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::{Document, ElementId};
use crate::host::stylesheet::SheetRule;
use crate::reflow::Promise;
use crate::stage::Stage;
use crate::style::transform::TransformRule;
use crate::style::value::{CssValue, StyleMap, autopx, destructure_shorthand, normalize_prop};

/// Vendor-prefix handling for a read/write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Vendorize {
    /// Use property names exactly as given.
    Plain,
    /// Write the prefixed and unprefixed forms.
    Both,
    /// Prefer the prefixed form when the unprefixed one is unsupported.
    #[default]
    Auto,
}

/// The vendor-prefixed equivalent of `prop`, when the engine does not
/// support the unprefixed form but does support the prefixed one.
pub fn vendorize(doc: &Document, prop: &str) -> Option<String> {
    if doc.supports(prop) {
        return None;
    }
    let prefixed = format!("{}{prop}", doc.vendor().css);
    doc.supports(&prefixed).then_some(prefixed)
}

/// Read computed values for `props`, keyed by their normalized names.
pub fn css_read(stage: &Stage, el: ElementId, props: &[&str]) -> KineticResult<StyleMap> {
    css_read_pseudo(stage, el, props, None)
}

/// [`css_read`] against a pseudo-element context.
pub fn css_read_pseudo(
    stage: &Stage,
    el: ElementId,
    props: &[&str],
    pseudo: Option<&str>,
) -> KineticResult<StyleMap> {
    let mut out = StyleMap::new();
    for raw in props {
        let prop = normalize_prop(raw);
        let value = computed_value(stage, el, &prop, pseudo)?;
        out.insert(prop, value);
    }
    Ok(out)
}

/// Read one computed value.
pub fn css_read_one(stage: &Stage, el: ElementId, prop: &str) -> KineticResult<CssValue> {
    computed_value(stage, el, &normalize_prop(prop), None)
}

fn computed_value(
    stage: &Stage,
    el: ElementId,
    prop: &str,
    pseudo: Option<&str>,
) -> KineticResult<CssValue> {
    let doc = stage.document();
    let read_prop = vendorize(doc, prop).unwrap_or_else(|| prop.to_owned());

    let mut declared = None;
    if pseudo.is_none() {
        declared = doc.effective_value(el, &read_prop)?;
    }
    if declared.is_none() {
        let element = doc.element(el)?;
        doc.each_rule(false, &mut |rule| {
            if let SheetRule::Style(style_rule) = rule {
                if style_rule.selector.matches(&element, pseudo) {
                    if let Some(v) = style_rule.declarations.get(&read_prop) {
                        // Document order: later declarations override.
                        declared = Some(v.clone());
                    }
                }
            }
            false
        });
    }

    // Dimension reads always come back as used pixels; an empty or
    // non-pixel value falls back to the element's box.
    if prop == "width" || prop == "height" {
        return Ok(match declared {
            Some(CssValue::Px(v)) => CssValue::Px(v),
            _ => {
                let rect = doc.bounding_client_rect(el)?;
                CssValue::Px(if prop == "width" { rect.width } else { rect.height })
            }
        });
    }
    if prop == "transform" {
        return Ok(match declared {
            Some(CssValue::Transform(rule)) => CssValue::Transform(rule),
            Some(CssValue::Keyword(text)) => {
                CssValue::Transform(TransformRule::parse(&text).unwrap_or_default())
            }
            _ => CssValue::Transform(TransformRule::identity()),
        });
    }
    match declared {
        Some(v) => Ok(v),
        None => Ok(default_value(prop)),
    }
}

fn default_value(prop: &str) -> CssValue {
    let keyword = match prop {
        "position" => "static",
        "left" | "top" | "right" | "bottom" | "z-index" => "auto",
        "overflow" | "overflow-x" | "overflow-y" => "visible",
        "opacity" => return CssValue::Number(1.0),
        _ => "",
    };
    CssValue::Keyword(keyword.to_owned())
}

/// Write a property map as inline style, with shorthand destructuring,
/// structured transforms, the default-px rule, and automatic vendor
/// substitution.
pub fn css_write(stage: &Stage, el: ElementId, props: StyleMap) -> KineticResult<()> {
    css_write_with(stage, el, props, Vendorize::Auto)
}

/// Write one property.
pub fn css_write_one(
    stage: &Stage,
    el: ElementId,
    prop: &str,
    value: CssValue,
) -> KineticResult<()> {
    let mut map = StyleMap::new();
    map.insert(prop.to_owned(), value);
    css_write(stage, el, map)
}

/// [`css_write`] with explicit vendor-prefix handling.
pub fn css_write_with(
    stage: &Stage,
    el: ElementId,
    props: StyleMap,
    mode: Vendorize,
) -> KineticResult<()> {
    let doc = stage.document();
    for (raw, value) in props {
        let prop = normalize_prop(&raw);
        let value = destructure_shorthand(&prop, value);
        let value = if prop == "transform" {
            match value {
                CssValue::Keyword(text) => CssValue::Transform(TransformRule::parse(&text)?),
                structured => structured,
            }
        } else {
            autopx(&prop, value)
        };
        match mode {
            Vendorize::Plain => doc.set_inline(el, &prop, value)?,
            Vendorize::Auto => {
                let name = vendorize(doc, &prop).unwrap_or_else(|| prop.clone());
                doc.set_inline(el, &name, value)?;
            }
            Vendorize::Both => {
                if let Some(prefixed) = vendorize(doc, &prop) {
                    doc.set_inline(el, &prefixed, value.clone())?;
                }
                doc.set_inline(el, &prop, value)?;
            }
        }
    }
    Ok(())
}

/// Read inline-only declarations for `props`; absent properties are
/// omitted.
pub fn css_read_inline(stage: &Stage, el: ElementId, props: &[&str]) -> KineticResult<StyleMap> {
    let doc = stage.document();
    let mut out = StyleMap::new();
    for raw in props {
        let prop = normalize_prop(raw);
        if let Some(v) = doc.inline_value(el, &prop)? {
            out.insert(prop, v);
        }
    }
    Ok(out)
}

/// Every inline declaration on the element.
pub fn css_read_inline_all(stage: &Stage, el: ElementId) -> KineticResult<StyleMap> {
    stage.document().with_element(el, |e| e.inline.clone())
}

type InlineSnapshot = Vec<(String, Option<CssValue>)>;

fn inline_snapshot<'a>(
    doc: &Document,
    el: ElementId,
    props: impl Iterator<Item = &'a String>,
) -> KineticResult<InlineSnapshot> {
    let mut snapshot = Vec::new();
    for prop in props {
        let prop = normalize_prop(prop);
        let value = doc.inline_value(el, &prop)?;
        snapshot.push((prop, value));
    }
    Ok(snapshot)
}

fn restore_snapshot(doc: &Document, el: ElementId, snapshot: &InlineSnapshot) {
    for (prop, value) in snapshot {
        let _ = match value {
            Some(v) => doc.set_inline(el, prop, v.clone()),
            None => doc.remove_inline(el, prop),
        };
    }
}

/// Read computed values in the next read phase.
pub fn css_read_async(stage: &Stage, el: ElementId, props: Vec<String>) -> Promise<StyleMap> {
    let stage = stage.clone();
    stage.clone().reflow().onread_promise(move |settle| {
        let refs: Vec<&str> = props.iter().map(String::as_str).collect();
        match css_read(&stage, el, &refs) {
            Ok(map) => settle.resolve(map),
            Err(e) => settle.reject(e),
        }
    })
}

/// Run an arbitrary measurement in the next read phase.
pub fn css_measure_async<T: 'static>(
    stage: &Stage,
    el: ElementId,
    reader: impl FnOnce(&Stage, ElementId) -> KineticResult<T> + 'static,
) -> Promise<T> {
    let stage = stage.clone();
    stage
        .clone()
        .reflow()
        .onread_promise(move |settle| match reader(&stage, el) {
            Ok(v) => settle.resolve(v),
            Err(e) => settle.reject(e),
        })
}

/// Write a property map in the next write phase.
pub fn css_write_async(stage: &Stage, el: ElementId, props: StyleMap) -> Promise<()> {
    let stage = stage.clone();
    stage
        .clone()
        .reflow()
        .onwrite_promise(move |settle| match css_write(&stage, el, props) {
            Ok(()) => settle.resolve(()),
            Err(e) => settle.reject(e),
        })
}

/// Probe a hypothetical style: apply `probe` in a write phase, run
/// `reader` in the following read phase, then restore the captured inline
/// snapshot in the write phase after that. The snapshot is taken
/// synchronously so concurrent writers are not folded into the rollback.
pub fn css_compute<T: Clone + 'static>(
    stage: &Stage,
    el: ElementId,
    probe: StyleMap,
    reader: impl FnOnce(&Stage, ElementId) -> KineticResult<T> + 'static,
) -> Promise<T> {
    let snapshot = match inline_snapshot(stage.document(), el, probe.keys()) {
        Ok(s) => s,
        Err(e) => return Promise::rejected(e),
    };
    let (promise, settle) = Promise::pending();
    let stage_outer = stage.clone();
    css_write_async(stage, el, probe).done(move |written| {
        if let Err(e) = written {
            settle.reject(e.duplicate());
            return;
        }
        let stage_inner = stage_outer.clone();
        let settle_inner = settle.clone();
        css_measure_async(&stage_outer, el, reader).done(move |measured| match measured {
            Ok(value) => {
                let value = value.clone();
                let doc_stage = stage_inner.clone();
                stage_inner.reflow().onwrite_once(move || {
                    restore_snapshot(doc_stage.document(), el, &snapshot);
                    settle_inner.resolve(value);
                });
            }
            Err(e) => settle_inner.reject(e.duplicate()),
        });
    });
    promise
}

/// An open style transaction: a captured inline snapshot that can be
/// rolled back without clobbering unrelated writes to other properties.
pub struct StyleTransaction {
    stage: Stage,
    el: ElementId,
    snapshot: InlineSnapshot,
}

impl StyleTransaction {
    /// The element under transaction.
    pub fn element(&self) -> ElementId {
        self.el
    }

    /// Reapply the captured snapshot in the next write phase.
    pub fn rollback(&self) -> Promise<()> {
        let stage = self.stage.clone();
        let snapshot = self.snapshot.clone();
        let el = self.el;
        self.stage.reflow().onwrite_promise(move |settle| {
            restore_snapshot(stage.document(), el, &snapshot);
            settle.resolve(());
        })
    }
}

/// Open a transaction over `props`: the current inline values are captured
/// synchronously (racing ahead of scheduled writers), restoration is
/// write-phase-scheduled.
pub fn css_transaction(
    stage: &Stage,
    el: ElementId,
    props: &[&str],
) -> KineticResult<StyleTransaction> {
    let owned: Vec<String> = props.iter().map(|p| (*p).to_owned()).collect();
    let snapshot = inline_snapshot(stage.document(), el, owned.iter())?;
    Ok(StyleTransaction {
        stage: stage.clone(),
        el,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::document::ElementData;
    use crate::host::stylesheet::Stylesheet;

    fn stage_with_element() -> (Stage, ElementId) {
        let stage = Stage::new();
        let el = stage.document().insert(ElementData::default());
        (stage, el)
    }

    #[test]
    fn write_applies_autopx_and_read_round_trips() {
        let (stage, el) = stage_with_element();
        css_write_one(&stage, el, "width", CssValue::Number(10.0)).unwrap();
        assert_eq!(
            css_read_one(&stage, el, "width").unwrap(),
            CssValue::Px(10.0)
        );
        css_write_one(&stage, el, "width", CssValue::parse("10px")).unwrap();
        assert_eq!(
            css_read_one(&stage, el, "width").unwrap(),
            CssValue::Px(10.0)
        );
    }

    #[test]
    fn camel_case_names_normalize_on_both_paths() {
        let (stage, el) = stage_with_element();
        css_write_one(&stage, el, "marginTop", CssValue::Number(4.0)).unwrap();
        let map = css_read(&stage, el, &["margin-top"]).unwrap();
        assert_eq!(map.get("margin-top"), Some(&CssValue::Px(4.0)));
    }

    #[test]
    fn stylesheet_declarations_reach_computed_reads() {
        let (stage, el) = stage_with_element();
        stage
            .document()
            .push_stylesheet(Stylesheet::default().style("div", "opacity: 0.5").unwrap());
        assert_eq!(
            css_read_one(&stage, el, "opacity").unwrap(),
            CssValue::Number(0.5)
        );
        // Inline wins over the sheet.
        css_write_one(&stage, el, "opacity", CssValue::Number(0.9)).unwrap();
        assert_eq!(
            css_read_one(&stage, el, "opacity").unwrap(),
            CssValue::Number(0.9)
        );
    }

    #[test]
    fn transform_reads_come_back_structured() {
        let (stage, el) = stage_with_element();
        css_write_one(
            &stage,
            el,
            "transform",
            CssValue::Keyword("translate(3px, 4px)".into()),
        )
        .unwrap();
        match css_read_one(&stage, el, "transform").unwrap() {
            CssValue::Transform(rule) => assert_eq!(rule.translate, Some([3.0, 4.0])),
            other => panic!("expected transform, got {other:?}"),
        }
    }

    #[test]
    fn vendor_substitution_kicks_in_when_unprefixed_unsupported() {
        let (stage, el) = stage_with_element();
        stage.document().mark_unsupported("backdrop-filter");
        css_write_one(
            &stage,
            el,
            "backdrop-filter",
            CssValue::Keyword("blur(2px)".into()),
        )
        .unwrap();
        assert_eq!(
            stage
                .document()
                .inline_value(el, "-webkit-backdrop-filter")
                .unwrap(),
            Some(CssValue::Keyword("blur(2px)".into()))
        );
        assert!(
            stage
                .document()
                .inline_value(el, "backdrop-filter")
                .unwrap()
                .is_none()
        );
        // Reads resolve through the same substitution.
        assert_eq!(
            css_read_one(&stage, el, "backdrop-filter").unwrap(),
            CssValue::Keyword("blur(2px)".into())
        );
    }

    #[test]
    fn async_write_lands_in_the_write_phase() {
        let (stage, el) = stage_with_element();
        let mut probe = StyleMap::new();
        probe.insert("left".to_owned(), CssValue::Number(5.0));
        let done = css_write_async(&stage, el, probe);
        assert!(!done.is_settled());
        assert!(stage.document().inline_value(el, "left").unwrap().is_none());
        stage.reflow().tick(0.0);
        assert!(done.is_settled());
        assert_eq!(
            stage.document().inline_value(el, "left").unwrap(),
            Some(CssValue::Px(5.0))
        );
    }

    #[test]
    fn compute_probes_and_restores_across_ticks() {
        let (stage, el) = stage_with_element();
        stage
            .document()
            .update(el, |e| {
                e.content_size = crate::foundation::core::Size {
                    width: 333.0,
                    height: 44.0,
                };
            })
            .unwrap();
        css_write_one(&stage, el, "width", CssValue::Number(50.0)).unwrap();

        let mut probe = StyleMap::new();
        probe.insert("width".to_owned(), CssValue::Keyword("auto".into()));
        let measured = css_compute(&stage, el, probe, |stage, el| {
            stage.document().bounding_client_rect(el)
        });

        let result = std::rc::Rc::new(std::cell::Cell::new(0.0f64));
        let r = std::rc::Rc::clone(&result);
        measured.done(move |m| r.set(m.as_ref().unwrap().width));

        for t in 0..3 {
            stage.reflow().tick(t as f64 * 16.0);
        }
        assert_eq!(result.get(), 333.0);
        // Probe rolled back.
        assert_eq!(
            stage.document().inline_value(el, "width").unwrap(),
            Some(CssValue::Px(50.0))
        );
    }

    #[test]
    fn transaction_rollback_restores_only_captured_props() {
        let (stage, el) = stage_with_element();
        css_write_one(&stage, el, "left", CssValue::Number(1.0)).unwrap();
        let txn = css_transaction(&stage, el, &["left", "top"]).unwrap();
        css_write_one(&stage, el, "left", CssValue::Number(99.0)).unwrap();
        css_write_one(&stage, el, "top", CssValue::Number(77.0)).unwrap();
        css_write_one(&stage, el, "opacity", CssValue::Number(0.3)).unwrap();
        let rolled = txn.rollback();
        stage.reflow().tick(0.0);
        assert!(rolled.is_settled());
        assert_eq!(
            stage.document().inline_value(el, "left").unwrap(),
            Some(CssValue::Px(1.0))
        );
        assert!(stage.document().inline_value(el, "top").unwrap().is_none());
        assert_eq!(
            stage.document().inline_value(el, "opacity").unwrap(),
            Some(CssValue::Number(0.3))
        );
    }
}
