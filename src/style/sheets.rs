use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::anim::ease::Ease;
use crate::anim::keyframes::Keyframe;
use crate::anim::player::Fill;
use crate::foundation::error::KineticResult;
use crate::host::document::ElementId;
use crate::host::stylesheet::SheetRule;
use crate::stage::Stage;
use crate::style::value::{CssValue, StyleMap, normalize_prop};

/// A named keyframes rule resolved into a normalized keyframe list, plus
/// any playback declarations found alongside the frames.
#[derive(Clone, Debug, Default)]
pub struct NamedKeyframes {
    /// Frames sorted by offset.
    pub frames: Vec<Keyframe>,
    /// Declared `animation-fill-mode`, if any.
    pub fill: Option<Fill>,
    /// Declared `animation-iteration-count`, if any (`infinite` maps to
    /// `f64::INFINITY`).
    pub iterations: Option<f64>,
}

/// Explicit cache for stylesheet lookups: keyframes by name, matched rules
/// by property-set key plus element identity. Process-wide lifetime,
/// cleared only on explicit bypass or [`SheetCache::clear`].
#[derive(Debug, Default)]
pub struct SheetCache {
    rules: RefCell<HashMap<(String, ElementId), Rc<Vec<StyleMap>>>>,
    keyframes: RefCell<HashMap<String, Rc<NamedKeyframes>>>,
}

impl SheetCache {
    /// Drop every cached lookup.
    pub fn clear(&self) {
        self.rules.borrow_mut().clear();
        self.keyframes.borrow_mut().clear();
    }
}

/// Resolve the style rules matching `el` across all stylesheets in
/// declaration order. `props` narrows each rule's returned declarations;
/// `None` returns everything each rule declares. Results are cached by
/// property-set key plus element identity unless `no_cache` bypasses (and
/// refreshes) the cache.
pub fn css_read_stylesheet(
    stage: &Stage,
    el: ElementId,
    props: Option<&[&str]>,
    no_cache: bool,
) -> KineticResult<Rc<Vec<StyleMap>>> {
    let cache_key = (
        props.map_or_else(|| "*".to_owned(), |p| p.join("|")),
        el,
    );
    if !no_cache {
        if let Some(hit) = stage.sheet_cache().rules.borrow().get(&cache_key) {
            return Ok(Rc::clone(hit));
        }
    }

    let element = stage.document().element(el)?;
    let wanted: Option<Vec<String>> =
        props.map(|list| list.iter().map(|p| normalize_prop(p)).collect());
    let mut all_rules = Vec::new();
    stage.document().each_rule(false, &mut |rule| {
        if let SheetRule::Style(style_rule) = rule {
            if style_rule.selector.matches(&element, None) {
                let map: StyleMap = match &wanted {
                    Some(list) => list
                        .iter()
                        .filter_map(|p| {
                            style_rule
                                .declarations
                                .get(p)
                                .map(|v| (p.clone(), v.clone()))
                        })
                        .collect(),
                    None => style_rule.declarations.clone(),
                };
                all_rules.push(map);
            }
        }
        false
    });

    let shared = Rc::new(all_rules);
    stage
        .sheet_cache()
        .rules
        .borrow_mut()
        .insert(cache_key, Rc::clone(&shared));
    Ok(shared)
}

/// Resolve a named `@keyframes` rule into a normalized keyframe list.
///
/// Stylesheets are scanned in reverse declaration order so the
/// last-declared rule wins. Offset keys expand (`0%, 100%` duplicates the
/// stop), WAAPI-style playback declarations are lifted out of the frames,
/// and frames come back sorted by offset. Cached by name unless `no_cache`.
pub fn css_read_keyframes(
    stage: &Stage,
    name: &str,
    no_cache: bool,
) -> KineticResult<Rc<NamedKeyframes>> {
    if !no_cache {
        if let Some(hit) = stage.sheet_cache().keyframes.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }
    }

    let mut named = NamedKeyframes::default();
    stage.document().each_rule(true, &mut |rule| {
        let SheetRule::Keyframes(kf) = rule else {
            return false;
        };
        if kf.name != name {
            return false;
        }
        for stop in &kf.stops {
            let (declarations, easing, fill, iterations) =
                lift_playback_declarations(&stop.declarations);
            named.fill = named.fill.or(fill);
            named.iterations = named.iterations.or(iterations);
            for key in &stop.keys {
                named.frames.push(Keyframe {
                    offset: Some(key.offset()),
                    easing,
                    props: declarations.clone(),
                });
            }
        }
        true
    });
    named
        .frames
        .sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap_or(std::cmp::Ordering::Equal));

    let shared = Rc::new(named);
    stage
        .sheet_cache()
        .keyframes
        .borrow_mut()
        .insert(name.to_owned(), Rc::clone(&shared));
    Ok(shared)
}

/// Split WAAPI-relevant `animation-*`/`transition-*` declarations out of a
/// keyframe declaration block.
fn lift_playback_declarations(
    declarations: &StyleMap,
) -> (StyleMap, Option<Ease>, Option<Fill>, Option<f64>) {
    let mut props = StyleMap::new();
    let mut easing = None;
    let mut fill = None;
    let mut iterations = None;
    for (prop, value) in declarations {
        let suffix = ["animation-", "transition-"]
            .iter()
            .find_map(|prefix| prop.strip_prefix(prefix));
        match suffix {
            Some("timing-function") => {
                easing = Ease::parse(&value.to_string()).ok().or(easing);
            }
            Some("fill-mode") => {
                fill = Fill::parse(&value.to_string()).ok().or(fill);
            }
            Some("iteration-count") => {
                let text = value.to_string();
                iterations = if text.trim() == "infinite" {
                    Some(f64::INFINITY)
                } else {
                    text.trim().parse::<f64>().ok()
                }
                .or(iterations);
            }
            _ => {
                props.insert(prop.clone(), value.clone());
            }
        }
    }
    (props, easing, fill, iterations)
}

/// Read a preset value (easing curves and the like) from the document
/// root's custom properties.
pub fn css_var_read(stage: &Stage, name: &str) -> Option<CssValue> {
    stage.document().custom_property(&normalize_prop(name))
}

/// Resolve an easing expression: literal CSS easing syntax first, then a
/// root custom property holding one (so preset names like `ease-dramatic`
/// work anywhere an easing string is accepted).
pub fn resolve_easing(stage: &Stage, text: &str) -> KineticResult<Ease> {
    if let Ok(ease) = Ease::parse(text) {
        return Ok(ease);
    }
    if let Some(value) = css_var_read(stage, text) {
        return Ease::parse(&value.to_string());
    }
    Err(crate::foundation::error::KineticError::animation(format!(
        "unrecognized easing \"{text}\" (not literal syntax, not a preset)"
    )))
}
