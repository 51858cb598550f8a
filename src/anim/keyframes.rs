use crate::anim::ease::Ease;
use crate::anim::player::Fill;
use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::ElementId;
use crate::stage::Stage;
use crate::style::accessor::{css_compute, css_read};
use crate::style::sheets::css_read_keyframes;
use crate::style::transform::TransformRule;
use crate::style::value::{CssValue, StyleMap, autopx, destructure_shorthand, normalize_prop};

/// One keyframe: a property map, an optional offset in `[0, 1]`, and an
/// optional easing applied toward the next frame.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Offset in `[0, 1]`; unanchored frames are spaced evenly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Easing toward the next frame; falls back to the playback easing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Ease>,
    /// Property values at this frame.
    #[serde(flatten)]
    pub props: StyleMap,
}

impl Keyframe {
    /// A frame holding `props` with no explicit offset or easing.
    pub fn new(props: StyleMap) -> Self {
        Self {
            props,
            ..Self::default()
        }
    }

    /// A frame at an explicit offset.
    pub fn at(offset: f64, props: StyleMap) -> Self {
        Self {
            offset: Some(offset),
            props,
            ..Self::default()
        }
    }
}

impl From<StyleMap> for Keyframe {
    fn from(props: StyleMap) -> Self {
        Self::new(props)
    }
}

/// An animation effect, decided once at the API boundary and matched
/// exhaustively from then on.
#[derive(Clone, Debug)]
pub enum Effect {
    /// An explicit keyframe list.
    Keyframes(Vec<Keyframe>),
    /// A named stylesheet `@keyframes` animation.
    Named(String),
    /// A target property map; the starting frame is measured from the
    /// element's current state in a scheduled read phase.
    EndState(StyleMap),
}

impl From<Vec<Keyframe>> for Effect {
    fn from(frames: Vec<Keyframe>) -> Self {
        Self::Keyframes(frames)
    }
}

impl From<&str> for Effect {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<StyleMap> for Effect {
    fn from(end_state: StyleMap) -> Self {
        Self::EndState(end_state)
    }
}

/// A fully resolved effect: concrete keyframes plus any playback overrides
/// the stylesheet declared alongside them.
#[derive(Clone, Debug, Default)]
pub struct ResolvedEffect {
    /// Concrete keyframes.
    pub frames: Vec<Keyframe>,
    /// Stylesheet-declared fill mode, if any.
    pub fill: Option<Fill>,
    /// Stylesheet-declared iteration count, if any.
    pub iterations: Option<f64>,
}

/// Normalize a keyframe list in place: shorthand destructuring, structured
/// transforms, auto-px, and offset validation. Returns the first-seen and
/// last-seen value of every property across the list, which callers use
/// for roll-back and from/to queries.
pub fn normalize_keyframes(frames: &mut [Keyframe]) -> KineticResult<(StyleMap, StyleMap)> {
    let mut last_offset = f64::NEG_INFINITY;
    for frame in frames.iter() {
        if let Some(offset) = frame.offset {
            if !(0.0..=1.0).contains(&offset) {
                return Err(KineticError::animation(format!(
                    "keyframe offset {offset} outside [0, 1]"
                )));
            }
            if offset < last_offset {
                return Err(KineticError::animation(
                    "keyframe offsets must be non-decreasing",
                ));
            }
            last_offset = offset;
        }
    }

    let mut first = StyleMap::new();
    let mut last = StyleMap::new();
    for frame in frames.iter_mut() {
        let props = std::mem::take(&mut frame.props);
        for (raw_prop, value) in props {
            let prop = normalize_prop(&raw_prop);
            let value = destructure_shorthand(&prop, value);
            let value = if prop == "transform" {
                match value {
                    CssValue::Transform(rule) => CssValue::Transform(rule),
                    CssValue::Keyword(text) => {
                        CssValue::Transform(TransformRule::parse(&text)?)
                    }
                    other => {
                        return Err(KineticError::animation(format!(
                            "transform keyframe value must be a transform, got {other}"
                        )));
                    }
                }
            } else {
                autopx(&prop, value)
            };
            first.entry(prop.clone()).or_insert_with(|| value.clone());
            last.insert(prop.clone(), value.clone());
            frame.props.insert(prop, value);
        }
    }
    Ok((first, last))
}

/// Resolve a heterogeneous effect into concrete keyframes, invoking `done`
/// when resolution completes (possibly several scheduler ticks later).
///
/// An end-state effect measures the element's current values in a read
/// phase; a named effect resolves against stylesheet keyframes; keyframes
/// requesting literal `auto` width/height get the element's natural size
/// probed asynchronously and substituted in pixels.
#[tracing::instrument(skip(stage, effect, done))]
pub fn resolve_effect(
    stage: &Stage,
    el: ElementId,
    effect: Effect,
    done: impl FnOnce(KineticResult<ResolvedEffect>) + 'static,
) {
    match effect {
        Effect::EndState(target) => {
            let stage2 = stage.clone();
            stage.reflow().onread_once(move || {
                let props: Vec<String> = target.keys().cloned().collect();
                let prop_refs: Vec<&str> = props.iter().map(String::as_str).collect();
                match css_read(&stage2, el, &prop_refs) {
                    Ok(current) => {
                        let frames = vec![Keyframe::new(current), Keyframe::new(target)];
                        finish_frames(&stage2, el, ResolvedEffect {
                            frames,
                            ..ResolvedEffect::default()
                        }, done);
                    }
                    Err(e) => done(Err(e)),
                }
            });
        }
        Effect::Named(name) => match css_read_keyframes(stage, &name, false) {
            Ok(named) => {
                if named.frames.is_empty() {
                    done(Err(KineticError::animation(format!(
                        "animation name \"{name}\" not found in any stylesheet"
                    ))));
                    return;
                }
                finish_frames(
                    stage,
                    el,
                    ResolvedEffect {
                        frames: named.frames.clone(),
                        fill: named.fill,
                        iterations: named.iterations,
                    },
                    done,
                );
            }
            Err(e) => done(Err(e)),
        },
        Effect::Keyframes(frames) => finish_frames(
            stage,
            el,
            ResolvedEffect {
                frames,
                ..ResolvedEffect::default()
            },
            done,
        ),
    }
}

fn finish_frames(
    stage: &Stage,
    el: ElementId,
    mut resolved: ResolvedEffect,
    done: impl FnOnce(KineticResult<ResolvedEffect>) + 'static,
) {
    let auto_frames: Vec<usize> = resolved
        .frames
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.props.get("width").is_some_and(CssValue::is_auto)
                || f.props.get("height").is_some_and(CssValue::is_auto)
        })
        .map(|(i, _)| i)
        .collect();
    if auto_frames.is_empty() {
        done(Ok(resolved));
        return;
    }

    let mut probe = StyleMap::new();
    probe.insert("width".to_owned(), CssValue::Keyword("auto".into()));
    probe.insert("height".to_owned(), CssValue::Keyword("auto".into()));
    let natural = css_compute(stage, el, probe, move |stage, el| {
        stage.document().bounding_client_rect(el)
    });
    natural.done(move |result| match result {
        Ok(rect) => {
            for i in auto_frames {
                let frame = &mut resolved.frames[i];
                if frame.props.get("width").is_some_and(CssValue::is_auto) {
                    frame.props.insert("width".to_owned(), CssValue::Px(rect.width));
                }
                if frame.props.get("height").is_some_and(CssValue::is_auto) {
                    frame
                        .props
                        .insert("height".to_owned(), CssValue::Px(rect.height));
                }
            }
            done(Ok(resolved));
        }
        Err(e) => done(Err(KineticError::animation(format!(
            "auto-size resolution failed: {e}"
        )))),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, CssValue)]) -> StyleMap {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn normalization_captures_first_and_last_values() {
        let mut frames = vec![
            Keyframe::new(map(&[
                ("width", CssValue::Number(0.0)),
                ("opacity", CssValue::Number(0.0)),
            ])),
            Keyframe::new(map(&[("width", CssValue::Number(50.0))])),
            Keyframe::new(map(&[
                ("width", CssValue::Number(100.0)),
                ("opacity", CssValue::Number(1.0)),
            ])),
        ];
        let (first, last) = normalize_keyframes(&mut frames).unwrap();
        assert_eq!(first.get("width"), Some(&CssValue::Px(0.0)));
        assert_eq!(first.get("opacity"), Some(&CssValue::Number(0.0)));
        assert_eq!(last.get("width"), Some(&CssValue::Px(100.0)));
        assert_eq!(last.get("opacity"), Some(&CssValue::Number(1.0)));
    }

    #[test]
    fn normalization_applies_autopx_inside_frames() {
        let mut frames = vec![Keyframe::new(map(&[("left", CssValue::Number(12.0))]))];
        normalize_keyframes(&mut frames).unwrap();
        assert_eq!(frames[0].props.get("left"), Some(&CssValue::Px(12.0)));
    }

    #[test]
    fn normalization_rejects_decreasing_offsets() {
        let mut frames = vec![
            Keyframe::at(0.8, map(&[("opacity", CssValue::Number(0.0))])),
            Keyframe::at(0.2, map(&[("opacity", CssValue::Number(1.0))])),
        ];
        assert!(normalize_keyframes(&mut frames).is_err());
    }

    #[test]
    fn normalization_parses_transform_text() {
        let mut frames = vec![Keyframe::new(map(&[(
            "transform",
            CssValue::Keyword("translate(10px, 0px)".into()),
        )]))];
        normalize_keyframes(&mut frames).unwrap();
        match frames[0].props.get("transform") {
            Some(CssValue::Transform(rule)) => {
                assert_eq!(rule.translate, Some([10.0, 0.0]));
            }
            other => panic!("expected structured transform, got {other:?}"),
        }
    }

    #[test]
    fn keyframe_json_shape_is_flat() {
        let frame: Keyframe =
            serde_json::from_str(r#"{"offset": 0.5, "easing": "ease-in", "width": 10}"#).unwrap();
        assert_eq!(frame.offset, Some(0.5));
        assert_eq!(frame.easing, Some(Ease::EaseIn));
        assert_eq!(frame.props.get("width"), Some(&CssValue::Number(10.0)));
    }
}
