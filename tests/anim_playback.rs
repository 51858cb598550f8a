use std::cell::Cell;
use std::rc::Rc;

use kinetic::host::{KeyframeStop, Stylesheet};
use kinetic::{
    Anim, CssValue, Effect, ElementData, ElementId, Fill, Keyframe, PlaybackParams, Rect, Size,
    Stage, StyleMap, Timeline,
};

fn stage_with_element() -> (Stage, ElementId) {
    let stage = Stage::new();
    let el = stage.document().insert(ElementData {
        border_box: Rect {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
        },
        content_size: Size {
            width: 240.0,
            height: 80.0,
        },
        ..ElementData::default()
    });
    (stage, el)
}

fn run_ticks(stage: &Stage, count: u32, step_ms: f64) {
    tick_span(stage, 0.0, count, step_ms);
}

fn tick_span(stage: &Stage, start_ms: f64, count: u32, step_ms: f64) {
    for t in 0..count {
        stage.tick(start_ms + f64::from(t) * step_ms);
    }
}

fn opacity_frames(from: f64, to: f64) -> Vec<Keyframe> {
    let mut a = StyleMap::new();
    a.insert("opacity".to_owned(), CssValue::Number(from));
    let mut b = StyleMap::new();
    b.insert("opacity".to_owned(), CssValue::Number(to));
    vec![Keyframe::new(a), Keyframe::new(b)]
}

#[test]
fn keyframe_animation_plays_to_finish_and_fulfills() {
    let (stage, el) = stage_with_element();
    let anim = Anim::new(
        &stage,
        el,
        Effect::Keyframes(opacity_frames(0.0, 1.0)),
        PlaybackParams {
            duration: 100.0,
            ..PlaybackParams::default()
        },
    );
    let finished = Rc::new(Cell::new(false));
    let f = Rc::clone(&finished);
    anim.play().done(move |r| f.set(r.is_ok()));

    run_ticks(&stage, 10, 16.0);
    assert!(finished.get());
    // Fill both holds the last frame on the overlay.
    assert_eq!(
        stage.document().effective_value(el, "opacity").unwrap(),
        Some(CssValue::Number(1.0))
    );
}

#[test]
fn end_state_effect_measures_the_current_value_first() {
    let (stage, el) = stage_with_element();
    stage
        .document()
        .set_inline(el, "opacity", CssValue::Number(0.8))
        .unwrap();
    let mut target = StyleMap::new();
    target.insert("opacity".to_owned(), CssValue::Number(0.0));
    let anim = Anim::new(
        &stage,
        el,
        Effect::EndState(target),
        PlaybackParams {
            duration: 100.0,
            ..PlaybackParams::default()
        },
    );

    let first_seen = Rc::new(Cell::new(f64::NAN));
    let seen = Rc::clone(&first_seen);
    anim.ready(move |_player, _params, first, _last| {
        if let Some(CssValue::Number(v)) = first.get("opacity") {
            seen.set(*v);
        }
    });
    // Resolution needs a read phase.
    run_ticks(&stage, 2, 16.0);
    assert_eq!(first_seen.get(), 0.8);
}

#[test]
fn seek_then_progress_round_trips_at_half() {
    let (stage, el) = stage_with_element();
    let anim = Anim::new(
        &stage,
        el,
        Effect::Keyframes(opacity_frames(0.0, 1.0)),
        PlaybackParams::default(),
    );
    anim.pause();
    anim.seek(0.5).unwrap();
    run_ticks(&stage, 2, 16.0);
    assert!((anim.progress() - 0.5).abs() < 1e-9);
    assert!(anim.seek(f64::NAN).is_err());
}

#[test]
fn cancel_rejects_the_play_promise() {
    let (stage, el) = stage_with_element();
    let anim = Anim::new(
        &stage,
        el,
        Effect::Keyframes(opacity_frames(0.0, 1.0)),
        PlaybackParams {
            duration: 10_000.0,
            ..PlaybackParams::default()
        },
    );
    let outcome = Rc::new(Cell::new(0i32));
    let o = Rc::clone(&outcome);
    anim.play().done(move |r| o.set(if r.is_ok() { 1 } else { -1 }));
    run_ticks(&stage, 2, 16.0);
    anim.cancel();
    tick_span(&stage, 32.0, 2, 16.0);
    assert_eq!(outcome.get(), -1);
    // Overlay dropped: visual state reverted.
    assert_eq!(stage.document().effective_value(el, "opacity").unwrap(), None);
}

#[test]
fn missing_named_animation_reaches_the_error_branch_and_rejects_play() {
    let (stage, el) = stage_with_element();
    let anim = Anim::new(
        &stage,
        el,
        Effect::Named("does-not-exist".to_owned()),
        PlaybackParams::default(),
    );
    let errored = Rc::new(Cell::new(false));
    let e = Rc::clone(&errored);
    anim.ready_or(|_, _, _, _| {}, move |_err| e.set(true));
    assert!(errored.get());

    let rejected = Rc::new(Cell::new(false));
    let r = Rc::clone(&rejected);
    anim.play().done(move |result| r.set(result.is_err()));
    assert!(rejected.get());
}

#[test]
fn named_animation_resolves_from_the_stylesheet() {
    let (stage, el) = stage_with_element();
    stage.document().push_stylesheet(Stylesheet::default().keyframes(
        "fade-out",
        vec![
            KeyframeStop::parse("from", "opacity: 1").unwrap(),
            KeyframeStop::parse("to", "opacity: 0").unwrap(),
        ],
    ));
    let anim = Anim::new(
        &stage,
        el,
        Effect::Named("fade-out".to_owned()),
        PlaybackParams {
            duration: 100.0,
            ..PlaybackParams::default()
        },
    );
    let finished = Rc::new(Cell::new(false));
    let f = Rc::clone(&finished);
    anim.play().done(move |r| f.set(r.is_ok()));
    run_ticks(&stage, 10, 16.0);
    assert!(finished.get());
    assert_eq!(
        stage.document().effective_value(el, "opacity").unwrap(),
        Some(CssValue::Number(0.0))
    );
}

#[test]
fn cancel_for_css_freezes_the_end_state_inline() {
    let (stage, el) = stage_with_element();
    let mut from = StyleMap::new();
    from.insert("width".to_owned(), CssValue::Number(0.0));
    let mut to = StyleMap::new();
    to.insert("width".to_owned(), CssValue::Number(100.0));
    let anim = Anim::new(
        &stage,
        el,
        Effect::Keyframes(vec![Keyframe::new(from), Keyframe::new(to)]),
        PlaybackParams {
            duration: 100.0,
            fill: Fill::Both,
            cancel_for_css: true,
            ..PlaybackParams::default()
        },
    );
    let finished = Rc::new(Cell::new(false));
    let f = Rc::clone(&finished);
    anim.play().done(move |r| f.set(r.is_ok()));
    run_ticks(&stage, 12, 16.0);
    assert!(finished.get());
    // The native effect is gone; the end state lives on as inline style.
    assert_eq!(
        stage.document().inline_value(el, "width").unwrap(),
        Some(CssValue::Px(100.0))
    );
    assert!(
        stage
            .document()
            .with_element(el, |e| e.animated.is_empty())
            .unwrap()
    );
}

#[test]
fn auto_size_keyframes_resolve_to_the_natural_size() {
    let (stage, el) = stage_with_element();
    let mut from = StyleMap::new();
    from.insert("width".to_owned(), CssValue::Number(0.0));
    let mut to = StyleMap::new();
    to.insert("width".to_owned(), CssValue::Keyword("auto".into()));
    let anim = Anim::new(
        &stage,
        el,
        Effect::Keyframes(vec![Keyframe::new(from), Keyframe::new(to)]),
        PlaybackParams {
            duration: 100.0,
            ..PlaybackParams::default()
        },
    );
    let resolved_width = Rc::new(Cell::new(f64::NAN));
    let w = Rc::clone(&resolved_width);
    anim.ready(move |_player, _params, _first, last| {
        if let Some(CssValue::Px(v)) = last.get("width") {
            w.set(*v);
        }
    });
    // Auto-size probing spans a write, a read, and a restoring write.
    run_ticks(&stage, 4, 16.0);
    assert_eq!(resolved_width.get(), 240.0);
}

#[test]
fn timeline_progress_is_the_plain_average() {
    let (stage, el) = stage_with_element();
    let el2 = stage.document().insert(ElementData::default());
    let a = Anim::new(
        &stage,
        el,
        Effect::Keyframes(opacity_frames(0.0, 1.0)),
        PlaybackParams::default(),
    );
    let b = Anim::new(
        &stage,
        el2,
        Effect::Keyframes(opacity_frames(1.0, 0.0)),
        PlaybackParams::default(),
    );
    a.pause();
    b.pause();
    a.seek(0.25).unwrap();
    b.seek(0.75).unwrap();
    let timeline = Timeline::new(vec![a, b]);
    assert!((timeline.progress() - 0.5).abs() < 1e-9);
}

#[test]
fn timeline_play_fulfills_when_every_member_finishes() {
    let (stage, el) = stage_with_element();
    let el2 = stage.document().insert(ElementData::default());
    let timeline = Timeline::new(vec![
        Anim::new(
            &stage,
            el,
            Effect::Keyframes(opacity_frames(0.0, 1.0)),
            PlaybackParams {
                duration: 50.0,
                ..PlaybackParams::default()
            },
        ),
        Anim::new(
            &stage,
            el2,
            Effect::Keyframes(opacity_frames(0.0, 1.0)),
            PlaybackParams {
                duration: 120.0,
                ..PlaybackParams::default()
            },
        ),
    ]);
    let finished = Rc::new(Cell::new(false));
    let f = Rc::clone(&finished);
    timeline.play().done(move |r| f.set(r.is_ok()));
    run_ticks(&stage, 5, 16.0);
    assert!(!finished.get(), "slow member still running");
    tick_span(&stage, 80.0, 10, 16.0);
    assert!(finished.get());
}
