use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::anim::ease::Ease;
use crate::anim::keyframes::Keyframe;
use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::{Document, ElementId};
use crate::reflow::Reflow;
use crate::style::transform::TransformRule;
use crate::style::value::{CssValue, StyleMap};

/// How an animation applies styles outside its active interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    /// No effect outside the active interval.
    #[default]
    None,
    /// Hold the last frame after finishing.
    Forwards,
    /// Apply the first frame during the delay phase.
    Backwards,
    /// Both directions.
    Both,
}

impl Fill {
    /// Parse a CSS `animation-fill-mode` keyword.
    pub fn parse(input: &str) -> KineticResult<Self> {
        match input.trim() {
            "none" => Ok(Self::None),
            "forwards" => Ok(Self::Forwards),
            "backwards" => Ok(Self::Backwards),
            "both" => Ok(Self::Both),
            other => Err(KineticError::animation(format!(
                "unrecognized fill mode \"{other}\""
            ))),
        }
    }

    fn at_end(self) -> bool {
        matches!(self, Self::Forwards | Self::Both)
    }

    fn at_start(self) -> bool {
        matches!(self, Self::Backwards | Self::Both)
    }
}

/// Playback parameters for one animation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    /// Active duration of one iteration, in milliseconds.
    pub duration: f64,
    /// Delay before the active interval, in milliseconds.
    pub delay: f64,
    /// Easing applied across each iteration.
    pub easing: Ease,
    /// Fill behavior outside the active interval.
    pub fill: Fill,
    /// Iteration count; `f64::INFINITY` loops forever.
    pub iterations: f64,
    /// Start playing in reverse.
    pub reverse: bool,
    /// On finish, cancel the underlying animation and freeze the element's
    /// style at the last keyframe's resolved values instead of relying on
    /// fill.
    pub cancel_for_css: bool,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            duration: 400.0,
            delay: 0.0,
            easing: Ease::Linear,
            fill: Fill::Both,
            iterations: 1.0,
            reverse: false,
            cancel_for_css: false,
        }
    }
}

/// Player lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    /// Not playing and holding no effect (freshly cancelled).
    Idle,
    /// Advancing with the scheduler clock.
    Running,
    /// Holding position.
    Paused,
    /// Reached a timeline boundary.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerEvent {
    Finish,
    Cancel,
}

enum OverlayAction {
    Set(StyleMap),
    Clear,
}

/// Shared handle to a [`Player`].
pub type PlayerHandle = Rc<RefCell<Player>>;

/// The native timeline engine behind [`crate::anim::Anim`]: keyframe
/// sampling against a clock advanced by the scheduler's write phase.
///
/// Construction auto-plays, like the platform animation primitive it
/// stands in for. Finish/cancel events are delivered on the tick after
/// they occur, never re-entrantly.
pub struct Player {
    element: ElementId,
    frames: Vec<Keyframe>,
    offsets: Vec<f64>,
    params: PlaybackParams,
    state: PlayState,
    current_time: f64,
    rate: f64,
    events: SmallVec<[PlayerEvent; 2]>,
    on_finish: Option<Box<dyn FnMut()>>,
    on_cancel: Option<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("element", &self.element)
            .field("state", &self.state)
            .field("current_time", &self.current_time)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl Player {
    /// Create a player over normalized keyframes. Rejects empty keyframe
    /// lists and degenerate timing up front, the way the platform engine
    /// rejects malformed effects.
    pub fn new(
        element: ElementId,
        frames: Vec<Keyframe>,
        params: PlaybackParams,
    ) -> KineticResult<Self> {
        if frames.is_empty() {
            return Err(KineticError::animation("keyframe list must not be empty"));
        }
        if !(params.duration.is_finite() && params.duration > 0.0) {
            return Err(KineticError::animation("duration must be a positive number"));
        }
        if !(params.iterations > 0.0) {
            return Err(KineticError::animation("iterations must be > 0"));
        }
        let offsets = space_offsets(&frames);
        let mut player = Self {
            element,
            frames,
            offsets,
            state: PlayState::Running,
            current_time: 0.0,
            rate: 1.0,
            events: SmallVec::new(),
            on_finish: None,
            on_cancel: None,
            params,
        };
        if player.params.reverse {
            player.reverse();
        }
        Ok(player)
    }

    /// The element this player writes to.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Playback parameters.
    pub fn params(&self) -> &PlaybackParams {
        &self.params
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Current position on the local timeline, in milliseconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Position divided by one iteration's duration.
    pub fn progress(&self) -> f64 {
        self.current_time / self.params.duration
    }

    fn total_time(&self) -> f64 {
        if self.params.iterations.is_finite() {
            self.params.delay + self.params.duration * self.params.iterations
        } else {
            f64::INFINITY
        }
    }

    /// Resume (or restart, after a boundary) playback.
    pub fn play(&mut self) {
        match self.state {
            PlayState::Running => {}
            PlayState::Paused => self.state = PlayState::Running,
            PlayState::Idle | PlayState::Finished => {
                self.current_time = if self.rate < 0.0 && self.total_time().is_finite() {
                    self.total_time()
                } else {
                    0.0
                };
                self.state = PlayState::Running;
            }
        }
    }

    /// Hold the current position.
    pub fn pause(&mut self) {
        if self.state == PlayState::Running {
            self.state = PlayState::Paused;
        }
    }

    /// Flip playback direction and resume; at a boundary, restart from the
    /// opposite end.
    pub fn reverse(&mut self) {
        self.rate = -self.rate;
        if self.rate < 0.0 && self.current_time <= 0.0 && self.total_time().is_finite() {
            self.current_time = self.total_time();
        } else if self.rate > 0.0
            && self.total_time().is_finite()
            && self.current_time >= self.total_time()
        {
            self.current_time = 0.0;
        }
        self.state = PlayState::Running;
    }

    /// Jump straight to the end boundary for the current direction and
    /// fire the finish event.
    pub fn finish(&mut self) -> KineticResult<()> {
        if self.rate > 0.0 && !self.total_time().is_finite() {
            return Err(KineticError::animation(
                "cannot finish an infinitely iterating animation",
            ));
        }
        self.current_time = if self.rate > 0.0 { self.total_time() } else { 0.0 };
        self.finish_internal();
        Ok(())
    }

    /// Cancel: drop the effect and fire the cancel event. The element's
    /// visual state reverts to its underlying styles.
    pub fn cancel(&mut self) {
        if self.state == PlayState::Idle {
            return;
        }
        self.state = PlayState::Idle;
        self.current_time = 0.0;
        self.events.push(PlayerEvent::Cancel);
    }

    /// Seek to `fraction` of one iteration's duration, clamped to
    /// `[0, duration]`.
    pub fn seek_fraction(&mut self, fraction: f64) {
        self.current_time = (fraction * self.params.duration)
            .min(self.params.duration)
            .max(0.0);
    }

    /// Install the single native finish handler.
    pub fn set_on_finish(&mut self, handler: impl FnMut() + 'static) {
        self.on_finish = Some(Box::new(handler));
    }

    /// Install the single native cancel handler.
    pub fn set_on_cancel(&mut self, handler: impl FnMut() + 'static) {
        self.on_cancel = Some(Box::new(handler));
    }

    fn finish_internal(&mut self) {
        self.state = PlayState::Finished;
        self.events.push(PlayerEvent::Finish);
    }

    fn take_events(&mut self) -> SmallVec<[PlayerEvent; 2]> {
        std::mem::take(&mut self.events)
    }

    fn advance(&mut self, dt: f64) -> OverlayAction {
        if self.state == PlayState::Running {
            self.current_time += dt * self.rate;
            let total = self.total_time();
            if self.rate > 0.0 && total.is_finite() && self.current_time >= total {
                self.current_time = total;
                self.finish_internal();
            } else if self.rate < 0.0 && self.current_time <= 0.0 {
                self.current_time = 0.0;
                self.finish_internal();
            }
        }
        self.overlay_action()
    }

    fn overlay_action(&self) -> OverlayAction {
        match self.state {
            PlayState::Idle => OverlayAction::Clear,
            PlayState::Running | PlayState::Paused | PlayState::Finished => {
                match self.sample_styles() {
                    Some(map) => OverlayAction::Set(map),
                    None => OverlayAction::Clear,
                }
            }
        }
    }

    /// Styles the effect contributes at the current time, or `None` when
    /// the effect is outside its active interval and fill does not apply.
    fn sample_styles(&self) -> Option<StyleMap> {
        let active = self.current_time - self.params.delay;
        if active < 0.0 {
            if self.params.fill.at_start() {
                return Some(self.sample_at(self.params.easing.apply(0.0)));
            }
            return None;
        }
        let duration = self.params.duration;
        let total_active = duration * self.params.iterations;
        let clamped = if total_active.is_finite() {
            active.min(total_active)
        } else {
            active
        };
        let mut iteration_progress = (clamped % duration) / duration;
        if total_active.is_finite() && clamped >= total_active && iteration_progress == 0.0 {
            iteration_progress = 1.0;
        }
        if self.state == PlayState::Finished
            && !(if self.rate >= 0.0 {
                self.params.fill.at_end()
            } else {
                self.params.fill.at_start()
            })
        {
            return None;
        }
        Some(self.sample_at(self.params.easing.apply(iteration_progress)))
    }

    /// Interpolate every animated property at eased iteration progress `p`.
    fn sample_at(&self, p: f64) -> StyleMap {
        let mut out = StyleMap::new();
        let props: BTreeSet<&String> = self.frames.iter().flat_map(|f| f.props.keys()).collect();
        for prop in props {
            let stops: Vec<(f64, &CssValue, Option<Ease>)> = self
                .frames
                .iter()
                .zip(&self.offsets)
                .filter_map(|(frame, offset)| {
                    frame.props.get(prop).map(|v| (*offset, v, frame.easing))
                })
                .collect();
            let Some(first) = stops.first() else { continue };
            let last = stops.last().expect("non-empty stops");
            let value = if p <= first.0 {
                first.1.clone()
            } else if p >= last.0 {
                last.1.clone()
            } else {
                let idx = stops.iter().rposition(|(o, _, _)| *o <= p).unwrap_or(0);
                let (o1, from, segment_ease) = stops[idx];
                let (o2, to, _) = stops[idx + 1];
                let span = o2 - o1;
                let t = if span > 0.0 { (p - o1) / span } else { 1.0 };
                let t = segment_ease.map_or(t, |e| e.apply(t));
                lerp_value(from, to, t)
            };
            out.insert(prop.clone(), value);
        }
        out
    }
}

/// Interpolate two CSS values; mismatched kinds fall back to a discrete
/// switch at the midpoint.
fn lerp_value(a: &CssValue, b: &CssValue, t: f64) -> CssValue {
    match (a, b) {
        (CssValue::Px(x), CssValue::Px(y)) => CssValue::Px(x + (y - x) * t),
        (CssValue::Number(x), CssValue::Number(y)) => CssValue::Number(x + (y - x) * t),
        (CssValue::Percent(x), CssValue::Percent(y)) => CssValue::Percent(x + (y - x) * t),
        (CssValue::Transform(x), CssValue::Transform(y)) => {
            CssValue::Transform(TransformRule::lerp(x, y, t))
        }
        _ => {
            if t < 0.5 {
                a.clone()
            } else {
                b.clone()
            }
        }
    }
}

/// Resolve keyframe spacing: explicit offsets stay, the first and last
/// frames anchor at 0 and 1, and unanchored runs are spaced evenly between
/// their neighbors.
fn space_offsets(frames: &[Keyframe]) -> Vec<f64> {
    let n = frames.len();
    let mut offsets: Vec<Option<f64>> = frames.iter().map(|f| f.offset).collect();
    if n == 0 {
        return Vec::new();
    }
    if offsets[0].is_none() {
        offsets[0] = Some(0.0);
    }
    if offsets[n - 1].is_none() {
        offsets[n - 1] = Some(if n == 1 { 0.0 } else { 1.0 });
    }
    let mut i = 1;
    while i < n {
        if offsets[i].is_some() {
            i += 1;
            continue;
        }
        let start = i - 1;
        let mut j = i;
        while offsets[j].is_none() {
            j += 1;
        }
        let a = offsets[start].unwrap_or(0.0);
        let b = offsets[j].unwrap_or(1.0);
        let step = (b - a) / (j - start) as f64;
        for k in (start + 1)..j {
            offsets[k] = Some(a + step * (k - start) as f64);
        }
        i = j;
    }
    offsets.into_iter().map(|o| o.unwrap_or(0.0)).collect()
}

/// Registry of live players, pumped once per scheduler tick in the write
/// phase. Holds only weak references: dropping every [`PlayerHandle`]
/// retires the player.
#[derive(Default)]
pub(crate) struct PlayerRegistry {
    players: RefCell<Vec<Weak<RefCell<Player>>>>,
    last_now: Cell<Option<f64>>,
}

impl PlayerRegistry {
    /// Create a registry and bind its pump as a repeating write callback.
    /// The pump holds only weak handles, so neither the scheduler nor the
    /// registry keeps the other alive.
    pub(crate) fn attach(reflow: &Rc<Reflow>, document: &Rc<Document>) -> Rc<Self> {
        let registry = Rc::new(Self::default());
        let weak = Rc::downgrade(&registry);
        let clock = Rc::downgrade(reflow);
        let doc = Rc::clone(document);
        reflow.onwrite(move || {
            let (Some(registry), Some(clock)) = (weak.upgrade(), clock.upgrade()) else {
                return false;
            };
            registry.pump(clock.now(), &doc);
            true
        });
        registry
    }

    pub(crate) fn register(&self, player: &PlayerHandle) {
        self.players.borrow_mut().push(Rc::downgrade(player));
    }

    fn pump(&self, now: f64, doc: &Document) {
        let dt = now - self.last_now.get().unwrap_or(now);
        self.last_now.set(Some(now));
        let live: Vec<PlayerHandle> = self
            .players
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        self.players.borrow_mut().retain(|w| w.strong_count() > 0);
        for player in live {
            let (element, action, events) = {
                let mut p = player.borrow_mut();
                let action = p.advance(dt);
                (p.element, action, p.take_events())
            };
            match action {
                OverlayAction::Set(map) => {
                    let _ = doc.set_animated_overlay(element, map);
                }
                OverlayAction::Clear => {
                    let _ = doc.clear_animated_overlay(element);
                }
            }
            for event in events {
                fire_event(&player, event);
            }
        }
    }
}

fn fire_event(player: &PlayerHandle, event: PlayerEvent) {
    let handler = {
        let mut p = player.borrow_mut();
        match event {
            PlayerEvent::Finish => p.on_finish.take(),
            PlayerEvent::Cancel => p.on_cancel.take(),
        }
    };
    if let Some(mut h) = handler {
        h();
        let mut p = player.borrow_mut();
        let slot = match event {
            PlayerEvent::Finish => &mut p.on_finish,
            PlayerEvent::Cancel => &mut p.on_cancel,
        };
        if slot.is_none() {
            *slot = Some(h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(from: f64, to: f64) -> Vec<Keyframe> {
        let mut a = StyleMap::new();
        a.insert("opacity".to_owned(), CssValue::Number(from));
        let mut b = StyleMap::new();
        b.insert("opacity".to_owned(), CssValue::Number(to));
        vec![Keyframe::new(a), Keyframe::new(b)]
    }

    fn opacity_of(map: &StyleMap) -> f64 {
        match map.get("opacity") {
            Some(CssValue::Number(v)) => *v,
            other => panic!("no opacity in {other:?}"),
        }
    }

    #[test]
    fn spacing_distributes_unanchored_frames() {
        let list = vec![
            Keyframe::default(),
            Keyframe::default(),
            Keyframe::at(0.8, StyleMap::new()),
            Keyframe::default(),
        ];
        assert_eq!(space_offsets(&list), vec![0.0, 0.4, 0.8, 1.0]);
    }

    #[test]
    fn advance_interpolates_and_finishes() {
        let mut p = Player::new(
            ElementId(0),
            frames(0.0, 1.0),
            PlaybackParams {
                duration: 100.0,
                ..PlaybackParams::default()
            },
        )
        .unwrap();
        match p.advance(50.0) {
            OverlayAction::Set(map) => assert!((opacity_of(&map) - 0.5).abs() < 1e-9),
            OverlayAction::Clear => panic!("expected overlay"),
        }
        match p.advance(100.0) {
            OverlayAction::Set(map) => assert!((opacity_of(&map) - 1.0).abs() < 1e-9),
            OverlayAction::Clear => panic!("expected fill at end"),
        }
        assert_eq!(p.state(), PlayState::Finished);
        assert_eq!(p.take_events().as_slice(), &[PlayerEvent::Finish]);
    }

    #[test]
    fn no_fill_clears_after_finish() {
        let mut p = Player::new(
            ElementId(0),
            frames(0.0, 1.0),
            PlaybackParams {
                duration: 100.0,
                fill: Fill::None,
                ..PlaybackParams::default()
            },
        )
        .unwrap();
        assert!(matches!(p.advance(150.0), OverlayAction::Clear));
    }

    #[test]
    fn seek_and_progress_agree() {
        let mut p = Player::new(ElementId(0), frames(0.0, 1.0), PlaybackParams::default()).unwrap();
        p.seek_fraction(0.5);
        assert!((p.progress() - 0.5).abs() < 1e-9);
        p.seek_fraction(4.0);
        assert!((p.progress() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reverse_from_start_plays_from_the_end() {
        let mut p = Player::new(
            ElementId(0),
            frames(0.0, 1.0),
            PlaybackParams {
                duration: 100.0,
                ..PlaybackParams::default()
            },
        )
        .unwrap();
        p.reverse();
        assert_eq!(p.current_time(), 100.0);
        p.advance(60.0);
        assert!((p.current_time() - 40.0).abs() < 1e-9);
        p.advance(60.0);
        assert_eq!(p.state(), PlayState::Finished);
    }

    #[test]
    fn cancel_queues_cancel_event_and_clears() {
        let mut p = Player::new(ElementId(0), frames(0.0, 1.0), PlaybackParams::default()).unwrap();
        p.cancel();
        assert!(matches!(p.advance(16.0), OverlayAction::Clear));
        assert_eq!(p.take_events().as_slice(), &[PlayerEvent::Cancel]);
    }

    #[test]
    fn delay_holds_first_frame_with_backwards_fill() {
        let mut p = Player::new(
            ElementId(0),
            frames(0.25, 1.0),
            PlaybackParams {
                duration: 100.0,
                delay: 50.0,
                fill: Fill::Both,
                ..PlaybackParams::default()
            },
        )
        .unwrap();
        match p.advance(10.0) {
            OverlayAction::Set(map) => assert!((opacity_of(&map) - 0.25).abs() < 1e-9),
            OverlayAction::Clear => panic!("expected backwards fill"),
        }
    }

    #[test]
    fn explicit_segment_easing_applies_between_stops() {
        let mut a = StyleMap::new();
        a.insert("opacity".to_owned(), CssValue::Number(0.0));
        let mut b = StyleMap::new();
        b.insert("opacity".to_owned(), CssValue::Number(1.0));
        let mut first = Keyframe::new(a);
        first.easing = Some(Ease::Steps(1, crate::anim::ease::StepPosition::End));
        let list = vec![first, Keyframe::new(b)];
        let mut p = Player::new(
            ElementId(0),
            list,
            PlaybackParams {
                duration: 100.0,
                ..PlaybackParams::default()
            },
        )
        .unwrap();
        match p.advance(99.0) {
            OverlayAction::Set(map) => assert_eq!(opacity_of(&map), 0.0),
            OverlayAction::Clear => panic!("expected overlay"),
        }
    }
}
