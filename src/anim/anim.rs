use std::cell::RefCell;
use std::rc::Rc;

use crate::anim::keyframes::{Effect, ResolvedEffect, normalize_keyframes, resolve_effect};
use crate::anim::player::{Fill, PlaybackParams, Player, PlayerHandle};
use crate::foundation::error::{KineticError, KineticResult};
use crate::host::document::ElementId;
use crate::reflow::Promise;
use crate::stage::Stage;
use crate::style::accessor::css_write;
use crate::style::value::StyleMap;

/// Success branch of a [`Anim::ready`] registration: the native handle,
/// the effective playback parameters, and the first/last-seen frame
/// captures. Callers constructing dependent animations rely on this
/// four-part signature.
type ReadyFn = Box<dyn FnOnce(&PlayerHandle, &PlaybackParams, &StyleMap, &StyleMap)>;
type ErrorFn = Box<dyn FnOnce(&KineticError)>;
type EventFn = Box<dyn FnMut(ElementId)>;

struct ReadyState {
    player: PlayerHandle,
    first: StyleMap,
    last: StyleMap,
}

enum Resolution {
    Pending,
    Ready(ReadyState),
    Failed(KineticError),
}

struct AnimInner {
    element: ElementId,
    params: PlaybackParams,
    resolution: Resolution,
    ready_callbacks: Vec<(ReadyFn, Option<ErrorFn>)>,
    finish_callbacks: Vec<EventFn>,
    cancel_callbacks: Vec<EventFn>,
}

/// One animation over one element, wrapping exactly one native player.
///
/// Lifecycle: `pending` (effect unresolved) → `ready` (player created) →
/// `finished`/`cancelled` per playback, any number of times; or the
/// terminal `errored` state when effect resolution fails, surfaced through
/// [`Anim::ready`]'s error branch and a rejected [`Anim::play`] promise.
///
/// The finish/cancel/ready callback lists are append-only; there is no
/// unsubscribe. That matches the usual one-shot lifetime of these objects,
/// but a long-lived, replayed instance accumulates its callbacks.
#[derive(Clone)]
pub struct Anim {
    stage: Stage,
    inner: Rc<RefCell<AnimInner>>,
}

impl Anim {
    /// Create an animation from an effect and start resolving it. The
    /// underlying player auto-plays once resolution completes, like the
    /// platform primitive; use [`Anim::pause`] to hold it.
    pub fn new(stage: &Stage, el: ElementId, effect: Effect, params: PlaybackParams) -> Self {
        let anim = Self {
            stage: stage.clone(),
            inner: Rc::new(RefCell::new(AnimInner {
                element: el,
                params,
                resolution: Resolution::Pending,
                ready_callbacks: Vec::new(),
                finish_callbacks: Vec::new(),
                cancel_callbacks: Vec::new(),
            })),
        };
        let inner = Rc::clone(&anim.inner);
        let stage_init = stage.clone();
        resolve_effect(stage, el, effect, move |result| match result {
            Ok(resolved) => init(&stage_init, &inner, resolved),
            Err(e) => fail(&inner, e),
        });
        anim
    }

    /// The animated element.
    pub fn element(&self) -> ElementId {
        self.inner.borrow().element
    }

    /// Register for readiness. If resolution already failed this is a
    /// silent no-op (see [`Anim::ready_or`] for the error branch); if
    /// already resolved, `on_ok` runs immediately and synchronously.
    pub fn ready(
        &self,
        on_ok: impl FnOnce(&PlayerHandle, &PlaybackParams, &StyleMap, &StyleMap) + 'static,
    ) {
        self.ready_impl(Box::new(on_ok), None);
    }

    /// [`Anim::ready`] with an error branch. Whether registered before or
    /// after resolution, exactly one branch runs exactly once.
    pub fn ready_or(
        &self,
        on_ok: impl FnOnce(&PlayerHandle, &PlaybackParams, &StyleMap, &StyleMap) + 'static,
        on_err: impl FnOnce(&KineticError) + 'static,
    ) {
        self.ready_impl(Box::new(on_ok), Some(Box::new(on_err)));
    }

    fn ready_impl(&self, on_ok: ReadyFn, on_err: Option<ErrorFn>) {
        let dispatch = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.resolution, Resolution::Pending) {
                inner.ready_callbacks.push((on_ok, on_err));
                return;
            }
            let params = inner.params.clone();
            match &inner.resolution {
                Resolution::Failed(e) => Err(e.duplicate()),
                Resolution::Ready(state) => Ok((
                    Rc::clone(&state.player),
                    params,
                    state.first.clone(),
                    state.last.clone(),
                )),
                Resolution::Pending => unreachable!("handled above"),
            }
        };
        match dispatch {
            Ok((player, params, first, last)) => on_ok(&player, &params, &first, &last),
            Err(e) => {
                if let Some(on_err) = on_err {
                    on_err(&e);
                }
            }
        }
    }

    /// Bind a callback to the finish event. Invoked every time the
    /// animation finishes.
    pub fn onfinish(&self, callback: impl FnMut(ElementId) + 'static) -> &Self {
        self.inner.borrow_mut().finish_callbacks.push(Box::new(callback));
        self
    }

    /// Bind a callback to the cancel event.
    pub fn oncancel(&self, callback: impl FnMut(ElementId) + 'static) -> &Self {
        self.inner.borrow_mut().cancel_callbacks.push(Box::new(callback));
        self
    }

    /// Play, returning a promise fulfilled on finish and rejected on
    /// cancel (or on resolution failure).
    pub fn play(&self) -> Promise<()> {
        let (promise, settle) = Promise::pending();
        let on_finish = settle.clone();
        let on_cancel = settle.clone();
        self.onfinish(move |_| on_finish.resolve(()));
        self.oncancel(move |_| on_cancel.reject(KineticError::animation("animation cancelled")));
        self.ready_or(
            |player, _, _, _| player.borrow_mut().play(),
            move |e| settle.reject(e.duplicate()),
        );
        promise
    }

    /// Hold the current position.
    pub fn pause(&self) -> &Self {
        self.ready(|player, _, _, _| player.borrow_mut().pause());
        self
    }

    /// Flip playback direction.
    pub fn reverse(&self) -> &Self {
        self.ready(|player, _, _, _| player.borrow_mut().reverse());
        self
    }

    /// Jump to the end boundary and fire finish.
    pub fn finish(&self) -> &Self {
        self.ready(|player, _, _, _| {
            if let Err(e) = player.borrow_mut().finish() {
                tracing::debug!("finish ignored: {e}");
            }
        });
        self
    }

    /// Cancel the underlying player; the element's visual state reverts.
    pub fn cancel(&self) -> &Self {
        self.ready(|player, _, _, _| player.borrow_mut().cancel());
        self
    }

    /// Seek to `fraction` of the duration, clamped to `[0, duration]`.
    /// A non-finite fraction is an invalid argument, reported
    /// synchronously.
    pub fn seek(&self, fraction: f64) -> KineticResult<&Self> {
        if !fraction.is_finite() {
            return Err(KineticError::animation(
                "seek accepts only a finite numeric fraction",
            ));
        }
        self.ready(move |player, _, _, _| player.borrow_mut().seek_fraction(fraction));
        Ok(self)
    }

    /// Current position divided by duration; `0` while unresolved.
    pub fn progress(&self) -> f64 {
        match &self.inner.borrow().resolution {
            Resolution::Ready(state) => state.player.borrow().progress(),
            _ => 0.0,
        }
    }
}

fn init(stage: &Stage, inner: &Rc<RefCell<AnimInner>>, resolved: ResolvedEffect) {
    let ResolvedEffect {
        mut frames,
        fill,
        iterations,
    } = resolved;
    let (first, last) = match normalize_keyframes(&mut frames) {
        Ok(captures) => captures,
        Err(e) => {
            fail(inner, e);
            return;
        }
    };

    let (element, params) = {
        let mut borrow = inner.borrow_mut();
        // Stylesheet-declared playback properties travel with the named
        // animation and take precedence.
        if let Some(fill) = fill {
            borrow.params.fill = fill;
        }
        if let Some(iterations) = iterations {
            borrow.params.iterations = iterations;
        }
        (borrow.element, borrow.params.clone())
    };

    let player = match Player::new(element, frames, params.clone()) {
        Ok(player) => Rc::new(RefCell::new(player)),
        Err(e) => {
            fail(inner, e);
            return;
        }
    };
    stage.players().register(&player);

    {
        let weak_inner = Rc::downgrade(inner);
        let weak_player = Rc::downgrade(&player);
        let stage_finish = stage.clone();
        let last_frame = last.clone();
        player.borrow_mut().set_on_finish(move || {
            let Some(inner) = weak_inner.upgrade() else {
                return;
            };
            let (element, params) = {
                let borrow = inner.borrow();
                (borrow.element, borrow.params.clone())
            };
            if params.cancel_for_css {
                if let Some(player) = weak_player.upgrade() {
                    player.borrow_mut().cancel();
                }
                if matches!(params.fill, Fill::Forwards | Fill::Both) {
                    let _ = css_write(&stage_finish, element, last_frame.clone());
                }
            }
            run_event_callbacks(&inner, EventKind::Finish);
        });
    }
    {
        let weak_inner = Rc::downgrade(inner);
        player.borrow_mut().set_on_cancel(move || {
            let Some(inner) = weak_inner.upgrade() else {
                return;
            };
            run_event_callbacks(&inner, EventKind::Cancel);
        });
    }

    let pending = {
        let mut borrow = inner.borrow_mut();
        borrow.resolution = Resolution::Ready(ReadyState {
            player: Rc::clone(&player),
            first: first.clone(),
            last: last.clone(),
        });
        std::mem::take(&mut borrow.ready_callbacks)
    };
    let params = inner.borrow().params.clone();
    for (on_ok, _) in pending {
        on_ok(&player, &params, &first, &last);
    }
}

fn fail(inner: &Rc<RefCell<AnimInner>>, error: KineticError) {
    let pending = {
        let mut borrow = inner.borrow_mut();
        borrow.resolution = Resolution::Failed(error.duplicate());
        std::mem::take(&mut borrow.ready_callbacks)
    };
    for (_, on_err) in pending {
        if let Some(on_err) = on_err {
            on_err(&error);
        }
    }
}

#[derive(Clone, Copy)]
enum EventKind {
    Finish,
    Cancel,
}

fn run_event_callbacks(inner: &Rc<RefCell<AnimInner>>, kind: EventKind) {
    let element = inner.borrow().element;
    let mut list = {
        let mut borrow = inner.borrow_mut();
        match kind {
            EventKind::Finish => std::mem::take(&mut borrow.finish_callbacks),
            EventKind::Cancel => std::mem::take(&mut borrow.cancel_callbacks),
        }
    };
    for callback in &mut list {
        callback(element);
    }
    // Callbacks may have registered more callbacks while the list was out.
    let mut borrow = inner.borrow_mut();
    let slot = match kind {
        EventKind::Finish => &mut borrow.finish_callbacks,
        EventKind::Cancel => &mut borrow.cancel_callbacks,
    };
    let appended = std::mem::take(slot);
    list.extend(appended);
    *slot = list;
}
