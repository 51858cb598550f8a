use std::cell::RefCell;

use crate::anim::anim::Anim;
use crate::foundation::error::KineticResult;
use crate::reflow::Promise;

/// An ordered collection of [`Anim`] instances driven as one unit.
///
/// The timeline has no timing state of its own: every query aggregates
/// over the members, every command broadcasts to them.
#[derive(Default)]
pub struct Timeline {
    animations: RefCell<Vec<Anim>>,
}

impl Timeline {
    /// Build a timeline over the given animations.
    pub fn new(animations: Vec<Anim>) -> Self {
        Self {
            animations: RefCell::new(animations),
        }
    }

    /// Append an animation.
    pub fn add(&self, anim: Anim) -> &Self {
        self.animations.borrow_mut().push(anim);
        self
    }

    /// Drop all animations.
    pub fn clear(&self) -> &Self {
        self.animations.borrow_mut().clear();
        self
    }

    /// Number of member animations.
    pub fn len(&self) -> usize {
        self.animations.borrow().len()
    }

    /// Whether the timeline has no members.
    pub fn is_empty(&self) -> bool {
        self.animations.borrow().is_empty()
    }

    /// Seek every member to `fraction`; each member validates the input.
    pub fn seek(&self, fraction: f64) -> KineticResult<&Self> {
        for anim in self.animations.borrow().iter() {
            anim.seek(fraction)?;
        }
        Ok(self)
    }

    /// Mean progress across members; `0` when empty.
    pub fn progress(&self) -> f64 {
        let animations = self.animations.borrow();
        if animations.is_empty() {
            return 0.0;
        }
        let sum: f64 = animations.iter().map(Anim::progress).sum();
        sum / animations.len() as f64
    }

    /// Play every member; fulfills when all fulfill, rejects if any
    /// rejects.
    pub fn play(&self) -> Promise<()> {
        let promises: Vec<Promise<()>> =
            self.animations.borrow().iter().map(Anim::play).collect();
        Promise::all(promises)
    }

    /// Pause every member.
    pub fn pause(&self) -> &Self {
        for anim in self.animations.borrow().iter() {
            anim.pause();
        }
        self
    }

    /// Finish every member.
    pub fn finish(&self) -> &Self {
        for anim in self.animations.borrow().iter() {
            anim.finish();
        }
        self
    }

    /// Cancel every member.
    pub fn cancel(&self) -> &Self {
        for anim in self.animations.borrow().iter() {
            anim.cancel();
        }
        self
    }
}
