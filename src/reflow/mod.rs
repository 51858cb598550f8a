//! Frame scheduler: central read/write phases for document access.
//!
//! Every tick runs all live read callbacks strictly before any write
//! callback, which is what keeps measurement from interleaving with
//! mutation (the classic layout-thrashing hazard). The loop is inverted:
//! instead of rescheduling itself against a display-sync primitive, the
//! scheduler exposes [`Reflow::tick`] for the embedder's frame callback,
//! which also makes it drivable from tests without a display surface.

mod promise;

pub use promise::{Promise, Settle};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type QueueSlot = Option<Box<dyn FnMut() -> bool>>;

/// The two phases of a scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Measurement phase; runs first.
    Read,
    /// Mutation phase; runs after every read.
    Write,
}

/// Outcome of one side of a [`Reflow::cycle`] round-trip.
pub enum Step<T> {
    /// Stop the cycle.
    Stop,
    /// Continue with this value.
    Next(T),
    /// Continue once the deferred value settles; a rejection stops the
    /// cycle.
    Wait(Promise<T>),
}

/// The frame scheduler. Shared via `Rc`; alive for the program's lifetime
/// with no explicit shutdown.
pub struct Reflow {
    reads: RefCell<Vec<QueueSlot>>,
    writes: RefCell<Vec<QueueSlot>>,
    now: Cell<f64>,
    ticks: Cell<u64>,
    // Weak self-handle so `cycle` can re-arm itself across ticks.
    this: RefCell<std::rc::Weak<Reflow>>,
}

impl Reflow {
    /// Create a shared scheduler.
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            reads: RefCell::new(Vec::new()),
            writes: RefCell::new(Vec::new()),
            now: Cell::new(0.0),
            ticks: Cell::new(0),
            this: RefCell::new(weak.clone()),
        })
    }

    /// Timestamp of the current (or most recent) tick, in milliseconds.
    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    /// Bind a callback to the read phase. The callback stays registered as
    /// long as it returns `true`; returning `false` retires it and it is
    /// never invoked again. There is no cancel-by-handle.
    pub fn onread(&self, callback: impl FnMut() -> bool + 'static) {
        self.reads.borrow_mut().push(Some(Box::new(callback)));
    }

    /// Bind a callback to the write phase under the same retire-on-`false`
    /// rule as [`Reflow::onread`].
    pub fn onwrite(&self, callback: impl FnMut() -> bool + 'static) {
        self.writes.borrow_mut().push(Some(Box::new(callback)));
    }

    /// Bind a one-shot callback to the read phase.
    pub fn onread_once(&self, callback: impl FnOnce() + 'static) {
        self.onread(once(callback));
    }

    /// Bind a one-shot callback to the write phase.
    pub fn onwrite_once(&self, callback: impl FnOnce() + 'static) {
        self.onwrite(once(callback));
    }

    /// Bind a one-shot read callback and hand it the settle side of a
    /// promise; the promise settles with whatever the callback passes on.
    pub fn onread_promise<T: 'static>(
        &self,
        callback: impl FnOnce(Settle<T>) + 'static,
    ) -> Promise<T> {
        let (promise, settle) = Promise::pending();
        self.onread_once(move || callback(settle));
        promise
    }

    /// Write-phase counterpart of [`Reflow::onread_promise`].
    pub fn onwrite_promise<T: 'static>(
        &self,
        callback: impl FnOnce(Settle<T>) + 'static,
    ) -> Promise<T> {
        let (promise, settle) = Promise::pending();
        self.onwrite_once(move || callback(settle));
        promise
    }

    /// Run one tick at `now_ms`: every live read callback, then every live
    /// write callback, then queue compaction.
    ///
    /// Callbacks registered into a phase while that phase is running are
    /// deferred to the next tick; a write registered during the read phase
    /// still runs this tick.
    pub fn tick(&self, now_ms: f64) {
        self.now.set(now_ms);
        tracing::trace!(now_ms, tick = self.ticks.get(), "reflow tick");
        Self::run_phase(&self.reads);
        Self::run_phase(&self.writes);
        // Retired slots stay null during iteration for index stability;
        // compaction happens only between ticks.
        self.reads.borrow_mut().retain(Option::is_some);
        self.writes.borrow_mut().retain(Option::is_some);
        self.ticks.set(self.ticks.get() + 1);
    }

    fn run_phase(queue: &RefCell<Vec<QueueSlot>>) {
        let len = queue.borrow().len();
        for i in 0..len {
            let slot = queue.borrow_mut()[i].take();
            let Some(mut callback) = slot else {
                continue;
            };
            if callback() {
                queue.borrow_mut()[i] = Some(callback);
            }
        }
    }

    /// A read→write transaction spanning one or more ticks.
    ///
    /// `read` runs in the next read phase with the previous round's value;
    /// a [`Step::Next`]/settled [`Step::Wait`] result schedules `write` in
    /// the following write phase, and a continuing `write` re-arms the
    /// whole cycle with its value. Either side returning [`Step::Stop`]
    /// (or a rejected deferred) ends the chain. This is the primitive for
    /// operations that must alternate measurement and mutation across
    /// frames, such as physically-animated drag reconciliation.
    pub fn cycle<T: Clone + 'static>(
        &self,
        read: impl FnMut(Option<&T>) -> Step<T> + 'static,
        write: impl FnMut(&T, Option<&T>) -> Step<T> + 'static,
        prev: Option<T>,
    ) {
        let Some(this) = self.this.borrow().upgrade() else {
            return;
        };
        cycle_arm(
            this,
            Rc::new(RefCell::new(read)),
            Rc::new(RefCell::new(write)),
            prev,
        );
    }
}

fn once(f: impl FnOnce() + 'static) -> impl FnMut() -> bool {
    let mut f = Some(f);
    move || {
        if let Some(f) = f.take() {
            f();
        }
        false
    }
}

type ReadFn<T> = Rc<RefCell<dyn FnMut(Option<&T>) -> Step<T>>>;
type WriteFn<T> = Rc<RefCell<dyn FnMut(&T, Option<&T>) -> Step<T>>>;

fn cycle_arm<T: Clone + 'static>(
    reflow: Rc<Reflow>,
    read: ReadFn<T>,
    write: WriteFn<T>,
    prev: Option<T>,
) {
    let scheduler = Rc::clone(&reflow);
    scheduler.onread_once(move || {
        let step = (&mut *read.borrow_mut())(prev.as_ref());
        match step {
            Step::Stop => {}
            Step::Next(value) => cycle_write(reflow, read, write, value, prev),
            Step::Wait(pending) => {
                pending.done(move |result| {
                    if let Ok(value) = result {
                        cycle_write(reflow, read, write, value.clone(), prev);
                    }
                });
            }
        }
    });
}

fn cycle_write<T: Clone + 'static>(
    reflow: Rc<Reflow>,
    read: ReadFn<T>,
    write: WriteFn<T>,
    value: T,
    prev: Option<T>,
) {
    let scheduler = Rc::clone(&reflow);
    scheduler.onwrite_once(move || {
        let step = (&mut *write.borrow_mut())(&value, prev.as_ref());
        match step {
            Step::Stop => {}
            Step::Next(next) => cycle_arm(reflow, read, write, Some(next)),
            Step::Wait(pending) => {
                pending.done(move |result| {
                    if let Ok(next) = result {
                        cycle_arm(reflow, read, write, Some(next.clone()));
                    }
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn reads_run_strictly_before_writes() {
        let reflow = Reflow::new();
        let seen = log();
        for _ in 0..3 {
            let s = Rc::clone(&seen);
            reflow.onwrite(move || {
                s.borrow_mut().push("w");
                false
            });
            let s = Rc::clone(&seen);
            reflow.onread(move || {
                s.borrow_mut().push("r");
                false
            });
        }
        reflow.tick(0.0);
        assert_eq!(*seen.borrow(), vec!["r", "r", "r", "w", "w", "w"]);
    }

    #[test]
    fn false_return_retires_after_first_invocation() {
        let reflow = Reflow::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        reflow.onread(move || {
            h.set(h.get() + 1);
            false
        });
        for t in 0..4 {
            reflow.tick(t as f64 * 16.0);
        }
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn true_return_repeats_until_false() {
        let reflow = Reflow::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        reflow.onread(move || {
            h.set(h.get() + 1);
            h.get() < 3
        });
        for t in 0..5 {
            reflow.tick(t as f64);
        }
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn write_registered_during_read_runs_same_tick() {
        let reflow = Reflow::new();
        let seen = log();
        {
            let scheduler = Rc::clone(&reflow);
            let s = Rc::clone(&seen);
            reflow.onread(move || {
                s.borrow_mut().push("r");
                let s = Rc::clone(&s);
                scheduler.onwrite_once(move || s.borrow_mut().push("w"));
                false
            });
        }
        reflow.tick(0.0);
        assert_eq!(*seen.borrow(), vec!["r", "w"]);
    }

    #[test]
    fn read_registered_during_write_waits_for_next_tick() {
        let reflow = Reflow::new();
        let seen = log();
        {
            let scheduler = Rc::clone(&reflow);
            let s = Rc::clone(&seen);
            reflow.onwrite(move || {
                s.borrow_mut().push("w");
                let s = Rc::clone(&s);
                scheduler.onread_once(move || s.borrow_mut().push("r"));
                false
            });
        }
        reflow.tick(0.0);
        assert_eq!(*seen.borrow(), vec!["w"]);
        reflow.tick(16.0);
        assert_eq!(*seen.borrow(), vec!["w", "r"]);
    }

    #[test]
    fn promise_registration_settles_with_callback_value() {
        let reflow = Reflow::new();
        let promise = reflow.onread_promise(|settle| settle.resolve(41u32));
        let got = Rc::new(Cell::new(0u32));
        let g = Rc::clone(&got);
        promise.done(move |r| g.set(*r.as_ref().unwrap()));
        assert_eq!(got.get(), 0);
        reflow.tick(0.0);
        assert_eq!(got.get(), 41);
    }

    #[test]
    fn cycle_chains_rounds_until_stop() {
        let reflow = Reflow::new();
        let rounds = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&rounds);
        reflow.cycle(
            move |prev: Option<&u32>| {
                let n = prev.copied().unwrap_or(0);
                if n >= 3 {
                    return Step::Stop;
                }
                Step::Next(n)
            },
            move |n, _prev| {
                seen.borrow_mut().push(*n);
                Step::Next(n + 1)
            },
            None,
        );
        for t in 0..6 {
            reflow.tick(t as f64);
        }
        assert_eq!(*rounds.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn cycle_waits_for_deferred_write_result() {
        let reflow = Reflow::new();
        let (pending, settle) = Promise::<u32>::pending();
        let rounds = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&rounds);
        let mut handoff = Some(pending);
        reflow.cycle(
            move |prev: Option<&u32>| Step::Next(prev.copied().unwrap_or(10)),
            move |n, _prev| {
                seen.borrow_mut().push(*n);
                match handoff.take() {
                    Some(p) => Step::Wait(p),
                    None => Step::Stop,
                }
            },
            None,
        );
        reflow.tick(0.0);
        assert_eq!(*rounds.borrow(), vec![10]);
        // Cycle is parked on the deferred value; ticks alone do nothing.
        reflow.tick(1.0);
        assert_eq!(*rounds.borrow(), vec![10]);
        settle.resolve(20);
        reflow.tick(2.0);
        assert_eq!(*rounds.borrow(), vec![10, 20]);
    }
}
