use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::error::{KineticError, KineticResult};

type DoneFn<T> = Box<dyn FnOnce(&KineticResult<T>)>;

enum PromiseState<T> {
    Pending(Vec<DoneFn<T>>),
    Settled(Rc<KineticResult<T>>),
}

/// A single-threaded deferred value.
///
/// Settles exactly once; later settle attempts are ignored. Subscribers
/// registered after settlement are invoked immediately and synchronously.
/// There is no executor: settlement happens inline wherever the paired
/// [`Settle`] handle is driven (a scheduler phase, an animation event).
pub struct Promise<T> {
    inner: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Settling side of a [`Promise`].
pub struct Settle<T> {
    inner: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Promise<T> {
    /// Create an unsettled promise plus its settle handle.
    pub fn pending() -> (Self, Settle<T>) {
        let inner = Rc::new(RefCell::new(PromiseState::Pending(Vec::new())));
        (
            Self {
                inner: Rc::clone(&inner),
            },
            Settle { inner },
        )
    }

    /// An already-fulfilled promise.
    pub fn resolved(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Settled(Rc::new(Ok(value))))),
        }
    }

    /// An already-rejected promise.
    pub fn rejected(error: KineticError) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseState::Settled(Rc::new(Err(error))))),
        }
    }

    /// Whether the promise has settled.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.inner.borrow(), PromiseState::Settled(_))
    }

    /// Register a settlement callback. Runs immediately when already
    /// settled.
    pub fn done(&self, f: impl FnOnce(&KineticResult<T>) + 'static) {
        let settled = match &mut *self.inner.borrow_mut() {
            PromiseState::Pending(callbacks) => {
                callbacks.push(Box::new(f));
                return;
            }
            PromiseState::Settled(result) => Rc::clone(result),
        };
        f(&settled);
    }

    /// Fulfills when every member fulfills; rejects as soon as one member
    /// rejects.
    pub fn all(members: Vec<Promise<T>>) -> Promise<()> {
        if members.is_empty() {
            return Promise::resolved(());
        }
        let (promise, settle) = Promise::pending();
        let remaining = Rc::new(std::cell::Cell::new(members.len()));
        for member in &members {
            let remaining = Rc::clone(&remaining);
            let settle = settle.clone();
            member.done(move |result| match result {
                Ok(_) => {
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        settle.resolve(());
                    }
                }
                Err(e) => settle.reject(KineticError::schedule(format!("member rejected: {e}"))),
            });
        }
        promise
    }
}

impl<T: 'static> Settle<T> {
    /// Fulfill the promise.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Reject the promise.
    pub fn reject(&self, error: KineticError) {
        self.settle(Err(error));
    }

    fn settle(&self, result: KineticResult<T>) {
        let result = Rc::new(result);
        let callbacks = {
            let mut state = self.inner.borrow_mut();
            match &mut *state {
                PromiseState::Settled(_) => return,
                PromiseState::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = PromiseState::Settled(Rc::clone(&result));
                    callbacks
                }
            }
        };
        for callback in callbacks {
            callback(&result);
        }
    }
}
