use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kinetic::{Reflow, Step};

#[test]
fn all_reads_run_before_any_write_within_a_tick() {
    let reflow = Reflow::new();
    let sequence = Rc::new(RefCell::new(Vec::new()));
    // Interleave registrations to prove ordering comes from the phases,
    // not from registration order.
    for i in 0..4 {
        let s = Rc::clone(&sequence);
        reflow.onwrite(move || {
            s.borrow_mut().push(format!("w{i}"));
            false
        });
        let s = Rc::clone(&sequence);
        reflow.onread(move || {
            s.borrow_mut().push(format!("r{i}"));
            false
        });
    }
    reflow.tick(0.0);
    let seq = sequence.borrow();
    let first_write = seq.iter().position(|s| s.starts_with('w')).unwrap();
    let last_read = seq.iter().rposition(|s| s.starts_with('r')).unwrap();
    assert_eq!(seq.len(), 8);
    assert!(
        last_read < first_write,
        "reads must finish before writes: {seq:?}"
    );
}

#[test]
fn returning_false_retires_a_callback_for_good() {
    let reflow = Reflow::new();
    let read_hits = Rc::new(Cell::new(0u32));
    let write_hits = Rc::new(Cell::new(0u32));
    let r = Rc::clone(&read_hits);
    reflow.onread(move || {
        r.set(r.get() + 1);
        false
    });
    let w = Rc::clone(&write_hits);
    reflow.onwrite(move || {
        w.set(w.get() + 1);
        w.get() < 2
    });
    for t in 0..5 {
        reflow.tick(f64::from(t) * 16.0);
    }
    assert_eq!(read_hits.get(), 1);
    assert_eq!(write_hits.get(), 2);
}

#[test]
fn cycle_alternates_measurement_and_mutation_across_ticks() {
    let reflow = Reflow::new();
    let measured = Rc::new(RefCell::new(Vec::new()));
    let mutated = Rc::new(RefCell::new(Vec::new()));

    let m = Rc::clone(&measured);
    let w = Rc::clone(&mutated);
    reflow.cycle(
        move |prev: Option<&i32>| {
            let next = prev.copied().map_or(1, |v| v * 2);
            if next > 8 {
                return Step::Stop;
            }
            m.borrow_mut().push(next);
            Step::Next(next)
        },
        move |value, _prev| {
            w.borrow_mut().push(*value);
            Step::Next(*value)
        },
        None,
    );
    for t in 0..8 {
        reflow.tick(f64::from(t) * 16.0);
    }
    assert_eq!(*measured.borrow(), vec![1, 2, 4, 8]);
    assert_eq!(*mutated.borrow(), vec![1, 2, 4, 8]);
}

#[test]
fn promise_wrappers_are_strictly_one_shot() {
    let reflow = Reflow::new();
    let hits = Rc::new(Cell::new(0u32));
    let h = Rc::clone(&hits);
    let promise = reflow.onread_promise(move |settle| {
        h.set(h.get() + 1);
        settle.resolve(h.get());
    });
    let resolved = Rc::new(Cell::new(0u32));
    let r = Rc::clone(&resolved);
    promise.done(move |result| r.set(*result.as_ref().unwrap()));
    for t in 0..3 {
        reflow.tick(f64::from(t) * 16.0);
    }
    assert_eq!(hits.get(), 1);
    assert_eq!(resolved.get(), 1);
}
