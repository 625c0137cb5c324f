use crate::{Interner, SharedInterner, Symbol};

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();

    let a = interner.intern("foo");
    let b = interner.intern("foo");
    let c = interner.intern("bar");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn resolve_roundtrip() {
    let mut interner = Interner::new();

    let sym = interner.intern("hello");
    assert_eq!(interner.resolve(sym), "hello");
}

#[test]
fn try_resolve_rejects_foreign_symbol() {
    let interner = Interner::new();
    assert!(interner.try_resolve(Symbol::from_raw(7)).is_none());
}

#[test]
fn symbols_are_copy() {
    let mut interner = Interner::new();
    let sym = interner.intern("x");

    let copy = sym;
    assert_eq!(sym, copy);
}

#[test]
fn symbol_ordering_is_insertion_order() {
    let mut interner = Interner::new();

    let z = interner.intern("z");
    let a = interner.intern("a");

    // z was inserted first, so z < a by insertion order
    assert!(z < a);
}

#[test]
fn shared_interner_agrees_across_clones() {
    let shared = SharedInterner::new();
    let other = shared.clone();

    let a = shared.intern("operator()");
    let b = other.intern("operator()");

    assert_eq!(a, b);
    assert_eq!(&*shared.resolve(a), "operator()");
}

#[test]
fn shared_interner_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SharedInterner>();
}

#[test]
fn shared_interner_concurrent_intern() {
    let shared = SharedInterner::new();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let mut syms = Vec::new();
                for j in 0..64 {
                    syms.push(shared.intern(&format!("sym{}", (i + j) % 16)));
                }
                syms
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("interner thread panicked");
    }

    // 16 distinct strings regardless of which thread won each race
    assert_eq!(shared.len(), 16);
}
