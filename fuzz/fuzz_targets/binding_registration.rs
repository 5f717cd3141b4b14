#![no_main]

use graft_di::{Binding, DiError, Injectable, Injector, Scope};
use libfuzzer_sys::fuzz_target;

struct A;
struct B;
struct C;
struct D;

macro_rules! leaf {
    ($($name:ident),+) => {
        $(impl Injectable for $name {
            type Deps = ();
            fn construct(_: ()) -> Self {
                $name
            }
        })+
    };
}

leaf!(A, B, C, D);

fn scope_of(byte: u8) -> Scope {
    match byte % 3 {
        0 => Scope::Transient,
        1 => Scope::Singleton,
        _ => Scope::EagerSingleton,
    }
}

fn binding_for(byte: u8) -> Binding {
    let scope = scope_of(byte >> 2);
    match byte % 4 {
        0 => Binding::bind::<A>().to_self().in_scope(scope),
        1 => Binding::bind::<B>().to_self().in_scope(scope),
        2 => Binding::bind::<C>().to_self().in_scope(scope),
        _ => Binding::bind::<D>().to_self().in_scope(scope),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut seen = [false; 4];
    let mut builder = Injector::builder();

    // Each byte registers one binding; a repeated type must be rejected
    for &byte in data.iter().take(16) {
        let slot = (byte % 4) as usize;
        match builder.register_binding(binding_for(byte)) {
            Ok(next) => {
                assert!(!seen[slot]);
                seen[slot] = true;
                builder = next;
            }
            Err(DiError::DuplicateBinding { .. }) => {
                assert!(seen[slot]);
                return;
            }
            Err(other) => panic!("unexpected registration error: {}", other),
        }
    }

    let injector = builder.build().expect("leaf bindings always build");
    assert_eq!(injector.len(), seen.iter().filter(|s| **s).count());
});
