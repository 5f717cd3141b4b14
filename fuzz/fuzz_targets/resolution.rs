#![no_main]

use graft_di::{Binding, DiError, Injectable, Injector, InjectorOptions, Proxy, Resolver, Scope};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

trait Head: Send + Sync {
    fn value(&self) -> u8;
}

impl Head for Proxy<dyn Head> {
    fn value(&self) -> u8 {
        self.target().value()
    }
}

struct HeadImpl {
    _body: Arc<Body>,
}

impl Head for HeadImpl {
    fn value(&self) -> u8 {
        7
    }
}

impl Injectable for HeadImpl {
    type Deps = (Arc<Body>,);
    fn construct((body,): Self::Deps) -> Self {
        HeadImpl { _body: body }
    }
}

struct Body {
    _tail: Arc<Tail>,
}

impl Injectable for Body {
    type Deps = (Arc<Tail>,);
    fn construct((tail,): Self::Deps) -> Self {
        Body { _tail: tail }
    }
}

struct Tail {
    head: Arc<dyn Head>,
}

impl Injectable for Tail {
    type Deps = (Arc<dyn Head>,);
    fn construct((head,): Self::Deps) -> Self {
        Tail { head }
    }
}

fn scope_of(byte: u8) -> Scope {
    match byte % 2 {
        0 => Scope::Transient,
        _ => Scope::Singleton,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }

    let with_stand_in = data[0] % 2 == 0;
    let max_depth = (data[1] % 6) as usize;

    let mut builder = Injector::builder()
        .register_binding(
            Binding::bind::<dyn Head>()
                .to::<HeadImpl, _>(|h| h as Arc<dyn Head>)
                .in_scope(scope_of(data[2])),
        )
        .unwrap()
        .register_binding(Binding::bind::<Body>().to_self().in_scope(scope_of(data[3])))
        .unwrap()
        .register_binding(Binding::bind::<Tail>().to_self().in_scope(scope_of(data[4])))
        .unwrap()
        .options(InjectorOptions::default().with_max_depth(max_depth));
    if with_stand_in {
        builder = builder.stand_in::<dyn Head, _>(|p| p as Arc<dyn Head>).unwrap();
    }
    let injector = builder.build().unwrap();

    for &byte in &data[5..] {
        let outcome = match byte % 3 {
            0 => injector.get::<dyn Head>().map(|head| assert_eq!(head.value(), 7)),
            1 => injector.get::<Body>().map(drop),
            _ => injector.get::<Tail>().map(|tail| assert_eq!(tail.head.value(), 7)),
        };
        match outcome {
            Ok(()) => {}
            Err(DiError::Circular(path)) => assert!(path.len() >= 2),
            Err(DiError::DepthExceeded(limit)) => assert_eq!(limit, max_depth),
            Err(other) => panic!("unexpected resolution error: {}", other),
        }
    }
});
