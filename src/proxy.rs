//! Cycle-breaking stand-ins.
//!
//! When resolving `T` requires resolving `T` again, the injector hands the
//! inner dependent a stand-in instead of the real instance. The stand-in is a
//! user-written forwarding implementation of the abstraction over
//! [`Proxy<dyn Trait>`](Proxy); its target slot starts empty and is bound
//! exactly once, when the outer construction of `T` completes.
//!
//! ```rust
//! use graft_di::Proxy;
//!
//! trait Account: Send + Sync {
//!     fn balance(&self) -> i64;
//! }
//!
//! impl Account for Proxy<dyn Account> {
//!     fn balance(&self) -> i64 {
//!         self.target().balance()
//!     }
//! }
//! ```

use std::panic;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::descriptors::{erase, unerase, AnyArc};
use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Panic payload raised when an unbound stand-in is used.
///
/// [`Proxy::target`] panics with this payload so forwarding impls can keep
/// the abstraction's plain signatures; the outermost resolve converts it
/// back into [`DiError::ProxyNotInitialized`].
#[derive(Debug, Clone, Copy)]
pub struct ProxyNotInitialized {
    /// Type name of the abstraction the stand-in was issued for.
    pub type_name: &'static str,
}

/// Rebindable forwarding slot behind a cycle-breaking stand-in.
///
/// A proxy is `Unbound` when issued and becomes `Bound` once; there is no
/// other transition.
pub struct Proxy<T: ?Sized> {
    key: Key,
    target: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Proxy<T> {
    pub(crate) fn unbound() -> Self {
        Self {
            key: Key::of::<T>(),
            target: OnceCell::new(),
        }
    }

    /// Key of the abstraction this proxy stands in for.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Whether the real instance has been bound.
    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    /// The real instance, or `ProxyNotInitialized` if it does not exist yet.
    pub fn try_target(&self) -> DiResult<&Arc<T>> {
        self.target
            .get()
            .ok_or(DiError::ProxyNotInitialized(self.key.display_name()))
    }

    /// The real instance.
    ///
    /// # Panics
    ///
    /// Panics with a [`ProxyNotInitialized`] payload when called before the
    /// target is bound. Inside a resolution the injector turns that panic into
    /// `Err(DiError::ProxyNotInitialized)`.
    ///
    /// The panic still passes through the process panic hook first, so the
    /// default hook prints a "panicked at" line even though the resolve
    /// returns an error. Applications that want it silent can skip the
    /// payload in their own hook:
    ///
    /// ```rust
    /// use graft_di::ProxyNotInitialized;
    /// use std::panic;
    ///
    /// let default_hook = panic::take_hook();
    /// panic::set_hook(Box::new(move |info| {
    ///     if !info.payload().is::<ProxyNotInitialized>() {
    ///         default_hook(info);
    ///     }
    /// }));
    /// # let _ = panic::take_hook();
    /// ```
    pub fn target(&self) -> &T {
        match self.target.get() {
            Some(target) => &**target,
            None => panic::panic_any(ProxyNotInitialized {
                type_name: self.key.display_name(),
            }),
        }
    }

    pub(crate) fn bind(&self, target: Arc<T>) -> DiResult<()> {
        self.target
            .set(target)
            .map_err(|_| DiError::StandInAlreadyBound(self.key.display_name()))
    }
}

impl<T: ?Sized> std::fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("key", &self.key)
            .field("bound", &self.target.get().is_some())
            .finish()
    }
}

type IssueFn = Arc<dyn Fn() -> IssuedStandIn + Send + Sync>;
type BindFn = Box<dyn FnOnce(&AnyArc) -> DiResult<()> + Send>;

/// Fabricates stand-ins for one abstraction.
#[derive(Clone)]
pub(crate) struct StandInFactory {
    key: Key,
    issue: IssueFn,
}

impl StandInFactory {
    pub(crate) fn new<T, W>(wrap: W) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        W: Fn(Arc<Proxy<T>>) -> Arc<T> + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        let issue: IssueFn = Arc::new(move || {
            let proxy = Arc::new(Proxy::<T>::unbound());
            let exposed = wrap(Arc::clone(&proxy));
            let bind: BindFn = Box::new(move |real: &AnyArc| proxy.bind(unerase::<T>(real)?));
            IssuedStandIn {
                key,
                instance: erase(exposed),
                bind: Some(bind),
            }
        });

        Self { key, issue }
    }

    pub(crate) fn key(&self) -> Key {
        self.key
    }

    pub(crate) fn issue(&self) -> IssuedStandIn {
        (self.issue)()
    }
}

/// A stand-in handed out during one resolution pass.
pub(crate) struct IssuedStandIn {
    key: Key,
    pub(crate) instance: AnyArc,
    bind: Option<BindFn>,
}

impl IssuedStandIn {
    /// Points the stand-in at the real instance. Only the first call binds.
    pub(crate) fn bind(&mut self, real: &AnyArc) -> DiResult<()> {
        match self.bind.take() {
            Some(bind) => bind(real),
            None => Err(DiError::StandInAlreadyBound(self.key.display_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    trait Counter: Send + Sync {
        fn count(&self) -> u32;
    }

    struct Fixed(u32);

    impl Counter for Fixed {
        fn count(&self) -> u32 {
            self.0
        }
    }

    impl Counter for Proxy<dyn Counter> {
        fn count(&self) -> u32 {
            self.target().count()
        }
    }

    fn factory() -> StandInFactory {
        StandInFactory::new::<dyn Counter, _>(|proxy| proxy as Arc<dyn Counter>)
    }

    #[test]
    fn unbound_proxy_reports_not_initialized() {
        let proxy = Proxy::<dyn Counter>::unbound();
        assert!(!proxy.is_bound());
        assert!(matches!(proxy.try_target(), Err(DiError::ProxyNotInitialized(_))));

        let payload = catch_unwind(AssertUnwindSafe(|| proxy.count())).unwrap_err();
        let payload = payload.downcast_ref::<ProxyNotInitialized>().unwrap();
        assert_eq!(payload.type_name, Key::of::<dyn Counter>().display_name());
    }

    #[test]
    fn issued_stand_in_forwards_after_bind() {
        let factory = factory();
        assert_eq!(factory.key(), Key::of::<dyn Counter>());

        let mut issued = factory.issue();
        let stand_in = unerase::<dyn Counter>(&issued.instance).unwrap();

        let real: Arc<dyn Counter> = Arc::new(Fixed(7));
        issued.bind(&erase(real)).unwrap();
        assert_eq!(stand_in.count(), 7);
    }

    #[test]
    fn stand_in_binds_at_most_once() {
        let mut issued = factory().issue();
        let first: Arc<dyn Counter> = Arc::new(Fixed(1));
        let second: Arc<dyn Counter> = Arc::new(Fixed(2));
        issued.bind(&erase(first)).unwrap();
        assert!(matches!(issued.bind(&erase(second)), Err(DiError::StandInAlreadyBound(_))));

        let stand_in = unerase::<dyn Counter>(&issued.instance).unwrap();
        assert_eq!(stand_in.count(), 1);
    }

    #[test]
    fn binding_with_wrong_type_fails() {
        let mut issued = factory().issue();
        assert!(matches!(issued.bind(&erase(Arc::new(5u8))), Err(DiError::TypeMismatch(_))));
    }
}
