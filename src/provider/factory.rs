//! Parameterized factories and user-supplied provider objects.

use std::sync::Arc;

use crate::descriptors::{construct_initialized, erase, unerase, AnyArc, Dependencies, Injectable};
use crate::error::DiResult;
use crate::key::Key;

type CreateFn<T> = Arc<dyn Fn(&[AnyArc]) -> DiResult<Arc<T>> + Send + Sync>;
type MakeFn = Arc<dyn Fn(Vec<AnyArc>) -> AnyArc + Send + Sync>;
pub(crate) type ForwardFn = Arc<dyn Fn(&AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Callable that builds fresh instances of `T` on demand.
///
/// Registered with [`Binder::factory`](crate::Binder::factory) or
/// [`Binder::factory_of`](crate::Binder::factory_of) and requested as
/// `Arc<Factory<T>>`. The implementation's dependencies are resolved once,
/// when the factory itself is first resolved, and reused by every
/// [`create`](Factory::create) call.
///
/// Instances produced by `create` get their
/// [`Injectable::initialize`] hook but no field injection; the injector is
/// not involved once the factory exists.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binder, Factory, Injectable, Injector, Module, DiResult, Resolver};
/// use std::sync::Arc;
///
/// struct Connection;
/// impl Injectable for Connection {
///     type Deps = ();
///     fn construct(_: ()) -> Self { Connection }
/// }
///
/// struct PoolModule;
/// impl Module for PoolModule {
///     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
///         binder.factory::<Connection>();
///         Ok(())
///     }
/// }
///
/// let injector = Injector::builder().install(PoolModule).unwrap().build().unwrap();
/// let factory = injector.get_required::<Factory<Connection>>();
/// let a = factory.create().unwrap();
/// let b = factory.create().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
pub struct Factory<T: ?Sized> {
    implementation: Key,
    dependencies: Vec<AnyArc>,
    create: CreateFn<T>,
}

impl<T: ?Sized + Send + Sync + 'static> Factory<T> {
    /// Builds one fresh instance.
    pub fn create(&self) -> DiResult<Arc<T>> {
        (self.create)(&self.dependencies)
    }

    /// Concrete type this factory constructs.
    pub fn implementation(&self) -> Key {
        self.implementation
    }
}

impl<T: ?Sized> std::fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("implementation", &self.implementation)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// Erased recipe a parameterized-factory provider uses to build its [`Factory`].
#[derive(Clone)]
pub(crate) struct FactoryRecipe {
    implementation: Key,
    dependency_keys: Vec<Key>,
    make: MakeFn,
}

impl FactoryRecipe {
    pub(crate) fn new<R, I, U>(upcast: U) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        I: Injectable,
        U: Fn(Arc<I>) -> Arc<R> + Send + Sync + 'static,
    {
        let upcast: Arc<dyn Fn(Arc<I>) -> Arc<R> + Send + Sync> = Arc::new(upcast);
        let create: CreateFn<R> =
            Arc::new(move |instances: &[AnyArc]| construct_initialized::<R, I>(instances, &*upcast));
        let implementation = Key::of::<I>();

        let make: MakeFn = Arc::new(move |dependencies: Vec<AnyArc>| {
            erase(Arc::new(Factory {
                implementation,
                dependencies,
                create: Arc::clone(&create),
            }))
        });

        Self {
            implementation,
            dependency_keys: I::Deps::keys(),
            make,
        }
    }

    pub(crate) fn implementation(&self) -> Key {
        self.implementation
    }

    pub(crate) fn dependency_keys(&self) -> &[Key] {
        &self.dependency_keys
    }

    pub(crate) fn make(&self, dependencies: Vec<AnyArc>) -> AnyArc {
        (self.make)(dependencies)
    }
}

/// User-written provider object producing instances of `T`.
///
/// The provider object is itself resolved from the injector (so it can have
/// dependencies of its own) and then asked for an instance every time `T`
/// is requested.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binder, Binding, CustomProvider, Injectable, Injector, Module, DiResult, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct Ticket(u32);
///
/// struct TicketDispenser { next: AtomicU32 }
/// impl Injectable for TicketDispenser {
///     type Deps = ();
///     fn construct(_: ()) -> Self { TicketDispenser { next: AtomicU32::new(1) } }
/// }
/// impl CustomProvider<Ticket> for TicketDispenser {
///     fn provide(&self) -> Arc<Ticket> {
///         Arc::new(Ticket(self.next.fetch_add(1, Ordering::SeqCst)))
///     }
/// }
///
/// struct Tickets;
/// impl Module for Tickets {
///     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
///         binder.bind(Binding::bind::<TicketDispenser>().to_self().singleton());
///         binder.provided_by::<Ticket, TicketDispenser>();
///         Ok(())
///     }
/// }
///
/// let injector = Injector::builder().install(Tickets).unwrap().build().unwrap();
/// assert_eq!(injector.get_required::<Ticket>().0, 1);
/// assert_eq!(injector.get_required::<Ticket>().0, 2);
/// ```
pub trait CustomProvider<T: ?Sized>: Send + Sync + 'static {
    /// Produces an instance of `T`.
    fn provide(&self) -> Arc<T>;
}

/// Forwarding closure calling `P::provide` on the resolved provider object.
pub(crate) fn forward_through<T, P>() -> ForwardFn
where
    T: ?Sized + Send + Sync + 'static,
    P: CustomProvider<T>,
{
    Arc::new(|provider: &AnyArc| {
        let provider = unerase::<P>(provider)?;
        Ok(erase(provider.provide()))
    })
}
