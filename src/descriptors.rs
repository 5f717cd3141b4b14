//! Compile-time construction descriptors.
//!
//! A type becomes constructible by the injector by implementing
//! [`Injectable`]: its dependencies are a tuple of `Arc`s, so the "exactly one
//! eligible constructor" rule is enforced by trait coherence instead of a
//! runtime scan. The injector only ever sees the type-erased [`Activator`]
//! built from that impl.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Type-erased instance as stored by providers.
///
/// Every instance is stored as an `Arc<Arc<T>>` behind `dyn Any`, where `T`
/// is the requested type (possibly a trait object). This keeps concrete types
/// and trait objects on one storage path.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Erases a typed instance into provider storage.
#[inline]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> AnyArc {
    Arc::new(instance)
}

/// Recovers a typed instance from provider storage.
#[inline]
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(instance: &AnyArc) -> DiResult<Arc<T>> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// A single injectable dependency.
///
/// Implemented for `Arc<T>` with `T` sized or a trait object. The dependency
/// is requested under [`Key::of::<T>()`](Key::of).
pub trait Dependency: Sized + Send + Sync + 'static {
    /// Key of the requested type.
    fn key() -> Key;

    /// Recovers the dependency from a resolved instance.
    fn from_instance(instance: &AnyArc) -> DiResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Arc<T> {
    #[inline]
    fn key() -> Key {
        Key::of::<T>()
    }

    #[inline]
    fn from_instance(instance: &AnyArc) -> DiResult<Self> {
        unerase::<T>(instance)
    }
}

/// Ordered list of dependencies, passed positionally to a constructor.
///
/// Implemented for `()` and tuples of up to eight [`Dependency`] values.
/// Dependencies are resolved left to right in tuple order.
pub trait Dependencies: Sized + 'static {
    /// Number of positional dependencies.
    const ARITY: usize;

    /// Keys of the dependencies, in declaration order.
    fn keys() -> Vec<Key>;

    /// Builds the tuple from resolved instances in declaration order.
    fn from_instances(instances: &[AnyArc]) -> DiResult<Self>;
}

impl Dependencies for () {
    const ARITY: usize = 0;

    fn keys() -> Vec<Key> {
        Vec::new()
    }

    fn from_instances(instances: &[AnyArc]) -> DiResult<Self> {
        check_arity::<Self>(instances)
    }
}

fn check_arity<D: Dependencies>(instances: &[AnyArc]) -> DiResult<()> {
    if instances.len() == D::ARITY {
        Ok(())
    } else {
        Err(DiError::InvalidConstructor {
            type_name: std::any::type_name::<D>(),
            reason: "resolved dependency count does not match the declared arity",
        })
    }
}

macro_rules! impl_dependencies {
    ($arity:expr; $($name:ident => $idx:tt),+) => {
        impl<$($name: Dependency),+> Dependencies for ($($name,)+) {
            const ARITY: usize = $arity;

            fn keys() -> Vec<Key> {
                vec![$($name::key()),+]
            }

            fn from_instances(instances: &[AnyArc]) -> DiResult<Self> {
                check_arity::<Self>(instances)?;
                Ok(($($name::from_instance(&instances[$idx])?,)+))
            }
        }
    };
}

impl_dependencies!(1; A => 0);
impl_dependencies!(2; A => 0, B => 1);
impl_dependencies!(3; A => 0, B => 1, C => 2);
impl_dependencies!(4; A => 0, B => 1, C => 2, D => 3);
impl_dependencies!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_dependencies!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_dependencies!(7; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_dependencies!(8; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

/// A type the injector knows how to construct.
///
/// `construct` is the single designated constructor; `Deps` lists its
/// dependencies as a tuple of `Arc`s.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Injectable, Injected, FieldInjections};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct Config { verbose: bool }
///
/// struct Mailer {
///     config: Arc<Config>,
///     audit: Injected<dyn Logger>,
/// }
///
/// impl Injectable for Mailer {
///     type Deps = (Arc<Config>,);
///
///     fn construct((config,): Self::Deps) -> Self {
///         Mailer { config, audit: Injected::new() }
///     }
///
///     fn inject_fields(fields: &mut FieldInjections<Self>) {
///         fields.field(|m: &Mailer| &m.audit);
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Constructor dependencies, in positional order.
    type Deps: Dependencies;

    /// Builds the instance from its resolved dependencies.
    fn construct(deps: Self::Deps) -> Self;

    /// Declares field injections performed after construction.
    fn inject_fields(_fields: &mut FieldInjections<Self>) {}

    /// Post-construction hook, invoked once per fresh instance.
    fn initialize(&self) {}
}

/// A field filled by the injector after construction.
///
/// Field injection bypasses the constructor path, so it can reach types
/// that are still being built higher up when the instance is constructed.
pub struct Injected<T: ?Sized> {
    slot: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Injected<T> {
    /// An empty slot.
    pub fn new() -> Self {
        Self { slot: OnceCell::new() }
    }

    /// The injected value, or `None` before injection.
    pub fn get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }

    /// Whether the field has been injected.
    pub fn is_injected(&self) -> bool {
        self.slot.get().is_some()
    }

    pub(crate) fn set(&self, value: Arc<T>) -> DiResult<()> {
        self.slot
            .set(value)
            .map_err(|_| DiError::FieldAlreadyInjected(std::any::type_name::<T>()))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

type AssignField<I> = Arc<dyn Fn(&I, &AnyArc) -> DiResult<()> + Send + Sync>;

/// Field injections declared by an [`Injectable`] type.
pub struct FieldInjections<I> {
    fields: Vec<(Key, AssignField<I>)>,
}

/// Collects the field injections `I` declares.
pub(crate) fn declared_fields<I: Injectable>() -> FieldInjections<I> {
    let mut fields = FieldInjections { fields: Vec::new() };
    I::inject_fields(&mut fields);
    fields
}

impl<I: 'static> FieldInjections<I> {
    /// Declares an injected field of type `T`.
    pub fn field<T, F>(&mut self, slot: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&'a I) -> &'a Injected<T> + Send + Sync + 'static,
    {
        let assign: AssignField<I> = Arc::new(move |instance: &I, dependency: &AnyArc| {
            slot(instance).set(unerase::<T>(dependency)?)
        });
        self.fields.push((Key::of::<T>(), assign));
        self
    }

    /// Keys of the declared fields, in declaration order.
    pub fn keys(&self) -> Vec<Key> {
        self.fields.iter().map(|(key, _)| *key).collect()
    }
}

/// A field injection bound to a freshly built instance.
pub(crate) struct PendingField {
    pub(crate) key: Key,
    pub(crate) assign: Box<dyn FnOnce(&AnyArc) -> DiResult<()> + Send>,
}

/// Post-construction work for one freshly built instance.
#[derive(Default)]
pub(crate) struct Wiring {
    pub(crate) fields: Vec<PendingField>,
    pub(crate) initialize: Option<Box<dyn FnOnce() + Send>>,
}

/// Output of an [`Activator`].
pub(crate) struct Built {
    pub(crate) instance: AnyArc,
    pub(crate) wiring: Wiring,
}

type BuildFn = Arc<dyn Fn(&[AnyArc]) -> DiResult<Built> + Send + Sync>;

/// How an [`Activator`] produces instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivatorKind {
    /// `Injectable::construct` of the implementation type
    Constructor,
    /// A factory closure supplied by a module
    FactoryMethod,
}

/// Type-erased constructor descriptor.
///
/// Produces instances of the requested type from positional dependencies,
/// along with the wiring (field injections, init hook) for each fresh instance.
#[derive(Clone)]
pub struct Activator {
    implementation: Key,
    kind: ActivatorKind,
    dependency_keys: Vec<Key>,
    field_keys: Vec<Key>,
    build: BuildFn,
}

impl Activator {
    /// Activator constructing `I` and exposing it as `R` through `upcast`.
    pub fn constructor<R, I, U>(upcast: U) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        I: Injectable,
        U: Fn(Arc<I>) -> Arc<R> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |instances: &[AnyArc]| {
            let deps = I::Deps::from_instances(instances)?;
            let concrete = Arc::new(I::construct(deps));
            let wiring = wiring_for(&concrete);
            Ok(Built {
                instance: erase(upcast(concrete)),
                wiring,
            })
        });

        Self {
            implementation: Key::of::<I>(),
            kind: ActivatorKind::Constructor,
            dependency_keys: I::Deps::keys(),
            field_keys: declared_fields::<I>().keys(),
            build,
        }
    }

    /// Activator invoking a factory closure with typed dependencies.
    pub fn factory_method<R, D, F>(factory: F) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<R> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |instances: &[AnyArc]| {
            let deps = D::from_instances(instances)?;
            Ok(Built {
                instance: erase(factory(deps)),
                wiring: Wiring::default(),
            })
        });

        Self {
            implementation: Key::of::<R>(),
            kind: ActivatorKind::FactoryMethod,
            dependency_keys: D::keys(),
            field_keys: Vec::new(),
            build,
        }
    }

    /// Implementation type produced by this activator.
    pub fn implementation(&self) -> Key {
        self.implementation
    }

    /// Constructor or factory method.
    pub fn kind(&self) -> ActivatorKind {
        self.kind
    }

    /// Positional dependency keys.
    pub fn dependency_keys(&self) -> &[Key] {
        &self.dependency_keys
    }

    /// Keys of fields injected after construction.
    pub fn field_keys(&self) -> &[Key] {
        &self.field_keys
    }

    pub(crate) fn build(&self, instances: &[AnyArc]) -> DiResult<Built> {
        (self.build)(instances)
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activator")
            .field("implementation", &self.implementation)
            .field("kind", &self.kind)
            .field("dependency_keys", &self.dependency_keys)
            .field("field_keys", &self.field_keys)
            .finish()
    }
}

fn wiring_for<I: Injectable>(concrete: &Arc<I>) -> Wiring {
    let fields = declared_fields::<I>()
        .fields
        .into_iter()
        .map(|(key, assign)| {
            let target = Arc::clone(concrete);
            PendingField {
                key,
                assign: Box::new(move |dependency: &AnyArc| assign(&*target, dependency)),
            }
        })
        .collect();

    let target = Arc::clone(concrete);
    Wiring {
        fields,
        initialize: Some(Box::new(move || target.initialize())),
    }
}

/// Builds a fresh `I` from cached dependencies, runs its init hook and upcasts.
pub(crate) fn construct_initialized<R, I>(
    instances: &[AnyArc],
    upcast: &(dyn Fn(Arc<I>) -> Arc<R> + Send + Sync),
) -> DiResult<Arc<R>>
where
    R: ?Sized + Send + Sync + 'static,
    I: Injectable,
{
    let deps = I::Deps::from_instances(instances)?;
    let concrete = Arc::new(I::construct(deps));
    concrete.initialize();
    Ok(upcast(concrete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Config(&'static str);

    struct Service {
        config: Arc<Config>,
        peer: Injected<dyn Named>,
        init_calls: AtomicUsize,
    }

    impl Named for Service {
        fn name(&self) -> &str {
            self.config.0
        }
    }

    impl Injectable for Service {
        type Deps = (Arc<Config>,);

        fn construct((config,): Self::Deps) -> Self {
            Service { config, peer: Injected::new(), init_calls: AtomicUsize::new(0) }
        }

        fn inject_fields(fields: &mut FieldInjections<Self>) {
            fields.field(|s: &Service| &s.peer);
        }

        fn initialize(&self) {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn constructor_activator_reports_keys() {
        let activator = Activator::constructor::<dyn Named, Service, _>(|s| s as Arc<dyn Named>);
        assert_eq!(activator.implementation(), Key::of::<Service>());
        assert_eq!(activator.dependency_keys(), &[Key::of::<Config>()]);
        assert_eq!(activator.field_keys(), &[Key::of::<dyn Named>()]);
        assert_eq!(activator.kind(), ActivatorKind::Constructor);
    }

    #[test]
    fn constructor_activator_builds_and_wires() {
        let activator = Activator::constructor::<Service, Service, _>(|s| s);
        let config = erase(Arc::new(Config("primary")));
        let built = activator.build(&[config]).unwrap();

        let service = unerase::<Service>(&built.instance).unwrap();
        assert_eq!(service.name(), "primary");
        assert!(!service.peer.is_injected());

        let peer: Arc<dyn Named> = Arc::new(Service {
            config: Arc::new(Config("peer")),
            peer: Injected::new(),
            init_calls: AtomicUsize::new(0),
        });
        let mut wiring = built.wiring;
        assert_eq!(wiring.fields.len(), 1);
        let field = wiring.fields.remove(0);
        assert_eq!(field.key, Key::of::<dyn Named>());
        (field.assign)(&erase(peer)).unwrap();
        (wiring.initialize.take().unwrap())();

        assert_eq!(service.peer.get().unwrap().name(), "peer");
        assert_eq!(service.init_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn upcast_activator_exposes_trait_object() {
        let activator = Activator::constructor::<dyn Named, Service, _>(|s| s as Arc<dyn Named>);
        let built = activator.build(&[erase(Arc::new(Config("traited")))]).unwrap();
        assert_eq!(unerase::<dyn Named>(&built.instance).unwrap().name(), "traited");
        assert!(unerase::<Service>(&built.instance).is_err());
    }

    #[test]
    fn arity_mismatch_is_invalid_constructor() {
        let activator = Activator::constructor::<Service, Service, _>(|s| s);
        match activator.build(&[]) {
            Err(DiError::InvalidConstructor { .. }) => {}
            other => panic!("expected InvalidConstructor, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn wrong_instance_type_is_type_mismatch() {
        let activator = Activator::constructor::<Service, Service, _>(|s| s);
        let wrong = erase(Arc::new(42u32));
        assert!(matches!(activator.build(&[wrong]), Err(DiError::TypeMismatch(_))));
    }

    #[test]
    fn injected_slot_rejects_second_assignment() {
        let slot: Injected<u32> = Injected::new();
        assert!(!slot.is_injected());
        slot.set(Arc::new(1)).unwrap();
        assert!(matches!(slot.set(Arc::new(2)), Err(DiError::FieldAlreadyInjected(_))));
        assert_eq!(**slot.get().unwrap(), 1);
    }
}
