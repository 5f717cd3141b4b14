//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Every variant carries the type name(s) involved so a failed startup can be
/// diagnosed from the message alone. None of these are retried by the
/// injector: each one aborts the in-flight resolution and propagates to the
/// caller of [`Injector::get`](crate::Injector::get).
///
/// # Examples
///
/// ```rust
/// use graft_di::{DiError, Injector, Resolver};
///
/// let injector = Injector::builder().build().unwrap();
/// match injector.get::<String>() {
///     Err(DiError::UnknownDependency(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use graft_di::DiError;
///
/// let duplicate = DiError::DuplicateBinding {
///     requested: "dyn app::Logger",
///     existing: "app::ConsoleLogger",
///     attempted: "app::FileLogger",
/// };
/// assert_eq!(
///     duplicate.to_string(),
///     "Duplicate binding for dyn app::Logger: already bound to app::ConsoleLogger, cannot also bind app::FileLogger"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Two bindings were registered for the same requested type
    #[error("Duplicate binding for {requested}: already bound to {existing}, cannot also bind {attempted}")]
    DuplicateBinding {
        requested: &'static str,
        existing: &'static str,
        attempted: &'static str,
    },
    /// No provider is registered and discovery did not supply one
    #[error("Unknown dependency: {0}")]
    UnknownDependency(&'static str),
    /// A type declares a dependency on itself
    #[error("Self dependency: {0} depends on itself")]
    SelfDependency(&'static str),
    /// The construction descriptor cannot be used for this binding
    #[error("Invalid constructor for {type_name}: {reason}")]
    InvalidConstructor {
        type_name: &'static str,
        reason: &'static str,
    },
    /// A capability was invoked on a stand-in whose target is not bound yet
    #[error("Proxy not initialized: stand-in for {0} was used before its target was constructed")]
    ProxyNotInitialized(&'static str),
    /// Cycle through a type with no registered stand-in (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Two discovery markers on the same type disagree
    #[error("Conflicting markers on {type_name}: {first} and {second}")]
    ConflictingMarkers {
        type_name: &'static str,
        first: &'static str,
        second: &'static str,
    },
    /// A singleton provider constructed a second instance
    #[error("Singleton {0} was constructed twice")]
    SingletonReconstructed(&'static str),
    /// A stand-in target was bound more than once
    #[error("Stand-in for {0} is already bound")]
    StandInAlreadyBound(&'static str),
    /// An injected field was assigned more than once
    #[error("Field of type {0} was already injected")]
    FieldAlreadyInjected(&'static str),
    /// Two stand-in factories were registered for the same abstraction
    #[error("Duplicate stand-in for {0}")]
    DuplicateStandIn(&'static str),
    /// A constructor or observer resolved from the injector that is building it
    #[error("Re-entrant resolution of {0} on an injector that is already resolving")]
    ReentrantResolution(&'static str),
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout graft-di.
///
/// ```rust
/// use graft_di::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::UnknownDependency("some_service"))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
