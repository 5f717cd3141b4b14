//! Injector configuration.
//!
//! Options can be set in code, read from `GRAFT_DI_*` environment variables,
//! or (with the `config` feature) deserialized from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default recursion limit for a single top-level resolve.
///
/// Each level costs several engine frames, so this must stay well inside the
/// 2 MiB stack of a spawned thread in an unoptimized build.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Environment variable overriding [`InjectorOptions::max_depth`].
pub const ENV_MAX_DEPTH: &str = "GRAFT_DI_MAX_DEPTH";
/// Environment variable overriding [`InjectorOptions::instantiate_eager`].
pub const ENV_INSTANTIATE_EAGER: &str = "GRAFT_DI_INSTANTIATE_EAGER";
/// Environment variable overriding [`InjectorOptions::validate_on_build`].
pub const ENV_VALIDATE_ON_BUILD: &str = "GRAFT_DI_VALIDATE_ON_BUILD";

/// Options applied when an [`Injector`](crate::Injector) is built
///
/// # Examples
///
/// ```rust
/// use graft_di::{Injector, InjectorOptions};
///
/// let options = InjectorOptions::default()
///     .with_max_depth(64)
///     .with_validate_on_build(true);
///
/// let injector = Injector::builder().options(options).build().unwrap();
/// assert_eq!(injector.options().max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct InjectorOptions {
    /// Maximum nested resolve depth before `DepthExceeded`
    pub max_depth: usize,
    /// Build eager singletons during `InjectorBuilder::build`
    pub instantiate_eager: bool,
    /// Run dependency graph validation during `InjectorBuilder::build`
    pub validate_on_build: bool,
}

impl Default for InjectorOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            instantiate_eager: true,
            validate_on_build: false,
        }
    }
}

impl InjectorOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_instantiate_eager(mut self, instantiate_eager: bool) -> Self {
        self.instantiate_eager = instantiate_eager;
        self
    }

    pub fn with_validate_on_build(mut self, validate_on_build: bool) -> Self {
        self.validate_on_build = validate_on_build;
        self
    }

    /// Defaults overridden by any `GRAFT_DI_*` variables that are set.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_depth: env_or(ENV_MAX_DEPTH, defaults.max_depth),
            instantiate_eager: env_or(ENV_INSTANTIATE_EAGER, defaults.instantiate_eager),
            validate_on_build: env_or(ENV_VALIDATE_ON_BUILD, defaults.validate_on_build),
        }
    }

    /// Parses options from JSON; missing fields keep their defaults.
    ///
    /// ```rust
    /// use graft_di::InjectorOptions;
    ///
    /// let options = InjectorOptions::from_json_str(r#"{ "max_depth": 32 }"#).unwrap();
    /// assert_eq!(options.max_depth, 32);
    /// assert!(options.instantiate_eager);
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "ignoring unparsable injector option");
                default
            }
        },
        Err(_) => default,
    }
}
