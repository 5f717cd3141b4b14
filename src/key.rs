//! Type identity keys for the binding registry.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key identifying a requested type in the registry.
///
/// A key wraps the [`TypeId`] of the requested type together with its
/// `std::any::type_name` for diagnostics. Both concrete types and trait
/// objects (`dyn Logger`) get keys, since `TypeId::of` accepts unsized
/// `'static` types.
///
/// Equality, ordering and hashing only look at the `TypeId`; the name is
/// carried along for error messages.
///
/// # Examples
///
/// ```rust
/// use graft_di::Key;
///
/// trait Logger: Send + Sync {}
///
/// let string_key = Key::of::<String>();
/// assert_eq!(string_key.display_name(), "alloc::string::String");
///
/// let trait_key = Key::of::<dyn Logger>();
/// assert!(trait_key.display_name().starts_with("dyn "));
/// assert_ne!(string_key, trait_key);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Key for the type `T` (sized or unsized).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Get the type name for display
    ///
    /// Returns the `std::any::type_name` of the requested type, used in
    /// every error message.
    #[inline]
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, used for compact graph labels.
    ///
    /// ```rust
    /// use graft_di::Key;
    ///
    /// assert_eq!(Key::of::<String>().short_name(), "String");
    /// ```
    pub fn short_name(&self) -> &'static str {
        let name = self.name;
        // Generic arguments may contain `::` themselves, so only look before the first `<`.
        let head_end = name.find('<').unwrap_or(name.len());
        match name[..head_end].rfind("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        }
    }
}

impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Key {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Helper for creating keys; same as [`Key::of`].
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}
