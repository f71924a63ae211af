//! Registry of "parse text into a value" functions, keyed by target type.
//!
//! Handler parameters and command properties of arbitrary types are bound from
//! captured text by looking up a parse function for the parameter's type here.
//!
//! Entries come from two places:
//!
//! - **Linked entries**: any crate in the final binary can contribute one with
//!   [`register_try_parse!`](crate::register_try_parse), which places it in the
//!   [`TRY_PARSE_REGISTRY`] distributed slice. [`TryParseRegistry::global`]
//!   collects them on first use.
//! - **Explicit registration**: [`TryParseRegistry::register`] at startup.
//!
//! The first registration for a type wins; later ones are ignored and never
//! overwrite it.
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, PartialEq)]
//! struct Color(u8, u8, u8);
//!
//! fn parse_color(text: &str) -> Option<Color> { /* ... */ }
//!
//! brass_core::register_try_parse!(Color, parse_color);
//!
//! let color: Option<Color> = TryParseRegistry::global().parse("#ff8800");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use linkme::distributed_slice;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// A parsed value with its concrete type erased.
pub type ErasedValue = Box<dyn Any + Send>;

/// Function pointer stored in linked entries.
pub type ErasedParseFn = fn(&str) -> Option<ErasedValue>;

type SharedParseFn = Arc<dyn Fn(&str) -> Option<ErasedValue> + Send + Sync>;

/// One linked parse function. Built by [`register_try_parse!`](crate::register_try_parse).
pub struct TryParseEntry {
    /// `TypeId::of::<T>` for the produced type.
    pub type_id: fn() -> TypeId,
    /// Name of the produced type, for logs.
    pub type_name: &'static str,
    /// The parse function; returns a boxed `T`.
    pub parse: ErasedParseFn,
}

/// Parse functions contributed by every crate linked into the binary.
#[distributed_slice]
pub static TRY_PARSE_REGISTRY: [TryParseEntry];

static GLOBAL: LazyLock<Arc<TryParseRegistry>> =
    LazyLock::new(|| Arc::new(TryParseRegistry::collect_linked()));

struct Entry {
    type_name: &'static str,
    parse: SharedParseFn,
}

/// Append-only map from a value type to its parse function.
#[derive(Default)]
pub struct TryParseRegistry {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl TryParseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every linked entry.
    pub fn collect_linked() -> Self {
        let registry = Self::new();
        let added = registry.load_linked();
        debug!(count = added, "Collected linked parse functions");
        registry
    }

    /// The process-wide registry, populated from linked entries on first access.
    pub fn global() -> Arc<TryParseRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Adds every linked entry whose type is not registered yet.
    ///
    /// Returns the number of entries added.
    pub fn load_linked(&self) -> usize {
        let mut added = 0;
        for entry in TRY_PARSE_REGISTRY {
            let parse = entry.parse;
            if self.insert((entry.type_id)(), entry.type_name, Arc::new(parse)) {
                added += 1;
            }
        }
        added
    }

    /// Registers `parse` as the parse function for `T`.
    ///
    /// Returns `false`, leaving the registry unchanged, if `T` already has one.
    pub fn register<T, F>(&self, parse: F) -> bool
    where
        T: Send + 'static,
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        let erased: SharedParseFn =
            Arc::new(move |text| parse(text).map(|value| Box::new(value) as ErasedValue));
        self.insert(TypeId::of::<T>(), std::any::type_name::<T>(), erased)
    }

    /// Registers `T`'s [`FromStr`] implementation.
    pub fn register_from_str<T>(&self) -> bool
    where
        T: FromStr + Send + 'static,
    {
        self.register(|text: &str| text.parse::<T>().ok())
    }

    fn insert(&self, type_id: TypeId, type_name: &'static str, parse: SharedParseFn) -> bool {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&type_id) {
            warn!(
                type_name,
                registered = existing.type_name,
                "Parse function already registered for type, keeping the first"
            );
            return false;
        }
        entries.insert(type_id, Entry { type_name, parse });
        true
    }

    /// Returns `true` if a parse function is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    /// Returns `true` if a parse function is registered for `type_id`.
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.entries.read().contains_key(&type_id)
    }

    /// Parses `text` into a `T` with the registered function.
    ///
    /// Returns `None` when no function is registered or parsing fails.
    pub fn parse<T: 'static>(&self, text: &str) -> Option<T> {
        self.parse_erased(TypeId::of::<T>(), text)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Parses `text` with the function registered for `type_id`.
    pub fn parse_erased(&self, type_id: TypeId, text: &str) -> Option<ErasedValue> {
        // Clone the function out so the lock is not held while it runs.
        let parse = self.entries.read().get(&type_id).map(|e| Arc::clone(&e.parse))?;
        parse(text)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for TryParseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut names: Vec<_> = entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("TryParseRegistry")
            .field("types", &names)
            .finish()
    }
}

/// Links a parse function for a type into [`TRY_PARSE_REGISTRY`].
///
/// With one argument the type's `FromStr` implementation is used; with two,
/// the second argument must coerce to `fn(&str) -> Option<T>`.
///
/// ```rust,ignore
/// brass_core::register_try_parse!(std::net::IpAddr);
/// brass_core::register_try_parse!(Color, |text: &str| Color::from_hex(text));
/// ```
#[macro_export]
macro_rules! register_try_parse {
    ($ty:ty) => {
        $crate::register_try_parse!($ty, |text: &str| text.parse::<$ty>().ok());
    };
    ($ty:ty, $parse:expr) => {
        const _: () = {
            fn __brass_try_parse(
                text: &str,
            ) -> ::core::option::Option<$crate::parse::ErasedValue> {
                let parse: fn(&str) -> ::core::option::Option<$ty> = $parse;
                parse(text).map(|value| ::std::boxed::Box::new(value) as $crate::parse::ErasedValue)
            }

            #[$crate::linkme::distributed_slice($crate::parse::TRY_PARSE_REGISTRY)]
            #[linkme(crate = $crate::linkme)]
            static __BRASS_TRY_PARSE: $crate::parse::TryParseEntry = $crate::parse::TryParseEntry {
                type_id: ::std::any::TypeId::of::<$ty>,
                type_name: ::core::stringify!($ty),
                parse: __brass_try_parse,
            };
        };
    };
}
