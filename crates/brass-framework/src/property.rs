//! Plugin properties that can be routed to like handlers.
//!
//! A [`Property`] pairs a name with a getter and an optional setter. As a
//! command target the setter receives the capture group of the same name;
//! as a precommand the getter's value decides whether the event passes.
//!
//! ```rust,ignore
//! let enabled = Arc::new(RwLock::new(true));
//! let prop = Property::shared("On", Arc::clone(&enabled));
//!
//! vec![
//!     Route::on_command_property(OnCommand::new("db (?<On>(on|off))$"), prop.clone()),
//!     Route::pre_command_property(PreCommand::new(), prop),
//! ]
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Getter<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Setter<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A named, readable and optionally writable value owned by a plugin.
pub struct Property<T> {
    name: Arc<str>,
    getter: Getter<T>,
    setter: Option<Setter<T>>,
}

impl<T: Send + Sync + 'static> Property<T> {
    /// Creates a writable property from a getter and a setter.
    pub fn new<G, S>(name: impl Into<Arc<str>>, getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
        }
    }

    /// Creates a property without a setter.
    pub fn read_only<G>(name: impl Into<Arc<str>>, getter: G) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// Creates a writable property backed by a shared lock.
    pub fn shared(name: impl Into<Arc<str>>, cell: Arc<RwLock<T>>) -> Self
    where
        T: Clone,
    {
        let read = Arc::clone(&cell);
        Self::new(name, move || read.read().clone(), move |value| *cell.write() = value)
    }

    /// The property name, also the capture group it binds from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the current value.
    pub fn get(&self) -> T {
        (self.getter)()
    }

    /// Returns `true` if the property has a setter.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Writes `value`; returns `false` for read-only properties.
    pub fn set(&self, value: T) -> bool {
        match &self.setter {
            Some(setter) => {
                setter(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            getter: Arc::clone(&self.getter),
            setter: self.setter.clone(),
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// A property with its value type erased, checked when the route registers.
pub(crate) trait AnyProperty: Send + Sync {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Send + Sync + 'static> AnyProperty for Property<T> {
    fn name(&self) -> &str {
        Property::name(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
