//! Method registration.
//!
//! The [`MethodRegistry`] is built once at startup. Each name can be
//! registered only once; a second registration is a programming error and is
//! reported before any call is served. [`MethodRegistry::into_dispatcher`]
//! closes registration: the resulting [`Dispatcher`] has no way to add
//! methods.
//!
//! Exported methods are wrapped with [`logged`], which records the name of
//! every invocation and otherwise calls straight through.

use std::collections::BTreeMap;

use sandbox_core::WireValue;
use tracing::{debug, error};

use crate::args::CallArgs;
use crate::dispatcher::Dispatcher;
use crate::facade::EngineFacade;
use crate::{Error, Result};

/// A callable registered under a method name.
pub type Handler = Box<dyn Fn(&mut dyn EngineFacade, CallArgs) -> Result<WireValue>>;

/// One registered method.
pub struct MethodRegistration {
    /// Name the host calls it by
    pub name: String,
    /// Whether the callable was wrapped by [`logged`]
    pub logged: bool,
    pub(crate) handler: Handler,
}

impl std::fmt::Debug for MethodRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistration")
            .field("name", &self.name)
            .field("logged", &self.logged)
            .finish_non_exhaustive()
    }
}

/// Wrap `method` so every invocation is logged under `name`.
///
/// The wrapper never touches the arguments or the result.
pub fn logged<F>(
    name: &str,
    method: F,
) -> impl Fn(&mut dyn EngineFacade, CallArgs) -> Result<WireValue>
where
    F: Fn(&mut dyn EngineFacade, CallArgs) -> Result<WireValue>,
{
    let name = name.to_string();
    move |engine: &mut dyn EngineFacade, args: CallArgs| {
        debug!(target: "sandbox::dispatch", method = %name, "calling {}", name);
        method(engine, args)
    }
}

/// Register a function under its own identifier, wrapped with [`logged`].
///
/// ```ignore
/// export!(registry, fetch_table)?;
/// // same as: registry.export("fetch_table", fetch_table)?;
/// ```
#[macro_export]
macro_rules! export {
    ($registry:expr, $method:ident) => {
        $registry.export(stringify!($method), $method)
    };
}

/// Registry of methods, open for registration.
#[derive(Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, MethodRegistration>,
}

impl MethodRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full fixed method surface.
    pub fn with_builtin_methods() -> Result<Self> {
        let mut registry = Self::new();
        crate::methods::register_builtin_methods(&mut registry)?;
        Ok(registry)
    }

    /// Register `method` under `name` as is.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateMethod`] if the name is taken. Callers treat this as
    /// fatal: it means two parts of the program claim the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, method: F) -> Result<()>
    where
        F: Fn(&mut dyn EngineFacade, CallArgs) -> Result<WireValue> + 'static,
    {
        self.insert(name.into(), Box::new(method), false)
    }

    /// Register `method` under `name`, wrapped with [`logged`].
    pub fn export<F>(&mut self, name: &str, method: F) -> Result<()>
    where
        F: Fn(&mut dyn EngineFacade, CallArgs) -> Result<WireValue> + 'static,
    {
        self.insert(name.to_string(), Box::new(logged(name, method)), true)
    }

    fn insert(&mut self, name: String, handler: Handler, logged: bool) -> Result<()> {
        if self.methods.contains_key(&name) {
            error!(target: "sandbox::dispatch", method = %name, "Method registered twice");
            return Err(Error::DuplicateMethod { name });
        }
        self.methods.insert(
            name.clone(),
            MethodRegistration {
                name,
                logged,
                handler,
            },
        );
        Ok(())
    }

    /// Whether a method is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Close registration.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.methods)
    }
}
