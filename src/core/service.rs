//! Service resolution container.
//!
//! Implementations register either under their own concrete type or under
//! an explicit abstract binding (typically a `dyn Trait`). Resolution
//! checks explicit bindings first, then the implementation list in
//! registration order. Entries marked singleton are constructed once and
//! cached; everything else constructs fresh per resolution.
//!
//! The registry is additive and monotonic: there is no unregister, and
//! registration is expected to finish during application startup before
//! concurrent resolution begins. The internal lock exists for soundness,
//! not as license to register from steady-state threads.

use std::any::{type_name, Any, TypeId};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    NotRegistered(&'static str),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotRegistered(name) => write!(f, "{} not registered", name),
        }
    }
}

impl std::error::Error for ServiceError {}

type Instance = Box<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

#[derive(Clone)]
struct Entry {
    construct: Factory,
    singleton: bool,
    service_name: &'static str,
}

enum RegistrationKind {
    /// Explicit abstract-type binding; resolution hits these first.
    Binding,
    /// Implementation-only registration; resolved by ordered type scan.
    Implementation,
}

/// One declarative registration, the unit a module manifest is made of.
///
/// Modules that used to rely on attribute scanning instead expose a
/// `fn services() -> Vec<Registration>` and the application feeds it to
/// [`ServiceRegistry::register_module`] at startup.
pub struct Registration {
    key: TypeId,
    kind: RegistrationKind,
    entry: Entry,
}

impl Registration {
    /// Registers `T` under its own concrete type.
    pub fn implementation<T: Default + Send + Sync + 'static>() -> Self {
        Self::implementation_with(T::default)
    }

    /// Registers `T` under its own concrete type with a custom factory.
    pub fn implementation_with<T: Send + Sync + 'static>(
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: TypeId::of::<T>(),
            kind: RegistrationKind::Implementation,
            entry: Entry {
                construct: Arc::new(move || Box::new(Arc::new(factory()))),
                singleton: false,
                service_name: type_name::<T>(),
            },
        }
    }

    /// Binds the abstract type `I` (usually a `dyn Trait`) to whatever the
    /// factory produces. The factory performs the unsizing coercion:
    ///
    /// ```ignore
    /// Registration::bind::<dyn PlatformUiProvider>(|| Arc::new(GtkProvider::new()))
    /// ```
    pub fn bind<I: ?Sized + 'static>(factory: impl Fn() -> Arc<I> + Send + Sync + 'static) -> Self
    where
        Arc<I>: Send + Sync,
    {
        Self {
            key: TypeId::of::<I>(),
            kind: RegistrationKind::Binding,
            entry: Entry {
                construct: Arc::new(move || Box::new(factory())),
                singleton: false,
                service_name: type_name::<I>(),
            },
        }
    }

    /// Marks the entry singleton: constructed on first resolution, cached
    /// for the life of the registry.
    pub fn singleton(mut self) -> Self {
        self.entry.singleton = true;
        self
    }
}

#[derive(Default)]
struct Registry {
    bindings: FxHashMap<TypeId, Entry>,
    implementations: Vec<(TypeId, Entry)>,
    cache: FxHashMap<TypeId, Instance>,
}

#[derive(Default)]
pub struct ServiceRegistry {
    inner: Mutex<Registry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one registration. Idempotent per key: re-registering a type
    /// already present is a no-op, and the first binding for an abstract
    /// type wins.
    pub fn add(&self, registration: Registration) {
        let mut inner = self.inner.lock().expect("service registry poisoned");
        let Registration { key, kind, entry } = registration;

        match kind {
            RegistrationKind::Binding => {
                if inner.bindings.contains_key(&key) {
                    tracing::debug!(service = entry.service_name, "binding already present");
                    return;
                }
                tracing::debug!(service = entry.service_name, "binding registered");
                inner.bindings.insert(key, entry);
            }
            RegistrationKind::Implementation => {
                if inner.implementations.iter().any(|(t, _)| *t == key) {
                    tracing::debug!(service = entry.service_name, "already registered");
                    return;
                }
                tracing::debug!(service = entry.service_name, "implementation registered");
                inner.implementations.push((key, entry));
            }
        }
    }

    /// Feeds a module manifest through [`add`](Self::add).
    pub fn register_module(&self, registrations: impl IntoIterator<Item = Registration>) {
        for registration in registrations {
            self.add(registration);
        }
    }

    pub fn register<T: Default + Send + Sync + 'static>(&self) {
        self.add(Registration::implementation::<T>());
    }

    pub fn register_with<T: Send + Sync + 'static>(
        &self,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) {
        self.add(Registration::implementation_with(factory));
    }

    pub fn register_singleton<T: Default + Send + Sync + 'static>(&self) {
        self.add(Registration::implementation::<T>().singleton());
    }

    pub fn bind<I: ?Sized + 'static>(&self, factory: impl Fn() -> Arc<I> + Send + Sync + 'static)
    where
        Arc<I>: Send + Sync,
    {
        self.add(Registration::bind::<I>(factory));
    }

    pub fn bind_singleton<I: ?Sized + 'static>(
        &self,
        factory: impl Fn() -> Arc<I> + Send + Sync + 'static,
    ) where
        Arc<I>: Send + Sync,
    {
        self.add(Registration::bind::<I>(factory).singleton());
    }

    /// Resolves `T`, honoring the entry's singleton marker.
    pub fn get<T: ?Sized + 'static>(&self) -> Result<Arc<T>> {
        self.resolve::<T>(None)
    }

    /// Legacy overload: same resolution, but `cached` forces cache
    /// read/write (or fresh construction) regardless of the marker.
    pub fn get_with<T: ?Sized + 'static>(&self, cached: bool) -> Result<Arc<T>> {
        self.resolve::<T>(Some(cached))
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some()
    }

    fn lookup(&self, key: TypeId) -> Option<Entry> {
        let inner = self.inner.lock().expect("service registry poisoned");
        inner.bindings.get(&key).cloned().or_else(|| {
            inner
                .implementations
                .iter()
                .find(|(t, _)| *t == key)
                .map(|(_, entry)| entry.clone())
        })
    }

    fn resolve<T: ?Sized + 'static>(&self, cached_override: Option<bool>) -> Result<Arc<T>> {
        let key = TypeId::of::<T>();
        let entry = self
            .lookup(key)
            .ok_or(ServiceError::NotRegistered(type_name::<T>()))?;
        let use_cache = cached_override.unwrap_or(entry.singleton);

        if use_cache {
            let inner = self.inner.lock().expect("service registry poisoned");
            if let Some(hit) = inner
                .cache
                .get(&key)
                .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            {
                return Ok(Arc::clone(hit));
            }
        }

        // Construct outside the lock so a factory may resolve its own
        // dependencies through this registry.
        let instance = (entry.construct)();
        let resolved = instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ServiceError::NotRegistered(type_name::<T>()))?;

        if use_cache {
            tracing::trace!(service = entry.service_name, "singleton constructed");
            let mut inner = self.inner.lock().expect("service registry poisoned");
            // First resolution wins if two threads raced here.
            if let Some(existing) = inner
                .cache
                .get(&key)
                .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            {
                return Ok(Arc::clone(existing));
            }
            inner.cache.insert(key, instance);
        }

        Ok(resolved)
    }
}
