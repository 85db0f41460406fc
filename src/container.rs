//! Dependency injection container
//!
//! The `Container` owns the singleton [`Registry`] and the injection
//! metadata of every declared type, and resolves object graphs from them.

use crate::injection::{InjectionDescriptor, InjectionTable};
use crate::provider::{ClassId, Injectable};
use crate::registry::{Instance, Registry};
use crate::{DiError, Result};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Dependency injection container.
///
/// Cloning a container is cheap and yields a handle to the same registry
/// and metadata, so it can be passed wherever bootstrap code needs it.
///
/// # Examples
///
/// ```rust
/// use fieldwire::{injectable, Container};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Engine;
///
/// #[derive(Default)]
/// struct Car {
///     engine: Option<Arc<Engine>>,
/// }
///
/// injectable!(Engine, Car);
///
/// let container = Container::new();
/// container.injectable::<Engine>().unwrap();
/// container
///     .inject::<Car, Engine, _>("engine", |car, engine| car.engine = Some(engine))
///     .unwrap();
///
/// let car = container.resolve::<Car>().unwrap();
/// let engine = container.resolve::<Engine>().unwrap();
/// assert!(Arc::ptr_eq(car.engine.as_ref().unwrap(), &engine));
/// ```
#[derive(Clone)]
pub struct Container {
    /// Singleton instances, keyed by type
    registry: Arc<Registry>,
    /// Injection descriptors, keyed by declaring type
    injections: Arc<InjectionTable>,
    /// Set once bootstrap is over; declarations are refused afterwards
    locked: Arc<AtomicBool>,
}

impl Container {
    /// Create an empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "fieldwire", "Creating new DI container");

        Self::with_capacity(0)
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many types will be declared.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry::with_capacity(capacity)),
            injections: Arc::new(InjectionTable::with_capacity(capacity)),
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    // =========================================================================
    // Declaration Methods
    // =========================================================================

    /// Mark `T` as injectable.
    ///
    /// Registers `T` in the registry without an instance. This is
    /// bookkeeping only: undeclared types resolve just as well. Marking a
    /// type that already has an instance keeps that instance.
    pub fn injectable<T: Injectable>(&self) -> Result<()> {
        self.check_not_locked()?;

        let created = self.registry.mark(ClassId::of::<T>());

        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service = std::any::type_name::<T>(),
            newly_marked = created,
            "Marking service as injectable"
        );
        #[cfg(not(feature = "logging"))]
        let _ = created;

        Ok(())
    }

    /// Declare that field `field` of `T` receives the singleton of `D`.
    ///
    /// `setter` performs the assignment. Declarations on the same type
    /// accumulate in call order, and that order is the wiring order.
    ///
    /// # Errors
    ///
    /// - [`DiError::InvalidDeclaration`] if `field` is not an identifier or
    ///   is already injected on `T`
    /// - [`DiError::Locked`] after [`lock`](Self::lock)
    pub fn inject<T, D, F>(&self, field: &'static str, setter: F) -> Result<()>
    where
        T: Injectable,
        D: Injectable,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        self.check_not_locked()?;

        let descriptor = InjectionDescriptor::new::<T, D, F>(field, setter)?;
        let count = self.injections.append(descriptor)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service = std::any::type_name::<T>(),
            field = field,
            dependency = std::any::type_name::<D>(),
            injected_fields = count,
            "Declared injected field"
        );
        #[cfg(not(feature = "logging"))]
        let _ = count;

        Ok(())
    }

    /// Start a fluent declaration for `T`, marking it injectable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fieldwire::{injectable, Container};
    /// use std::sync::Arc;
    ///
    /// #[derive(Default)]
    /// struct Logger;
    /// #[derive(Default)]
    /// struct Cache;
    ///
    /// #[derive(Default)]
    /// struct UserService {
    ///     log: Option<Arc<Logger>>,
    ///     cache: Option<Arc<Cache>>,
    /// }
    ///
    /// injectable!(Logger, Cache, UserService);
    ///
    /// let container = Container::new();
    /// container
    ///     .declare::<UserService>()?
    ///     .inject("log", |s, log: Arc<Logger>| s.log = Some(log))?
    ///     .inject("cache", |s, cache: Arc<Cache>| s.cache = Some(cache))?
    ///     .done();
    ///
    /// let users = container.resolve::<UserService>()?;
    /// assert!(users.log.is_some() && users.cache.is_some());
    /// # Ok::<(), fieldwire::DiError>(())
    /// ```
    pub fn declare<T: Injectable>(&self) -> Result<Declaration<'_, T>> {
        self.injectable::<T>()?;
        Ok(Declaration {
            container: self,
            count: 0,
            _declaring: PhantomData,
        })
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a fully wired singleton of `T`.
    ///
    /// Returns the registered instance if `T` was resolved before.
    /// Otherwise constructs `T`, resolves every declared field in
    /// declaration order, then registers the wired instance. Only the
    /// first registered instance of a type is ever handed out.
    ///
    /// # Errors
    ///
    /// - any error from an [`Injectable::construct`] along the graph,
    ///   returned as is
    /// - [`DiError::CircularDependency`] if a type is reached again while
    ///   it is still being wired; the error names the whole path
    #[inline]
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>> {
        let mut path = ResolutionPath::new();
        let instance = self.resolve_erased::<T>(&mut path)?;
        downcast::<T>(instance)
    }

    /// Resolve, returning None on any error.
    #[inline]
    pub fn try_resolve<T: Injectable>(&self) -> Option<Arc<T>> {
        self.resolve::<T>().ok()
    }

    /// Resolve `T` as part of a larger resolution (internal)
    pub(crate) fn resolve_erased<T: Injectable>(
        &self,
        path: &mut ResolutionPath,
    ) -> Result<Instance> {
        let class = ClassId::of::<T>();

        if let Some(instance) = self.registry.get(&class) {
            #[cfg(feature = "logging")]
            trace!(
                target: "fieldwire",
                service = class.type_name(),
                depth = path.depth(),
                "Service resolved from registry"
            );
            return Ok(instance);
        }

        if path.contains(&class) {
            let cycle = path.describe(class);

            #[cfg(feature = "logging")]
            debug!(
                target: "fieldwire",
                service = class.type_name(),
                cycle = cycle.as_str(),
                "Circular dependency detected"
            );

            return Err(DiError::circular::<T>(cycle));
        }

        path.push(class);
        let built = self.build::<T>(class, path);
        path.pop();

        let fresh: Instance = Arc::new(built?);
        let canonical = self.registry.publish(class, Arc::clone(&fresh));

        #[cfg(feature = "logging")]
        if Arc::ptr_eq(&fresh, &canonical) {
            debug!(
                target: "fieldwire",
                service = class.type_name(),
                depth = path.depth(),
                "Service registered as singleton"
            );
        } else {
            debug!(
                target: "fieldwire",
                service = class.type_name(),
                "Another resolution registered this service first, dropping our instance"
            );
        }

        Ok(canonical)
    }

    /// Construct `T` and wire its declared fields
    fn build<T: Injectable>(&self, class: ClassId, path: &mut ResolutionPath) -> Result<T> {
        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service = class.type_name(),
            depth = path.depth(),
            "Constructing service"
        );

        let mut instance = T::construct()?;

        for descriptor in self.injections.snapshot(&class.type_id()) {
            descriptor.wire(self, path, &mut instance)?;

            #[cfg(feature = "logging")]
            trace!(
                target: "fieldwire",
                service = class.type_name(),
                field = descriptor.field_name(),
                dependency = descriptor.dependency().type_name(),
                "Injected field"
            );
        }

        Ok(instance)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// The registered instance of `T`, without constructing anything.
    #[inline]
    pub fn get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.registry
            .get(&ClassId::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Check if `T` is known to the registry, resolved or not.
    #[inline]
    pub fn contains<T: Injectable>(&self) -> bool {
        self.registry.has(&ClassId::of::<T>())
    }

    /// Check if `T` already has a singleton.
    #[inline]
    pub fn is_resolved<T: Injectable>(&self) -> bool {
        self.registry.get(&ClassId::of::<T>()).is_some()
    }

    /// Descriptors declared on `T`, in wiring order.
    pub fn injections<T: Injectable>(&self) -> Vec<Arc<InjectionDescriptor>> {
        self.injections.snapshot(&ClassId::of::<T>().type_id())
    }

    /// Names of the fields declared on `T`, in wiring order.
    pub fn injected_fields<T: Injectable>(&self) -> Vec<&'static str> {
        self.injections.field_names(&ClassId::of::<T>().type_id())
    }

    /// The underlying registry.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of types known to the registry.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if no type is known yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Refuse further declarations.
    ///
    /// Resolution keeps working; only `injectable`, `inject` and `declare`
    /// start failing with [`DiError::Locked`].
    #[inline]
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service_count = self.registry.len(),
            declaring_types = self.injections.len(),
            "Container locked - no further declarations allowed"
        );
    }

    /// Check if the container is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    #[inline]
    fn check_not_locked(&self) -> Result<()> {
        if self.locked.load(Ordering::Relaxed) {
            return Err(DiError::Locked);
        }
        Ok(())
    }
}

/// Downcast a registry instance to `T`
fn downcast<T: Injectable>(instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| {
        DiError::Internal(format!(
            "registry entry is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Fluent declaration of the injected fields of `T`.
///
/// Created by [`Container::declare`].
pub struct Declaration<'a, T> {
    container: &'a Container,
    count: usize,
    _declaring: PhantomData<fn() -> T>,
}

impl<'a, T: Injectable> Declaration<'a, T> {
    /// Declare an injected field and continue the chain
    #[inline]
    pub fn inject<D, F>(mut self, field: &'static str, setter: F) -> Result<Self>
    where
        D: Injectable,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        self.container.inject::<T, D, F>(field, setter)?;
        self.count += 1;
        Ok(self)
    }

    /// Finish the declaration, returning how many fields it declared
    #[inline]
    pub fn done(self) -> usize {
        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service = std::any::type_name::<T>(),
            fields_declared = self.count,
            "Declaration completed"
        );

        self.count
    }
}

/// Types currently being wired by one call to [`Container::resolve`]
#[derive(Debug, Default)]
pub(crate) struct ResolutionPath {
    stack: Vec<ClassId>,
}

impl ResolutionPath {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn contains(&self, class: &ClassId) -> bool {
        self.stack.contains(class)
    }

    #[inline]
    fn push(&mut self, class: ClassId) {
        self.stack.push(class);
    }

    #[inline]
    fn pop(&mut self) {
        self.stack.pop();
    }

    /// Nesting depth of the type being resolved (0 = root)
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `A -> B -> A`, starting where `repeat` first entered the path
    fn describe(&self, repeat: ClassId) -> String {
        let start = self.stack.iter().position(|c| *c == repeat).unwrap_or(0);
        self.stack[start..]
            .iter()
            .chain(std::iter::once(&repeat))
            .map(|c| c.short_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.registry.len())
            .field("resolved_count", &self.registry.resolved_count())
            .field("declaring_types", &self.injections.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injectable;
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct Engine {
        horsepower: u32,
    }

    #[derive(Default)]
    struct Car {
        engine: Option<Arc<Engine>>,
    }

    injectable!(Engine, Car);

    fn car_container() -> Container {
        let container = Container::new();
        container.injectable::<Engine>().unwrap();
        container
            .inject::<Car, Engine, _>("engine", |car, engine| car.engine = Some(engine))
            .unwrap();
        container
    }

    #[test]
    fn test_no_metadata_resolves_to_default() {
        let container = Container::new();
        let engine = container.resolve::<Engine>().unwrap();
        assert_eq!(engine.horsepower, 0);
        assert!(container.injections::<Engine>().is_empty());
    }

    #[test]
    fn test_resolve_same_instance() {
        let container = car_container();

        let c1 = container.resolve::<Car>().unwrap();
        let c2 = container.resolve::<Car>().unwrap();

        assert!(Arc::ptr_eq(&c1, &c2));
    }

    #[test]
    fn test_injected_field_is_dependency_singleton() {
        let container = car_container();

        let car = container.resolve::<Car>().unwrap();
        let engine = container.resolve::<Engine>().unwrap();

        assert!(Arc::ptr_eq(car.engine.as_ref().unwrap(), &engine));
    }

    #[test]
    fn test_registered_only_after_wiring() {
        let container = car_container();

        assert!(container.contains::<Engine>());
        assert!(!container.is_resolved::<Engine>());
        assert!(!container.contains::<Car>());
        assert!(container.get::<Car>().is_none());

        let car = container.resolve::<Car>().unwrap();

        assert!(container.is_resolved::<Engine>());
        assert!(Arc::ptr_eq(&container.get::<Car>().unwrap(), &car));
    }

    #[test]
    fn test_marking_keeps_existing_singleton() {
        let container = car_container();
        let engine = container.resolve::<Engine>().unwrap();

        container.injectable::<Engine>().unwrap();

        assert!(Arc::ptr_eq(&container.resolve::<Engine>().unwrap(), &engine));
    }

    #[test]
    fn test_constructor_runs_once() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        struct Counted;
        injectable!(Counted => {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Ok(Counted)
        });

        let container = Container::new();
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        let _ = container.resolve::<Counted>().unwrap();
        let _ = container.resolve::<Counted>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_construction_failure_propagates() {
        struct Broken;
        injectable!(Broken => Err(DiError::creation_failed::<Broken>("no socket")));

        #[allow(dead_code)]
        #[derive(Default)]
        struct Client {
            broken: Option<Arc<Broken>>,
        }
        injectable!(Client);

        let container = Container::new();
        container
            .inject::<Client, Broken, _>("broken", |c, b| c.broken = Some(b))
            .unwrap();

        let err = container.resolve::<Client>().err().unwrap();
        assert_eq!(err, DiError::creation_failed::<Broken>("no socket"));
        assert!(!container.is_resolved::<Client>());
        assert!(!container.is_resolved::<Broken>());
    }

    #[test]
    fn test_resolve_retries_after_construction_failure() {
        static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

        struct Flaky;
        injectable!(Flaky => {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DiError::creation_failed::<Flaky>("warming up"))
            } else {
                Ok(Flaky)
            }
        });

        let container = Container::new();

        let err = container.resolve::<Flaky>().err().unwrap();
        assert_eq!(err, DiError::creation_failed::<Flaky>("warming up"));
        assert!(!container.is_resolved::<Flaky>());

        let flaky = container.resolve::<Flaky>().unwrap();
        assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&container.get::<Flaky>().unwrap(), &flaky));
    }

    #[test]
    fn test_cycle_below_root_reports_inner_path() {
        #[allow(dead_code)]
        #[derive(Default)]
        struct Root {
            b: Option<Arc<Middle>>,
        }
        #[allow(dead_code)]
        #[derive(Default)]
        struct Middle {
            c: Option<Arc<Leaf>>,
        }
        #[allow(dead_code)]
        #[derive(Default)]
        struct Leaf {
            b: Option<Arc<Middle>>,
        }
        injectable!(Root, Middle, Leaf);

        let container = Container::new();
        container.inject::<Root, Middle, _>("b", |r, m| r.b = Some(m)).unwrap();
        container.inject::<Middle, Leaf, _>("c", |m, l| m.c = Some(l)).unwrap();
        container.inject::<Leaf, Middle, _>("b", |l, m| l.b = Some(m)).unwrap();

        match container.resolve::<Root>() {
            Err(DiError::CircularDependency { path, .. }) => {
                assert_eq!(path, "Middle -> Leaf -> Middle")
            }
            other => panic!("expected a cycle error, got {:?}", other.map(|_| ())),
        }
        assert!(!container.is_resolved::<Root>());
        assert!(!container.is_resolved::<Middle>());
        assert!(!container.is_resolved::<Leaf>());
    }

    #[test]
    fn test_self_cycle_is_rejected() {
        #[allow(dead_code)]
        #[derive(Default)]
        struct Node {
            next: Option<Arc<Node>>,
        }
        injectable!(Node);

        let container = Container::new();
        container
            .inject::<Node, Node, _>("next", |n, next| n.next = Some(next))
            .unwrap();

        match container.resolve::<Node>() {
            Err(DiError::CircularDependency { path, .. }) => assert_eq!(path, "Node -> Node"),
            other => panic!("expected a cycle error, got {:?}", other.map(|_| ())),
        }
        assert!(!container.is_resolved::<Node>());
    }

    #[test]
    fn test_lock() {
        let container = Container::new();
        assert!(!container.is_locked());

        container.lock();
        assert!(container.is_locked());
        assert_eq!(container.injectable::<Engine>(), Err(DiError::Locked));
        assert_eq!(
            container.inject::<Car, Engine, _>("engine", |c, e| c.engine = Some(e)),
            Err(DiError::Locked)
        );

        // resolution still works
        assert!(container.resolve::<Car>().is_ok());
    }

    #[test]
    fn test_clone_shares_state() {
        let container = car_container();
        let handle = container.clone();

        let car = handle.resolve::<Car>().unwrap();
        assert!(Arc::ptr_eq(&container.resolve::<Car>().unwrap(), &car));
    }

    #[test]
    fn test_declaration_chain() {
        #[derive(Default)]
        struct Garage {
            first: Option<Arc<Car>>,
            engine: Option<Arc<Engine>>,
        }
        injectable!(Garage);

        let container = car_container();
        let declared = container
            .declare::<Garage>()
            .unwrap()
            .inject("first", |g, car: Arc<Car>| g.first = Some(car))
            .unwrap()
            .inject("engine", |g, engine: Arc<Engine>| g.engine = Some(engine))
            .unwrap()
            .done();

        assert_eq!(declared, 2);
        assert!(container.contains::<Garage>());
        assert_eq!(container.injected_fields::<Garage>(), vec!["first", "engine"]);

        let garage = container.resolve::<Garage>().unwrap();
        let via_car = garage.first.as_ref().unwrap().engine.as_ref().unwrap();
        assert!(Arc::ptr_eq(via_car, garage.engine.as_ref().unwrap()));
    }

    #[test]
    fn test_concurrent_resolution_yields_one_singleton() {
        let container = car_container();

        let cars: Vec<Arc<Car>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| container.resolve::<Car>().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = &cars[0];
        for car in &cars {
            assert!(Arc::ptr_eq(first, car));
            assert!(Arc::ptr_eq(
                first.engine.as_ref().unwrap(),
                car.engine.as_ref().unwrap()
            ));
        }
    }

    #[test]
    fn test_resolution_path_describe() {
        let mut path = ResolutionPath::new();
        path.push(ClassId::of::<Car>());
        path.push(ClassId::of::<Engine>());

        assert_eq!(path.depth(), 2);
        assert_eq!(path.describe(ClassId::of::<Engine>()), "Engine -> Engine");
        assert_eq!(path.describe(ClassId::of::<Car>()), "Car -> Engine -> Car");
    }
}
