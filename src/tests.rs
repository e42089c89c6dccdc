use crate::{
    define_module, interface, open_generic, BuildKey, BuilderAware,
    BuilderContext, BuilderStrategy, CompositeResolverOverride, Constructor,
    ContainerControlledLifetimeManager, DependencyOverride, Dispose, Existing,
    ExtensionContext, ExternallyControlledLifetimeManager,
    HierarchicalLifetimeManager, InjectError, InjectResult, Injectable,
    InjectionConstructor, InjectionMethod, InjectionProperty, Instance,
    LifetimeManager, Members, Method, OpenGeneric, ParameterOverride,
    PerThreadLifetimeManager, Property, RegisterOptions, Service, ServiceInfo,
    Svc, TypeKey, UnityBuildStage, UnityContainer, UnityContainerExtension,
};
use parking_lot::Mutex;
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};
use tracing_test::traced_test;

#[derive(Default)]
struct Svc1(pub i32);

impl Injectable for Svc1 {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

struct Svc2 {
    pub dep1: Svc<Svc1>,
}

impl Injectable for Svc2 {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| Ok(Svc2 { dep1: args.next()? })).param::<Svc1>("dep1"),
        )
    }
}

struct Svc3 {
    pub dep1: Svc<Svc1>,
    pub dep2: Svc<Svc2>,
}

impl Injectable for Svc3 {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| {
                Ok(Svc3 {
                    dep1: args.next()?,
                    dep2: args.next()?,
                })
            })
            .param::<Svc1>("dep1")
            .param::<Svc2>("dep2"),
        )
    }
}

trait Foo: Service {
    fn bar(&self) -> i32;
}

interface!(Foo);

#[derive(Default)]
struct FooA;

impl Foo for FooA {
    fn bar(&self) -> i32 {
        1
    }
}

impl Injectable for FooA {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

#[derive(Default)]
struct FooB;

impl Foo for FooB {
    fn bar(&self) -> i32 {
        2
    }
}

impl Injectable for FooB {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

struct NeedsFoo(Svc<dyn Foo>);

impl Injectable for NeedsFoo {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| Ok(NeedsFoo(args.next()?))).param::<dyn Foo>("foo"),
        )
    }
}

/// Records the ids of disposed values, in the order they were disposed.
#[derive(Default)]
struct DisposeLog(Mutex<Vec<usize>>);

impl Injectable for DisposeLog {}

struct Tracked<const ID: usize> {
    log: Svc<DisposeLog>,
}

impl<const ID: usize> Injectable for Tracked<ID> {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| Ok(Tracked { log: args.next()? }))
                .param::<DisposeLog>("log"),
        )
    }

    fn as_dispose(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

impl<const ID: usize> Dispose for Tracked<ID> {
    fn dispose(&self) {
        self.log.0.lock().push(ID);
    }
}

fn container_with_log() -> InjectResult<(UnityContainer, Svc<DisposeLog>)> {
    let container = UnityContainer::new();
    let log = Svc::new(DisposeLog::default());
    container.register_instance(None, Svc::clone(&log), None)?;
    Ok((container, log))
}

#[test]
fn transient_values_are_distinct() -> InjectResult<()> {
    let container = UnityContainer::new();
    let first: Svc<Svc3> = container.resolve()?;
    let second: Svc<Svc3> = container.resolve()?;
    assert!(!Svc::ptr_eq(&first, &second));
    assert!(!Svc::ptr_eq(&first.dep1, &first.dep2.dep1));
    Ok(())
}

#[test]
fn singletons_are_reused_across_the_graph() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_singleton::<Svc1, Svc1>()?;

    let first: Svc<Svc3> = container.resolve()?;
    let second: Svc<Svc3> = container.resolve()?;
    assert!(Svc::ptr_eq(&first.dep1, &first.dep2.dep1));
    assert!(Svc::ptr_eq(&first.dep1, &second.dep1));
    assert!(!Svc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn missing_dependency_reports_the_operation() {
    let container = UnityContainer::new();
    match container.resolve::<NeedsFoo>() {
        Err(InjectError::ResolutionFailed {
            service_info,
            operation: Some(operation),
            source,
            ..
        }) if service_info == ServiceInfo::of::<NeedsFoo>() => {
            assert!(operation.contains("\"foo\""), "{}", operation);
            match *source {
                InjectError::NotConstructible { service_info }
                    if service_info == ServiceInfo::of::<dyn Foo>() => {}
                error => Err(error).unwrap(),
            }
        }
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("no implementation of Foo was registered"),
    }
}

#[test]
fn interfaces_resolve_to_their_mapping() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<dyn Foo, FooB>(RegisterOptions::new())?;

    let needs: Svc<NeedsFoo> = container.resolve()?;
    assert_eq!(2, needs.0.bar());
    Ok(())
}

#[test]
fn reregistration_replaces_the_mapping() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<dyn Foo, FooA>(RegisterOptions::new())?;
    assert_eq!(1, container.resolve::<dyn Foo>()?.bar());

    container.register_type::<dyn Foo, FooB>(RegisterOptions::new())?;
    assert_eq!(2, container.resolve::<dyn Foo>()?.bar());
    assert_eq!(1, container.registrations().len());
    Ok(())
}

#[test]
fn child_registrations_shadow_the_parent() -> InjectResult<()> {
    let parent = UnityContainer::new();
    parent.register_type::<dyn Foo, FooA>(RegisterOptions::new())?;
    let child = parent.create_child_container()?;
    assert_eq!(1, child.resolve::<dyn Foo>()?.bar());

    child.register_type::<dyn Foo, FooB>(RegisterOptions::new())?;
    assert_eq!(2, child.resolve::<dyn Foo>()?.bar());
    assert_eq!(1, parent.resolve::<dyn Foo>()?.bar());
    Ok(())
}

#[test]
fn hierarchical_values_are_disposed_with_their_container() -> InjectResult<()> {
    let (parent, log) = container_with_log()?;
    parent.register_type::<Tracked<1>, Tracked<1>>(
        RegisterOptions::new().lifetime(HierarchicalLifetimeManager::new()),
    )?;
    let child = parent.create_child_container()?;

    let from_parent: Svc<Tracked<1>> = parent.resolve()?;
    let from_child: Svc<Tracked<1>> = child.resolve()?;
    assert!(!Svc::ptr_eq(&from_parent, &from_child));

    child.dispose();
    assert_eq!(vec![1], *log.0.lock());
    assert!(Svc::ptr_eq(&from_parent, &parent.resolve::<Tracked<1>>()?));

    parent.dispose();
    assert_eq!(vec![1, 1], *log.0.lock());
    Ok(())
}

#[test]
fn disposing_a_parent_disposes_its_children() -> InjectResult<()> {
    let (parent, log) = container_with_log()?;
    parent.register_type::<Tracked<2>, Tracked<2>>(
        RegisterOptions::new().lifetime(HierarchicalLifetimeManager::new()),
    )?;
    let child = parent.create_child_container()?;
    let _value: Svc<Tracked<2>> = child.resolve()?;

    parent.dispose();
    assert!(child.is_disposed());
    assert_eq!(vec![2], *log.0.lock());
    Ok(())
}

#[test]
fn disposal_happens_in_reverse_registration_order() -> InjectResult<()> {
    let (container, log) = container_with_log()?;
    container.register_singleton::<Tracked<1>, Tracked<1>>()?;
    container.register_singleton::<Tracked<2>, Tracked<2>>()?;
    container.register_singleton::<Tracked<3>, Tracked<3>>()?;

    // Resolution order does not matter
    let _third: Svc<Tracked<3>> = container.resolve()?;
    let _first: Svc<Tracked<1>> = container.resolve()?;
    let _second: Svc<Tracked<2>> = container.resolve()?;

    container.dispose();
    container.dispose();
    assert_eq!(vec![3, 2, 1], *log.0.lock());
    Ok(())
}

#[test]
fn disposed_containers_refuse_requests() {
    let container = UnityContainer::new();
    container.register_singleton::<Svc1, Svc1>().unwrap();
    container.dispose();

    assert!(!container.is_registered::<Svc1>(None));
    assert!(container.registrations().is_empty());

    match container.resolve::<Svc1>() {
        Err(InjectError::ContainerDisposed) => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("the container was disposed"),
    }
    assert!(matches!(
        container.register_singleton::<Svc1, Svc1>(),
        Err(InjectError::ContainerDisposed)
    ));
    assert!(matches!(
        container.create_child_container(),
        Err(InjectError::ContainerDisposed)
    ));
}

#[test]
fn overrides_apply_to_one_resolve_only() -> InjectResult<()> {
    let container = UnityContainer::new();
    let replacement = Svc::new(Svc1(5));
    let overrides = CompositeResolverOverride::new()
        .with(DependencyOverride::new(Svc::clone(&replacement)));

    let overridden: Svc<Svc3> = container.resolve_with(None, overrides)?;
    assert!(Svc::ptr_eq(&replacement, &overridden.dep1));
    assert!(Svc::ptr_eq(&replacement, &overridden.dep2.dep1));

    let plain: Svc<Svc3> = container.resolve()?;
    assert_eq!(0, plain.dep1.0);
    Ok(())
}

#[test]
fn overrides_win_over_registrations() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_instance(None, Svc::new(Svc1(1)), None)?;

    let overrides = CompositeResolverOverride::new()
        .with(ParameterOverride::new("dep1", Svc::new(Svc1(7))));
    let svc2: Svc<Svc2> = container.resolve_with(None, overrides)?;
    assert_eq!(7, svc2.dep1.0);
    assert_eq!(1, container.resolve::<Svc2>()?.dep1.0);
    Ok(())
}

trait Repository<T>: Service {
    fn describe(&self) -> &'static str;
}

interface!(Repository<T> = [MemoryRepository<T>]);

struct MemoryRepository<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Service> Repository<T> for MemoryRepository<T> {
    fn describe(&self) -> &'static str {
        "memory"
    }
}

impl<T: Service> Injectable for MemoryRepository<T> {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::new(|_| {
            Ok(MemoryRepository {
                _marker: PhantomData,
            })
        }))
    }

    fn open_generic() -> Option<OpenGeneric> {
        Some(open_generic!(MemoryRepository))
    }
}

#[derive(Default)]
struct SpecialRepository;

impl Repository<u32> for SpecialRepository {
    fn describe(&self) -> &'static str {
        "special"
    }
}

impl Injectable for SpecialRepository {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

#[test]
fn closed_registrations_win_over_open_generics() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_generic_type::<dyn Repository<()>, MemoryRepository<()>>(
        RegisterOptions::new(),
    )?;
    container.register_type::<dyn Repository<u32>, SpecialRepository>(RegisterOptions::new())?;

    assert_eq!("memory", container.resolve::<dyn Repository<String>>()?.describe());
    assert_eq!("special", container.resolve::<dyn Repository<u32>>()?.describe());
    assert!(container.is_registered::<dyn Repository<u8>>(None));
    Ok(())
}

#[test]
fn open_generic_lifetimes_are_per_closed_type() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_generic_type::<dyn Repository<()>, MemoryRepository<()>>(
        RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
    )?;

    let first = container.resolve::<dyn Repository<String>>()?;
    let second = container.resolve::<dyn Repository<String>>()?;
    let other: Svc<MemoryRepository<u8>> = container.resolve()?;
    assert!(Svc::ptr_eq(&first, &second));
    assert_eq!("memory", other.describe());

    let registration = &container.registrations()[0];
    assert_eq!(
        TypeKey::OpenGeneric(open_generic!(MemoryRepository)),
        registration.mapped_to()
    );
    Ok(())
}

#[test]
fn open_generic_singletons_are_shared_with_children() -> InjectResult<()> {
    let parent = UnityContainer::new();
    parent.register_generic_type::<dyn Repository<()>, MemoryRepository<()>>(
        RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
    )?;
    let child = parent.create_child_container()?;

    let from_child = child.resolve::<dyn Repository<String>>()?;
    let from_parent = parent.resolve::<dyn Repository<String>>()?;
    assert!(Svc::ptr_eq(&from_child, &from_parent));

    child.dispose();
    assert!(Svc::ptr_eq(&from_parent, &parent.resolve::<dyn Repository<String>>()?));
    Ok(())
}

#[test]
fn open_generic_hierarchical_values_are_per_container() -> InjectResult<()> {
    let parent = UnityContainer::new();
    parent.register_generic_type::<dyn Repository<()>, MemoryRepository<()>>(
        RegisterOptions::new().lifetime(HierarchicalLifetimeManager::new()),
    )?;
    let child = parent.create_child_container()?;

    let from_child = child.resolve::<dyn Repository<u8>>()?;
    let from_parent = parent.resolve::<dyn Repository<u8>>()?;
    assert!(!Svc::ptr_eq(&from_child, &from_parent));
    assert!(Svc::ptr_eq(&from_child, &child.resolve::<dyn Repository<u8>>()?));
    Ok(())
}

#[derive(Default)]
struct FooLogger;

impl Foo for FooLogger {
    fn bar(&self) -> i32 {
        3
    }
}

impl Logger for FooLogger {
    fn name(&self) -> &'static str {
        "foo"
    }
}

impl Injectable for FooLogger {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

#[test]
fn registrations_sharing_an_implementation_keep_their_lifetime() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<dyn Foo, FooLogger>(
        RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new()),
    )?;
    let first = container.resolve::<dyn Foo>()?;

    container.register_type::<dyn Logger, FooLogger>(RegisterOptions::new())?;
    assert!(Svc::ptr_eq(&first, &container.resolve::<dyn Foo>()?));
    assert_eq!("foo", container.resolve::<dyn Logger>()?.name());

    // Registering Foo again without a lifetime removes its singleton
    container.register_type::<dyn Foo, FooLogger>(RegisterOptions::new())?;
    assert!(!Svc::ptr_eq(&first, &container.resolve::<dyn Foo>()?));
    Ok(())
}

struct Looping;

impl Injectable for Looping {}

fn resolve_looping(options: RegisterOptions) -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_factory::<Looping, _>(
        None,
        |container: &UnityContainer, _build_key: &BuildKey| container.resolve::<Looping>(),
        options,
    )?;

    let (sender, receiver) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = sender.send(container.resolve::<Looping>().map(|_| ()));
    });
    receiver
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("resolving the factory did not finish")
}

#[test]
fn factories_requesting_their_own_key_fail_with_a_cycle() {
    let singleton = RegisterOptions::new().lifetime(ContainerControlledLifetimeManager::new());
    for options in [singleton, RegisterOptions::new()] {
        match resolve_looping(options) {
            Err(error)
                if matches!(
                    error.root_cause(),
                    InjectError::CycleDetected { cycle, .. } if cycle.len() == 2
                ) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("the factory requests its own key"),
        }
    }
}

#[test]
fn non_generic_types_cannot_be_registered_as_open_generics() {
    let container = UnityContainer::new();
    match container.register_generic_type::<dyn Foo, FooA>(RegisterOptions::new()) {
        Err(InjectError::NotGeneric { service_info })
            if service_info == ServiceInfo::of::<dyn Foo>() => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("Foo is not generic"),
    }
}

struct Ambiguous;

impl Injectable for Ambiguous {
    fn members() -> Members<Self> {
        Members::new()
            .constructor(Constructor::new(|_| Ok(Ambiguous)).param::<Svc1>("first"))
            .constructor(Constructor::new(|_| Ok(Ambiguous)).param::<Svc2>("second"))
    }
}

#[test]
fn ambiguous_constructors_fail() {
    match UnityContainer::new().resolve::<Ambiguous>() {
        Err(error)
            if matches!(
                error.root_cause(),
                InjectError::AmbiguousConstructor {
                    service_info,
                    parameter_count: 1,
                } if *service_info == ServiceInfo::of::<Ambiguous>()
            ) => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("the constructors have the same length"),
    }
}

struct Token;

struct Widget {
    token: Svc<Token>,
    dep1: Option<Svc<Svc1>>,
    built_up: AtomicBool,
}

impl Injectable for Widget {
    fn members() -> Members<Self> {
        Members::new()
            .constructor(Constructor::new(|_| {
                Ok(Widget {
                    token: Svc::new(Token),
                    dep1: None,
                    built_up: AtomicBool::new(false),
                })
            }))
            .property(
                Property::new("dep1", |widget: &mut Widget, dep1: Svc<Svc1>| {
                    widget.dep1 = Some(dep1);
                })
                .marked(),
            )
    }

    fn as_builder_aware(&self) -> Option<&dyn BuilderAware> {
        Some(self)
    }
}

impl BuilderAware for Widget {
    fn on_built_up(&self, _build_key: &BuildKey) {
        self.built_up.store(true, Ordering::Release);
    }
}

#[test]
fn build_up_injects_without_constructing() -> InjectResult<()> {
    let container = UnityContainer::new();
    let token = Svc::new(Token);
    let widget = Widget {
        token: Svc::clone(&token),
        dep1: None,
        built_up: AtomicBool::new(false),
    };

    let widget = container.build_up(widget, None, CompositeResolverOverride::new())?;
    assert!(Svc::ptr_eq(&token, &widget.token));
    assert!(widget.dep1.is_some());
    assert!(widget.built_up.load(Ordering::Acquire));
    Ok(())
}

trait Logger: Service {
    fn name(&self) -> &'static str;
}

interface!(Logger);

#[derive(Default)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn name(&self) -> &'static str {
        "console"
    }
}

impl Injectable for ConsoleLogger {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

#[derive(Default)]
struct FileLogger;

impl Logger for FileLogger {
    fn name(&self) -> &'static str {
        "file"
    }
}

impl Injectable for FileLogger {
    fn members() -> Members<Self> {
        Members::new().constructor(Constructor::from_default())
    }
}

#[test]
fn resolve_all_returns_named_registrations() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<dyn Logger, ConsoleLogger>(RegisterOptions::new())?;
    container.register_named::<dyn Logger, FileLogger>("file")?;

    let loggers = container.resolve_all::<dyn Logger>()?;
    assert_eq!(1, loggers.len());
    assert_eq!("file", loggers[0].name());
    assert_eq!("console", container.resolve::<dyn Logger>()?.name());
    assert_eq!("file", container.resolve_named::<dyn Logger>("file")?.name());
    Ok(())
}

#[test]
fn resolve_all_includes_parent_registrations_once() -> InjectResult<()> {
    let parent = UnityContainer::new();
    parent.register_named::<dyn Logger, ConsoleLogger>("a")?;
    parent.register_named::<dyn Logger, FileLogger>("b")?;
    let child = parent.create_child_container()?;
    child.register_named::<dyn Logger, FileLogger>("a")?;

    let names: Vec<_> = child
        .resolve_all::<dyn Logger>()?
        .iter()
        .map(|logger| logger.name())
        .collect();
    assert_eq!(vec!["file", "file"], names);
    assert_eq!(2, parent.resolve_all::<dyn Logger>()?.len());
    Ok(())
}

#[derive(Default)]
struct Counter(AtomicUsize);

impl Injectable for Counter {}

struct Slow;

impl Injectable for Slow {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| {
                let counter: Svc<Counter> = args.next()?;
                counter.0.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Slow)
            })
            .param::<Counter>("counter"),
        )
    }
}

#[test]
fn concurrent_singleton_requests_build_once() -> InjectResult<()> {
    let container = UnityContainer::new();
    let counter = Svc::new(Counter::default());
    container.register_instance(None, Svc::clone(&counter), None)?;
    container.register_singleton::<Slow, Slow>()?;

    let values: Vec<Svc<Slow>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| container.resolve::<Slow>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<InjectResult<_>>()
    })?;

    assert_eq!(1, counter.0.load(Ordering::SeqCst));
    assert!(values.iter().all(|value| Svc::ptr_eq(value, &values[0])));
    Ok(())
}

struct SelfDependent;

impl Injectable for SelfDependent {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| {
                let _inner: Svc<SelfDependent> = args.next()?;
                Ok(SelfDependent)
            })
            .param::<SelfDependent>("inner"),
        )
    }
}

#[test]
fn singleton_cycles_fail_without_deadlocking() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_singleton::<SelfDependent, SelfDependent>()?;

    for _ in 0..2 {
        match container.resolve::<SelfDependent>() {
            Err(error)
                if matches!(
                    error.root_cause(),
                    InjectError::CycleDetected { cycle, .. } if cycle.len() == 2
                ) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("the type depends on itself"),
        }
    }
    Ok(())
}

#[test]
fn lifetime_managers_cannot_be_shared() -> InjectResult<()> {
    let container = UnityContainer::new();
    let lifetime: Arc<dyn LifetimeManager> = Arc::new(ContainerControlledLifetimeManager::new());
    container.register_type::<Svc1, Svc1>(RegisterOptions::new().with_lifetime(Arc::clone(&lifetime)))?;

    match container.register_type::<Svc2, Svc2>(RegisterOptions::new().with_lifetime(lifetime)) {
        Err(InjectError::LifetimeManagerInUse { service_info })
            if service_info == ServiceInfo::of::<Svc2>() => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("the lifetime manager is already in use"),
    }
    Ok(())
}

struct MaybeFoo {
    foo: Option<Svc<dyn Foo>>,
}

impl Injectable for MaybeFoo {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| {
                Ok(MaybeFoo {
                    foo: args.next_optional()?,
                })
            })
            .optional_param::<dyn Foo>("foo"),
        )
    }
}

#[test]
fn optional_dependencies_may_be_missing() -> InjectResult<()> {
    let container = UnityContainer::new();
    assert!(container.resolve::<MaybeFoo>()?.foo.is_none());

    container.register_type::<dyn Foo, FooA>(RegisterOptions::new())?;
    assert_eq!(1, container.resolve::<MaybeFoo>()?.foo.as_ref().unwrap().bar());
    Ok(())
}

#[test]
fn try_resolve_distinguishes_missing_registrations() -> InjectResult<()> {
    let container = UnityContainer::new();
    assert!(container.try_resolve::<dyn Foo>()?.is_none());
    assert!(container.try_resolve::<NeedsFoo>().is_err());
    assert!(container.try_resolve::<Svc1>()?.is_some());
    Ok(())
}

#[test]
fn per_thread_values_are_separate() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<Svc1, Svc1>(
        RegisterOptions::new().lifetime(PerThreadLifetimeManager::new()),
    )?;

    let first: Svc<Svc1> = container.resolve()?;
    assert!(Svc::ptr_eq(&first, &container.resolve::<Svc1>()?));

    let other = std::thread::scope(|scope| {
        scope
            .spawn(|| container.resolve::<Svc1>())
            .join()
            .unwrap()
    })?;
    assert!(!Svc::ptr_eq(&first, &other));
    Ok(())
}

#[test]
fn externally_controlled_values_are_not_kept_alive() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<Svc1, Svc1>(
        RegisterOptions::new().lifetime(ExternallyControlledLifetimeManager::new()),
    )?;

    let first: Svc<Svc1> = container.resolve()?;
    assert!(Svc::ptr_eq(&first, &container.resolve::<Svc1>()?));

    let weak = Svc::downgrade(&first);
    drop(first);
    assert!(weak.upgrade().is_none());
    assert_eq!(0, container.resolve::<Svc1>()?.0);
    Ok(())
}

struct Flaky;

#[derive(Default)]
struct Attempts(AtomicUsize);

impl Injectable for Attempts {}

impl Injectable for Flaky {
    fn members() -> Members<Self> {
        Members::new().constructor(
            Constructor::new(|args| {
                let attempts: Svc<Attempts> = args.next()?;
                if attempts.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(InjectError::activation_failed::<Flaky>("not ready yet"));
                }

                Ok(Flaky)
            })
            .param::<Attempts>("attempts"),
        )
    }
}

#[test]
fn failed_singletons_can_be_retried() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_instance(None, Svc::new(Attempts::default()), None)?;
    container.register_singleton::<Flaky, Flaky>()?;

    match container.resolve::<Flaky>() {
        Err(error) => assert!(matches!(
            error.root_cause(),
            InjectError::ActivationFailed { .. }
        )),
        Ok(_) => unreachable!("the first attempt fails"),
    }

    let first = container.resolve::<Flaky>()?;
    assert!(Svc::ptr_eq(&first, &container.resolve::<Flaky>()?));
    Ok(())
}

struct Substitute;

impl BuilderStrategy for Substitute {
    fn pre_build_up(&self, context: &mut BuilderContext) -> InjectResult<()> {
        if *context.build_key().service_info() == ServiceInfo::of::<Svc1>() {
            context.set_existing(Existing::Built(Instance::new(Svc::new(Svc1(99)), None)));
        }

        Ok(())
    }
}

struct Substitution;

impl UnityContainerExtension for Substitution {
    fn initialize(&self, context: &ExtensionContext<'_>) -> InjectResult<()> {
        context
            .strategies()
            .add(Arc::new(Substitute), UnityBuildStage::PostInitialization);
        Ok(())
    }
}

#[test]
fn extensions_can_substitute_built_values() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.add_extension(Substitution)?;

    assert_eq!(99, container.resolve::<Svc1>()?.0);
    let built_up = container.build_up(Svc1(1), None, CompositeResolverOverride::new())?;
    assert_eq!(99, built_up.0);

    let child = container.create_child_container()?;
    assert_eq!(99, child.resolve::<Svc2>()?.dep1.0);
    Ok(())
}

#[test]
fn containers_resolve_to_themselves() -> InjectResult<()> {
    let container = UnityContainer::new();
    let child = container.create_child_container()?;
    child.register_type::<dyn Foo, FooB>(RegisterOptions::new())?;

    let resolved: Svc<UnityContainer> = child.resolve()?;
    assert!(resolved.parent().is_some());
    assert!(resolved.is_registered::<dyn Foo>(None));
    assert!(container.resolve::<UnityContainer>()?.parent().is_none());
    Ok(())
}

struct Server {
    port: u16,
    host: Option<Svc<String>>,
    started: bool,
}

impl Injectable for Server {
    fn members() -> Members<Self> {
        Members::new()
            .constructor(Constructor::new(|_| {
                Ok(Server {
                    port: 80,
                    host: None,
                    started: false,
                })
            }))
            .constructor(
                Constructor::new(|args| {
                    Ok(Server {
                        port: args.next_value()?,
                        host: None,
                        started: false,
                    })
                })
                .param::<u16>("port"),
            )
            .property(Property::new("host", |server: &mut Server, host: Svc<String>| {
                server.host = Some(host);
            }))
            .method(Method::new("start", |server: &mut Server, _| {
                server.started = true;
                Ok(())
            }))
    }
}

#[test]
fn injection_members_configure_the_build() -> InjectResult<()> {
    let container = UnityContainer::new();
    container.register_type::<Server, Server>(
        RegisterOptions::new()
            .member(InjectionConstructor::new().value(Svc::new(8080_u16)))
            .member(InjectionProperty::with_value("host", Svc::new(String::from("localhost"))))
            .member(InjectionMethod::new("start")),
    )?;

    let server: Svc<Server> = container.resolve()?;
    assert_eq!(8080, server.port);
    assert_eq!(Some("localhost"), server.host.as_deref().map(String::as_str));
    assert!(server.started);
    Ok(())
}

#[test]
fn unknown_injection_members_fail_the_build() {
    let container = UnityContainer::new();
    container
        .register_type::<Server, Server>(
            RegisterOptions::new().member(InjectionProperty::new("missing")),
        )
        .unwrap();

    match container.resolve::<Server>() {
        Err(error)
            if matches!(
                error.root_cause(),
                InjectError::PropertyNotFound { property, .. } if property == "missing"
            ) => {}
        Err(error) => Err(error).unwrap(),
        Ok(_) => unreachable!("the property does not exist"),
    }
}

#[test]
fn modules_register_in_order() -> InjectResult<()> {
    let module = define_module! {
        types = [dyn Foo => FooA],
        named = {
            "b": dyn Foo => FooB,
        },
        instances = [Svc1 => Svc1(3)],
    };
    assert_eq!(3, module.len());

    let container = UnityContainer::new();
    container.add_module(module)?;
    assert_eq!(1, container.resolve::<dyn Foo>()?.bar());
    assert_eq!(2, container.resolve_named::<dyn Foo>("b")?.bar());
    assert_eq!(3, container.resolve::<Svc2>()?.dep1.0);
    Ok(())
}

#[test]
#[traced_test]
fn registrations_and_failures_are_logged() {
    let container = UnityContainer::new();
    container
        .register_type::<dyn Foo, FooA>(RegisterOptions::new())
        .unwrap();
    assert!(logs_contain("registered type"));

    assert!(container.resolve::<Ambiguous>().is_err());
    assert!(logs_contain("resolution failed"));
}
