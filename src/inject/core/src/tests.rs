use std::{cell::Cell, cell::RefCell, rc::Rc};

use anyhow::anyhow;

use crate::{instance::InstanceAddr, prelude::*, ErrorFormatExt, NamedTypeId};

// === Fixtures === //

trait Shape {
	fn name(&self) -> &'static str;
}

trait Missing {}

contract!(dyn Shape, dyn Missing);

#[derive(Default)]
struct Circle;

#[derive(Default)]
struct Square;

impl Shape for Circle {
	fn name(&self) -> &'static str {
		"circle"
	}
}

impl Shape for Square {
	fn name(&self) -> &'static str {
		"square"
	}
}

upcast!(Circle => dyn Shape, Square => dyn Shape);

struct Logger {
	prefix: &'static str,
}

impl Default for Logger {
	fn default() -> Self {
		Self { prefix: "default" }
	}
}

#[derive(Default)]
struct Clock;

#[derive(Default)]
struct Spring;

injectable!(Circle, Square, Logger, Clock, Spring);

#[derive(Default)]
struct Gadget {
	spring: Option<Rc<Spring>>,
}

impl Injectable for Gadget {
	fn describe(d: &mut Describe<Self>) {
		d.default_constructor();
		d.field::<Spring>("spring", |gadget, spring| gadget.spring = Some(spring));
	}
}

struct Widget {
	gadget: Rc<Gadget>,
}

impl Injectable for Widget {
	fn describe(d: &mut Describe<Self>) {
		d.constructor()
			.param::<Gadget>("gadget")
			.build(|args| Ok(Widget { gadget: args.one()? }));
	}
}

#[derive(Default)]
struct Service {
	logger: Option<Rc<Logger>>,
	clock: Option<Rc<Clock>>,
	shapes: usize,
	trace: Vec<&'static str>,
}

impl Injectable for Service {
	fn describe(d: &mut Describe<Self>) {
		d.default_constructor();

		d.property::<Clock>("clock", |service, clock| {
			service.trace.push("clock");
			service.clock = Some(clock);
			Ok(())
		});
		d.field::<Logger>("logger", |service, logger| {
			service.trace.push("logger");
			service.logger = Some(logger);
		});
		d.field::<dyn Missing>("missing", |service, _| service.trace.push("missing"));

		d.method("ready").call(|service| {
			service.trace.push("ready");
			Ok(())
		});
		d.method("configure")
			.many::<dyn Shape>("shapes")
			.call_with(|service, args| {
				service.shapes = args.many::<dyn Shape>()?.len();
				service.trace.push("configure");
				Ok(())
			});
	}
}

struct Drawing {
	shape: Rc<dyn Shape>,
}

impl Injectable for Drawing {
	fn describe(d: &mut Describe<Self>) {
		d.constructor()
			.param::<dyn Shape>("shape")
			.build(|args| Ok(Drawing { shape: args.one()? }));
	}
}

struct Canvas;

impl Injectable for Canvas {
	fn describe(d: &mut Describe<Self>) {
		d.constructor().param::<dyn Missing>("missing").build(|_| Ok(Canvas));
	}
}

#[derive(Debug)]
struct Broken;

impl Injectable for Broken {
	fn describe(d: &mut Describe<Self>) {
		d.constructor().build(|_| Err(anyhow!("the boiler exploded")));
	}
}

struct Chicken;

struct Egg;

impl Injectable for Chicken {
	fn describe(d: &mut Describe<Self>) {
		d.constructor().param::<Egg>("egg").build(|_| Ok(Chicken));
	}
}

impl Injectable for Egg {
	fn describe(d: &mut Describe<Self>) {
		d.constructor().param::<Chicken>("chicken").build(|_| Ok(Egg));
	}
}

struct Reporter {
	logger: Rc<Logger>,
	clock: Option<Rc<Clock>>,
	backup: Option<Rc<Logger>>,
	shapes: Vec<Rc<dyn Shape>>,
	counted: usize,
	attached: Option<(&'static str, bool)>,
}

impl Injectable for Reporter {
	fn describe(d: &mut Describe<Self>) {
		d.constructor()
			.param_named::<Logger>("logger", "app")
			.optional::<Clock>("clock")
			.build(|args| {
				Ok(Reporter {
					logger: args.one()?,
					clock: args.optional()?,
					backup: None,
					shapes: Vec::new(),
					counted: 0,
					attached: None,
				})
			});

		d.field::<Logger>("backup", |reporter, logger| reporter.backup = Some(logger))
			.named("backup");
		d.field_many::<dyn Shape>("shapes", |reporter, shapes| reporter.shapes = shapes);
		d.property_many::<dyn Shape>("counted", |reporter, shapes| {
			reporter.counted = shapes.len();
			Ok(())
		});

		d.method("attach")
			.param_named::<Logger>("logger", "backup")
			.optional::<Clock>("clock")
			.call_with(|reporter, args| {
				let logger = args.one::<Logger>()?;
				reporter.attached = Some((logger.prefix, args.optional::<Clock>()?.is_some()));
				Ok(())
			});
	}
}

#[derive(Default)]
struct ShapeFactory {
	made: Cell<usize>,
}

injectable!(ShapeFactory);

impl InjectionFactory<dyn Shape> for ShapeFactory {
	fn create(&self, cx: &ResolutionContext) -> anyhow::Result<Rc<dyn Shape>> {
		self.made.set(self.made.get() + 1);

		if cx.is_injecting_into::<Drawing>() {
			Ok(Rc::new(Circle))
		} else {
			Ok(Rc::new(Square))
		}
	}
}

fn names(shapes: &[Rc<dyn Shape>]) -> Vec<&'static str> {
	shapes.iter().map(|shape| shape.name()).collect()
}

// === Binding kinds === //

#[test]
fn unbound_types_are_built_transitively() {
	let mut container = Container::new();
	let widget = container.resolve::<Widget>().unwrap().single().unwrap();
	assert!(widget.gadget.spring.is_some());
}

#[test]
fn bound_only_mode_ignores_unbound_types() {
	let mut container = Container::builder()
		.resolution_mode(ResolutionMode::BoundOnly)
		.build();

	assert!(container.resolve::<Widget>().unwrap().is_empty());
	assert!(container.resolve::<Gadget>().unwrap().is_empty());

	// Bound, but its constructor dependency is not.
	container.bind::<Widget>().to_self().unwrap();
	assert!(container.resolve::<Widget>().unwrap().is_empty());

	// Binding the dependency lets the whole chain through, even though `Spring` stays unbound.
	container.bind::<Gadget>().to_self().unwrap();
	let widget = container.resolve::<Widget>().unwrap().single().unwrap();
	assert!(widget.gadget.spring.is_none());

	container.binder_mut().unbind_contract::<Gadget>();
	container.set_resolution_mode(ResolutionMode::AlwaysResolve);
	assert_eq!(container.resolve::<Widget>().unwrap().len(), 1);
}

#[test]
fn bound_only_mode_skips_singletons_it_cannot_build() {
	let mut container = Container::builder()
		.resolution_mode(ResolutionMode::BoundOnly)
		.build();

	let binding = container
		.bind_multiton::<dyn Shape>()
		.to::<Circle>()
		.unwrap()
		.into_binding();
	container.bind_singleton::<Widget>().to_self().unwrap();

	assert!(container.resolve::<Widget>().unwrap().is_empty());
	assert_eq!(container.resolve_all::<dyn Shape>().unwrap().len(), 1);
	assert!(binding.values().iter().all(SlotValue::is_constructed));

	// Explicit construction still reports what was missing.
	assert!(matches!(
		container.instantiate::<Widget>().err().unwrap(),
		InjectError::Unresolved { member: "gadget", .. }
	));
}

#[test]
fn named_singletons_are_shared_until_unbound() {
	let mut container = Container::new();
	container
		.bind_singleton::<Logger>()
		.named("app")
		.unwrap()
		.to_self()
		.unwrap();

	let a = container.resolve_named::<Logger>("app").unwrap().single().unwrap();
	let b = container.resolve_named::<Logger>("app").unwrap().single().unwrap();
	assert!(Rc::ptr_eq(&a, &b));

	// The type is bound, so unnamed requests do not fall back to construction.
	assert!(container.resolve::<Logger>().unwrap().is_empty());

	container.binder_mut().unbind_discriminator(&"app".into());
	assert!(container.binder().bindings_of::<Logger>().is_empty());
	assert_eq!(container.resolve::<Logger>().unwrap().len(), 1);
}

#[test]
fn multitons_cache_each_slot() {
	let mut container = Container::new();
	let binding = container
		.bind_multiton::<dyn Shape>()
		.to::<Circle>()
		.unwrap()
		.to::<Square>()
		.unwrap()
		.to::<Circle>()
		.unwrap()
		.into_binding();

	assert_eq!(binding.len(), 2);

	let first = container.resolve_all::<dyn Shape>().unwrap();
	let second = container.resolve_all::<dyn Shape>().unwrap();
	assert_eq!(names(&first), ["circle", "square"]);
	assert!(!Rc::ptr_eq(&first[0], &first[1]));
	assert!(first.iter().zip(&second).all(|(a, b)| Rc::ptr_eq(a, b)));
	assert!(binding.values().iter().all(SlotValue::is_constructed));
}

#[test]
fn addresses_are_fresh_every_time() {
	let mut container = Container::new();
	let binding = container.bind::<Gadget>().to_self().unwrap().into_binding();

	let a = container.resolve::<Gadget>().unwrap().single().unwrap();
	let b = container.resolve::<Gadget>().unwrap().single().unwrap();
	assert!(!Rc::ptr_eq(&a, &b));
	assert!(!binding.values()[0].is_constructed());
}

#[test]
fn unbinding_restores_the_unbound_behavior() {
	let mut container = Container::new();
	container.bind_singleton::<Gadget>().to_self().unwrap();

	let cached = container.resolve::<Gadget>().unwrap().single().unwrap();
	assert_eq!(container.binder_mut().unbind_contract::<Gadget>().len(), 1);

	let fresh = container.resolve::<Gadget>().unwrap().single().unwrap();
	assert!(!Rc::ptr_eq(&cached, &fresh));
}

#[test]
fn factories_are_materialized_once_and_produce_every_time() {
	let mut container = Container::new();
	let binding = container
		.bind_factory::<dyn Shape>()
		.to_factory::<ShapeFactory>()
		.unwrap()
		.into_binding();

	let plain = container.resolve::<dyn Shape>().unwrap().single().unwrap();
	let drawing = container.resolve::<Drawing>().unwrap().single().unwrap();
	assert_eq!(plain.name(), "square");
	assert_eq!(drawing.shape.name(), "circle");

	let values = binding.values();
	let SlotValue::Constructed(factory) = &values[0] else {
		panic!("the factory was never materialized");
	};
	assert_eq!(factory.downcast::<ShapeFactory>().unwrap().made.get(), 2);
}

// === Registry === //

#[test]
fn duplicate_names_are_rejected_and_repeats_ignored() {
	let mut container = Container::new();
	let binding = container
		.bind_singleton::<Logger>()
		.named("x")
		.unwrap()
		.to_self()
		.unwrap()
		.into_binding();

	let err = container
		.bind_singleton::<Logger>()
		.named("x")
		.unwrap()
		.to_self()
		.err()
		.unwrap();
	assert!(matches!(err, InjectError::DuplicateBinding { .. }));

	container.binder_mut().add(binding.clone()).unwrap();
	assert_eq!(container.binder().len(), 1);
}

#[test]
fn discriminators_resolve_across_contracts() {
	let mut container = Container::new();
	container.bind_singleton::<Logger>().named("main").unwrap().to_self().unwrap();
	container.bind_singleton::<Clock>().named("main").unwrap().to_self().unwrap();
	container.bind_singleton::<Clock>().named("spare").unwrap().to_self().unwrap();

	let resolved = container.resolve_by_discriminator("main").unwrap();
	assert_eq!(resolved.len(), 2);
	assert!(resolved[0].get::<Logger>().is_some());
	assert!(resolved[1].get::<Clock>().is_some());

	let keyed = container
		.resolve_key(TypeKey::of::<Clock>(), Some("spare".into()))
		.unwrap();
	assert_eq!(keyed.len(), 1);
	assert!(!keyed[0].instance().ptr_eq(resolved[1].instance()));
}

#[test]
fn the_cache_can_be_primed_from_bindings() {
	let mut container = Container::new();
	container
		.bind_multiton::<dyn Shape>()
		.to::<Circle>()
		.unwrap()
		.to::<Square>()
		.unwrap();
	container.bind::<Logger>().to_instance(Rc::new(Logger::default())).unwrap();

	// Pre-built instances are primed through their runtime type.
	assert_eq!(container.prime_cache(), 3);
	assert_eq!(container.prime_cache(), 0);
	assert!(container.cache().has(NamedTypeId::of::<Circle>()));
	assert!(container.cache().has(NamedTypeId::of::<Logger>()));
}

// === Injection === //

#[test]
fn members_are_injected_in_order() {
	let mut container = Container::new();
	container.bind_multiton::<dyn Shape>().to::<Circle>().unwrap().to::<Square>().unwrap();

	let service = container.instantiate::<Service>().unwrap();
	assert_eq!(service.trace, ["logger", "clock", "ready", "configure"]);
	assert_eq!(service.shapes, 2);
	assert!(service.clock.is_some());
}

#[test]
fn existing_objects_can_be_injected() {
	let mut container = Container::new();
	container.bind_singleton::<Logger>().to_self().unwrap();

	let service = container.inject(Service::default()).unwrap();
	let logger = container.resolve::<Logger>().unwrap().single().unwrap();
	assert!(Rc::ptr_eq(service.logger.as_ref().unwrap(), &logger));
	assert_eq!(service.shapes, 0);
}

#[test]
fn single_dependencies_take_the_first_candidate() {
	let mut container = Container::new();
	container.bind::<dyn Shape>().to::<Circle>().unwrap().to::<Square>().unwrap();

	let drawing = container.instantiate::<Drawing>().unwrap();
	assert_eq!(drawing.shape.name(), "circle");
}

#[test]
fn conditions_see_the_injection_site() {
	let mut container = Container::new();
	container
		.bind::<Logger>()
		.to_instance(Rc::new(Logger { prefix: "service" }))
		.unwrap()
		.when_into::<Service>();
	container
		.bind::<Logger>()
		.to_instance(Rc::new(Logger { prefix: "other" }))
		.unwrap()
		.when(|cx| !cx.is_injecting_into::<Service>());

	let service = container.instantiate::<Service>().unwrap();
	assert_eq!(service.logger.as_ref().unwrap().prefix, "service");

	let logger = container.resolve::<Logger>().unwrap().single().unwrap();
	assert_eq!(logger.prefix, "other");
}

#[test]
fn conditions_can_target_a_single_parent() {
	let mut container = Container::new();
	let mut first = Rc::new(Service::default());
	let mut second = Rc::new(Service::default());

	container
		.bind::<Logger>()
		.to_instance(Rc::new(Logger { prefix: "first" }))
		.unwrap()
		.when_into_instance(&first);

	container.inject_in_place(Rc::get_mut(&mut first).unwrap()).unwrap();
	container.inject_in_place(Rc::get_mut(&mut second).unwrap()).unwrap();

	assert_eq!(first.logger.as_ref().unwrap().prefix, "first");
	assert!(second.logger.is_none());

	// The address alone is not enough; the parent type has to match too.
	let mut cx = ResolutionContext::for_type(TypeKey::of::<Logger>(), None);
	cx.parent_instance = Some(InstanceAddr::of(&*first));
	cx.parent_type = Some(NamedTypeId::of::<Clock>());
	assert!(container.resolve_with(cx.clone()).unwrap().is_empty());

	cx.parent_type = Some(NamedTypeId::of::<Service>());
	assert_eq!(container.resolve_with(cx).unwrap().len(), 1);
}

#[test]
fn named_and_optional_dependencies_reach_every_site() {
	let mut container = Container::builder()
		.resolution_mode(ResolutionMode::BoundOnly)
		.build();

	for (name, prefix) in [(None, "unnamed"), (Some("app"), "app"), (Some("backup"), "backup")] {
		let mut builder = container.bind::<Logger>();
		if let Some(name) = name {
			builder = builder.named(name).unwrap();
		}
		builder.to_instance(Rc::new(Logger { prefix })).unwrap();
	}
	container.bind_multiton::<dyn Shape>().to::<Circle>().unwrap().to::<Square>().unwrap();
	container.bind::<Reporter>().to_self().unwrap();

	let reporter = container.resolve::<Reporter>().unwrap().single().unwrap();
	assert_eq!(reporter.logger.prefix, "app");
	assert!(reporter.clock.is_none());
	assert_eq!(reporter.backup.as_ref().unwrap().prefix, "backup");
	assert_eq!(names(&reporter.shapes), ["circle", "square"]);
	assert_eq!(reporter.counted, 2);
	assert_eq!(reporter.attached, Some(("backup", false)));

	container.bind::<Clock>().to_self().unwrap();
	let reporter = container.resolve::<Reporter>().unwrap().single().unwrap();
	assert!(reporter.clock.is_some());
	assert_eq!(reporter.attached, Some(("backup", true)));
}

// === Failures === //

#[test]
fn missing_required_dependencies_are_errors() {
	let mut container = Container::new();

	let err = container.resolve::<Canvas>().unwrap_err();
	assert!(matches!(
		err,
		InjectError::Unresolved {
			member: "missing",
			..
		}
	));
	assert!(container.resolve_or_log::<Canvas>().is_empty());
}

#[test]
fn constructor_failures_keep_their_cause() {
	let mut container = Container::new();

	let err = container.instantiate::<Broken>().unwrap_err();
	assert!(matches!(err, InjectError::Construction { .. }));
	assert!(err.format_error().to_string().contains("the boiler exploded"));
}

#[test]
fn cycles_are_detected() {
	let mut container = Container::new();

	let err = container.resolve::<Chicken>().unwrap_err();
	let InjectError::CycleDetected { ty, stack } = err else {
		panic!("expected a cycle, got {err:?}");
	};
	assert!(ty.is::<Chicken>());
	assert_eq!(stack, [NamedTypeId::of::<Chicken>(), NamedTypeId::of::<Egg>()]);
}

#[test]
fn interfaces_have_no_constructor() {
	let mut container = Container::new();

	assert!(container.resolve::<dyn Missing>().unwrap().is_empty());
	let err = container
		.binder_mut()
		.bind_many(&[<dyn Missing as Contract>::type_key()], &[BindingKind::Address])
		.unwrap_err();
	assert_eq!(
		err.to_string(),
		format!(
			"no constructors on type {}; is it an interface?",
			NamedTypeId::of::<dyn Missing>()
		)
	);
}

// === Hooks === //

#[test]
fn before_resolve_hooks_can_short_circuit() {
	let mut container = Container::new();
	let canned = Rc::new(Logger { prefix: "canned" });

	let supplied = canned.clone();
	container.resolve_hooks().on_before_resolve(move |cx, outcome| {
		if cx.target_id().is_some_and(|ty| ty.is::<Logger>()) {
			*outcome = Some(vec![Resolved::direct(supplied.clone())]);
			Flow::Stop
		} else {
			Flow::Continue
		}
	});

	let service = container.instantiate::<Service>().unwrap();
	assert!(Rc::ptr_eq(service.logger.as_ref().unwrap(), &canned));
	assert!(service.clock.is_some());
}

#[test]
fn after_resolve_hooks_can_rewrite_results() {
	let mut container = Container::new();
	container.bind::<dyn Shape>().to::<Circle>().unwrap().to::<Square>().unwrap();

	container
		.resolve_hooks()
		.on_after_resolve(|_, results| {
			results.retain(|value| !value.instance().ty().is::<Circle>());
			Flow::Stop
		})
		.on_after_resolve(|_, results| {
			results.clear();
			Flow::Continue
		});

	let shapes = container.resolve_all::<dyn Shape>().unwrap();
	assert_eq!(names(&shapes), ["square"]);
}

#[test]
fn evaluation_hooks_replace_the_default_path() {
	let mut container = Container::new();
	container.bind_singleton::<dyn Shape>().to::<Circle>().unwrap();

	let seen = Rc::new(Cell::new(0));
	let counter = seen.clone();
	container
		.resolve_hooks()
		.on_binding_evaluation(|_, binding| {
			binding
				.has_tag("never")
				.then(|| Resolved::of_contract(Rc::new(Circle) as Rc<dyn Shape>))
		})
		.on_binding_evaluation(|cx, _| {
			assert!(cx.selected.is_some_and(|ty| ty.is::<dyn Shape>()));
			Some(Resolved::of_contract(Rc::new(Square) as Rc<dyn Shape>))
		})
		.on_binding_resolution(move |_, _, _| counter.set(counter.get() + 1));

	let shape = container.resolve::<dyn Shape>().unwrap().single().unwrap();
	assert_eq!(shape.name(), "square");
	assert_eq!(seen.get(), 1);
}

#[test]
fn inject_hooks_wrap_every_injection() {
	let mut container = Container::new();
	let events = Rc::new(RefCell::new(Vec::new()));

	let before = events.clone();
	let after = events.clone();
	container
		.resolve_hooks()
		.on_before_inject(move |ty, _| before.borrow_mut().push(("before", ty)))
		.on_after_inject(move |ty, target| {
			if let Some(gadget) = target.downcast_ref::<Gadget>() {
				assert!(gadget.spring.is_some());
			}
			after.borrow_mut().push(("after", ty));
		});

	container.resolve::<Widget>().unwrap();

	let ty = |name, ty| (name, ty);
	assert_eq!(
		*events.borrow(),
		[
			ty("before", NamedTypeId::of::<Gadget>()),
			ty("before", NamedTypeId::of::<Spring>()),
			ty("after", NamedTypeId::of::<Spring>()),
			ty("after", NamedTypeId::of::<Gadget>()),
			ty("before", NamedTypeId::of::<Widget>()),
			ty("after", NamedTypeId::of::<Widget>()),
		]
	);
}

#[test]
fn binding_hooks_can_veto_additions() {
	let mut container = Container::new();
	container.binding_hooks().on_before_add(|event| {
		if event.binding().has_tag("forbidden") {
			event.veto();
		}
	});

	// Tags are applied before the first value registers the binding.
	let binding = container
		.bind::<Clock>()
		.tag("forbidden")
		.to_self()
		.unwrap()
		.into_binding();

	assert!(!container.binder().contains(&binding));
	assert!(container.binder().is_empty());
}

#[test]
fn removals_notify_the_remove_hooks() {
	let mut container = Container::new();
	let removed = Rc::new(RefCell::new(Vec::new()));

	let before = removed.clone();
	let after = removed.clone();
	container
		.binding_hooks()
		.on_before_remove(move |bindings| before.borrow_mut().push(("before", bindings.len())))
		.on_after_remove(move |bindings| after.borrow_mut().push(("after", bindings.len())));

	container.bind::<Clock>().tag("temp").to_self().unwrap();
	container.bind::<Spring>().tag("temp").to_self().unwrap();
	let shapes = container
		.bind_multiton::<dyn Shape>()
		.to::<Circle>()
		.unwrap()
		.to::<Square>()
		.unwrap()
		.into_binding();

	assert_eq!(container.binder_mut().unbind_tagged("temp").len(), 2);
	assert!(container.binder().bindings_tagged("temp").is_empty());
	assert_eq!(container.binder().len(), 1);

	// Removing every value unbinds the binding as well.
	let values = shapes.values();
	assert_eq!(container.binder_mut().remove_values(&shapes, &values), 2);
	assert!(shapes.is_empty());
	assert!(container.binder().is_empty());

	container.bind::<Logger>().to_self().unwrap();
	container.bind::<Clock>().to_self().unwrap();
	assert_eq!(container.binder_mut().clear().len(), 2);
	assert!(container.binder().is_empty());

	assert_eq!(
		*removed.borrow(),
		[
			("before", 2),
			("after", 2),
			("before", 1),
			("after", 1),
			("before", 2),
			("after", 2),
		]
	);
}

// === Extensions === //

#[derive(Default)]
struct Greeter {
	registered: Rc<Cell<bool>>,
}

impl ContainerExtension for Greeter {
	fn on_register(&mut self, container: &mut Container) {
		self.registered.set(true);
		container.bind_singleton::<Logger>().named("greeter").unwrap().to_self().unwrap();
	}

	fn on_unregister(&mut self, container: &mut Container) {
		self.registered.set(false);
		container.binder_mut().unbind_discriminator(&"greeter".into());
	}
}

#[test]
fn extensions_manage_their_own_bindings() {
	let mut container = Container::new();
	let greeter = Greeter::default();
	let registered = greeter.registered.clone();

	container.register_extension(greeter);
	assert!(registered.get());
	assert!(container.extension::<Greeter>().is_some());
	assert_eq!(container.resolve_named::<Logger>("greeter").unwrap().len(), 1);

	container.unregister_extension::<Greeter>().unwrap();
	assert!(!registered.get());
	assert!(!container.has_extension::<Greeter>());
	assert!(container.binder().is_empty());
}
