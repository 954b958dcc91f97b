use std::{any::Any, rc::Rc};

use crate::{
	binding::{registry::Binder, Adapter, Binding, Slot, SlotValue},
	container::ContainerConfig,
	error::{InjectError, InjectResult},
	event::ResolveHooks,
	instance::{Instance, InstanceAddr, Resolved},
	key::{TypeKey, ViewFn},
	meta::{
		cache::MetadataCache,
		describe::{Args, Cardinality, MemberKind, MethodInvoke, ParamInfo},
		extract::TypeMetadata,
	},
	resolve::context::{InjectionSite, ResolutionContext, ResolutionMode},
	util::type_id::NamedTypeId,
};

/// A single resolution pass over a container's state. The registry is only read; singleton and
/// multiton slots are materialized through the bindings' own interior mutability.
pub(crate) struct Injector<'c> {
	binder: &'c Binder,
	cache: &'c mut MetadataCache,
	hooks: &'c mut ResolveHooks,
	config: ContainerConfig,
	constructing: Vec<NamedTypeId>,
}

impl<'c> Injector<'c> {
	pub fn new(
		binder: &'c Binder,
		cache: &'c mut MetadataCache,
		hooks: &'c mut ResolveHooks,
		config: ContainerConfig,
	) -> Self {
		Self {
			binder,
			cache,
			hooks,
			config,
			constructing: Vec::new(),
		}
	}

	// === Resolution === //

	pub fn resolve(&mut self, mut cx: ResolutionContext) -> InjectResult<Vec<Resolved>> {
		if let Some(outcome) = self.hooks.fire_before_resolve(&cx) {
			return Ok(outcome);
		}

		let candidates = match (cx.target, &cx.discriminator) {
			(Some(target), _) => self.binder.bindings_for(target.id()).to_vec(),
			(None, Some(discriminator)) => self.binder.bindings_by_discriminator(discriminator),
			(None, None) => Vec::new(),
		};

		let mut results = Vec::new();

		if candidates.is_empty() {
			if let Some(value) = self.resolve_unbound(&cx)? {
				results.push(value);
			}
		}

		for binding in candidates {
			// Unnamed requests only ever see unnamed bindings.
			if binding.discriminator() != cx.discriminator {
				continue;
			}

			cx.selected = Some(binding.contract());
			if !binding.applies_to(&cx) {
				log::trace!("condition excluded {binding:?}");
				continue;
			}

			if let Some(value) = self.hooks.fire_binding_evaluation(&cx, &binding) {
				self.hooks.fire_binding_resolution(&cx, &binding, &value);
				results.push(value);
				continue;
			}

			for value in self.evaluate(&binding, &cx)? {
				self.hooks.fire_binding_resolution(&cx, &binding, &value);
				results.push(value);
			}
		}

		self.hooks.fire_after_resolve(&cx, &mut results);
		Ok(results)
	}

	fn resolve_unbound(&mut self, cx: &ResolutionContext) -> InjectResult<Option<Resolved>> {
		let Some(target) = cx.target else {
			return Ok(None);
		};

		if self.config.resolution_mode == ResolutionMode::BoundOnly {
			return Ok(None);
		}

		// Abstract contracts have nothing to fall back to.
		let Some(view) = target.identity_view() else {
			log::trace!("{} is unbound and abstract; resolving to nothing", target.id());
			return Ok(None);
		};

		let instance = self.instantiate(target)?;
		Ok(Some(Self::adapt_view(&instance, view, target.id())?))
	}

	fn evaluate(&mut self, binding: &Binding, cx: &ResolutionContext) -> InjectResult<Vec<Resolved>> {
		let kind = binding.kind();
		let mut values = Vec::new();

		for (index, Slot { value, adapter }) in binding.slots().into_iter().enumerate() {
			let instance = match value {
				SlotValue::Constructed(instance) => instance,
				SlotValue::Unconstructed(key) => {
					let instance = match self.instantiate(key) {
						Ok(instance) => instance,
						// Under `BoundOnly`, a binding whose required dependencies are unbound
						// contributes nothing.
						Err(InjectError::Unresolved {
							parent,
							member,
							dependency,
						}) if self.config.resolution_mode == ResolutionMode::BoundOnly => {
							log::debug!(
								"skipping {binding:?}: {dependency} for `{member}` of {parent} is unbound"
							);
							continue;
						}
						Err(err) => return Err(err),
					};

					if kind.caches_values() && binding.materialize(index, key, instance.clone()) {
						log::debug!("materialized {} for {binding:?}", key.id());
					}

					instance
				}
			};

			values.push(match adapter {
				Adapter::View(view) => Self::adapt_view(&instance, view, binding.contract())?,
				Adapter::Factory(produce) => match produce(&instance, cx) {
					Some(Ok(value)) => value,
					Some(Err(cause)) => return Err(InjectError::construction(instance.ty(), cause)),
					None => {
						return Err(InjectError::NotAssignable {
							value: instance.ty(),
							contract: binding.contract(),
						})
					}
				},
			});
		}

		Ok(values)
	}

	fn adapt_view(
		instance: &Instance,
		view: ViewFn,
		contract: NamedTypeId,
	) -> InjectResult<Resolved> {
		let Some(viewed) = view(instance) else {
			return Err(InjectError::NotAssignable {
				value: instance.ty(),
				contract,
			});
		};

		Ok(Resolved::from_view(instance.clone(), viewed))
	}

	// === Construction === //

	/// Constructs a fresh instance of `key` and injects it.
	pub fn instantiate(&mut self, key: TypeKey) -> InjectResult<Instance> {
		let ty = key.id();

		if self.config.detect_cycles && self.constructing.contains(&ty) {
			return Err(InjectError::CycleDetected {
				ty,
				stack: self.constructing.clone(),
			});
		}

		self.constructing.push(ty);
		let result = self.construct(key);
		self.constructing.pop();

		result
	}

	fn construct(&mut self, key: TypeKey) -> InjectResult<Instance> {
		let ty = key.id();
		let meta = self.cache.get(key);
		let Some(ctor) = meta.constructor() else {
			return Err(InjectError::NoConstructor(ty));
		};

		let mut args = Args::default();
		for param in ctor.params() {
			// Constructor parameters have no parent instance yet.
			let values = self.resolve_param(ty, None, InjectionSite::Constructor, param)?;
			args.push(param.name, values);
		}

		let boxed = ctor
			.invoke(&mut args)
			.map_err(|cause| InjectError::construction(ty, cause))?;

		let mut object = Rc::<dyn Any>::from(boxed);
		let addr = InstanceAddr::of(&*object);
		let Some(target) = Rc::get_mut(&mut object) else {
			unreachable!("a freshly allocated `Rc` has no other handles");
		};

		self.inject_members(&meta, target, Some(addr))?;

		Ok(Instance::from_shared(key, object))
	}

	// === Injection === //

	/// Runs field, property, and method injection on an existing object of type `key`.
	pub fn inject_into(
		&mut self,
		key: TypeKey,
		target: &mut dyn Any,
		addr: InstanceAddr,
	) -> InjectResult<()> {
		let meta = self.cache.get(key);
		self.inject_members(&meta, target, Some(addr))
	}

	fn inject_members(
		&mut self,
		meta: &TypeMetadata,
		target: &mut dyn Any,
		addr: Option<InstanceAddr>,
	) -> InjectResult<()> {
		let ty = meta.ty();
		self.hooks.fire_before_inject(ty, target);

		for member in meta.fields().iter().chain(meta.properties()) {
			let site = match member.kind() {
				MemberKind::Field => InjectionSite::Field,
				MemberKind::Property => InjectionSite::Property,
			};

			let cx = ResolutionContext::for_member(
				member.dependency().key,
				member.discriminator().cloned(),
				site,
				member.name(),
				ty,
				addr,
			);

			let values = self.resolve(cx)?;
			if values.is_empty() {
				log::trace!("nothing resolved for `{}` of {ty}; leaving it untouched", member.name());
				continue;
			}

			member
				.apply(target, &mut Args::single(member.name(), values))
				.map_err(|cause| InjectError::construction(ty, cause))?;
		}

		for method in meta.methods() {
			let result = match method.invoke() {
				MethodInvoke::NoArgs(call) => call(target),
				MethodInvoke::WithArgs(call) => {
					let mut args = Args::default();
					for param in method.params() {
						let values = self.resolve_param(ty, addr, InjectionSite::Method, param)?;
						args.push(param.name, values);
					}
					call(target, &mut args)
				}
			};

			result.map_err(|cause| InjectError::construction(ty, cause))?;
		}

		self.hooks.fire_after_inject(ty, target);
		Ok(())
	}

	fn resolve_param(
		&mut self,
		parent: NamedTypeId,
		addr: Option<InstanceAddr>,
		site: InjectionSite,
		param: &ParamInfo,
	) -> InjectResult<Vec<Resolved>> {
		let cx = ResolutionContext::for_member(
			param.dependency.key,
			param.discriminator.clone(),
			site,
			param.name,
			parent,
			addr,
		);

		let values = self.resolve(cx)?;

		if values.is_empty() && param.dependency.cardinality == Cardinality::One {
			return Err(InjectError::Unresolved {
				parent,
				member: param.name,
				dependency: param.dependency.key.id(),
			});
		}

		Ok(values)
	}
}
