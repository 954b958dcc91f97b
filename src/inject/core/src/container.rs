use std::{any::Any, rc::Rc};

use crate::{
	binding::{
		factory::{BindingBuilder, BulkBinding},
		registry::Binder,
		BindingKind,
	},
	error::{InjectError, InjectResult},
	event::{BindingHooks, ResolveHooks},
	ext::ContainerExtension,
	instance::{InstanceAddr, Resolution, Resolved},
	key::{Contract, Discriminator, TypeKey},
	meta::{cache::MetadataCache, describe::Injectable},
	resolve::{
		context::{ResolutionContext, ResolutionMode},
		injector::Injector,
	},
	util::{error::ResultExt, hash::FxHashMap, type_id::NamedTypeId},
};

// === Configuration === //

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContainerConfig {
	pub resolution_mode: ResolutionMode,

	/// Raise [InjectError::CycleDetected] instead of recursing forever when a type ends up depending
	/// on itself.
	pub detect_cycles: bool,
}

impl Default for ContainerConfig {
	fn default() -> Self {
		Self {
			resolution_mode: ResolutionMode::AlwaysResolve,
			detect_cycles: true,
		}
	}
}

#[derive(Debug, Default)]
pub struct ContainerBuilder {
	config: ContainerConfig,
}

impl ContainerBuilder {
	pub fn resolution_mode(mut self, mode: ResolutionMode) -> Self {
		self.config.resolution_mode = mode;
		self
	}

	pub fn detect_cycles(mut self, enabled: bool) -> Self {
		self.config.detect_cycles = enabled;
		self
	}

	pub fn build(self) -> Container {
		Container::with_config(self.config)
	}
}

// === Container === //

/// Owns a binding registry, its metadata cache, the resolution hooks, and any registered
/// extensions.
#[derive(Debug, Default)]
pub struct Container {
	binder: Binder,
	cache: MetadataCache,
	hooks: ResolveHooks,
	config: ContainerConfig,
	extensions: FxHashMap<NamedTypeId, Box<dyn Any>>,
}

impl Container {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn builder() -> ContainerBuilder {
		ContainerBuilder::default()
	}

	pub fn with_config(config: ContainerConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	pub fn config(&self) -> ContainerConfig {
		self.config
	}

	pub fn set_resolution_mode(&mut self, mode: ResolutionMode) {
		log::debug!("switching resolution mode to {mode:?}");
		self.config.resolution_mode = mode;
	}

	pub fn binder(&self) -> &Binder {
		&self.binder
	}

	pub fn binder_mut(&mut self) -> &mut Binder {
		&mut self.binder
	}

	pub fn cache(&self) -> &MetadataCache {
		&self.cache
	}

	pub fn cache_mut(&mut self) -> &mut MetadataCache {
		&mut self.cache
	}

	pub fn binding_hooks(&mut self) -> &mut BindingHooks {
		self.binder.hooks_mut()
	}

	pub fn resolve_hooks(&mut self) -> &mut ResolveHooks {
		&mut self.hooks
	}

	/// Extracts metadata for every type currently reachable from a binding.
	pub fn prime_cache(&mut self) -> usize {
		self.cache.prime_from_registry(&self.binder)
	}

	fn injector(&mut self) -> Injector<'_> {
		Injector::new(&self.binder, &mut self.cache, &mut self.hooks, self.config)
	}

	// === Binding === //

	pub fn bind<C: ?Sized + Contract>(&mut self) -> BindingBuilder<'_, C> {
		self.binder.bind()
	}

	pub fn bind_singleton<C: ?Sized + Contract>(&mut self) -> BindingBuilder<'_, C> {
		self.binder.bind_singleton()
	}

	pub fn bind_factory<C: ?Sized + Contract>(&mut self) -> BindingBuilder<'_, C> {
		self.binder.bind_factory()
	}

	pub fn bind_multiton<C: ?Sized + Contract>(&mut self) -> BindingBuilder<'_, C> {
		self.binder.bind_multiton()
	}

	pub fn bind_many(
		&mut self,
		types: &[TypeKey],
		kinds: &[BindingKind],
	) -> InjectResult<BulkBinding> {
		self.binder.bind_many(types, kinds)
	}

	// === Resolution === //

	pub fn resolve<C: ?Sized + Contract>(&mut self) -> InjectResult<Resolution<C>> {
		self.resolve_as(ResolutionContext::for_type(C::type_key(), None))
	}

	pub fn resolve_named<C: ?Sized + Contract>(
		&mut self,
		discriminator: impl Into<Discriminator>,
	) -> InjectResult<Resolution<C>> {
		self.resolve_as(ResolutionContext::for_type(
			C::type_key(),
			Some(discriminator.into()),
		))
	}

	pub fn resolve_all<C: ?Sized + Contract>(&mut self) -> InjectResult<Vec<Rc<C>>> {
		Ok(self.resolve::<C>()?.into_vec())
	}

	pub fn resolve_all_named<C: ?Sized + Contract>(
		&mut self,
		discriminator: impl Into<Discriminator>,
	) -> InjectResult<Vec<Rc<C>>> {
		Ok(self.resolve_named::<C>(discriminator)?.into_vec())
	}

	/// Resolves `C`, logging and swallowing any failure.
	pub fn resolve_or_log<C: ?Sized + Contract>(&mut self) -> Resolution<C> {
		self.resolve::<C>().log().unwrap_or(Resolution::Empty)
	}

	fn resolve_as<C: ?Sized + Contract>(
		&mut self,
		cx: ResolutionContext,
	) -> InjectResult<Resolution<C>> {
		Resolution::from_resolved(self.injector().resolve(cx)?)
	}

	pub fn resolve_key(
		&mut self,
		key: TypeKey,
		discriminator: Option<Discriminator>,
	) -> InjectResult<Vec<Resolved>> {
		self.resolve_with(ResolutionContext::for_type(key, discriminator))
	}

	/// Resolves every binding carrying `discriminator`, whatever its contract.
	pub fn resolve_by_discriminator(
		&mut self,
		discriminator: impl Into<Discriminator>,
	) -> InjectResult<Vec<Resolved>> {
		self.resolve_with(ResolutionContext::for_discriminator(discriminator.into()))
	}

	pub fn resolve_with(&mut self, cx: ResolutionContext) -> InjectResult<Vec<Resolved>> {
		self.injector().resolve(cx)
	}

	// === Construction and injection === //

	/// Constructs and injects a fresh `T`, ignoring any binding registered for it.
	pub fn instantiate<T: Injectable>(&mut self) -> InjectResult<Rc<T>> {
		let instance = self.injector().instantiate(TypeKey::of::<T>())?;

		instance.downcast::<T>().ok_or(InjectError::NotAssignable {
			value: instance.ty(),
			contract: NamedTypeId::of::<T>(),
		})
	}

	pub fn inject<T: Injectable>(&mut self, mut target: T) -> InjectResult<T> {
		self.inject_in_place(&mut target)?;
		Ok(target)
	}

	/// Runs field, property, and method injection on an existing object.
	pub fn inject_in_place<T: Injectable>(&mut self, target: &mut T) -> InjectResult<()> {
		let addr = InstanceAddr::of(&*target);
		self.injector().inject_into(TypeKey::of::<T>(), target, addr)
	}

	// === Extensions === //

	/// Registers an extension, replacing (and unregistering) any existing extension of the same
	/// type.
	pub fn register_extension<E: ContainerExtension>(&mut self, mut extension: E) {
		let replaced = self.unregister_extension::<E>();
		if replaced.is_some() {
			log::debug!("replacing extension {}", NamedTypeId::of::<E>());
		}

		extension.on_register(self);
		self.extensions
			.insert(NamedTypeId::of::<E>(), Box::new(extension));
	}

	pub fn unregister_extension<E: ContainerExtension>(&mut self) -> Option<E> {
		let extension = self.extensions.remove(&NamedTypeId::of::<E>())?;
		let Ok(mut extension) = extension.downcast::<E>() else {
			return None;
		};

		extension.on_unregister(self);
		Some(*extension)
	}

	pub fn extension<E: ContainerExtension>(&self) -> Option<&E> {
		self.extensions
			.get(&NamedTypeId::of::<E>())
			.and_then(|extension| extension.downcast_ref::<E>())
	}

	pub fn extension_mut<E: ContainerExtension>(&mut self) -> Option<&mut E> {
		self.extensions
			.get_mut(&NamedTypeId::of::<E>())
			.and_then(|extension| extension.downcast_mut::<E>())
	}

	pub fn has_extension<E: ContainerExtension>(&self) -> bool {
		self.extensions.contains_key(&NamedTypeId::of::<E>())
	}
}
