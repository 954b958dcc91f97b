use crate::{
	binding::{Binding, BindingKind, SlotValue},
	error::{InjectError, InjectResult},
	event::{AddEvent, BindingHooks},
	key::{Contract, Discriminator},
	util::{hash::FxHashMap, type_id::NamedTypeId},
};

// === Binder === //

/// The binding registry. Bindings are indexed by contract type (as an ordered list) and, when they
/// carry a discriminator, by `(contract, discriminator)`.
#[derive(Debug, Default)]
pub struct Binder {
	by_type: FxHashMap<NamedTypeId, Vec<Binding>>,
	by_name: FxHashMap<(NamedTypeId, Discriminator), Binding>,
	type_order: Vec<NamedTypeId>,
	hooks: BindingHooks,
}

impl Binder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn hooks_mut(&mut self) -> &mut BindingHooks {
		&mut self.hooks
	}

	// === Addition === //

	/// Registers a binding. Returns the binding which ended up in the registry, which may differ from
	/// the one passed in if a `before_add` hook replaced it, or `None` if a hook vetoed it.
	///
	/// Adding a binding which is already registered is a no-op.
	pub fn add(&mut self, binding: Binding) -> InjectResult<Option<Binding>> {
		if self.contains(&binding) {
			log::trace!("ignoring repeated registration of {binding:?}");
			return Ok(Some(binding));
		}

		let mut event = AddEvent::new(binding);
		self.hooks.fire_before_add(&mut event);

		let Some(binding) = event.into_binding() else {
			log::warn!("a before-add hook vetoed a binding");
			return Ok(None);
		};

		if self.contains(&binding) {
			return Ok(Some(binding));
		}

		if binding.is_empty() {
			return Err(InjectError::NullArgument("binding.values"));
		}

		let contract = binding.contract();
		if let Some(discriminator) = binding.discriminator() {
			if self.by_name.contains_key(&(contract, discriminator.clone())) {
				return Err(InjectError::DuplicateBinding {
					contract,
					discriminator,
				});
			}

			self.by_name.insert((contract, discriminator), binding.clone());
		}

		let list = self.by_type.entry(contract).or_default();
		if list.is_empty() {
			self.type_order.push(contract);
		}
		list.push(binding.clone());

		log::debug!("added {binding:?}");
		self.hooks.fire_after_add(&binding);

		Ok(Some(binding))
	}

	/// Changes the discriminator of a binding, keeping the `(contract, discriminator)` index in
	/// sync if the binding is registered.
	pub fn rename(
		&mut self,
		binding: &Binding,
		discriminator: Option<Discriminator>,
	) -> InjectResult<()> {
		if binding.discriminator() == discriminator {
			return Ok(());
		}

		if !self.contains(binding) {
			binding.set_discriminator(discriminator);
			return Ok(());
		}

		let contract = binding.contract();
		if let Some(discriminator) = &discriminator {
			if self.by_name.contains_key(&(contract, discriminator.clone())) {
				return Err(InjectError::DuplicateBinding {
					contract,
					discriminator: discriminator.clone(),
				});
			}
		}

		if let Some(old) = binding.discriminator() {
			self.by_name.remove(&(contract, old));
		}

		if let Some(discriminator) = &discriminator {
			self.by_name
				.insert((contract, discriminator.clone()), binding.clone());
		}

		binding.set_discriminator(discriminator);
		Ok(())
	}

	// === Queries === //

	pub fn contains(&self, binding: &Binding) -> bool {
		self.bindings_for(binding.contract())
			.iter()
			.any(|other| other.ptr_eq(binding))
	}

	pub fn contains_type(&self, contract: NamedTypeId) -> bool {
		self.by_type.contains_key(&contract)
	}

	pub fn bindings_for(&self, contract: NamedTypeId) -> &[Binding] {
		self.by_type.get(&contract).map_or(&[][..], Vec::as_slice)
	}

	pub fn bindings_of<C: ?Sized + Contract>(&self) -> &[Binding] {
		self.bindings_for(NamedTypeId::of::<C>())
	}

	pub fn binding_named(
		&self,
		contract: NamedTypeId,
		discriminator: &Discriminator,
	) -> Option<&Binding> {
		self.by_name.get(&(contract, discriminator.clone()))
	}

	pub fn bindings_by_discriminator(&self, discriminator: &Discriminator) -> Vec<Binding> {
		self.type_order
			.iter()
			.filter_map(|&contract| self.binding_named(contract, discriminator))
			.cloned()
			.collect()
	}

	pub fn bindings_tagged(&self, tag: &str) -> Vec<Binding> {
		self.all().filter(|binding| binding.has_tag(tag)).cloned().collect()
	}

	/// Iterates over every binding, grouped by contract type in the order the types were first
	/// bound.
	pub fn all(&self) -> impl Iterator<Item = &Binding> + '_ {
		self.type_order
			.iter()
			.flat_map(|contract| self.bindings_for(*contract))
	}

	/// Finds registered bindings structurally equal to `binding`, excluding `binding` itself.
	pub fn duplicates_of(&self, binding: &Binding) -> Vec<Binding> {
		self.bindings_for(binding.contract())
			.iter()
			.filter(|other| !other.ptr_eq(binding) && other.equivalent(binding))
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		self.by_type.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.by_type.is_empty()
	}

	// === Removal === //

	pub fn unbind_type(&mut self, contract: NamedTypeId) -> Vec<Binding> {
		let candidates = self.bindings_for(contract).to_vec();
		self.remove_all(candidates)
	}

	pub fn unbind_contract<C: ?Sized + Contract>(&mut self) -> Vec<Binding> {
		self.unbind_type(NamedTypeId::of::<C>())
	}

	pub fn unbind_discriminator(&mut self, discriminator: &Discriminator) -> Vec<Binding> {
		let candidates = self.bindings_by_discriminator(discriminator);
		self.remove_all(candidates)
	}

	pub fn unbind_unnamed(&mut self, contract: NamedTypeId) -> Vec<Binding> {
		let candidates = self
			.bindings_for(contract)
			.iter()
			.filter(|binding| binding.discriminator().is_none())
			.cloned()
			.collect();

		self.remove_all(candidates)
	}

	pub fn unbind_tagged(&mut self, tag: &str) -> Vec<Binding> {
		let candidates = self.bindings_tagged(tag);
		self.remove_all(candidates)
	}

	/// Removes one exact binding. Returns whether it was registered.
	pub fn unbind(&mut self, binding: &Binding) -> bool {
		let candidates = if self.contains(binding) {
			vec![binding.clone()]
		} else {
			Vec::new()
		};

		!self.remove_all(candidates).is_empty()
	}

	pub fn clear(&mut self) -> Vec<Binding> {
		let candidates = self.all().cloned().collect();
		self.remove_all(candidates)
	}

	/// Removes a single value from a binding. A registered binding left without values is unbound.
	pub fn remove_value(&mut self, binding: &Binding, value: &SlotValue) -> bool {
		self.remove_values(binding, std::slice::from_ref(value)) > 0
	}

	pub fn remove_values(&mut self, binding: &Binding, values: &[SlotValue]) -> usize {
		let removed = values
			.iter()
			.filter(|value| binding.remove_value(value))
			.count();

		if removed > 0 && binding.is_empty() {
			log::debug!("{binding:?} has no values left; unbinding it");
			self.unbind(binding);
		}

		removed
	}

	/// The candidate list is a snapshot taken before any mutation. Hooks observe it even when it is
	/// empty.
	fn remove_all(&mut self, candidates: Vec<Binding>) -> Vec<Binding> {
		self.hooks.fire_before_remove(&candidates);

		for binding in &candidates {
			self.detach(binding);
		}

		if !candidates.is_empty() {
			log::debug!("removed {} binding(s)", candidates.len());
		}

		self.hooks.fire_after_remove(&candidates);
		candidates
	}

	fn detach(&mut self, binding: &Binding) {
		let contract = binding.contract();

		if let Some(discriminator) = binding.discriminator() {
			let key = (contract, discriminator);
			if self.by_name.get(&key).is_some_and(|named| named.ptr_eq(binding)) {
				self.by_name.remove(&key);
			}
		}

		let Some(list) = self.by_type.get_mut(&contract) else {
			return;
		};

		list.retain(|other| !other.ptr_eq(binding));

		if list.is_empty() {
			self.by_type.remove(&contract);
			self.type_order.retain(|&ty| ty != contract);
		}
	}
}

// === Binding creation === //

impl Binder {
	pub fn bind<C: ?Sized + Contract>(&mut self) -> super::factory::BindingBuilder<'_, C> {
		super::factory::BindingBuilder::new(self, BindingKind::Address)
	}

	pub fn bind_singleton<C: ?Sized + Contract>(&mut self) -> super::factory::BindingBuilder<'_, C> {
		super::factory::BindingBuilder::new(self, BindingKind::Singleton)
	}

	pub fn bind_factory<C: ?Sized + Contract>(&mut self) -> super::factory::BindingBuilder<'_, C> {
		super::factory::BindingBuilder::new(self, BindingKind::Factory)
	}

	pub fn bind_multiton<C: ?Sized + Contract>(&mut self) -> super::factory::BindingBuilder<'_, C> {
		super::factory::BindingBuilder::new(self, BindingKind::Multiton)
	}
}
