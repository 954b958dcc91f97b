use std::{marker::PhantomData, rc::Rc};

use crate::{
	binding::{registry::Binder, Binding, BindingKind, Slot, SlotValue, Tag},
	error::{InjectError, InjectResult},
	instance::{produce_with, Instance, InjectionFactory, InstanceAddr},
	key::{view_as, Contract, Discriminator, TypeKey, Upcast},
	meta::describe::Injectable,
	resolve::context::ResolutionContext,
	util::type_id::NamedTypeId,
};

// === BindingBuilder === //

/// Fluent configuration for a single binding. The binding is registered as soon as it receives its
/// first value.
pub struct BindingBuilder<'a, C: ?Sized> {
	binder: &'a mut Binder,
	binding: Binding,
	registered: bool,
	_ty: PhantomData<fn() -> Rc<C>>,
}

impl<'a, C: ?Sized + Contract> BindingBuilder<'a, C> {
	pub(crate) fn new(binder: &'a mut Binder, kind: BindingKind) -> Self {
		Self {
			binder,
			binding: Binding::new(C::type_key(), kind),
			registered: false,
			_ty: PhantomData,
		}
	}

	// === Values === //

	pub fn to<V: Injectable + Upcast<C>>(self) -> InjectResult<Self> {
		self.expect_constructing::<V>()?;
		self.push(Slot::view(SlotValue::of::<V>(), view_as::<V, C>))
	}

	pub fn to_self(self) -> InjectResult<Self>
	where
		C: Injectable,
	{
		self.to::<C>()
	}

	pub fn to_instance<V: Injectable + Upcast<C>>(self, value: Rc<V>) -> InjectResult<Self> {
		self.expect_constructing::<V>()?;
		self.push(Slot::view(
			SlotValue::Constructed(Instance::described(value)),
			view_as::<V, C>,
		))
	}

	/// Binds an unconstructed factory type. The factory itself is built (and injected) once, on first
	/// resolution.
	pub fn to_factory<F: InjectionFactory<C> + Injectable>(self) -> InjectResult<Self> {
		self.expect_factory::<F>()?;
		self.push(Slot::factory(SlotValue::of::<F>(), produce_with::<F, C>))
	}

	pub fn to_factory_instance<F: InjectionFactory<C> + Injectable>(
		self,
		factory: Rc<F>,
	) -> InjectResult<Self> {
		self.expect_factory::<F>()?;
		self.push(Slot::factory(
			SlotValue::Constructed(Instance::described(factory)),
			produce_with::<F, C>,
		))
	}

	/// Binds the contract to itself through a runtime key. The key must identify the contract type
	/// and be constructible.
	pub fn to_key(self, key: TypeKey) -> InjectResult<Self> {
		let contract = NamedTypeId::of::<C>();

		let Some(view) = key.identity_view().filter(|_| key.id() == contract) else {
			return Err(InjectError::NotAssignable {
				value: key.id(),
				contract,
			});
		};

		if self.binding.kind() == BindingKind::Factory {
			return Err(InjectError::NotAssignable {
				value: key.id(),
				contract,
			});
		}

		self.push(Slot::view(SlotValue::Unconstructed(key), view))
	}

	fn expect_constructing<V: 'static>(&self) -> InjectResult<()> {
		if self.binding.kind() == BindingKind::Factory {
			// Factory bindings only accept values implementing `InjectionFactory<C>`.
			return Err(InjectError::NotAssignable {
				value: NamedTypeId::of::<V>(),
				contract: NamedTypeId::of::<C>(),
			});
		}
		Ok(())
	}

	fn expect_factory<F: 'static>(&self) -> InjectResult<()> {
		if self.binding.kind() != BindingKind::Factory {
			return Err(InjectError::NotAssignable {
				value: NamedTypeId::of::<F>(),
				contract: NamedTypeId::of::<C>(),
			});
		}
		Ok(())
	}

	fn push(mut self, slot: Slot) -> InjectResult<Self> {
		let changed = self.binding.push_slot(slot);

		if !self.registered {
			self.registered = true;

			match self.binder.add(self.binding.clone())? {
				Some(stored) => self.binding = stored,
				None => log::debug!("{:?} was vetoed; further values stay local", self.binding),
			}
		} else if changed {
			log::debug!("added a value to {:?}", self.binding);
		}

		Ok(self)
	}

	// === Configuration === //

	pub fn named(self, discriminator: impl Into<Discriminator>) -> InjectResult<Self> {
		self.binder.rename(&self.binding, Some(discriminator.into()))?;
		Ok(self)
	}

	pub fn when(self, condition: impl Fn(&ResolutionContext) -> bool + 'static) -> Self {
		self.binding.set_condition(Rc::new(condition));
		self
	}

	/// Only applies the binding when injecting into a `P`.
	pub fn when_into<P: ?Sized + 'static>(self) -> Self {
		self.when(|cx| cx.is_injecting_into::<P>())
	}

	/// Only applies the binding when injecting into the given object.
	///
	/// The parent is identified by its type and address. No handle is kept since one would stop
	/// [Rc::get_mut] from reaching the parent for injection, so the binding should be removed once
	/// the parent is dropped.
	pub fn when_into_instance<P: ?Sized + 'static>(self, parent: &Rc<P>) -> Self {
		let addr = InstanceAddr::of(&**parent);
		self.when(move |cx| cx.is_injecting_into::<P>() && cx.parent_instance == Some(addr))
	}

	pub fn tag(self, tag: impl Into<Tag>) -> Self {
		self.binding.add_tag(tag.into());
		self
	}

	pub fn binding(&self) -> &Binding {
		&self.binding
	}

	pub fn into_binding(self) -> Binding {
		self.binding
	}
}

// === Bulk bindings === //

/// Handle over the self-bindings created by [Binder::bind_many].
#[derive(Debug, Clone)]
pub struct BulkBinding {
	bindings: Vec<Binding>,
}

impl BulkBinding {
	pub fn when(self, condition: impl Fn(&ResolutionContext) -> bool + 'static) -> Self {
		let condition = Rc::new(condition) as crate::binding::Condition;
		for binding in &self.bindings {
			binding.set_condition(condition.clone());
		}
		self
	}

	pub fn tag(self, tag: impl Into<Tag>) -> Self {
		let tag = tag.into();
		for binding in &self.bindings {
			binding.add_tag(tag.clone());
		}
		self
	}

	pub fn bindings(&self) -> &[Binding] {
		&self.bindings
	}

	pub fn into_bindings(self) -> Vec<Binding> {
		self.bindings
	}
}

impl Binder {
	/// Binds every type in `types` to itself with the kind at the same index. Every pair is validated
	/// before anything is registered.
	pub fn bind_many(
		&mut self,
		types: &[TypeKey],
		kinds: &[BindingKind],
	) -> InjectResult<BulkBinding> {
		if types.len() != kinds.len() {
			return Err(InjectError::ParameterLengthMismatch {
				left: types.len(),
				right: kinds.len(),
			});
		}

		let mut pending = Vec::with_capacity(types.len());
		for (&key, &kind) in types.iter().zip(kinds) {
			let Some(view) = key.identity_view() else {
				return Err(InjectError::NoConstructor(key.id()));
			};

			if kind == BindingKind::Factory {
				return Err(InjectError::NotAssignable {
					value: key.id(),
					contract: key.id(),
				});
			}

			let binding = Binding::new(key, kind);
			binding.push_slot(Slot::view(SlotValue::Unconstructed(key), view));
			pending.push(binding);
		}

		let mut bindings = Vec::with_capacity(pending.len());
		for binding in pending {
			if let Some(stored) = self.add(binding)? {
				bindings.push(stored);
			}
		}

		Ok(BulkBinding { bindings })
	}
}
