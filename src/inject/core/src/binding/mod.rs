use std::{borrow::Cow, cell::RefCell, fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
	instance::{Instance, ProduceFn},
	key::{Contract, Discriminator, TypeKey, ViewFn},
	resolve::context::ResolutionContext,
	util::type_id::NamedTypeId,
};

pub mod factory;
pub mod registry;

// === Kinds === //

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingKind {
	/// A fresh instance is constructed on every resolution.
	Address,

	/// The value is constructed once and cached in the binding.
	Singleton,

	/// Every value slot is constructed once and cached independently.
	Multiton,

	/// Construction is delegated to an [`InjectionFactory`](crate::InjectionFactory).
	Factory,
}

impl BindingKind {
	pub fn default_arity(self) -> Arity {
		match self {
			Self::Address | Self::Multiton => Arity::Multiple,
			Self::Singleton | Self::Factory => Arity::Single,
		}
	}

	pub fn caches_values(self) -> bool {
		!matches!(self, Self::Address)
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Arity {
	Single,
	Multiple,
}

// === Slots === //

#[derive(Clone)]
pub enum SlotValue {
	Unconstructed(TypeKey),
	Constructed(Instance),
}

impl SlotValue {
	pub fn of<T: ?Sized + Contract>() -> Self {
		Self::Unconstructed(T::type_key())
	}

	pub fn ty(&self) -> NamedTypeId {
		match self {
			Self::Unconstructed(key) => key.id(),
			Self::Constructed(instance) => instance.ty(),
		}
	}

	pub fn is_constructed(&self) -> bool {
		matches!(self, Self::Constructed(_))
	}

	/// Unconstructed slots are compared by type; constructed ones by identity.
	pub fn same_as(&self, other: &SlotValue) -> bool {
		match (self, other) {
			(Self::Unconstructed(a), Self::Unconstructed(b)) => a == b,
			(Self::Constructed(a), Self::Constructed(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for SlotValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unconstructed(key) => f.debug_tuple("Unconstructed").field(key).finish(),
			Self::Constructed(instance) => f.debug_tuple("Constructed").field(instance).finish(),
		}
	}
}

/// How a slot's instance is turned into a value of the binding's contract.
#[derive(Copy, Clone)]
pub(crate) enum Adapter {
	View(ViewFn),
	Factory(ProduceFn),
}

#[derive(Clone)]
pub(crate) struct Slot {
	pub value: SlotValue,
	pub adapter: Adapter,
}

impl Slot {
	pub fn view(value: SlotValue, view: ViewFn) -> Self {
		Self {
			value,
			adapter: Adapter::View(view),
		}
	}

	pub fn factory(value: SlotValue, produce: ProduceFn) -> Self {
		Self {
			value,
			adapter: Adapter::Factory(produce),
		}
	}
}

// === Binding === //

pub type Condition = Rc<dyn Fn(&ResolutionContext) -> bool>;

pub type Tag = Cow<'static, str>;

struct BindingData {
	contract: TypeKey,
	discriminator: Option<Discriminator>,
	kind: BindingKind,
	arity: Arity,
	slots: Vec<Slot>,
	condition: Option<Condition>,
	tags: SmallVec<[Tag; 2]>,
}

/// A shared handle to a binding record. Handles compare by identity through [Binding::ptr_eq];
/// [Binding::equivalent] compares their contents.
#[derive(Clone)]
pub struct Binding(Rc<RefCell<BindingData>>);

impl Binding {
	pub(crate) fn new(contract: TypeKey, kind: BindingKind) -> Self {
		Self(Rc::new(RefCell::new(BindingData {
			contract,
			discriminator: None,
			kind,
			arity: kind.default_arity(),
			slots: Vec::new(),
			condition: None,
			tags: SmallVec::new(),
		})))
	}

	// === Getters === //

	pub fn contract(&self) -> NamedTypeId {
		self.0.borrow().contract.id()
	}

	pub fn contract_key(&self) -> TypeKey {
		self.0.borrow().contract
	}

	pub fn discriminator(&self) -> Option<Discriminator> {
		self.0.borrow().discriminator.clone()
	}

	pub fn kind(&self) -> BindingKind {
		self.0.borrow().kind
	}

	pub fn arity(&self) -> Arity {
		self.0.borrow().arity
	}

	pub fn values(&self) -> Vec<SlotValue> {
		self.0
			.borrow()
			.slots
			.iter()
			.map(|slot| slot.value.clone())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.0.borrow().slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.borrow().slots.is_empty()
	}

	pub fn tags(&self) -> Vec<Tag> {
		self.0.borrow().tags.to_vec()
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.0.borrow().tags.iter().any(|t| t == tag)
	}

	pub fn has_condition(&self) -> bool {
		self.0.borrow().condition.is_some()
	}

	/// Evaluates the binding's condition. Bindings without one always apply.
	pub fn applies_to(&self, cx: &ResolutionContext) -> bool {
		// The condition is cloned out so that it can inspect this binding while running.
		let condition = self.0.borrow().condition.clone();
		condition.map_or(true, |condition| condition(cx))
	}

	pub fn ptr_eq(&self, other: &Binding) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Structural equality: same contract, discriminator, kind, and value list.
	pub fn equivalent(&self, other: &Binding) -> bool {
		if self.ptr_eq(other) {
			return true;
		}

		let (a, b) = (self.0.borrow(), other.0.borrow());

		a.contract == b.contract
			&& a.discriminator == b.discriminator
			&& a.kind == b.kind
			&& a.slots.len() == b.slots.len()
			&& a.slots
				.iter()
				.zip(&b.slots)
				.all(|(a, b)| a.value.same_as(&b.value))
	}

	// === Internal accessors === //

	pub(crate) fn slots(&self) -> Vec<Slot> {
		self.0.borrow().slots.clone()
	}

	/// Adds a value, de-duplicating against existing values. Single-arity bindings have their value
	/// replaced. Returns whether the value list changed.
	pub(crate) fn push_slot(&self, slot: Slot) -> bool {
		let mut data = self.0.borrow_mut();

		if data.slots.iter().any(|other| other.value.same_as(&slot.value)) {
			return false;
		}

		if data.arity == Arity::Single {
			data.slots.clear();
		}
		data.slots.push(slot);
		true
	}

	pub(crate) fn remove_value(&self, value: &SlotValue) -> bool {
		let mut data = self.0.borrow_mut();
		let len = data.slots.len();
		data.slots.retain(|slot| !slot.value.same_as(value));
		data.slots.len() != len
	}

	/// Replaces the unconstructed value at `index` with its materialized instance. The swap is
	/// skipped if the slot changed while the instance was being constructed.
	pub(crate) fn materialize(&self, index: usize, key: TypeKey, instance: Instance) -> bool {
		let mut data = self.0.borrow_mut();
		let Some(slot) = data.slots.get_mut(index) else {
			return false;
		};

		if !matches!(&slot.value, SlotValue::Unconstructed(current) if *current == key) {
			return false;
		}

		slot.value = SlotValue::Constructed(instance);
		true
	}

	pub(crate) fn set_discriminator(&self, discriminator: Option<Discriminator>) {
		self.0.borrow_mut().discriminator = discriminator;
	}

	pub(crate) fn set_condition(&self, condition: Condition) {
		self.0.borrow_mut().condition = Some(condition);
	}

	pub(crate) fn add_tag(&self, tag: Tag) {
		let mut data = self.0.borrow_mut();
		if !data.tags.contains(&tag) {
			data.tags.push(tag);
		}
	}
}

impl fmt::Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();

		f.debug_struct("Binding")
			.field("contract", &data.contract)
			.field("discriminator", &data.discriminator)
			.field("kind", &data.kind)
			.field("arity", &data.arity)
			.field(
				"values",
				&data.slots.iter().map(|slot| &slot.value).collect::<Vec<_>>(),
			)
			.field("conditional", &data.condition.is_some())
			.field("tags", &data.tags)
			.finish()
	}
}
