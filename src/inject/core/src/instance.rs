use std::{any::Any, fmt, rc::Rc};

use derive_where::derive_where;

use crate::{
	error::{InjectError, InjectResult},
	key::{Contract, TypeKey},
	meta::describe::Injectable,
	resolve::context::ResolutionContext,
	util::type_id::NamedTypeId,
};

// === Instance === //

/// A type-erased, shared object produced by (or handed to) the container.
#[derive(Clone)]
pub struct Instance {
	key: TypeKey,
	object: Rc<dyn Any>,
	addr: InstanceAddr,
}

impl Instance {
	pub fn new<T: 'static>(value: Rc<T>) -> Self {
		Self {
			key: TypeKey::abstract_type::<T>(),
			addr: InstanceAddr::of(&*value),
			object: value,
		}
	}

	/// Wraps a pre-built value of a describable type. Unlike [Instance::new], the instance keeps a
	/// constructible key so its metadata can be extracted ahead of time.
	pub fn described<T: Injectable>(value: Rc<T>) -> Self {
		Self {
			key: TypeKey::of::<T>(),
			addr: InstanceAddr::of(&*value),
			object: value,
		}
	}

	/// Wraps a value which is only known through its contract type. The instance can be downcast to
	/// `Rc<C>` rather than to its concrete type.
	pub fn opaque<C: ?Sized + 'static>(value: Rc<C>) -> Self {
		Self {
			key: TypeKey::abstract_type::<C>(),
			addr: InstanceAddr::of(&*value),
			object: Rc::new(value),
		}
	}

	pub(crate) fn from_shared(key: TypeKey, object: Rc<dyn Any>) -> Self {
		Self {
			key,
			addr: InstanceAddr::of(&*object),
			object,
		}
	}

	pub fn key(&self) -> TypeKey {
		self.key
	}

	pub fn ty(&self) -> NamedTypeId {
		self.key.id()
	}

	pub fn addr(&self) -> InstanceAddr {
		self.addr
	}

	pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
		self.object.clone().downcast::<T>().ok()
	}

	pub fn ptr_eq(&self, other: &Instance) -> bool {
		self.addr == other.addr
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("ty", &self.ty())
			.field("addr", &self.addr)
			.finish()
	}
}

/// The address of an object, used to compare instances by identity without keeping them alive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InstanceAddr(usize);

impl InstanceAddr {
	pub fn of<T: ?Sized>(value: &T) -> Self {
		Self(value as *const T as *const () as usize)
	}
}

// === Resolved === //

/// A value produced by a resolution: the underlying instance plus a view of it as the contract it
/// was requested through.
#[derive(Clone)]
pub struct Resolved {
	instance: Instance,
	view: Rc<dyn Any>,
}

impl Resolved {
	pub(crate) fn from_view(instance: Instance, view: Rc<dyn Any>) -> Self {
		Self { instance, view }
	}

	pub fn direct<T: 'static>(value: Rc<T>) -> Self {
		Self {
			instance: Instance::new(value.clone()),
			view: Rc::new(value),
		}
	}

	pub fn of_contract<C: ?Sized + 'static>(value: Rc<C>) -> Self {
		Self {
			instance: Instance::opaque(value.clone()),
			view: Rc::new(value),
		}
	}

	pub fn instance(&self) -> &Instance {
		&self.instance
	}

	pub fn get<C: ?Sized + 'static>(&self) -> Option<Rc<C>> {
		self.view.downcast_ref::<Rc<C>>().cloned()
	}

	pub(crate) fn expect<C: ?Sized + 'static>(&self) -> InjectResult<Rc<C>> {
		self.get::<C>().ok_or_else(|| InjectError::NotAssignable {
			value: self.instance.ty(),
			contract: NamedTypeId::of::<C>(),
		})
	}
}

impl fmt::Debug for Resolved {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Resolved").field(&self.instance).finish()
	}
}

// === Resolution === //

/// The typed outcome of a resolution. A request producing exactly one value is unwrapped into
/// [Resolution::Single].
#[derive_where(Clone)]
pub enum Resolution<C: ?Sized> {
	Empty,
	Single(Rc<C>),
	Many(Vec<Rc<C>>),
}

impl<C: ?Sized + 'static> Resolution<C> {
	pub(crate) fn from_resolved(values: Vec<Resolved>) -> InjectResult<Self> {
		let mut values = values
			.iter()
			.map(Resolved::expect::<C>)
			.collect::<InjectResult<Vec<_>>>()?;

		Ok(match values.len() {
			0 => Self::Empty,
			1 => Self::Single(values.remove(0)),
			_ => Self::Many(values),
		})
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	pub fn len(&self) -> usize {
		match self {
			Self::Empty => 0,
			Self::Single(_) => 1,
			Self::Many(values) => values.len(),
		}
	}

	/// Returns the single value or, for a multi-valued resolution, the first one.
	pub fn single(self) -> Option<Rc<C>> {
		match self {
			Self::Empty => None,
			Self::Single(value) => Some(value),
			Self::Many(values) => values.into_iter().next(),
		}
	}

	pub fn into_vec(self) -> Vec<Rc<C>> {
		match self {
			Self::Empty => Vec::new(),
			Self::Single(value) => vec![value],
			Self::Many(values) => values,
		}
	}
}

impl<C: ?Sized> fmt::Debug for Resolution<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Empty => f.write_str("Empty"),
			Self::Single(_) => f.write_str("Single(..)"),
			Self::Many(values) => write!(f, "Many({} values)", values.len()),
		}
	}
}

// === InjectionFactory === //

/// The contract for values bound through [`Binder::bind_factory`]. The factory takes over
/// construction entirely: the container neither constructs nor injects the values it produces.
///
/// [`Binder::bind_factory`]: crate::binding::registry::Binder::bind_factory
pub trait InjectionFactory<C: ?Sized + 'static>: 'static {
	fn create(&self, cx: &ResolutionContext) -> anyhow::Result<Rc<C>>;
}

pub(crate) type ProduceFn = fn(&Instance, &ResolutionContext) -> Option<anyhow::Result<Resolved>>;

pub(crate) fn produce_with<F, C>(
	factory: &Instance,
	cx: &ResolutionContext,
) -> Option<anyhow::Result<Resolved>>
where
	F: InjectionFactory<C>,
	C: ?Sized + Contract,
{
	let factory = factory.downcast::<F>()?;
	Some(factory.create(cx).map(Resolved::of_contract))
}
