use std::{any::Any, borrow::Cow, fmt, hash, rc::Rc};

use crate::{
	instance::Instance,
	meta::describe::{Describe, Injectable, TypeDescription},
	util::type_id::NamedTypeId,
};

// === TypeKey === //

pub(crate) type ViewFn = fn(&Instance) -> Option<Rc<dyn Any>>;

#[derive(Copy, Clone)]
pub(crate) struct Recipe {
	pub describe: fn() -> TypeDescription,
	pub view: ViewFn,
}

/// Identifies a type the container can be asked for. Keys built with [TypeKey::of] also know how to
/// describe (and therefore construct) their type. Keys built with [TypeKey::abstract_type] do not,
/// which is how trait objects and other non-constructible contracts are represented.
#[derive(Copy, Clone)]
pub struct TypeKey {
	id: NamedTypeId,
	recipe: Option<Recipe>,
}

impl TypeKey {
	pub fn of<T: Injectable>() -> Self {
		Self {
			id: NamedTypeId::of::<T>(),
			recipe: Some(Recipe {
				describe: describe_erased::<T>,
				view: view_as::<T, T>,
			}),
		}
	}

	pub fn abstract_type<T: ?Sized + 'static>() -> Self {
		Self {
			id: NamedTypeId::of::<T>(),
			recipe: None,
		}
	}

	pub fn id(self) -> NamedTypeId {
		self.id
	}

	pub fn is_constructible(self) -> bool {
		self.recipe.is_some()
	}

	pub(crate) fn describe(self) -> Option<TypeDescription> {
		self.recipe.map(|recipe| (recipe.describe)())
	}

	pub(crate) fn identity_view(self) -> Option<ViewFn> {
		self.recipe.map(|recipe| recipe.view)
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.id.fmt(f)
	}
}

impl Eq for TypeKey {}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl hash::Hash for TypeKey {
	fn hash<H: hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

fn describe_erased<T: Injectable>() -> TypeDescription {
	let mut describe = Describe::<T>::new();
	T::describe(&mut describe);
	describe.into_description()
}

pub(crate) fn view_as<V, C>(instance: &Instance) -> Option<Rc<dyn Any>>
where
	V: Upcast<C>,
	C: ?Sized + 'static,
{
	let concrete = instance.downcast::<V>()?;
	Some(Rc::new(V::upcast(concrete)) as Rc<dyn Any>)
}

// === Contract === //

/// A type which can be requested from the container. Every [Injectable] type is a contract of
/// itself. Abstract contracts (usually `dyn Trait`) are declared with the [contract!] macro.
///
/// [contract!]: crate::contract
pub trait Contract: 'static {
	fn type_key() -> TypeKey;
}

impl<T: Injectable> Contract for T {
	fn type_key() -> TypeKey {
		TypeKey::of::<T>()
	}
}

#[macro_export]
macro_rules! contract {
	($($ty:ty),*$(,)?) => {$(
		impl $crate::Contract for $ty {
			fn type_key() -> $crate::TypeKey {
				$crate::TypeKey::abstract_type::<$ty>()
			}
		}
	)*};
}

// === Upcast === //

/// Converts a shared concrete value into a shared value of its contract type. Every type is
/// trivially convertible into itself; conversions into trait objects are declared with
/// [upcast!].
///
/// [upcast!]: crate::upcast
pub trait Upcast<C: ?Sized + 'static>: 'static {
	fn upcast(self: Rc<Self>) -> Rc<C>;
}

impl<T: 'static> Upcast<T> for T {
	fn upcast(self: Rc<Self>) -> Rc<T> {
		self
	}
}

#[macro_export]
macro_rules! upcast {
	($($ty:ty => $contract:ty),*$(,)?) => {$(
		impl $crate::Upcast<$contract> for $ty {
			fn upcast(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<$contract> {
				self
			}
		}
	)*};
}

// === Discriminator === //

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Discriminator(Cow<'static, str>);

impl Discriminator {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&'static str> for Discriminator {
	fn from(name: &'static str) -> Self {
		Self(Cow::Borrowed(name))
	}
}

impl From<String> for Discriminator {
	fn from(name: String) -> Self {
		Self(Cow::Owned(name))
	}
}

impl From<&Discriminator> for Discriminator {
	fn from(name: &Discriminator) -> Self {
		name.clone()
	}
}

impl PartialEq<str> for Discriminator {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == other
	}
}
