use std::{
	any::{type_name, TypeId},
	borrow::Borrow,
	fmt,
};

use derive_where::derive_where;

/// A [TypeId] which remembers the name of the type it was created from. Equality, ordering, and
/// hashing only ever look at the [TypeId].
#[derive(Copy, Clone)]
#[derive_where(Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NamedTypeId {
	id: TypeId,
	#[derive_where(skip)]
	name: &'static str,
}

impl fmt::Debug for NamedTypeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeId<{}>", self.name)
	}
}

impl fmt::Display for NamedTypeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl NamedTypeId {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: type_name::<T>(),
		}
	}

	pub fn raw(self) -> TypeId {
		self.id
	}

	pub fn name(self) -> &'static str {
		self.name
	}

	pub fn is<T: ?Sized + 'static>(self) -> bool {
		self.id == TypeId::of::<T>()
	}
}

impl Borrow<TypeId> for NamedTypeId {
	fn borrow(&self) -> &TypeId {
		&self.id
	}
}

impl From<NamedTypeId> for TypeId {
	fn from(id: NamedTypeId) -> Self {
		id.raw()
	}
}
