use std::rc::Rc;

use crate::{
	binding::{registry::Binder, SlotValue},
	key::TypeKey,
	meta::extract::{extract, TypeMetadata},
	util::{hash::FxHashMap, type_id::NamedTypeId},
};

/// Memoizes [TypeMetadata] per type. Metadata for a type is extracted at most once until it is
/// evicted.
#[derive(Debug, Default)]
pub struct MetadataCache {
	entries: FxHashMap<NamedTypeId, Rc<TypeMetadata>>,
}

impl MetadataCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&mut self, key: TypeKey) -> Rc<TypeMetadata> {
		if let Some(meta) = self.entries.get(&key.id()) {
			log::trace!("metadata cache hit for {}", key.id());
			return meta.clone();
		}

		let meta = Rc::new(extract(key));
		self.entries.insert(key.id(), meta.clone());
		meta
	}

	pub fn has(&self, ty: NamedTypeId) -> bool {
		self.entries.contains_key(&ty)
	}

	pub fn evict(&mut self, ty: NamedTypeId) -> bool {
		self.entries.remove(&ty).is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Extracts metadata for every constructible type referenced by a registered binding value.
	/// Returns the number of newly cached types.
	pub fn prime_from_registry(&mut self, binder: &Binder) -> usize {
		let keys = binder
			.all()
			.flat_map(|binding| binding.values())
			.map(|value| match value {
				SlotValue::Unconstructed(key) => key,
				SlotValue::Constructed(instance) => instance.key(),
			})
			.collect::<Vec<_>>();

		let mut primed = 0;
		for key in keys {
			if key.is_constructible() && !self.has(key.id()) {
				self.get(key);
				primed += 1;
			}
		}

		log::debug!("primed the metadata cache with {primed} type(s)");
		primed
	}
}
