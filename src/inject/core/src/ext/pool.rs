use std::{fmt, rc::Rc};

use crate::{
	container::Container,
	error::{InjectError, InjectResult},
	key::{Contract, Discriminator},
	util::type_id::NamedTypeId,
};

/// A capacity-limited pool of `C` values. Released values are handed out again before new ones are
/// resolved from the container.
pub struct InstancePool<C: ?Sized> {
	capacity: usize,
	discriminator: Option<Discriminator>,
	idle: Vec<Rc<C>>,
	in_use: usize,
}

impl<C: ?Sized + Contract> InstancePool<C> {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			discriminator: None,
			idle: Vec::new(),
			in_use: 0,
		}
	}

	/// Resolves new values through the binding with the given discriminator.
	pub fn named(mut self, discriminator: impl Into<Discriminator>) -> Self {
		self.discriminator = Some(discriminator.into());
		self
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn idle_len(&self) -> usize {
		self.idle.len()
	}

	pub fn in_use(&self) -> usize {
		self.in_use
	}

	pub fn acquire(&mut self, container: &mut Container) -> InjectResult<Rc<C>> {
		if let Some(value) = self.idle.pop() {
			self.in_use += 1;
			return Ok(value);
		}

		if self.in_use >= self.capacity {
			return Err(InjectError::MaxCapacityExceeded {
				ty: NamedTypeId::of::<C>(),
				capacity: self.capacity,
			});
		}

		let resolution = match &self.discriminator {
			Some(discriminator) => container.resolve_named::<C>(discriminator)?,
			None => container.resolve::<C>()?,
		};

		let Some(value) = resolution.single() else {
			return Err(InjectError::Unresolved {
				parent: NamedTypeId::of::<Self>(),
				member: "acquire",
				dependency: NamedTypeId::of::<C>(),
			});
		};

		self.in_use += 1;
		Ok(value)
	}

	/// Returns a value to the pool. Values are only accepted while some are checked out.
	pub fn release(&mut self, value: Rc<C>) -> bool {
		if self.in_use == 0 {
			log::warn!(
				"released a {} into a pool with nothing checked out",
				NamedTypeId::of::<C>(),
			);
			return false;
		}

		self.in_use -= 1;
		self.idle.push(value);
		true
	}
}

impl<C: ?Sized> fmt::Debug for InstancePool<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InstancePool")
			.field("capacity", &self.capacity)
			.field("discriminator", &self.discriminator)
			.field("idle", &self.idle.len())
			.field("in_use", &self.in_use)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::injectable;

	#[derive(Debug, Default)]
	struct Bullet;

	injectable!(Bullet);

	#[test]
	fn pools_reuse_released_values() {
		let mut container = Container::new();
		let mut pool = InstancePool::<Bullet>::new(2);

		let a = pool.acquire(&mut container).unwrap();
		let b = pool.acquire(&mut container).unwrap();
		assert!(!Rc::ptr_eq(&a, &b));

		let err = pool.acquire(&mut container).unwrap_err();
		assert!(matches!(
			err,
			InjectError::MaxCapacityExceeded { capacity: 2, .. }
		));

		assert!(pool.release(a.clone()));
		let c = pool.acquire(&mut container).unwrap();
		assert!(Rc::ptr_eq(&a, &c));
		assert_eq!(pool.in_use(), 2);
		assert_eq!(pool.idle_len(), 0);
	}

	#[test]
	fn foreign_releases_are_rejected() {
		let mut pool = InstancePool::<Bullet>::new(1);
		assert!(!pool.release(Rc::new(Bullet)));
	}

	#[test]
	fn named_pools_resolve_through_their_binding() {
		let mut container = Container::new();
		let mut pool = InstancePool::<Bullet>::new(1).named("missing");

		// There is a binding for the type, so nothing is constructed implicitly.
		container.bind::<Bullet>().to_self().unwrap();

		let err = pool.acquire(&mut container).unwrap_err();
		assert!(matches!(err, InjectError::Unresolved { .. }));
		assert_eq!(pool.in_use(), 0);
	}
}
