//! Optional layers built on top of the [Container](crate::Container).

use crate::container::Container;

pub mod audit;
pub mod pool;

/// A plugin owned by a [Container]. Extensions usually subscribe to the container's hooks when
/// registered.
pub trait ContainerExtension: 'static {
	fn on_register(&mut self, container: &mut Container) {
		let _ = container;
	}

	fn on_unregister(&mut self, container: &mut Container) {
		let _ = container;
	}
}
