use std::{cell::RefCell, rc::Rc};

use crate::{
	binding::Binding, container::Container, ext::ContainerExtension, util::type_id::NamedTypeId,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AuditEntry {
	Added(NamedTypeId),
	Removed(NamedTypeId),
}

#[derive(Debug, Default)]
struct AuditState {
	enabled: bool,
	live: Vec<Binding>,
	entries: Vec<AuditEntry>,
	duplicates: usize,
}

/// Records registry mutations and warns when a binding is added which is structurally equal to one
/// that is already registered.
#[derive(Debug, Default, Clone)]
pub struct BindingAudit {
	state: Rc<RefCell<AuditState>>,
}

impl BindingAudit {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> Vec<AuditEntry> {
		self.state.borrow().entries.clone()
	}

	pub fn duplicates(&self) -> usize {
		self.state.borrow().duplicates
	}
}

impl ContainerExtension for BindingAudit {
	fn on_register(&mut self, container: &mut Container) {
		{
			let mut state = self.state.borrow_mut();
			state.enabled = true;
			state.live = container.binder().all().cloned().collect();
		}

		let after_add = self.state.clone();
		let after_remove = self.state.clone();

		container
			.binding_hooks()
			.on_after_add(move |binding| {
				let mut state = after_add.borrow_mut();
				if !state.enabled {
					return;
				}

				if state.live.iter().any(|other| other.equivalent(binding)) {
					log::warn!("{binding:?} duplicates an existing binding");
					state.duplicates += 1;
				}

				state.live.push(binding.clone());
				state.entries.push(AuditEntry::Added(binding.contract()));
			})
			.on_after_remove(move |bindings| {
				let mut state = after_remove.borrow_mut();
				if !state.enabled {
					return;
				}

				for binding in bindings {
					state.live.retain(|other| !other.ptr_eq(binding));
					state.entries.push(AuditEntry::Removed(binding.contract()));
				}
			});
	}

	fn on_unregister(&mut self, _container: &mut Container) {
		// Hooks cannot be removed so they are muted instead.
		let mut state = self.state.borrow_mut();
		state.enabled = false;
		state.live.clear();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::injectable;

	#[derive(Default)]
	struct Logger;

	injectable!(Logger);

	#[test]
	fn records_mutations_and_duplicates() {
		let mut container = Container::new();
		let audit = BindingAudit::new();
		container.register_extension(audit.clone());

		container.bind::<Logger>().to_self().unwrap();
		container.bind::<Logger>().to_self().unwrap();
		container.binder_mut().unbind_contract::<Logger>();

		let logger = NamedTypeId::of::<Logger>();
		assert_eq!(audit.duplicates(), 1);
		assert_eq!(
			audit.entries(),
			vec![
				AuditEntry::Added(logger),
				AuditEntry::Added(logger),
				AuditEntry::Removed(logger),
				AuditEntry::Removed(logger),
			]
		);

		assert!(container.has_extension::<BindingAudit>());
		container.unregister_extension::<BindingAudit>().unwrap();
		container.bind::<Logger>().to_self().unwrap();
		assert_eq!(audit.entries().len(), 4);
	}
}
