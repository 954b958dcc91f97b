//! Extension hooks fired by the registry and the injector.
//!
//! Hooks run synchronously in registration order. They only ever receive event data, never the
//! registry or container itself, so a hook cannot recursively mutate the bindings it is observing.

use std::{any::Any, fmt};

use crate::{
	binding::Binding, instance::Resolved, resolve::context::ResolutionContext,
	util::type_id::NamedTypeId,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Flow {
	Continue,
	Stop,
}

// === Binding hooks === //

/// The binding about to be added. Hooks can replace it or veto the addition altogether.
#[derive(Debug)]
pub struct AddEvent {
	binding: Binding,
	vetoed: bool,
}

impl AddEvent {
	pub(crate) fn new(binding: Binding) -> Self {
		Self {
			binding,
			vetoed: false,
		}
	}

	pub fn binding(&self) -> &Binding {
		&self.binding
	}

	pub fn replace(&mut self, binding: Binding) {
		self.binding = binding;
	}

	pub fn veto(&mut self) {
		self.vetoed = true;
	}

	pub fn is_vetoed(&self) -> bool {
		self.vetoed
	}

	pub(crate) fn into_binding(self) -> Option<Binding> {
		(!self.vetoed).then_some(self.binding)
	}
}

type BeforeAddHook = Box<dyn FnMut(&mut AddEvent)>;
type AfterAddHook = Box<dyn FnMut(&Binding)>;
type RemoveHook = Box<dyn FnMut(&[Binding])>;

#[derive(Default)]
pub struct BindingHooks {
	before_add: Vec<BeforeAddHook>,
	after_add: Vec<AfterAddHook>,
	before_remove: Vec<RemoveHook>,
	after_remove: Vec<RemoveHook>,
}

impl BindingHooks {
	pub fn on_before_add(&mut self, hook: impl FnMut(&mut AddEvent) + 'static) -> &mut Self {
		self.before_add.push(Box::new(hook));
		self
	}

	pub fn on_after_add(&mut self, hook: impl FnMut(&Binding) + 'static) -> &mut Self {
		self.after_add.push(Box::new(hook));
		self
	}

	pub fn on_before_remove(&mut self, hook: impl FnMut(&[Binding]) + 'static) -> &mut Self {
		self.before_remove.push(Box::new(hook));
		self
	}

	pub fn on_after_remove(&mut self, hook: impl FnMut(&[Binding]) + 'static) -> &mut Self {
		self.after_remove.push(Box::new(hook));
		self
	}

	pub(crate) fn fire_before_add(&mut self, event: &mut AddEvent) {
		for hook in &mut self.before_add {
			hook(event);

			if event.is_vetoed() {
				break;
			}
		}
	}

	pub(crate) fn fire_after_add(&mut self, binding: &Binding) {
		for hook in &mut self.after_add {
			hook(binding);
		}
	}

	pub(crate) fn fire_before_remove(&mut self, bindings: &[Binding]) {
		for hook in &mut self.before_remove {
			hook(bindings);
		}
	}

	pub(crate) fn fire_after_remove(&mut self, bindings: &[Binding]) {
		for hook in &mut self.after_remove {
			hook(bindings);
		}
	}
}

impl fmt::Debug for BindingHooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BindingHooks")
			.field("before_add", &self.before_add.len())
			.field("after_add", &self.after_add.len())
			.field("before_remove", &self.before_remove.len())
			.field("after_remove", &self.after_remove.len())
			.finish()
	}
}

// === Resolution hooks === //

type BeforeResolveHook = Box<dyn FnMut(&ResolutionContext, &mut Option<Vec<Resolved>>) -> Flow>;
type AfterResolveHook = Box<dyn FnMut(&ResolutionContext, &mut Vec<Resolved>) -> Flow>;
type EvaluationHook = Box<dyn FnMut(&ResolutionContext, &Binding) -> Option<Resolved>>;
type ResolutionHook = Box<dyn FnMut(&ResolutionContext, &Binding, &Resolved)>;
type InjectHook = Box<dyn FnMut(NamedTypeId, &mut dyn Any)>;

#[derive(Default)]
pub struct ResolveHooks {
	before_resolve: Vec<BeforeResolveHook>,
	after_resolve: Vec<AfterResolveHook>,
	binding_evaluation: Vec<EvaluationHook>,
	binding_resolution: Vec<ResolutionHook>,
	before_inject: Vec<InjectHook>,
	after_inject: Vec<InjectHook>,
}

impl ResolveHooks {
	/// Registers a hook which runs before any binding is looked up. Returning [Flow::Stop] ends the
	/// resolution immediately with whatever the hooks left in the outcome (or nothing).
	pub fn on_before_resolve(
		&mut self,
		hook: impl FnMut(&ResolutionContext, &mut Option<Vec<Resolved>>) -> Flow + 'static,
	) -> &mut Self {
		self.before_resolve.push(Box::new(hook));
		self
	}

	/// Registers a hook which can inspect or rewrite the collected results. Returning [Flow::Stop]
	/// skips the remaining after-resolve hooks.
	pub fn on_after_resolve(
		&mut self,
		hook: impl FnMut(&ResolutionContext, &mut Vec<Resolved>) -> Flow + 'static,
	) -> &mut Self {
		self.after_resolve.push(Box::new(hook));
		self
	}

	/// Registers a hook which can supply a binding's value in place of the default construction
	/// path. The first hook returning a value wins.
	pub fn on_binding_evaluation(
		&mut self,
		hook: impl FnMut(&ResolutionContext, &Binding) -> Option<Resolved> + 'static,
	) -> &mut Self {
		self.binding_evaluation.push(Box::new(hook));
		self
	}

	pub fn on_binding_resolution(
		&mut self,
		hook: impl FnMut(&ResolutionContext, &Binding, &Resolved) + 'static,
	) -> &mut Self {
		self.binding_resolution.push(Box::new(hook));
		self
	}

	pub fn on_before_inject(
		&mut self,
		hook: impl FnMut(NamedTypeId, &mut dyn Any) + 'static,
	) -> &mut Self {
		self.before_inject.push(Box::new(hook));
		self
	}

	pub fn on_after_inject(
		&mut self,
		hook: impl FnMut(NamedTypeId, &mut dyn Any) + 'static,
	) -> &mut Self {
		self.after_inject.push(Box::new(hook));
		self
	}

	pub(crate) fn fire_before_resolve(&mut self, cx: &ResolutionContext) -> Option<Vec<Resolved>> {
		let mut outcome = None;

		for hook in &mut self.before_resolve {
			if hook(cx, &mut outcome) == Flow::Stop {
				log::trace!("before-resolve hook short-circuited {:?}", cx.target);
				return Some(outcome.unwrap_or_default());
			}
		}

		None
	}

	pub(crate) fn fire_after_resolve(&mut self, cx: &ResolutionContext, results: &mut Vec<Resolved>) {
		for hook in &mut self.after_resolve {
			if hook(cx, results) == Flow::Stop {
				break;
			}
		}
	}

	pub(crate) fn fire_binding_evaluation(
		&mut self,
		cx: &ResolutionContext,
		binding: &Binding,
	) -> Option<Resolved> {
		self.binding_evaluation
			.iter_mut()
			.find_map(|hook| hook(cx, binding))
	}

	pub(crate) fn fire_binding_resolution(
		&mut self,
		cx: &ResolutionContext,
		binding: &Binding,
		resolved: &Resolved,
	) {
		for hook in &mut self.binding_resolution {
			hook(cx, binding, resolved);
		}
	}

	pub(crate) fn fire_before_inject(&mut self, ty: NamedTypeId, target: &mut dyn Any) {
		for hook in &mut self.before_inject {
			hook(ty, target);
		}
	}

	pub(crate) fn fire_after_inject(&mut self, ty: NamedTypeId, target: &mut dyn Any) {
		for hook in &mut self.after_inject {
			hook(ty, target);
		}
	}
}

impl fmt::Debug for ResolveHooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolveHooks")
			.field("before_resolve", &self.before_resolve.len())
			.field("after_resolve", &self.after_resolve.len())
			.field("binding_evaluation", &self.binding_evaluation.len())
			.field("binding_resolution", &self.binding_resolution.len())
			.field("before_inject", &self.before_inject.len())
			.field("after_inject", &self.after_inject.len())
			.finish()
	}
}
