use crate::{
	instance::InstanceAddr,
	key::{Discriminator, TypeKey},
	util::type_id::NamedTypeId,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ResolutionMode {
	/// Unbound types are constructed directly.
	#[default]
	AlwaysResolve,

	/// Only bound types resolve; anything else yields an empty result.
	BoundOnly,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum InjectionSite {
	#[default]
	None,
	Constructor,
	Field,
	Property,
	Method,
}

/// Describes a single resolution attempt. These are built fresh for every attempt and only ever
/// handed to binding conditions and hooks.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
	/// The requested type. This is `None` for requests made by discriminator alone.
	pub target: Option<TypeKey>,
	pub discriminator: Option<Discriminator>,
	pub site: InjectionSite,

	/// The name of the parameter or member being injected.
	pub member: Option<&'static str>,
	pub parent_type: Option<NamedTypeId>,

	/// The object being injected into. Constructor parameters never have one since their parent
	/// does not exist yet.
	pub parent_instance: Option<InstanceAddr>,

	/// The contract type of the binding currently being evaluated.
	pub selected: Option<NamedTypeId>,
}

impl ResolutionContext {
	pub fn for_type(target: TypeKey, discriminator: Option<Discriminator>) -> Self {
		Self {
			target: Some(target),
			discriminator,
			..Default::default()
		}
	}

	pub fn for_discriminator(discriminator: Discriminator) -> Self {
		Self {
			discriminator: Some(discriminator),
			..Default::default()
		}
	}

	pub(crate) fn for_member(
		target: TypeKey,
		discriminator: Option<Discriminator>,
		site: InjectionSite,
		member: &'static str,
		parent_type: NamedTypeId,
		parent_instance: Option<InstanceAddr>,
	) -> Self {
		Self {
			target: Some(target),
			discriminator,
			site,
			member: Some(member),
			parent_type: Some(parent_type),
			parent_instance,
			selected: None,
		}
	}

	pub fn is_injecting_into<P: ?Sized + 'static>(&self) -> bool {
		self.parent_type.is_some_and(|ty| ty.is::<P>())
	}

	pub fn target_id(&self) -> Option<NamedTypeId> {
		self.target.map(TypeKey::id)
	}
}
