mod util;

pub mod binding;
pub mod container;
pub mod error;
pub mod event;
pub mod ext;
pub mod instance;
pub mod key;
pub mod meta;
pub mod resolve;

pub mod prelude {
	pub use crate::{
		binding::{
			factory::{BindingBuilder, BulkBinding},
			registry::Binder,
			Arity, Binding, BindingKind, SlotValue,
		},
		container::{Container, ContainerBuilder, ContainerConfig},
		contract,
		error::{InjectError, InjectResult},
		event::{AddEvent, BindingHooks, Flow, ResolveHooks},
		ext::{pool::InstancePool, ContainerExtension},
		injectable,
		instance::{Instance, InjectionFactory, Resolution, Resolved},
		key::{Contract, Discriminator, TypeKey, Upcast},
		meta::describe::{Args, Describe, Injectable, WithParams},
		resolve::context::{InjectionSite, ResolutionContext, ResolutionMode},
		upcast,
	};
}

pub use prelude::*;

pub use util::{error::ErrorFormatExt, type_id::NamedTypeId};

#[cfg(test)]
mod tests;
