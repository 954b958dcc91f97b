use thiserror::Error;

use crate::{key::Discriminator, util::type_id::NamedTypeId};

pub type InjectResult<T> = Result<T, InjectError>;

#[derive(Debug, Error)]
pub enum InjectError {
	#[error("required argument `{0}` was not provided")]
	NullArgument(&'static str),

	#[error("{value} is not assignable to the contract type {contract}")]
	NotAssignable {
		value: NamedTypeId,
		contract: NamedTypeId,
	},

	#[error("a binding for {contract} named {discriminator:?} is already registered")]
	DuplicateBinding {
		contract: NamedTypeId,
		discriminator: Discriminator,
	},

	#[error("parameter lengths do not match ({left} types against {right} kinds)")]
	ParameterLengthMismatch { left: usize, right: usize },

	#[error("no constructors on type {0}; is it an interface?")]
	NoConstructor(NamedTypeId),

	#[error("pool of {ty} is already at its maximum capacity of {capacity}")]
	MaxCapacityExceeded { ty: NamedTypeId, capacity: usize },

	#[error("could not resolve {dependency} for `{member}` of {parent}")]
	Unresolved {
		parent: NamedTypeId,
		member: &'static str,
		dependency: NamedTypeId,
	},

	#[error("cyclic dependency detected while constructing {ty} (construction stack: {stack:?})")]
	CycleDetected {
		ty: NamedTypeId,
		stack: Vec<NamedTypeId>,
	},

	#[error("failed to construct or inject {ty}")]
	Construction {
		ty: NamedTypeId,
		#[source]
		cause: anyhow::Error,
	},
}

impl InjectError {
	pub(crate) fn construction(ty: NamedTypeId, cause: anyhow::Error) -> Self {
		Self::Construction { ty, cause }
	}
}
