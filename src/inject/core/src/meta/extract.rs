use crate::{
	key::TypeKey,
	meta::describe::{ConstructorInfo, MemberInfo, MethodInfo, TypeDescription},
	util::type_id::NamedTypeId,
};

// === TypeMetadata === //

/// Everything needed to construct and populate a concrete type. Immutable once extracted.
#[derive(Debug)]
pub struct TypeMetadata {
	ty: NamedTypeId,
	constructor: Option<ConstructorInfo>,
	fields: Vec<MemberInfo>,
	properties: Vec<MemberInfo>,
	methods: Vec<MethodInfo>,
}

impl TypeMetadata {
	pub fn ty(&self) -> NamedTypeId {
		self.ty
	}

	pub fn constructor(&self) -> Option<&ConstructorInfo> {
		self.constructor.as_ref()
	}

	pub fn fields(&self) -> &[MemberInfo] {
		&self.fields
	}

	pub fn properties(&self) -> &[MemberInfo] {
		&self.properties
	}

	pub fn methods(&self) -> &[MethodInfo] {
		&self.methods
	}

	pub fn is_constructible(&self) -> bool {
		self.constructor.is_some()
	}

	pub fn has_injections(&self) -> bool {
		!self.fields.is_empty() || !self.properties.is_empty() || !self.methods.is_empty()
	}
}

// === Extraction === //

pub fn extract(key: TypeKey) -> TypeMetadata {
	let Some(desc) = key.describe() else {
		log::debug!("{} has no descriptor; extracted an empty metadata record", key.id());

		return TypeMetadata {
			ty: key.id(),
			constructor: None,
			fields: Vec::new(),
			properties: Vec::new(),
			methods: Vec::new(),
		};
	};

	let TypeDescription {
		ty,
		constructors,
		fields,
		properties,
		methods,
	} = desc;

	let constructor_count = constructors.len();
	let constructor = select_constructor(constructors);

	log::debug!(
		"extracted metadata for {ty}: {} of {constructor_count} constructors selected, {} fields, {} properties, {} methods",
		constructor.as_ref().map_or(0, |_| 1),
		fields.len(),
		properties.len(),
		methods.len(),
	);

	TypeMetadata {
		ty,
		constructor,
		fields,
		properties,
		methods,
	}
}

/// A lone constructor is always used. Otherwise, the first constructor marked as preferred wins,
/// falling back to the one with the fewest parameters (earliest declaration on ties).
fn select_constructor(mut constructors: Vec<ConstructorInfo>) -> Option<ConstructorInfo> {
	if constructors.len() <= 1 {
		return constructors.pop();
	}

	let index = match constructors.iter().position(ConstructorInfo::is_preferred) {
		Some(index) => index,
		None => constructors
			.iter()
			.enumerate()
			.min_by_key(|(_, ctor)| ctor.params().len())
			.map(|(index, _)| index)?,
	};

	Some(constructors.swap_remove(index))
}

#[cfg(test)]
mod test {
	use std::rc::Rc;

	use super::*;
	use crate::meta::describe::{Describe, Injectable, WithParams};

	#[derive(Default)]
	struct Part;

	crate::injectable!(Part);

	struct Many(usize);

	impl Injectable for Many {
		fn describe(d: &mut Describe<Self>) {
			d.constructor()
				.param::<Part>("a")
				.param::<Part>("b")
				.build(|_| Ok(Many(2)));
			d.constructor().param::<Part>("a").build(|_| Ok(Many(1)));
			d.constructor().param::<Part>("b").build(|_| Ok(Many(3)));
		}
	}

	struct Marked(usize);

	impl Injectable for Marked {
		fn describe(d: &mut Describe<Self>) {
			d.constructor().build(|_| Ok(Marked(0)));
			d.constructor()
				.param::<Part>("a")
				.preferred()
				.build(|_| Ok(Marked(1)));
			d.constructor()
				.param::<Part>("a")
				.preferred()
				.build(|_| Ok(Marked(2)));
		}
	}

	struct Nothing;

	impl Injectable for Nothing {
		fn describe(d: &mut Describe<Self>) {
			d.field::<Part>("part", |_, _: Rc<Part>| {});
		}
	}

	fn build<T: Injectable>() -> Box<T> {
		let meta = extract(TypeKey::of::<T>());
		let ctor = meta.constructor().unwrap();
		ctor.invoke(&mut Default::default())
			.unwrap()
			.downcast::<T>()
			.unwrap()
	}

	#[test]
	fn picks_fewest_parameters_then_declaration_order() {
		assert_eq!(build::<Many>().0, 1);
	}

	#[test]
	fn picks_first_preferred_constructor() {
		assert_eq!(build::<Marked>().0, 1);
	}

	#[test]
	fn missing_constructors_are_not_an_extraction_error() {
		let meta = extract(TypeKey::of::<Nothing>());
		assert!(!meta.is_constructible());
		assert_eq!(meta.fields().len(), 1);
		assert!(meta.has_injections());

		let meta = extract(TypeKey::abstract_type::<dyn std::fmt::Debug>());
		assert!(!meta.is_constructible());
		assert!(!meta.has_injections());
	}
}
