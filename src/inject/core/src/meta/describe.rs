//! Static injection descriptors.
//!
//! Types opt into construction and injection by implementing [Injectable] and listing their
//! constructors, injectable fields, injectable properties, and post-construction methods in
//! [Injectable::describe]. These tables are turned into [TypeMetadata] exactly once per type by the
//! [MetadataCache].
//!
//! [TypeMetadata]: super::extract::TypeMetadata
//! [MetadataCache]: super::cache::MetadataCache

use std::{any::Any, fmt, marker::PhantomData, rc::Rc};

use anyhow::Context;
use smallvec::SmallVec;

use crate::{
	instance::Resolved,
	key::{Contract, Discriminator, TypeKey},
	util::type_id::NamedTypeId,
};

// === Injectable === //

pub trait Injectable: Sized + 'static {
	fn describe(d: &mut Describe<Self>);
}

/// Implements [Injectable] for types which are built through their [Default] implementation and
/// have nothing to inject.
#[macro_export]
macro_rules! injectable {
	($($ty:ty),*$(,)?) => {$(
		impl $crate::Injectable for $ty {
			fn describe(d: &mut $crate::meta::describe::Describe<Self>) {
				d.default_constructor();
			}
		}
	)*};
}

// === Dependencies === //

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Cardinality {
	/// Exactly one value is required.
	One,

	/// Zero or one value.
	Optional,

	/// Every value the request produces.
	Many,
}

#[derive(Debug, Clone)]
pub struct Dependency {
	pub key: TypeKey,
	pub cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
	pub name: &'static str,
	pub dependency: Dependency,
	pub discriminator: Option<Discriminator>,
}

// === Args === //

#[derive(Debug)]
struct ArgValue {
	name: &'static str,
	values: Vec<Resolved>,
}

/// The resolved dependencies handed to a constructor, method, or member setter. Values are taken in
/// the order their parameters were declared.
#[derive(Debug, Default)]
pub struct Args {
	values: SmallVec<[ArgValue; 4]>,
	cursor: usize,
}

impl Args {
	pub(crate) fn push(&mut self, name: &'static str, values: Vec<Resolved>) {
		self.values.push(ArgValue { name, values });
	}

	pub(crate) fn single(name: &'static str, values: Vec<Resolved>) -> Self {
		let mut args = Self::default();
		args.push(name, values);
		args
	}

	pub fn remaining(&self) -> usize {
		self.values.len() - self.cursor
	}

	fn next(&mut self) -> anyhow::Result<(&'static str, Vec<Resolved>)> {
		let Some(arg) = self.values.get_mut(self.cursor) else {
			anyhow::bail!(
				"requested argument #{} but only {} were declared",
				self.cursor + 1,
				self.values.len(),
			);
		};
		self.cursor += 1;

		Ok((arg.name, std::mem::take(&mut arg.values)))
	}

	pub fn one<C: ?Sized + 'static>(&mut self) -> anyhow::Result<Rc<C>> {
		let (name, values) = self.next()?;
		Self::first_of(name, values)?
			.with_context(|| format!("no value was resolved for `{name}`"))
	}

	pub fn optional<C: ?Sized + 'static>(&mut self) -> anyhow::Result<Option<Rc<C>>> {
		let (name, values) = self.next()?;
		Self::first_of(name, values)
	}

	pub fn many<C: ?Sized + 'static>(&mut self) -> anyhow::Result<Vec<Rc<C>>> {
		let (name, values) = self.next()?;
		values
			.iter()
			.map(|value| Self::cast(name, value))
			.collect()
	}

	fn first_of<C: ?Sized + 'static>(
		name: &'static str,
		values: Vec<Resolved>,
	) -> anyhow::Result<Option<Rc<C>>> {
		if values.len() > 1 {
			log::warn!(
				"`{name}` expects a single {} but {} values were resolved; using the first one",
				NamedTypeId::of::<C>(),
				values.len(),
			);
		}

		values.first().map(|value| Self::cast(name, value)).transpose()
	}

	fn cast<C: ?Sized + 'static>(name: &'static str, value: &Resolved) -> anyhow::Result<Rc<C>> {
		value.get::<C>().with_context(|| {
			format!(
				"`{name}` resolved to {}, which cannot be viewed as {}",
				value.instance().ty(),
				NamedTypeId::of::<C>(),
			)
		})
	}
}

// === Erased invokers === //

pub(crate) type ConstructorFn = Rc<dyn Fn(&mut Args) -> anyhow::Result<Box<dyn Any>>>;
pub(crate) type ParameterlessFn = Rc<dyn Fn() -> anyhow::Result<Box<dyn Any>>>;
pub(crate) type MethodFn = Rc<dyn Fn(&mut dyn Any, &mut Args) -> anyhow::Result<()>>;
pub(crate) type NoArgsMethodFn = Rc<dyn Fn(&mut dyn Any) -> anyhow::Result<()>>;
pub(crate) type SetterFn = Rc<dyn Fn(&mut dyn Any, &mut Args) -> anyhow::Result<()>>;

fn downcast_target<T: 'static>(target: &mut dyn Any) -> anyhow::Result<&mut T> {
	target
		.downcast_mut::<T>()
		.with_context(|| format!("injection target is not a {}", NamedTypeId::of::<T>()))
}

#[derive(Clone)]
pub(crate) enum ConstructorInvoke {
	Parameterless(ParameterlessFn),
	Parameterized(ConstructorFn),
}

#[derive(Clone)]
pub(crate) enum MethodInvoke {
	NoArgs(NoArgsMethodFn),
	WithArgs(MethodFn),
}

// === Descriptors === //

#[derive(Clone)]
pub struct ConstructorInfo {
	params: Vec<ParamInfo>,
	preferred: bool,
	invoke: ConstructorInvoke,
}

impl ConstructorInfo {
	pub fn params(&self) -> &[ParamInfo] {
		&self.params
	}

	pub fn is_preferred(&self) -> bool {
		self.preferred
	}

	pub fn is_parameterless(&self) -> bool {
		matches!(self.invoke, ConstructorInvoke::Parameterless(_))
	}

	pub(crate) fn invoke(&self, args: &mut Args) -> anyhow::Result<Box<dyn Any>> {
		match &self.invoke {
			ConstructorInvoke::Parameterless(f) => f(),
			ConstructorInvoke::Parameterized(f) => f(args),
		}
	}
}

impl fmt::Debug for ConstructorInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConstructorInfo")
			.field("params", &self.params)
			.field("preferred", &self.preferred)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MemberKind {
	Field,
	Property,
}

#[derive(Clone)]
pub struct MemberInfo {
	name: &'static str,
	kind: MemberKind,
	dependency: Dependency,
	discriminator: Option<Discriminator>,
	setter: SetterFn,
}

impl MemberInfo {
	pub fn named(&mut self, discriminator: impl Into<Discriminator>) -> &mut Self {
		self.discriminator = Some(discriminator.into());
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn kind(&self) -> MemberKind {
		self.kind
	}

	pub fn dependency(&self) -> &Dependency {
		&self.dependency
	}

	pub fn discriminator(&self) -> Option<&Discriminator> {
		self.discriminator.as_ref()
	}

	pub(crate) fn apply(&self, target: &mut dyn Any, args: &mut Args) -> anyhow::Result<()> {
		(self.setter)(target, args)
	}
}

impl fmt::Debug for MemberInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemberInfo")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("dependency", &self.dependency)
			.field("discriminator", &self.discriminator)
			.finish_non_exhaustive()
	}
}

#[derive(Clone)]
pub struct MethodInfo {
	name: &'static str,
	params: Vec<ParamInfo>,
	invoke: MethodInvoke,
}

impl MethodInfo {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn params(&self) -> &[ParamInfo] {
		&self.params
	}

	pub fn is_parameterless(&self) -> bool {
		matches!(self.invoke, MethodInvoke::NoArgs(_))
	}

	pub(crate) fn invoke(&self) -> &MethodInvoke {
		&self.invoke
	}
}

impl fmt::Debug for MethodInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodInfo")
			.field("name", &self.name)
			.field("params", &self.params)
			.finish_non_exhaustive()
	}
}

// === Describe === //

/// The raw, unselected description of a type as declared by [Injectable::describe].
#[derive(Debug)]
pub(crate) struct TypeDescription {
	pub ty: NamedTypeId,
	pub constructors: Vec<ConstructorInfo>,
	pub fields: Vec<MemberInfo>,
	pub properties: Vec<MemberInfo>,
	pub methods: Vec<MethodInfo>,
}

pub struct Describe<T> {
	desc: TypeDescription,
	_ty: PhantomData<fn(T)>,
}

impl<T: Injectable> Describe<T> {
	pub(crate) fn new() -> Self {
		Self {
			desc: TypeDescription {
				ty: NamedTypeId::of::<T>(),
				constructors: Vec::new(),
				fields: Vec::new(),
				properties: Vec::new(),
				methods: Vec::new(),
			},
			_ty: PhantomData,
		}
	}

	pub(crate) fn into_description(self) -> TypeDescription {
		self.desc
	}

	// === Constructors === //

	pub fn constructor(&mut self) -> ConstructorBuilder<'_, T> {
		ConstructorBuilder {
			target: &mut self.desc.constructors,
			params: Vec::new(),
			preferred: false,
			_ty: PhantomData,
		}
	}

	pub fn default_constructor(&mut self) -> &mut Self
	where
		T: Default,
	{
		self.constructor().build(|_| Ok(T::default()));
		self
	}

	// === Members === //

	pub fn field<C: ?Sized + Contract>(
		&mut self,
		name: &'static str,
		setter: impl Fn(&mut T, Rc<C>) + 'static,
	) -> &mut MemberInfo {
		self.push_member::<C>(MemberKind::Field, name, Cardinality::One, move |target, args| {
			if let Some(value) = args.optional::<C>()? {
				setter(target, value);
			}
			Ok(())
		})
	}

	pub fn field_many<C: ?Sized + Contract>(
		&mut self,
		name: &'static str,
		setter: impl Fn(&mut T, Vec<Rc<C>>) + 'static,
	) -> &mut MemberInfo {
		self.push_member::<C>(MemberKind::Field, name, Cardinality::Many, move |target, args| {
			setter(target, args.many::<C>()?);
			Ok(())
		})
	}

	pub fn property<C: ?Sized + Contract>(
		&mut self,
		name: &'static str,
		setter: impl Fn(&mut T, Rc<C>) -> anyhow::Result<()> + 'static,
	) -> &mut MemberInfo {
		self.push_member::<C>(
			MemberKind::Property,
			name,
			Cardinality::One,
			move |target, args| match args.optional::<C>()? {
				Some(value) => setter(target, value),
				None => Ok(()),
			},
		)
	}

	pub fn property_many<C: ?Sized + Contract>(
		&mut self,
		name: &'static str,
		setter: impl Fn(&mut T, Vec<Rc<C>>) -> anyhow::Result<()> + 'static,
	) -> &mut MemberInfo {
		self.push_member::<C>(
			MemberKind::Property,
			name,
			Cardinality::Many,
			move |target, args| setter(target, args.many::<C>()?),
		)
	}

	fn push_member<C: ?Sized + Contract>(
		&mut self,
		kind: MemberKind,
		name: &'static str,
		cardinality: Cardinality,
		apply: impl Fn(&mut T, &mut Args) -> anyhow::Result<()> + 'static,
	) -> &mut MemberInfo {
		let list = match kind {
			MemberKind::Field => &mut self.desc.fields,
			MemberKind::Property => &mut self.desc.properties,
		};

		let index = list.len();
		list.push(MemberInfo {
			name,
			kind,
			dependency: Dependency {
				key: C::type_key(),
				cardinality,
			},
			discriminator: None,
			setter: Rc::new(move |target: &mut dyn Any, args: &mut Args| {
				apply(downcast_target::<T>(target)?, args)
			}),
		});

		&mut list[index]
	}

	// === Methods === //

	/// Declares a post-construction method. These run after every field and property has been
	/// injected, in declaration order.
	pub fn method(&mut self, name: &'static str) -> MethodBuilder<'_, T> {
		MethodBuilder {
			target: &mut self.desc.methods,
			name,
			params: Vec::new(),
			_ty: PhantomData,
		}
	}
}

// === Parameter lists === //

/// Parameter declarations shared by [ConstructorBuilder] and [MethodBuilder].
pub trait WithParams: Sized {
	fn params_mut(&mut self) -> &mut Vec<ParamInfo>;

	fn param_with<C: ?Sized + Contract>(
		mut self,
		name: &'static str,
		cardinality: Cardinality,
		discriminator: Option<Discriminator>,
	) -> Self {
		self.params_mut().push(ParamInfo {
			name,
			dependency: Dependency {
				key: C::type_key(),
				cardinality,
			},
			discriminator,
		});
		self
	}

	fn param<C: ?Sized + Contract>(self, name: &'static str) -> Self {
		self.param_with::<C>(name, Cardinality::One, None)
	}

	fn param_named<C: ?Sized + Contract>(
		self,
		name: &'static str,
		discriminator: impl Into<Discriminator>,
	) -> Self {
		self.param_with::<C>(name, Cardinality::One, Some(discriminator.into()))
	}

	fn optional<C: ?Sized + Contract>(self, name: &'static str) -> Self {
		self.param_with::<C>(name, Cardinality::Optional, None)
	}

	fn many<C: ?Sized + Contract>(self, name: &'static str) -> Self {
		self.param_with::<C>(name, Cardinality::Many, None)
	}
}

pub struct ConstructorBuilder<'a, T> {
	target: &'a mut Vec<ConstructorInfo>,
	params: Vec<ParamInfo>,
	preferred: bool,
	_ty: PhantomData<fn(T)>,
}

impl<T: 'static> ConstructorBuilder<'_, T> {
	/// Marks this constructor as the one to use when a type declares several.
	pub fn preferred(mut self) -> Self {
		self.preferred = true;
		self
	}

	pub fn build<F>(self, f: F)
	where
		F: Fn(&mut Args) -> anyhow::Result<T> + 'static,
	{
		let invoke = if self.params.is_empty() {
			ConstructorInvoke::Parameterless(Rc::new(move || {
				Ok(Box::new(f(&mut Args::default())?) as Box<dyn Any>)
			}))
		} else {
			ConstructorInvoke::Parameterized(Rc::new(move |args: &mut Args| {
				Ok(Box::new(f(args)?) as Box<dyn Any>)
			}))
		};

		self.target.push(ConstructorInfo {
			params: self.params,
			preferred: self.preferred,
			invoke,
		});
	}
}

impl<T> WithParams for ConstructorBuilder<'_, T> {
	fn params_mut(&mut self) -> &mut Vec<ParamInfo> {
		&mut self.params
	}
}

pub struct MethodBuilder<'a, T> {
	target: &'a mut Vec<MethodInfo>,
	name: &'static str,
	params: Vec<ParamInfo>,
	_ty: PhantomData<fn(T)>,
}

impl<T: 'static> MethodBuilder<'_, T> {
	pub fn call(self, f: impl Fn(&mut T) -> anyhow::Result<()> + 'static) {
		if !self.params.is_empty() {
			log::warn!(
				"method `{}` declared {} parameters but was bound through `call`; they will not be resolved",
				self.name,
				self.params.len(),
			);
		}

		self.target.push(MethodInfo {
			name: self.name,
			params: Vec::new(),
			invoke: MethodInvoke::NoArgs(Rc::new(move |target: &mut dyn Any| {
				f(downcast_target::<T>(target)?)
			})),
		});
	}

	pub fn call_with(self, f: impl Fn(&mut T, &mut Args) -> anyhow::Result<()> + 'static) {
		self.target.push(MethodInfo {
			name: self.name,
			params: self.params,
			invoke: MethodInvoke::WithArgs(Rc::new(move |target: &mut dyn Any, args: &mut Args| {
				f(downcast_target::<T>(target)?, args)
			})),
		});
	}
}

impl<T> WithParams for MethodBuilder<'_, T> {
	fn params_mut(&mut self) -> &mut Vec<ParamInfo> {
		&mut self.params
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[derive(Default)]
	struct Engine;

	crate::injectable!(Engine);

	#[derive(Default)]
	struct Car {
		engine: Option<Rc<Engine>>,
		started: bool,
	}

	impl Injectable for Car {
		fn describe(d: &mut Describe<Self>) {
			d.default_constructor();
			d.constructor()
				.param::<Engine>("engine")
				.build(|args| {
					Ok(Car {
						engine: Some(args.one()?),
						started: false,
					})
				});
			d.field::<Engine>("engine", |car, engine| car.engine = Some(engine))
				.named("v8");
			d.method("start").call(|car| {
				car.started = true;
				Ok(())
			});
		}
	}

	#[test]
	fn collects_declarations_in_order() {
		let mut describe = Describe::<Car>::new();
		Car::describe(&mut describe);
		let desc = describe.into_description();

		assert_eq!(desc.constructors.len(), 2);
		assert!(desc.constructors[0].is_parameterless());
		assert_eq!(desc.constructors[1].params()[0].name, "engine");
		assert_eq!(desc.fields[0].discriminator().unwrap().as_str(), "v8");
		assert!(desc.methods[0].is_parameterless());
	}

	#[test]
	fn args_are_consumed_in_declaration_order() {
		let engine = Rc::new(Engine);
		let mut args = Args::default();
		args.push("first", vec![Resolved::direct(engine.clone())]);
		args.push("second", Vec::new());
		args.push("third", vec![Resolved::direct(engine.clone()), Resolved::direct(engine.clone())]);

		assert!(Rc::ptr_eq(&args.one::<Engine>().unwrap(), &engine));
		assert!(args.optional::<Engine>().unwrap().is_none());
		assert_eq!(args.many::<Engine>().unwrap().len(), 2);
		assert_eq!(args.remaining(), 0);
		assert!(args.one::<Engine>().is_err());
	}

	#[test]
	fn args_reject_mismatched_views() {
		let mut args = Args::single("engine", vec![Resolved::direct(Rc::new(Engine))]);
		assert!(args.one::<Car>().is_err());
	}

	#[test]
	fn setters_run_against_erased_targets() {
		let mut describe = Describe::<Car>::new();
		Car::describe(&mut describe);
		let desc = describe.into_description();

		let mut car = Car::default();
		let mut args = Args::single("engine", vec![Resolved::direct(Rc::new(Engine))]);
		desc.fields[0].apply(&mut car, &mut args).unwrap();
		assert!(car.engine.is_some());

		match desc.methods[0].invoke() {
			MethodInvoke::NoArgs(f) => f(&mut car).unwrap(),
			MethodInvoke::WithArgs(_) => unreachable!(),
		}
		assert!(car.started);
	}
}
