use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use bitflags::bitflags;
use fxhash::FxHashMap;

use crate::heap::ObjectRef;
use crate::model::{Field, Method, RuntimeConstantPool};

bitflags! {
	#[derive(Copy, Clone, Eq, PartialEq, Debug)]
	pub struct TypeModifiers: u16 {
		const PUBLIC     = 0x0001;
		const PRIVATE    = 0x0002;
		const PROTECTED  = 0x0004;
		const STATIC     = 0x0008;
		const FINAL      = 0x0010;
		const SUPER      = 0x0020;
		const INTERFACE  = 0x0200;
		const ABSTRACT   = 0x0400;
		const SYNTHETIC  = 0x1000;
		const ANNOTATION = 0x2000;
		const ENUM       = 0x4000;
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeKind {
	Class,
	Interface,
	Array,
	Primitive,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
	Void,
	Boolean,
	Byte,
	Char,
	Short,
	Int,
	Float,
	Long,
	Double,
}

impl PrimitiveKind {
	pub fn descriptor(self) -> char {
		match self {
			PrimitiveKind::Void => 'V',
			PrimitiveKind::Boolean => 'Z',
			PrimitiveKind::Byte => 'B',
			PrimitiveKind::Char => 'C',
			PrimitiveKind::Short => 'S',
			PrimitiveKind::Int => 'I',
			PrimitiveKind::Float => 'F',
			PrimitiveKind::Long => 'J',
			PrimitiveKind::Double => 'D',
		}
	}

	pub fn type_size(self) -> u32 {
		match self {
			PrimitiveKind::Void => 0,
			PrimitiveKind::Boolean | PrimitiveKind::Byte => 1,
			PrimitiveKind::Char | PrimitiveKind::Short => 2,
			PrimitiveKind::Int | PrimitiveKind::Float => 4,
			PrimitiveKind::Long | PrimitiveKind::Double => 8,
		}
	}

	pub fn from_descriptor(c: char) -> Option<Self> {
		Some(match c {
			'V' => PrimitiveKind::Void,
			'Z' => PrimitiveKind::Boolean,
			'B' => PrimitiveKind::Byte,
			'C' => PrimitiveKind::Char,
			'S' => PrimitiveKind::Short,
			'I' => PrimitiveKind::Int,
			'F' => PrimitiveKind::Float,
			'J' => PrimitiveKind::Long,
			'D' => PrimitiveKind::Double,
			_ => return None,
		})
	}
}

/// Initialization state machine (§4.2). Guarded by `Type::init` so that the
/// loaded→initializing transition and the super-type/`<clinit>` work it
/// brackets happen under one lock per type, not one lock for the whole
/// loader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InitState {
	Unloaded,
	Loaded,
	Initializing,
	Initialized,
	Failed,
}

pub(crate) struct InitCell {
	pub(crate) state: InitState,
	/// Native thread id of whoever is driving initialization, so re-entry
	/// from the same thread can be recognized as a no-op (§4.2, §9).
	pub(crate) owner: Option<std::thread::ThreadId>,
}

/// Two-phase payload, same discipline as this codebase's existing type
/// graph: a type is `Uninit` the instant its shell is allocated (so other
/// types being parsed in the same batch can form forward references to it
/// by pointer), then promoted to `Init` once the class-file reader and
/// linker have filled in its shape. The promotion is the only mutation;
/// after that a `Type` is logically immutable (initialization state lives
/// in `InitCell`, not here).
#[derive(Copy, Clone)]
pub(crate) enum TypeData {
	Uninit,
	Init {
		modifiers: TypeModifiers,
		super_type: Option<&'static Type>,
		interfaces: &'static [&'static Type],
		fields: &'static [Field],
		methods: &'static [Method],
		constant_pool: &'static RuntimeConstantPool,
		object_size: u32,
		type_size: u32,
		component_type: Option<&'static Type>,
		primitive: Option<PrimitiveKind>,
	},
}

pub struct Type {
	pub(crate) name: &'static str,
	pub(crate) kind: TypeKind,
	pub(crate) data: Cell<TypeData>,
	pub(crate) init: Mutex<InitCell>,
	pub(crate) init_cv: std::sync::Condvar,
	pub(crate) mirror: Cell<Option<ObjectRef>>,
	pub(crate) loader_mirror: Cell<Option<ObjectRef>>,
}

unsafe impl Sync for Type {}

impl Type {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn kind(&self) -> TypeKind {
		self.kind
	}

	pub fn is_primitive(&self) -> bool {
		self.kind == TypeKind::Primitive
	}

	pub fn is_array(&self) -> bool {
		self.kind == TypeKind::Array
	}

	pub fn is_interface(&self) -> bool {
		self.kind == TypeKind::Interface
	}

	fn data(&self) -> TypeData {
		self.data.get()
	}

	pub fn is_linked(&self) -> bool {
		matches!(self.data(), TypeData::Init { .. })
	}

	pub fn modifiers(&self) -> TypeModifiers {
		match self.data() {
			TypeData::Init { modifiers, .. } => modifiers,
			TypeData::Uninit => TypeModifiers::empty(),
		}
	}

	pub fn is_abstract(&self) -> bool {
		self.modifiers().contains(TypeModifiers::ABSTRACT) || self.kind == TypeKind::Interface
	}

	pub fn super_type(&self) -> Option<&'static Type> {
		match self.data() {
			TypeData::Init { super_type, .. } => super_type,
			TypeData::Uninit => None,
		}
	}

	pub fn interfaces(&self) -> &'static [&'static Type] {
		match self.data() {
			TypeData::Init { interfaces, .. } => interfaces,
			TypeData::Uninit => &[],
		}
	}

	pub fn declared_fields(&self) -> &'static [Field] {
		match self.data() {
			TypeData::Init { fields, .. } => fields,
			TypeData::Uninit => &[],
		}
	}

	pub fn declared_methods(&self) -> &'static [Method] {
		match self.data() {
			TypeData::Init { methods, .. } => methods,
			TypeData::Uninit => &[],
		}
	}

	pub fn constant_pool(&self) -> Option<&'static RuntimeConstantPool> {
		match self.data() {
			TypeData::Init { constant_pool, .. } => Some(constant_pool),
			TypeData::Uninit => None,
		}
	}

	/// Bytes of instance field area, recursively including every super
	/// type. Monotonically non-decreasing from super to subtype (§3, §8).
	pub fn object_size(&self) -> u32 {
		match self.data() {
			TypeData::Init { object_size, .. } => object_size,
			TypeData::Uninit => 0,
		}
	}

	/// Bytes occupied by one slot of this type (a field or array element).
	pub fn type_size(&self) -> u32 {
		match self.data() {
			TypeData::Init { type_size, .. } => type_size,
			TypeData::Uninit => 0,
		}
	}

	pub fn component_type(&self) -> Option<&'static Type> {
		match self.data() {
			TypeData::Init { component_type, .. } => component_type,
			TypeData::Uninit => None,
		}
	}

	pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
		match self.data() {
			TypeData::Init { primitive, .. } => primitive,
			TypeData::Uninit => None,
		}
	}

	pub fn mirror(&self) -> Option<ObjectRef> {
		self.mirror.get()
	}

	pub fn set_mirror(&self, object: ObjectRef) {
		self.mirror.set(Some(object));
	}

	pub fn loader_mirror(&self) -> Option<ObjectRef> {
		self.loader_mirror.get()
	}

	pub fn set_loader_mirror(&self, object: ObjectRef) {
		self.loader_mirror.set(Some(object));
	}

	/// Is `self` the same type as, or a subtype of, `other`? Walks the
	/// super chain and, for interfaces, the implemented-interface set.
	pub fn is_assignable_to(&self, other: &Type) -> bool {
		if std::ptr::eq(self, other) {
			return true;
		}
		if let Some(super_ty) = self.super_type() {
			if super_ty.is_assignable_to(other) {
				return true;
			}
		}
		self.interfaces().iter().any(|i| i.is_assignable_to(other))
	}

	pub(crate) fn init_state(&self) -> InitState {
		self.init.lock().unwrap().state
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name)
	}
}

impl fmt::Debug for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Type({:?}, {})", self.kind, self.name)
	}
}

impl Eq for Type {}

impl PartialEq for Type {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self, other)
	}
}

impl Hash for Type {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(self as *const Type).hash(state)
	}
}

/// Owns the singleton primitive descriptors and memoizes array-type
/// construction (`[I`, `[Ljava/lang/Object;`, …) the way the class loader's
/// name cache memoizes classes — separate tables because array types are
/// synthesized rather than read from a class file.
pub struct TypePool {
	primitives: Mutex<FxHashMap<PrimitiveKind, &'static Type>>,
	arrays: Mutex<HashMap<*const Type, &'static Type, fxhash::FxBuildHasher>>,
}

unsafe impl Sync for TypePool {}

impl TypePool {
	pub(crate) fn new() -> Self {
		Self {
			primitives: Mutex::new(FxHashMap::default()),
			arrays: Mutex::new(HashMap::default()),
		}
	}

	pub fn get_primitive(&self, kind: PrimitiveKind) -> &'static Type {
		let mut primitives = self.primitives.lock().unwrap();
		*primitives.entry(kind).or_insert_with(|| {
			let name: &'static str = Box::leak(kind.descriptor().to_string().into_boxed_str());
			Box::leak(Box::new(Type {
				name,
				kind: TypeKind::Primitive,
				data: Cell::new(TypeData::Init {
					modifiers: TypeModifiers::empty(),
					super_type: None,
					interfaces: &[],
					fields: &[],
					methods: &[],
					constant_pool: Box::leak(Box::new(RuntimeConstantPool::empty())),
					object_size: 0,
					type_size: kind.type_size(),
					component_type: None,
					primitive: Some(kind),
				}),
				init: Mutex::new(InitCell { state: InitState::Initialized, owner: None }),
				init_cv: Default::default(),
				mirror: Cell::new(None),
				loader_mirror: Cell::new(None),
			}))
		})
	}

	/// Synthesizes (and memoizes) the array type whose component type is
	/// `component`. Array types are always fully linked: `object_size` is
	/// the header-relative element area stride, `type_size` is a reference
	/// width (arrays are always reference-typed slots).
	pub fn get_array(&self, component: &'static Type) -> &'static Type {
		let mut arrays = self.arrays.lock().unwrap();
		*arrays.entry(component as *const Type).or_insert_with(|| {
			let name: &'static str = Box::leak(format!("[{}", array_descriptor(component)).into_boxed_str());
			Box::leak(Box::new(Type {
				name,
				kind: TypeKind::Array,
				data: Cell::new(TypeData::Init {
					modifiers: TypeModifiers::FINAL,
					super_type: None,
					interfaces: &[],
					fields: &[],
					methods: &[],
					constant_pool: Box::leak(Box::new(RuntimeConstantPool::empty())),
					object_size: 0,
					type_size: std::mem::size_of::<usize>() as u32,
					component_type: Some(component),
					primitive: None,
				}),
				init: Mutex::new(InitCell { state: InitState::Initialized, owner: None }),
				init_cv: Default::default(),
				mirror: Cell::new(None),
				loader_mirror: Cell::new(None),
			}))
		})
	}
}

fn array_descriptor(ty: &Type) -> String {
	match ty.kind() {
		TypeKind::Primitive => ty.primitive_kind().unwrap().descriptor().to_string(),
		TypeKind::Array => ty.name().to_string(),
		_ => format!("L{};", ty.name()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn primitive_pool_memoizes() {
		let pool = TypePool::new();
		let a = pool.get_primitive(PrimitiveKind::Int);
		let b = pool.get_primitive(PrimitiveKind::Int);
		assert!(std::ptr::eq(a, b));
		assert_eq!(a.type_size(), 4);
	}

	#[test]
	fn array_pool_memoizes_by_component_identity() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(PrimitiveKind::Int);
		let a = pool.get_array(int_ty);
		let b = pool.get_array(int_ty);
		assert!(std::ptr::eq(a, b));
		assert_eq!(a.name(), "[I");
	}
}
