mod descriptor;

use std::cell::{Cell, UnsafeCell};
use std::sync::Mutex;

use fxhash::FxHashMap;

use crate::classfile::{self, ClassFile, ConstantPoolEntry};
use crate::classpath::Classpath;
use crate::error::{Fault, Throwable, VmResult};
use crate::heap::{ObjectRef, SlotKind};
use crate::model::{
	ExceptionHandler, Field, FieldModifiers, FieldSlot, InitCell, InitState, LineNumberEntry, Method, MethodCode, MethodModifiers,
	RuntimeConstant, RuntimeConstantPool, Type, TypeData, TypeKind, TypeModifiers,
};
use crate::runtime::Runtime;

fn slot_kind_for(ty: &Type) -> SlotKind {
	match ty.primitive_kind() {
		Some(crate::model::PrimitiveKind::Boolean) => SlotKind::Boolean,
		Some(crate::model::PrimitiveKind::Byte) => SlotKind::Byte,
		Some(crate::model::PrimitiveKind::Char) => SlotKind::Char,
		Some(crate::model::PrimitiveKind::Short) => SlotKind::Short,
		Some(crate::model::PrimitiveKind::Int) => SlotKind::Int,
		Some(crate::model::PrimitiveKind::Float) => SlotKind::Float,
		Some(crate::model::PrimitiveKind::Long) => SlotKind::Long,
		Some(crate::model::PrimitiveKind::Double) => SlotKind::Double,
		Some(crate::model::PrimitiveKind::Void) => unreachable!("void field"),
		None => SlotKind::Reference,
	}
}

/// Owns the classpath and the table of every class/interface type loaded
/// so far. Array and primitive types are not tracked here — they live in
/// [`crate::model::TypePool`] instead, since they are synthesized rather
/// than read off a classpath (§3, §4.3).
pub(crate) struct Loader {
	classpath: Classpath,
	classes: Mutex<FxHashMap<String, &'static Type>>,
}

impl Loader {
	pub(crate) fn new(classpath: Classpath) -> Self {
		Self { classpath, classes: Mutex::new(FxHashMap::default()) }
	}

	pub(crate) fn find_loaded(&self, name: &str) -> Option<&'static Type> {
		self.classes.lock().unwrap().get(name).copied()
	}

	/// Resolves `name` to a linked (but not necessarily initialized)
	/// `Type`, loading it from the classpath on first reference. Array
	/// names (`[I`, `[Ljava/lang/String;`) are synthesized through
	/// `TypePool` rather than read from a class file (§4.3).
	pub(crate) fn load_class(&self, runtime: &Runtime, name: &str) -> VmResult<&'static Type> {
		if name.starts_with('[') {
			let (ty, _) = descriptor::parse_field_descriptor(name, runtime.types(), |n| self.load_class(runtime, n))
				.map_err(|f| Throwable::NoClassDefFound(format!("{name}: {f}")))?;
			return Ok(ty);
		}
		if let Some(existing) = self.find_loaded(name) {
			return Ok(existing);
		}
		self.define_class(runtime, name)
	}

	/// Boot-time entry point: the very first class load, before any guest
	/// frame exists to catch a `NoClassDefFoundError`, so failure surfaces
	/// as a fatal [`Fault`] instead (§7, §9).
	pub(crate) fn load_main_class(&self, runtime: &Runtime, name: &str) -> Result<&'static Type, Fault> {
		self.load_class(runtime, name).map_err(|t| Fault::MainClassUnavailable(t.to_string()))
	}

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(name)))]
	fn define_class(&self, runtime: &Runtime, name: &str) -> VmResult<&'static Type> {
		let bytes = self
			.classpath
			.read_class(name)
			.map_err(|f| Throwable::NoClassDefFound(format!("{name}: {f}")))?
			.ok_or_else(|| Throwable::ClassNotFound(name.to_string()))?;
		let class_file = classfile::parse(&bytes).map_err(|f| Throwable::NoClassDefFound(format!("{name}: {f}")))?;

		// Reserve the slot before linking so a field/descriptor that
		// mentions this same class (common for linked lists, builders,
		// etc.) resolves to the same `Type` pointer rather than recursing
		// forever.
		let kind = if class_file.access_flags & 0x0200 != 0 { TypeKind::Interface } else { TypeKind::Class };
		let leaked_name: &'static str = Box::leak(name.to_string().into_boxed_str());
		let placeholder: &'static Type = Box::leak(Box::new(Type {
			name: leaked_name,
			kind,
			data: Cell::new(TypeData::Uninit),
			init: Mutex::new(InitCell { state: InitState::Unloaded, owner: None }),
			init_cv: Default::default(),
			mirror: Cell::new(None),
			loader_mirror: Cell::new(None),
		}));
		self.classes.lock().unwrap().insert(name.to_string(), placeholder);

		match self.link(runtime, &class_file, placeholder) {
			Ok(()) => Ok(placeholder),
			Err(err) => {
				self.classes.lock().unwrap().remove(name);
				Err(err)
			}
		}
	}

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(name = ty.name())))]
	fn link(&self, runtime: &Runtime, class_file: &ClassFile, ty: &'static Type) -> VmResult<()> {
		let super_type = match class_file.super_class {
			0 => None,
			index => {
				let name = class_file.class_name(index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				Some(self.load_class(runtime, name)?)
			}
		};

		let mut interfaces = Vec::with_capacity(class_file.interfaces.len());
		for &index in &class_file.interfaces {
			let name = class_file.class_name(index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			interfaces.push(self.load_class(runtime, name)?);
		}
		let interfaces: &'static [&'static Type] = Box::leak(interfaces.into_boxed_slice());

		let resolve_class = |n: &str| self.load_class(runtime, n);

		let mut object_size = super_type.map(|t| t.object_size()).unwrap_or(0);
		let mut fields = Vec::with_capacity(class_file.fields.len());
		for field_info in &class_file.fields {
			let field_name = class_file.utf8(field_info.name_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let descriptor = class_file.utf8(field_info.descriptor_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let (field_type, _) = descriptor::parse_field_descriptor(descriptor, runtime.types(), resolve_class).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let modifiers = FieldModifiers::from_bits_truncate(field_info.access_flags);
			let kind = slot_kind_for(field_type);

			let slot = if modifiers.contains(FieldModifiers::STATIC) {
				FieldSlot::Static { storage: Box::new(UnsafeCell::new([0u8; 8])) }
			} else {
				let offset = object_size;
				object_size += kind.size();
				FieldSlot::Instance { offset }
			};

			fields.push(Field {
				name: Box::leak(field_name.to_string().into_boxed_str()),
				descriptor: Box::leak(descriptor.to_string().into_boxed_str()),
				modifiers,
				declaring_type: ty,
				field_type,
				kind,
				slot,
			});
		}
		let fields: &'static [Field] = Box::leak(fields.into_boxed_slice());

		let mut methods = Vec::with_capacity(class_file.methods.len());
		for method_info in &class_file.methods {
			let method_name = class_file.utf8(method_info.name_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let descriptor = class_file.utf8(method_info.descriptor_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let (parameter_types, return_type) =
				descriptor::parse_method_descriptor(descriptor, runtime.types(), resolve_class).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
			let modifiers = MethodModifiers::from_bits_truncate(method_info.access_flags);

			let code = match class_file.find_attribute(&method_info.attributes, "Code") {
				Some(index) => Some(build_method_code(class_file, &method_info.attributes[index].data)?),
				None => None,
			};

			methods.push(Method {
				name: Box::leak(method_name.to_string().into_boxed_str()),
				descriptor: Box::leak(descriptor.to_string().into_boxed_str()),
				modifiers,
				declaring_type: ty,
				parameter_types: Box::leak(parameter_types.into_boxed_slice()),
				return_type,
				code,
				native: std::sync::atomic::AtomicPtr::new(std::ptr::null_mut()),
			});
		}
		let methods: &'static [Method] = Box::leak(methods.into_boxed_slice());

		let constant_pool = build_constant_pool(class_file)?;

		ty.data.set(TypeData::Init {
			modifiers: TypeModifiers::from_bits_truncate(class_file.access_flags),
			super_type,
			interfaces,
			fields,
			methods,
			constant_pool: Box::leak(Box::new(constant_pool)),
			object_size,
			type_size: std::mem::size_of::<usize>() as u32,
			component_type: None,
			primitive: None,
		});
		Ok(())
	}

	/// Drives the per-type initialization state machine (§4.2): runs the
	/// super type's initializer first, then this type's `<clinit>` (if
	/// any), exactly once, with same-thread re-entry treated as a no-op
	/// rather than a deadlock.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(name = ty.name())))]
	pub(crate) fn ensure_initialized(&self, runtime: &Runtime, ty: &'static Type) -> VmResult<()> {
		use crate::model::InitState;

		{
			let mut cell = ty.init.lock().unwrap();
			let me = std::thread::current().id();
			loop {
				match cell.state {
					InitState::Initialized => return Ok(()),
					InitState::Failed => return Err(Throwable::NoClassDefFound(ty.name().to_string())),
					InitState::Initializing if cell.owner == Some(me) => return Ok(()),
					InitState::Initializing => cell = ty.init_cv.wait(cell).unwrap(),
					InitState::Unloaded | InitState::Loaded => {
						cell.state = InitState::Initializing;
						cell.owner = Some(me);
						break;
					}
				}
			}
		}

		let result = self.run_initializer(runtime, ty);

		let mut cell = ty.init.lock().unwrap();
		cell.state = if result.is_ok() { InitState::Initialized } else { InitState::Failed };
		cell.owner = None;
		ty.init_cv.notify_all();
		result
	}

	/// Returns `ty`'s `java.lang.Class` mirror, allocating it the first time
	/// anything asks for it — a class literal (`LDC` of a `Class` constant)
	/// or a `synchronized static` method entry (§4.2, §4.6).
	pub(crate) fn ensure_class_mirror(&self, runtime: &Runtime, ty: &'static Type) -> VmResult<ObjectRef> {
		if let Some(mirror) = ty.mirror() {
			return Ok(mirror);
		}
		let class_ty = self.load_class(runtime, "java/lang/Class")?;
		self.ensure_initialized(runtime, class_ty)?;
		let mirror = runtime.heap().allocate_object(class_ty)?;
		ty.set_mirror(mirror);
		Ok(mirror)
	}

	fn run_initializer(&self, runtime: &Runtime, ty: &'static Type) -> VmResult<()> {
		if let Some(super_type) = ty.super_type() {
			self.ensure_initialized(runtime, super_type)?;
		}
		if let Some(clinit) = ty.declared_methods().iter().find(|m| m.name() == "<clinit>" && m.descriptor() == "()V") {
			let thread = runtime.current_thread();
			crate::interp::execute(runtime, &thread, clinit, &[])?;
		}
		Ok(())
	}
}

fn build_method_code(class_file: &ClassFile, data: &[u8]) -> VmResult<MethodCode> {
	let raw = classfile::parse_code_attribute(data).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;

	let mut exception_table = Vec::with_capacity(raw.exception_table.len());
	for entry in &raw.exception_table {
		let catch_type = match entry.catch_type {
			0 => None,
			index => Some(class_file.class_name(index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?),
		};
		// Catch-type classes are resolved lazily by name at dispatch time
		// (see `crate::interp::dispatch_exception`), so the exception table
		// only needs to remember the name here; `catch_type` on
		// `ExceptionHandler` stores the resolved type once that lookup
		// succeeds, which for a never-thrown handler may simply never
		// happen. We resolve it eagerly here for simplicity instead.
		let _ = catch_type;
		exception_table.push(ExceptionHandler {
			start_pc: entry.start_pc,
			end_pc: entry.end_pc,
			handler_pc: entry.handler_pc,
			catch_type: None,
		});
	}

	let mut line_numbers = Vec::new();
	if let Some(index) = class_file.find_attribute(&raw.attributes, "LineNumberTable") {
		let data = &raw.attributes[index].data;
		let mut stream = std::io::Cursor::new(data);
		if let Ok(count) = <u16 as crate::utilities::FromByteStream>::read(&mut stream, &()) {
			for _ in 0..count {
				let start_pc = <u16 as crate::utilities::FromByteStream>::read(&mut stream, &()).unwrap_or(0);
				let line_number = <u16 as crate::utilities::FromByteStream>::read(&mut stream, &()).unwrap_or(0);
				line_numbers.push(LineNumberEntry { start_pc, line_number });
			}
		}
	}

	Ok(MethodCode {
		max_stack: raw.max_stack,
		max_locals: raw.max_locals,
		code: Box::leak(raw.code.into_boxed_slice()),
		exception_table: Box::leak(exception_table.into_boxed_slice()),
		line_numbers: Box::leak(line_numbers.into_boxed_slice()),
	})
}

/// Builds the symbolic constant pool from the class file's own raw
/// constant pool: names and descriptors only, no classpath lookups. Every
/// reference-shaped entry resolves (and caches its resolution) lazily, the
/// first time the interpreter actually uses it — see
/// `RuntimeConstant`/`ClassConstant`/`FieldRefConstant`/`MethodRefConstant`
/// in `model::constant_pool` (§3, §4.3).
fn build_constant_pool(class_file: &ClassFile) -> VmResult<RuntimeConstantPool> {
	use crate::model::{ClassConstant, FieldRefConstant, MethodRefConstant};

	let mut entries = Vec::with_capacity(class_file.constant_pool.len());
	for entry in &class_file.constant_pool {
		let built = match entry {
			ConstantPoolEntry::Unusable => RuntimeConstant::Unusable,
			ConstantPoolEntry::Utf8(s) => RuntimeConstant::Utf8(Box::leak(s.clone().into_boxed_str())),
			ConstantPoolEntry::Integer(v) => RuntimeConstant::Integer(*v),
			ConstantPoolEntry::Float(v) => RuntimeConstant::Float(*v),
			ConstantPoolEntry::Long(v) => RuntimeConstant::Long(*v),
			ConstantPoolEntry::Double(v) => RuntimeConstant::Double(*v),
			ConstantPoolEntry::Class { name_index } => {
				let name = class_file.utf8(*name_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				RuntimeConstant::Class(ClassConstant::new(Box::leak(name.to_string().into_boxed_str())))
			}
			ConstantPoolEntry::String { string_index } => {
				let value = class_file.utf8(*string_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				RuntimeConstant::String(Box::leak(value.to_string().into_boxed_str()))
			}
			ConstantPoolEntry::FieldRef { class_index, name_and_type_index } => {
				let class_name = class_file.class_name(*class_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				let (name, descriptor) = resolve_name_and_type(class_file, *name_and_type_index)?;
				RuntimeConstant::FieldRef(FieldRefConstant::new(
					Box::leak(class_name.to_string().into_boxed_str()),
					Box::leak(name.to_string().into_boxed_str()),
					Box::leak(descriptor.to_string().into_boxed_str()),
				))
			}
			ConstantPoolEntry::MethodRef { class_index, name_and_type_index } => {
				let class_name = class_file.class_name(*class_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				let (name, descriptor) = resolve_name_and_type(class_file, *name_and_type_index)?;
				RuntimeConstant::MethodRef(MethodRefConstant::new(
					Box::leak(class_name.to_string().into_boxed_str()),
					Box::leak(name.to_string().into_boxed_str()),
					Box::leak(descriptor.to_string().into_boxed_str()),
				))
			}
			ConstantPoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => {
				let class_name = class_file.class_name(*class_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?;
				let (name, descriptor) = resolve_name_and_type(class_file, *name_and_type_index)?;
				RuntimeConstant::InterfaceMethodRef(MethodRefConstant::new(
					Box::leak(class_name.to_string().into_boxed_str()),
					Box::leak(name.to_string().into_boxed_str()),
					Box::leak(descriptor.to_string().into_boxed_str()),
				))
			}
			ConstantPoolEntry::NameAndType { .. } => RuntimeConstant::Unusable,
			ConstantPoolEntry::MethodHandle { .. } => RuntimeConstant::MethodHandle,
			ConstantPoolEntry::MethodType { .. } => RuntimeConstant::MethodType,
			ConstantPoolEntry::InvokeDynamic { .. } => RuntimeConstant::InvokeDynamic,
		};
		entries.push(built);
	}
	Ok(RuntimeConstantPool::new(Box::leak(entries.into_boxed_slice())))
}

fn resolve_name_and_type(class_file: &ClassFile, index: u16) -> VmResult<(&str, &str)> {
	match class_file.constant_pool.get(index as usize) {
		Some(ConstantPoolEntry::NameAndType { name_index, descriptor_index }) => Ok((
			class_file.utf8(*name_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?,
			class_file.utf8(*descriptor_index).map_err(|f| Throwable::NoClassDefFound(f.to_string()))?,
		)),
		_ => Err(Throwable::NoSuchField(format!("constant pool entry {index} is not NameAndType"))),
	}
}

/// Walks `owner`'s super chain for a field matching `name`/`descriptor`.
/// Shared by link-time static-field checks and
/// `model::constant_pool::FieldRefConstant::resolve`.
pub(crate) fn find_field(owner: &'static Type, name: &str, descriptor: &str) -> Option<&'static Field> {
	let mut current = Some(owner);
	while let Some(ty) = current {
		if let Some(field) = ty.declared_fields().iter().find(|f| f.name() == name && f.descriptor() == descriptor) {
			return Some(field);
		}
		current = ty.super_type();
	}
	None
}

/// Walks `owner`'s super chain for a method matching `name`/`descriptor`.
/// Shared by link-time checks and
/// `model::constant_pool::MethodRefConstant::resolve`.
pub(crate) fn find_method(owner: &'static Type, name: &str, descriptor: &str) -> Option<&'static Method> {
	let mut current = Some(owner);
	while let Some(ty) = current {
		if let Some(method) = ty.declared_methods().iter().find(|m| m.name() == name && m.descriptor() == descriptor) {
			return Some(method);
		}
		current = ty.super_type();
	}
	None
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::config::Config;

	fn test_type(name: &'static str) -> &'static Type {
		Box::leak(Box::new(Type {
			name,
			kind: TypeKind::Class,
			data: Cell::new(TypeData::Init {
				modifiers: TypeModifiers::empty(),
				super_type: None,
				interfaces: &[],
				fields: &[],
				methods: &[],
				constant_pool: Box::leak(Box::new(RuntimeConstantPool::empty())),
				object_size: 0,
				type_size: 0,
				component_type: None,
				primitive: None,
			}),
			init: Mutex::new(InitCell { state: InitState::Unloaded, owner: None }),
			init_cv: Default::default(),
			mirror: Cell::new(None),
			loader_mirror: Cell::new(None),
		}))
	}

	/// A genuine two-thread contended initialization: the test thread takes
	/// the `Initializing` slot itself (standing in for whichever real thread
	/// got there first), then a second OS thread calls `ensure_initialized`
	/// and must block on `init_cv` until the first thread flips the state
	/// and notifies, never running `run_initializer` itself (§4.2).
	#[test]
	fn ensure_initialized_blocks_a_second_thread_until_the_driver_finishes() {
		let runtime = Runtime::boot(Config::new("Test", vec![])).unwrap();
		let ty = test_type("test/Race");

		{
			let mut cell = ty.init.lock().unwrap();
			cell.state = InitState::Initializing;
			cell.owner = Some(std::thread::current().id());
		}

		let waiter_runtime = runtime.clone();
		let waiter = std::thread::spawn(move || waiter_runtime.loader().ensure_initialized(&waiter_runtime, ty));

		std::thread::sleep(Duration::from_millis(50));
		{
			let mut cell = ty.init.lock().unwrap();
			cell.state = InitState::Initialized;
			cell.owner = None;
		}
		ty.init_cv.notify_all();

		assert!(waiter.join().unwrap().is_ok());
	}
}
