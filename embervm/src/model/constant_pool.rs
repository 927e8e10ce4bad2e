use std::sync::OnceLock;

use crate::error::{Throwable, VmResult};
use crate::model::{Field, Method, Type};
use crate::runtime::Runtime;

/// A symbolic class reference: just the name read off the class file until
/// something actually uses it, at which point [`Self::resolve`] loads (and
/// links) the named type once and caches the result. A second call against
/// the same constant is a pure `OnceLock::get` — no re-resolution, no
/// repeated classpath lookup (§4.3, §9).
pub struct ClassConstant {
	name: &'static str,
	resolved: OnceLock<&'static Type>,
}

impl ClassConstant {
	pub(crate) fn new(name: &'static str) -> Self {
		Self { name, resolved: OnceLock::new() }
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn resolve(&self, runtime: &Runtime) -> VmResult<&'static Type> {
		if let Some(ty) = self.resolved.get() {
			return Ok(*ty);
		}
		let ty = runtime.loader().load_class(runtime, self.name)?;
		Ok(*self.resolved.get_or_init(|| ty))
	}
}

/// A symbolic field reference: owning class name plus name-and-type, until
/// [`Self::resolve`] walks the owner's super chain and caches the field it
/// finds (§4.3).
pub struct FieldRefConstant {
	class: ClassConstant,
	name: &'static str,
	descriptor: &'static str,
	resolved: OnceLock<&'static Field>,
}

impl FieldRefConstant {
	pub(crate) fn new(class_name: &'static str, name: &'static str, descriptor: &'static str) -> Self {
		Self { class: ClassConstant::new(class_name), name, descriptor, resolved: OnceLock::new() }
	}

	pub(crate) fn resolve(&self, runtime: &Runtime) -> VmResult<&'static Field> {
		if let Some(field) = self.resolved.get() {
			return Ok(*field);
		}
		let owner = self.class.resolve(runtime)?;
		let field = crate::loader::find_field(owner, self.name, self.descriptor)
			.ok_or_else(|| Throwable::NoSuchField(format!("{}.{}", owner.name(), self.name)))?;
		Ok(*self.resolved.get_or_init(|| field))
	}
}

/// A symbolic method reference, resolved and cached the same way as
/// [`FieldRefConstant`]; shared between `CONSTANT_Methodref` and
/// `CONSTANT_InterfaceMethodref` since both name-and-type-resolve the same
/// way (§4.3, §4.4).
pub struct MethodRefConstant {
	class: ClassConstant,
	name: &'static str,
	descriptor: &'static str,
	resolved: OnceLock<&'static Method>,
}

impl MethodRefConstant {
	pub(crate) fn new(class_name: &'static str, name: &'static str, descriptor: &'static str) -> Self {
		Self { class: ClassConstant::new(class_name), name, descriptor, resolved: OnceLock::new() }
	}

	pub(crate) fn resolve(&self, runtime: &Runtime) -> VmResult<&'static Method> {
		if let Some(method) = self.resolved.get() {
			return Ok(*method);
		}
		let owner = self.class.resolve(runtime)?;
		let method = crate::loader::find_method(owner, self.name, self.descriptor)
			.ok_or_else(|| Throwable::NoSuchMethod(format!("{}.{}{}", owner.name(), self.name, self.descriptor)))?;
		Ok(*self.resolved.get_or_init(|| method))
	}
}

/// An entry of a type's runtime constant pool. Reference-shaped entries
/// (`Class`, `FieldRef`, `MethodRef`, `InterfaceMethodRef`) are symbolic —
/// a name, or a name-and-type against an as-yet-unresolved owner — until
/// the interpreter actually resolves one, at which point the resolution is
/// cached on the constant itself rather than repeated (§4.3, §9).
///
/// `MethodHandle`, `MethodType` and `InvokeDynamic` are kept as distinct,
/// permanently-unresolvable variants: the interpreter parses them out of a
/// class file but any attempt to resolve one fails with
/// `Throwable::Linkage` rather than panicking on a missing case (§9).
pub enum RuntimeConstant {
	Utf8(&'static str),
	Integer(i32),
	Float(f32),
	Long(i64),
	Double(f64),
	String(&'static str),
	Class(ClassConstant),
	FieldRef(FieldRefConstant),
	MethodRef(MethodRefConstant),
	InterfaceMethodRef(MethodRefConstant),
	MethodHandle,
	MethodType,
	InvokeDynamic,
	/// Placeholder occupying the second slot of a `Long`/`Double` entry, per
	/// the class file format's two-slot-wide-constant rule.
	Unusable,
}

pub struct RuntimeConstantPool {
	entries: &'static [RuntimeConstant],
}

impl RuntimeConstantPool {
	pub(crate) fn new(entries: &'static [RuntimeConstant]) -> Self {
		Self { entries }
	}

	pub(crate) fn empty() -> Self {
		Self { entries: &[] }
	}

	pub fn get(&self, index: u16) -> Option<&'static RuntimeConstant> {
		self.entries.get(index as usize)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::model::{PrimitiveKind, TypePool};

	/// `ClassConstant::resolve` itself needs a full `Runtime` to exercise
	/// end to end; this test drives the `OnceLock` it caches into directly,
	/// the same way `resolve` does, to pin down that a second fill attempt
	/// never displaces the first winner's pointer nor runs its init closure
	/// again — the idempotence §4.3 requires.
	#[test]
	fn resolution_cache_keeps_first_winner_and_inits_once() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(PrimitiveKind::Int);
		let long_ty = pool.get_primitive(PrimitiveKind::Long);
		let constant = ClassConstant::new("I");
		let inits = AtomicUsize::new(0);

		let first = *constant.resolved.get_or_init(|| {
			inits.fetch_add(1, Ordering::Relaxed);
			int_ty
		});
		let second = *constant.resolved.get_or_init(|| {
			inits.fetch_add(1, Ordering::Relaxed);
			long_ty
		});

		assert!(std::ptr::eq(first, second));
		assert!(std::ptr::eq(first, int_ty));
		assert_eq!(inits.load(Ordering::Relaxed), 1);
	}
}
