use bitflags::bitflags;

use crate::model::Type;

bitflags! {
	#[derive(Copy, Clone, Eq, PartialEq, Debug)]
	pub struct MethodModifiers: u16 {
		const PUBLIC       = 0x0001;
		const PRIVATE      = 0x0002;
		const PROTECTED    = 0x0004;
		const STATIC       = 0x0008;
		const FINAL        = 0x0010;
		const SYNCHRONIZED = 0x0020;
		const BRIDGE       = 0x0040;
		const VARARGS      = 0x0080;
		const NATIVE       = 0x0100;
		const ABSTRACT     = 0x0400;
		const STRICT       = 0x0800;
		const SYNTHETIC    = 0x1000;
	}
}

#[derive(Debug, Copy, Clone)]
pub struct ExceptionHandler {
	pub start_pc: u16,
	pub end_pc: u16,
	pub handler_pc: u16,
	/// `None` is a finally-style handler that catches everything.
	pub catch_type: Option<&'static Type>,
}

#[derive(Debug, Copy, Clone)]
pub struct LineNumberEntry {
	pub start_pc: u16,
	pub line_number: u16,
}

/// Everything a method needs beyond its signature: the bytecode proper plus
/// the exception table it is unwound against and the source-line map used
/// for diagnostics (§3, §5.c).
pub struct MethodCode {
	pub max_stack: u16,
	pub max_locals: u16,
	pub code: &'static [u8],
	pub exception_table: &'static [ExceptionHandler],
	pub line_numbers: &'static [LineNumberEntry],
}

pub struct Method {
	pub(crate) name: &'static str,
	pub(crate) descriptor: &'static str,
	pub(crate) modifiers: MethodModifiers,
	pub(crate) declaring_type: &'static Type,
	pub(crate) parameter_types: &'static [&'static Type],
	pub(crate) return_type: &'static Type,
	pub(crate) code: Option<MethodCode>,
	/// Populated for methods loaded with `ACC_NATIVE`, once a matching
	/// symbol has been resolved from a loaded native library (§5.e, §7
	/// `UnsatisfiedLinkError`). `None` until then.
	pub(crate) native: std::sync::atomic::AtomicPtr<std::ffi::c_void>,
}

impl Method {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn descriptor(&self) -> &'static str {
		self.descriptor
	}

	pub fn modifiers(&self) -> MethodModifiers {
		self.modifiers
	}

	pub fn declaring_type(&self) -> &'static Type {
		self.declaring_type
	}

	pub fn parameter_types(&self) -> &'static [&'static Type] {
		self.parameter_types
	}

	pub fn return_type(&self) -> &'static Type {
		self.return_type
	}

	pub fn is_static(&self) -> bool {
		self.modifiers.contains(MethodModifiers::STATIC)
	}

	pub fn is_abstract(&self) -> bool {
		self.modifiers.contains(MethodModifiers::ABSTRACT)
	}

	pub fn is_native(&self) -> bool {
		self.modifiers.contains(MethodModifiers::NATIVE)
	}

	pub fn is_synchronized(&self) -> bool {
		self.modifiers.contains(MethodModifiers::SYNCHRONIZED)
	}

	pub fn code(&self) -> Option<&MethodCode> {
		self.code.as_ref()
	}

	pub(crate) fn native_ptr(&self) -> Option<*const std::ffi::c_void> {
		let ptr = self.native.load(std::sync::atomic::Ordering::Acquire);
		(!ptr.is_null()).then_some(ptr as *const _)
	}

	pub(crate) fn bind_native(&self, ptr: *mut std::ffi::c_void) {
		self.native.store(ptr, std::sync::atomic::Ordering::Release);
	}

	/// Resolves an overriding method starting the virtual lookup at `from`
	/// (§4.4 dynamic dispatch): walks up `from`'s super chain looking for a
	/// non-private method matching this method's name and descriptor.
	pub(crate) fn resolve_virtual(&self, from: &'static Type) -> Option<&'static Method> {
		let mut current = Some(from);
		while let Some(ty) = current {
			if let Some(found) = ty
				.declared_methods()
				.iter()
				.find(|m| m.name == self.name && m.descriptor == self.descriptor && !m.is_abstract())
			{
				return Some(found);
			}
			current = ty.super_type();
		}
		None
	}
}
