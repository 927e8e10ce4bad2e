use std::cell::UnsafeCell;

use bitflags::bitflags;

use crate::heap::value::SlotKind;
use crate::model::Type;

bitflags! {
	#[derive(Copy, Clone, Eq, PartialEq, Debug)]
	pub struct FieldModifiers: u16 {
		const PUBLIC    = 0x0001;
		const PRIVATE   = 0x0002;
		const PROTECTED = 0x0004;
		const STATIC    = 0x0008;
		const FINAL     = 0x0010;
		const VOLATILE  = 0x0040;
		const TRANSIENT = 0x0080;
		const SYNTHETIC = 0x1000;
		const ENUM      = 0x4000;
	}
}

/// Where a field's value physically lives: instance fields are an offset
/// into the owning object's memory; static fields own a small backing
/// buffer allocated once at link time (§3, §4.3).
pub(crate) enum FieldSlot {
	Instance { offset: u32 },
	Static { storage: Box<UnsafeCell<[u8; 8]>> },
}

// `UnsafeCell<[u8; 8]>` is only ever accessed through the volatile-aware
// `read_slot`/`write_slot` helpers, which apply the same ordering
// discipline regardless of which thread holds the `Field`.
unsafe impl Sync for FieldSlot {}

pub struct Field {
	pub(crate) name: &'static str,
	pub(crate) descriptor: &'static str,
	pub(crate) modifiers: FieldModifiers,
	pub(crate) declaring_type: &'static Type,
	pub(crate) field_type: &'static Type,
	pub(crate) kind: SlotKind,
	pub(crate) slot: FieldSlot,
}

impl Field {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn descriptor(&self) -> &'static str {
		self.descriptor
	}

	pub fn modifiers(&self) -> FieldModifiers {
		self.modifiers
	}

	pub fn declaring_type(&self) -> &'static Type {
		self.declaring_type
	}

	pub fn field_type(&self) -> &'static Type {
		self.field_type
	}

	pub fn is_static(&self) -> bool {
		self.modifiers.contains(FieldModifiers::STATIC)
	}

	pub fn is_volatile(&self) -> bool {
		self.modifiers.contains(FieldModifiers::VOLATILE)
	}

	pub(crate) fn slot_kind(&self) -> SlotKind {
		self.kind
	}

	/// Byte offset into an object's memory. Panics on static fields; callers
	/// must check `is_static()` first (mirrors the teacher's `Field::offset`
	/// convention of failing loudly on a slot-kind mismatch).
	pub(crate) fn offset(&self) -> u32 {
		match &self.slot {
			FieldSlot::Instance { offset } => *offset,
			FieldSlot::Static { .. } => panic!("static field has no object offset"),
		}
	}

	pub(crate) unsafe fn static_ptr(&self) -> *mut u8 {
		match &self.slot {
			FieldSlot::Static { storage } => storage.get() as *mut u8,
			FieldSlot::Instance { .. } => panic!("instance field has no static storage"),
		}
	}
}
