use std::hash::{Hash, Hasher};
use std::ptr::NonNull;

use crate::model::Type;
use crate::thread::Monitor;

/// Object header, laid out immediately before the instance field area in one
/// contiguous allocation. `used` is the collector's mark bit; everything
/// else is set once at allocation time and never mutated except by the
/// collector flipping `used`.
#[repr(C)]
pub(crate) struct ObjectHeader {
	pub(crate) ty: &'static Type,
	pub(crate) used: std::sync::atomic::AtomicBool,
	pub(crate) memory_size: u32,
	/// Present only on array headers; `u32::MAX` marks a plain object.
	pub(crate) array_length: u32,
	/// Every object carries its own monitor rather than a lazily-inflated
	/// one (§4.6) — simpler, and fine at this interpreter's scale.
	pub(crate) monitor: Monitor,
}

impl ObjectHeader {
	#[inline]
	pub(crate) fn is_array(&self) -> bool {
		self.array_length != u32::MAX
	}

	/// Pointer to the first byte of the instance field / element area,
	/// immediately following this header in the same allocation.
	#[inline]
	pub(crate) unsafe fn memory(&self) -> *mut u8 {
		(self as *const ObjectHeader as *mut u8).add(std::mem::size_of::<ObjectHeader>())
	}
}

/// A handle to a heap object. Equality and hashing are by pointer identity —
/// objects are never moved or copied, so two handles are "the same object"
/// iff they point at the same header, exactly like the type graph's own
/// `Type` identity.
#[derive(Copy, Clone)]
pub struct ObjectRef(pub(crate) NonNull<ObjectHeader>);

unsafe impl Send for ObjectRef {}
unsafe impl Sync for ObjectRef {}

impl ObjectRef {
	#[inline]
	pub(crate) fn header(&self) -> &ObjectHeader {
		unsafe { self.0.as_ref() }
	}

	#[inline]
	pub fn ty(&self) -> &'static Type {
		self.header().ty
	}

	#[inline]
	pub fn is_array(&self) -> bool {
		self.header().is_array()
	}

	#[inline]
	pub fn array_length(&self) -> Option<i32> {
		self.is_array().then(|| self.header().array_length as i32)
	}

	#[inline]
	pub(crate) fn memory_size(&self) -> u32 {
		self.header().memory_size
	}

	#[inline]
	pub(crate) unsafe fn field_ptr<T>(&self, offset: u32) -> *mut T {
		self.header().memory().add(offset as usize) as *mut T
	}

	#[inline]
	pub unsafe fn read_field<T: Copy>(&self, offset: u32) -> T {
		*self.field_ptr::<T>(offset)
	}

	#[inline]
	pub unsafe fn write_field<T: Copy>(&self, offset: u32, value: T) {
		*self.field_ptr::<T>(offset) = value;
	}

	#[inline]
	pub(crate) fn mark_used(&self, used: bool) {
		self.header().used.store(used, std::sync::atomic::Ordering::Relaxed);
	}

	#[inline]
	pub(crate) fn is_used(&self) -> bool {
		self.header().used.load(std::sync::atomic::Ordering::Relaxed)
	}

	#[inline]
	pub(crate) fn raw(&self) -> NonNull<ObjectHeader> {
		self.0
	}

	#[inline]
	pub(crate) fn monitor(&self) -> &Monitor {
		&self.header().monitor
	}

	#[inline]
	pub(crate) fn to_raw_bits(this: Option<ObjectRef>) -> usize {
		match this {
			Some(r) => r.0.as_ptr() as usize,
			None => 0,
		}
	}

	#[inline]
	pub(crate) fn from_raw_bits(bits: usize) -> Option<ObjectRef> {
		NonNull::new(bits as *mut ObjectHeader).map(ObjectRef)
	}
}

impl Eq for ObjectRef {}

impl PartialEq for ObjectRef {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl Hash for ObjectRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.as_ptr().hash(state)
	}
}

impl std::fmt::Debug for ObjectRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "ObjectRef({:p}: {})", self.0.as_ptr(), self.ty().name())
	}
}
