use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::collections::ObjectList;
use crate::error::{Throwable, VmResult};
use crate::heap::object::ObjectHeader;
use crate::heap::ObjectRef;
use crate::model::Type;

/// Owns every live allocation and the byte budget it counts against. One
/// `Heap` per runtime; shared by every interpreter thread and the collector
/// thread through `&Heap` (§4.5, §5.d).
pub(crate) struct Heap {
	objects: ObjectList<ObjectHeader>,
	used_bytes: std::sync::atomic::AtomicUsize,
	max_bytes: usize,
}

impl Heap {
	pub(crate) fn new(max_bytes: usize) -> Self {
		Self {
			objects: ObjectList::new(),
			used_bytes: std::sync::atomic::AtomicUsize::new(0),
			max_bytes,
		}
	}

	pub(crate) fn used_bytes(&self) -> usize {
		self.used_bytes.load(std::sync::atomic::Ordering::Relaxed)
	}

	pub(crate) fn object_count(&self) -> usize {
		self.objects.len()
	}

	fn layout_for(total_size: usize) -> Layout {
		Layout::from_size_align(
			std::mem::size_of::<ObjectHeader>() + total_size,
			std::mem::align_of::<ObjectHeader>(),
		)
		.expect("object layout overflow")
	}

	/// Shared implementation for both plain objects and arrays: reserves
	/// `total_size` bytes of the heap budget, allocates a header-prefixed
	/// block, zero-initializes it (every primitive field/slot defaults to
	/// zero, every reference slot to null, per §4.1), and registers it with
	/// the collector's object list.
	unsafe fn allocate(&self, ty: &'static Type, total_size: u32, array_length: u32) -> VmResult<ObjectRef> {
		let layout = Self::layout_for(total_size as usize);
		let reserved = layout.size();

		loop {
			let current = self.used_bytes.load(std::sync::atomic::Ordering::Relaxed);
			let next = current.checked_add(reserved).ok_or(Throwable::OutOfMemory)?;
			if next > self.max_bytes {
				return Err(Throwable::OutOfMemory);
			}
			if self
				.used_bytes
				.compare_exchange_weak(
					current,
					next,
					std::sync::atomic::Ordering::AcqRel,
					std::sync::atomic::Ordering::Relaxed,
				)
				.is_ok()
			{
				break;
			}
		}

		let ptr = alloc_zeroed(layout);
		let Some(ptr) = NonNull::new(ptr as *mut ObjectHeader) else {
			self.used_bytes.fetch_sub(reserved, std::sync::atomic::Ordering::Relaxed);
			return Err(Throwable::OutOfMemory);
		};

		ptr.as_ptr().write(ObjectHeader {
			ty,
			used: std::sync::atomic::AtomicBool::new(false),
			memory_size: total_size,
			array_length,
			monitor: crate::thread::Monitor::new(),
		});

		self.objects.add(ptr);
		Ok(ObjectRef(ptr))
	}

	pub(crate) fn allocate_object(&self, ty: &'static Type) -> VmResult<ObjectRef> {
		debug_assert!(!ty.is_array() && !ty.is_primitive());
		unsafe { self.allocate(ty, ty.object_size(), u32::MAX) }
	}

	/// Allocates an array of `length` elements of `component`'s type. The
	/// element area stride is `component.type_size()`, exactly like a
	/// field's slot width (§3 "array component type").
	pub(crate) fn allocate_array(&self, array_type: &'static Type, length: i32) -> VmResult<ObjectRef> {
		if length < 0 {
			return Err(Throwable::NegativeArraySize(length));
		}
		let component = array_type.component_type().expect("array type without component");
		let element_size = component.type_size() as u64;
		let total_size = element_size
			.checked_mul(length as u64)
			.and_then(|n| u32::try_from(n).ok())
			.ok_or(Throwable::OutOfMemory)?;
		unsafe { self.allocate(array_type, total_size, length as u32) }
	}

	/// Reclaims a single dead object: runs before the header is unmapped by
	/// the collector, so `size` must be read out first.
	pub(crate) unsafe fn deallocate(&self, header: NonNull<ObjectHeader>) {
		let size = header.as_ref().memory_size;
		let layout = Self::layout_for(size as usize);
		self.used_bytes.fetch_sub(layout.size(), std::sync::atomic::Ordering::Relaxed);
		dealloc(header.as_ptr() as *mut u8, layout);
	}

	pub(crate) fn objects(&self) -> &ObjectList<ObjectHeader> {
		&self.objects
	}
}

unsafe impl Send for Heap {}
unsafe impl Sync for Heap {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{PrimitiveKind, TypePool};

	#[test]
	fn allocate_array_zero_length_ok() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(PrimitiveKind::Int);
		let array_ty = pool.get_array(int_ty);
		let heap = Heap::new(1 << 20);
		let array = heap.allocate_array(array_ty, 0).unwrap();
		assert_eq!(array.array_length(), Some(0));
	}

	#[test]
	fn allocate_array_negative_length_throws() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(PrimitiveKind::Int);
		let array_ty = pool.get_array(int_ty);
		let heap = Heap::new(1 << 20);
		let err = heap.allocate_array(array_ty, -1).unwrap_err();
		assert!(matches!(err, Throwable::NegativeArraySize(-1)));
	}

	#[test]
	fn allocate_beyond_budget_throws_out_of_memory() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(PrimitiveKind::Int);
		let array_ty = pool.get_array(int_ty);
		let heap = Heap::new(16);
		let err = heap.allocate_array(array_ty, 1 << 20).unwrap_err();
		assert!(matches!(err, Throwable::OutOfMemory));
	}
}
