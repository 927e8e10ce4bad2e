use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::heap::{Heap, ObjectRef};
use crate::thread::ThreadList;

/// Minimum interval between automatic collection cycles, and the minimum
/// number of new allocations that must have happened since the last cycle
/// before an automatic one is considered (§5.d). A collection can still be
/// forced (`System.gc()`-equivalent) regardless of either threshold.
const MIN_CYCLE_INTERVAL: Duration = Duration::from_millis(250);
const MIN_ALLOCATIONS_PER_CYCLE: usize = 100;

/// Mark-and-sweep collector plus the finalization queue it feeds. Runs on
/// its own background thread, pausing application threads only for the
/// (short) mark phase root scan, matching the concurrent design in §4.5.
pub(crate) struct GarbageCollector {
	finalization_queue: Mutex<VecDeque<ObjectRef>>,
	allocations_since_cycle: std::sync::atomic::AtomicUsize,
	last_cycle: Mutex<Instant>,
}

impl GarbageCollector {
	pub(crate) fn new() -> Self {
		Self {
			finalization_queue: Mutex::new(VecDeque::new()),
			allocations_since_cycle: std::sync::atomic::AtomicUsize::new(0),
			last_cycle: Mutex::new(Instant::now()),
		}
	}

	pub(crate) fn note_allocation(&self) {
		self.allocations_since_cycle.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
	}

	/// Gate for the background collector thread's polling loop: only start
	/// a cycle once both the minimum interval has elapsed and enough
	/// allocations have accumulated to make one worthwhile (§5.d). A forced
	/// collection bypasses this and calls `run_cycle` directly.
	pub(crate) fn should_run_cycle(&self) -> bool {
		let enough_allocations =
			self.allocations_since_cycle.load(std::sync::atomic::Ordering::Relaxed) >= MIN_ALLOCATIONS_PER_CYCLE;
		let enough_time = self.last_cycle.lock().unwrap().elapsed() >= MIN_CYCLE_INTERVAL;
		enough_allocations && enough_time
	}

	/// One mark-and-sweep cycle: every live thread's frames are walked for
	/// reference-tagged locals/operand-stack slots (the root set, §4.5),
	/// every reachable object is transitively marked, then every unmarked
	/// object is either queued for finalization (if its type declares
	/// `finalize`) or immediately deallocated. Mark and sweep run under one
	/// continuously held heap-list lock (`ObjectList::collect_and_sweep`),
	/// so an allocation racing the cycle is never swept before a root gets
	/// the chance to reach it.
	pub(crate) fn run_cycle(&self, heap: &Heap, threads: &ThreadList) {
		let roots = threads.collect_roots();
		let mut finalized = Vec::new();

		heap.objects().collect_and_sweep(
			|objects| {
				for &header in objects {
					unsafe { header.as_ref().used.store(false, std::sync::atomic::Ordering::Relaxed) };
				}
				let mut stack = roots;
				while let Some(obj) = stack.pop() {
					if obj.is_used() {
						continue;
					}
					obj.mark_used(true);
					self.push_children(obj, &mut stack);
				}
			},
			|header| unsafe { header.as_ref().used.load(std::sync::atomic::Ordering::Relaxed) },
			|header| {
				let object = ObjectRef::from_raw_bits(header.as_ptr() as usize).unwrap();
				if Self::has_finalizer(&object) {
					finalized.push(object);
				} else {
					unsafe { heap.deallocate(header) };
				}
			},
		);

		self.allocations_since_cycle.store(0, std::sync::atomic::Ordering::Relaxed);
		*self.last_cycle.lock().unwrap() = Instant::now();

		let mut queue = self.finalization_queue.lock().unwrap();
		queue.extend(finalized);
	}

	/// Whether `object`'s runtime type (or any ancestor) declares
	/// `finalize()V` — a virtual lookup up the super chain, not a check of
	/// the exact runtime type's own declared methods, so a subtype that does
	/// not redeclare an inherited `finalize` is still finalized (§4.7).
	fn has_finalizer(object: &ObjectRef) -> bool {
		let mut current = Some(object.ty());
		while let Some(ty) = current {
			if ty.declared_methods().iter().any(|m| m.name() == "finalize" && m.descriptor() == "()V") {
				return true;
			}
			current = ty.super_type();
		}
		false
	}

	/// Pushes every reference-shaped field/element of `obj` onto the mark
	/// stack. Arrays of a reference component type are walked element by
	/// element; arrays of primitives and plain objects with no reference
	/// fields contribute no children.
	fn push_children(&self, obj: ObjectRef, stack: &mut Vec<ObjectRef>) {
		use crate::heap::{read_slot, SlotKind};

		if obj.is_array() {
			let ty = obj.ty();
			let Some(component) = ty.component_type() else { return };
			if component.is_primitive() {
				return;
			}
			let length = obj.array_length().unwrap_or(0) as u32;
			let stride = component.type_size();
			for i in 0..length {
				let offset = i * stride;
				let ptr = unsafe { obj.field_ptr::<u8>(offset) };
				if let crate::heap::Value::Reference(Some(child)) = unsafe { read_slot(ptr, SlotKind::Reference, false) } {
					stack.push(child);
				}
			}
			return;
		}

		let mut current = Some(obj.ty());
		while let Some(ty) = current {
			for field in ty.declared_fields() {
				if field.is_static() || field.slot_kind() != SlotKind::Reference {
					continue;
				}
				let ptr = unsafe { obj.field_ptr::<u8>(field.offset()) };
				if let crate::heap::Value::Reference(Some(child)) = unsafe { read_slot(ptr, SlotKind::Reference, field.is_volatile()) } {
					stack.push(child);
				}
			}
			current = ty.super_type();
		}
	}

	/// Pops the next finalizer-pending object, if any, for the finalizer
	/// thread to run `finalize()` on and then hand back for deallocation.
	pub(crate) fn next_pending_finalization(&self) -> Option<ObjectRef> {
		self.finalization_queue.lock().unwrap().pop_front()
	}

	pub(crate) fn finalization_queue_len(&self) -> usize {
		self.finalization_queue.lock().unwrap().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn should_run_cycle_requires_both_enough_allocations_and_elapsed_time() {
		let gc = GarbageCollector::new();
		assert!(!gc.should_run_cycle(), "fresh collector has neither allocations nor elapsed time");

		for _ in 0..MIN_ALLOCATIONS_PER_CYCLE {
			gc.note_allocation();
		}
		assert!(!gc.should_run_cycle(), "allocation threshold alone is not enough before the interval elapses");

		*gc.last_cycle.lock().unwrap() = Instant::now() - MIN_CYCLE_INTERVAL;
		assert!(gc.should_run_cycle(), "both thresholds satisfied should allow a cycle");
	}

	#[test]
	fn should_run_cycle_false_with_elapsed_time_but_too_few_allocations() {
		let gc = GarbageCollector::new();
		*gc.last_cycle.lock().unwrap() = Instant::now() - MIN_CYCLE_INTERVAL;
		gc.note_allocation();
		assert!(!gc.should_run_cycle());
	}
}
