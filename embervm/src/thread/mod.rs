mod monitor;

pub(crate) use monitor::Monitor;

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::heap::{ObjectRef, Value};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ThreadState {
	New,
	Runnable,
	Blocked,
	Waiting,
	TimedWaiting,
	Terminated,
}

/// A live frame's locals/operand-stack storage, as seen by the collector's
/// root scan (§4.5). `locals_len` is fixed for the frame's lifetime, but
/// the operand stack's occupied length is read through `operands_len`
/// *at scan time* — it changes as the owning thread executes, and the
/// backing buffer is fixed-capacity so the pointer itself stays valid
/// throughout.
struct FrameRoots {
	locals: *const Value,
	locals_len: usize,
	operands: *const Value,
	operands_len: *const AtomicUsize,
}

unsafe impl Send for FrameRoots {}

/// RAII guard returned by `Thread::enter_frame`: pops the frame's root
/// registration on drop, including on unwind through a thrown exception.
pub(crate) struct FrameRootsGuard<'t> {
	thread: &'t Thread,
}

impl Drop for FrameRootsGuard<'_> {
	fn drop(&mut self) {
		self.thread.frames.lock().unwrap().pop();
	}
}

pub struct Thread {
	pub(crate) id: std::thread::ThreadId,
	pub(crate) name: String,
	pub(crate) daemon: bool,
	state: Mutex<ThreadState>,
	frames: Mutex<Vec<FrameRoots>>,
	pub(crate) interrupted: Cell<bool>,
	/// The mirror object returned by `Thread.currentThread()`, set once the
	/// guest-visible `Thread` instance for this native thread exists.
	mirror: Mutex<Option<ObjectRef>>,
}

unsafe impl Sync for Thread {}

impl Thread {
	pub(crate) fn new(name: String, daemon: bool) -> Arc<Self> {
		Arc::new(Self {
			id: std::thread::current().id(),
			name,
			daemon,
			state: Mutex::new(ThreadState::New),
			frames: Mutex::new(Vec::new()),
			interrupted: Cell::new(false),
			mirror: Mutex::new(None),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_daemon(&self) -> bool {
		self.daemon
	}

	pub fn state(&self) -> ThreadState {
		*self.state.lock().unwrap()
	}

	pub(crate) fn set_state(&self, state: ThreadState) {
		*self.state.lock().unwrap() = state;
	}

	pub fn mirror(&self) -> Option<ObjectRef> {
		*self.mirror.lock().unwrap()
	}

	pub(crate) fn set_mirror(&self, object: ObjectRef) {
		*self.mirror.lock().unwrap() = Some(object);
	}

	/// Registers a frame's locals/operand-stack storage as GC roots for the
	/// lifetime of the returned guard. `locals` and the fixed stack's
	/// backing buffer must not move or be freed (i.e. the frame must
	/// outlive the guard).
	pub(crate) fn enter_frame(&self, locals: &[Value], operands: &crate::collections::FixedStack<Value>) -> FrameRootsGuard<'_> {
		self.frames.lock().unwrap().push(FrameRoots {
			locals: locals.as_ptr(),
			locals_len: locals.len(),
			operands: operands.data_ptr(),
			operands_len: operands.size_ptr(),
		});
		FrameRootsGuard { thread: self }
	}

	fn collect_roots_into(&self, out: &mut Vec<ObjectRef>) {
		let frames = self.frames.lock().unwrap();
		for frame in frames.iter() {
			let locals = unsafe { std::slice::from_raw_parts(frame.locals, frame.locals_len) };
			let operands_len = unsafe { (*frame.operands_len).load(Ordering::Relaxed) };
			let operands = unsafe { std::slice::from_raw_parts(frame.operands, operands_len) };
			for value in locals.iter().chain(operands.iter()) {
				if let Value::Reference(Some(obj)) = value {
					out.push(*obj);
				}
			}
		}
		if let Some(mirror) = *self.mirror.lock().unwrap() {
			out.push(mirror);
		}
	}
}

impl std::fmt::Debug for Thread {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Thread({:?}, {:?})", self.name, self.state())
	}
}

/// Global registry of every live thread, consulted by the collector's mark
/// phase root scan (§4.5) and by `Thread.getAllStackTraces`-style queries.
pub(crate) struct ThreadList {
	threads: Mutex<Vec<Arc<Thread>>>,
}

impl ThreadList {
	pub(crate) fn new() -> Self {
		Self { threads: Mutex::new(Vec::new()) }
	}

	pub(crate) fn register(&self, thread: Arc<Thread>) {
		self.threads.lock().unwrap().push(thread);
	}

	pub(crate) fn unregister(&self, id: std::thread::ThreadId) {
		self.threads.lock().unwrap().retain(|t| t.id != id);
	}

	pub(crate) fn len(&self) -> usize {
		self.threads.lock().unwrap().len()
	}

	pub(crate) fn collect_roots(&self) -> Vec<ObjectRef> {
		let threads = self.threads.lock().unwrap();
		let mut roots = Vec::new();
		for thread in threads.iter() {
			thread.collect_roots_into(&mut roots);
		}
		roots
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collections::FixedStack;
	use crate::heap::Heap;
	use crate::model::TypePool;

	#[test]
	fn collect_roots_into_finds_locals_and_live_operands_but_not_popped_ones() {
		let pool = TypePool::new();
		let object_ty = pool.get_primitive(crate::model::PrimitiveKind::Int);
		let array_ty = pool.get_array(object_ty);
		let heap = Heap::new(1 << 20);
		let a = heap.allocate_array(array_ty, 0).unwrap();
		let b = heap.allocate_array(array_ty, 0).unwrap();
		let c = heap.allocate_array(array_ty, 0).unwrap();

		let locals = [Value::Reference(Some(a)), Value::Int(0)];
		let mut operands: FixedStack<Value> = FixedStack::new(4);
		operands.push(Value::Reference(Some(b)));
		operands.push(Value::Reference(Some(c)));
		operands.pop();

		let thread = Thread::new("main".to_string(), false);
		let guard = thread.enter_frame(&locals, &operands);

		let mut roots = Vec::new();
		thread.collect_roots_into(&mut roots);

		assert_eq!(roots, vec![a, b]);
		drop(guard);

		let mut roots_after_drop = Vec::new();
		thread.collect_roots_into(&mut roots_after_drop);
		assert!(roots_after_drop.is_empty(), "frame roots must vanish once the guard is dropped");
	}

	#[test]
	fn thread_list_collect_roots_aggregates_every_registered_thread() {
		let pool = TypePool::new();
		let int_ty = pool.get_primitive(crate::model::PrimitiveKind::Int);
		let array_ty = pool.get_array(int_ty);
		let heap = Heap::new(1 << 20);
		let a = heap.allocate_array(array_ty, 0).unwrap();
		let b = heap.allocate_array(array_ty, 0).unwrap();

		let locals_a = [Value::Reference(Some(a))];
		let locals_b = [Value::Reference(Some(b))];
		let empty_operands: FixedStack<Value> = FixedStack::new(1);

		let thread_a = Thread::new("a".to_string(), false);
		let thread_b = Thread::new("b".to_string(), false);
		let _guard_a = thread_a.enter_frame(&locals_a, &empty_operands);
		let _guard_b = thread_b.enter_frame(&locals_b, &empty_operands);

		let list = ThreadList::new();
		list.register(thread_a.clone());
		list.register(thread_b.clone());
		assert_eq!(list.len(), 2);

		let mut roots = list.collect_roots();
		roots.sort_by_key(|r| r.raw());
		let mut expected = vec![a, b];
		expected.sort_by_key(|r| r.raw());
		assert_eq!(roots, expected);

		list.unregister(thread_a.id);
		assert_eq!(list.len(), 1);
	}
}
