//! Wires every subsystem together behind one `Arc<Runtime>`: the type pool,
//! heap, collector, thread registry, interned-string pool, class loader and
//! native-library registry all live here, reached from the interpreter and
//! from `crate::natives` through `&Runtime` (§5).

use std::cell::RefCell;
use std::sync::Arc;
use std::thread::Builder;
use std::time::Duration;

use crate::classpath::Classpath;
use crate::config::Config;
use crate::error::{Fault, Throwable, VmResult};
use crate::heap::{write_slot, GarbageCollector, Heap, ObjectRef, SlotKind, Value};
use crate::loader::Loader;
use crate::model::TypePool;
use crate::natives::NativeRegistry;
use crate::strings::StringPool;
use crate::thread::{Thread, ThreadList};

/// How often the background collector thread wakes up to check
/// `GarbageCollector::should_run_cycle` (§4.5, §5.d). The collector's own
/// allocation-count/elapsed-time gate decides whether a wake-up actually
/// does anything.
const GC_POLL_INTERVAL: Duration = Duration::from_millis(50);

thread_local! {
	static CURRENT_THREAD: RefCell<Option<Arc<Thread>>> = const { RefCell::new(None) };
}

pub struct Runtime {
	config: Config,
	types: TypePool,
	heap: Heap,
	gc: GarbageCollector,
	threads: ThreadList,
	strings: StringPool,
	loader: Loader,
	natives: NativeRegistry,
}

impl Runtime {
	/// Default heap budget when nothing else configures one; not exposed as
	/// a tuning knob, just a ceiling generous enough for this interpreter's
	/// own workloads.
	const DEFAULT_HEAP_BYTES: usize = 64 * 1024 * 1024;

	/// Boots a fresh runtime: opens the classpath, constructs every
	/// subsystem, and starts the background collector/finalizer thread.
	/// Does not load or run the main class — see [`Runtime::run_main`].
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn boot(config: Config) -> Result<Arc<Self>, Fault> {
		let classpath = Classpath::open(&config.classpath)?;
		let runtime = Arc::new(Self {
			types: TypePool::new(),
			heap: Heap::new(Self::DEFAULT_HEAP_BYTES),
			gc: GarbageCollector::new(),
			threads: ThreadList::new(),
			strings: StringPool::new(),
			loader: Loader::new(classpath),
			natives: NativeRegistry::new(),
			config,
		});
		spawn_gc_thread(Arc::clone(&runtime));
		Ok(runtime)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub(crate) fn types(&self) -> &TypePool {
		&self.types
	}

	pub(crate) fn heap(&self) -> &Heap {
		&self.heap
	}

	pub(crate) fn gc(&self) -> &GarbageCollector {
		&self.gc
	}

	pub(crate) fn threads(&self) -> &ThreadList {
		&self.threads
	}

	pub(crate) fn strings(&self) -> &StringPool {
		&self.strings
	}

	pub(crate) fn loader(&self) -> &Loader {
		&self.loader
	}

	pub(crate) fn natives(&self) -> &NativeRegistry {
		&self.natives
	}

	/// Maps a host shared library so its exported `Java_...` symbols become
	/// visible to `ACC_NATIVE` method dispatch (§5.e). Intended to be called
	/// by the embedding launcher before [`Runtime::run_main`].
	pub fn load_native_library(&self, path: &std::path::Path) -> Result<(), Fault> {
		self.natives.load_library(path)
	}

	pub(crate) fn exceptions(&self) -> ExceptionFactory {
		ExceptionFactory
	}

	/// The `Thread` registered for whichever OS thread is calling in,
	/// lazily creating and registering one the first time a given OS thread
	/// ever reaches the interpreter (the main thread included) — §4.5,
	/// §4.6.
	pub(crate) fn current_thread(&self) -> Arc<Thread> {
		CURRENT_THREAD.with(|cell| {
			if let Some(existing) = cell.borrow().clone() {
				return existing;
			}
			let name = std::thread::current().name().unwrap_or("thread").to_string();
			let thread = Thread::new(name, false);
			self.threads.register(Arc::clone(&thread));
			*cell.borrow_mut() = Some(Arc::clone(&thread));
			thread
		})
	}

	/// Loads and runs the configured main class's `main(String[])` on the
	/// calling thread, to completion.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(main_class = %self.config.main_class)))]
	pub fn run_main(self: &Arc<Self>) -> VmResult<()> {
		let main_class = self
			.loader
			.load_main_class(self, &self.config.main_class)
			.map_err(|fault| Throwable::Linkage(fault.to_string()))?;
		self.loader.ensure_initialized(self, main_class)?;
		let method = main_class
			.declared_methods()
			.iter()
			.find(|m| m.name() == "main" && m.descriptor() == "([Ljava/lang/String;)V" && m.is_static())
			.ok_or_else(|| Throwable::NoSuchMethod(format!("{}.main([Ljava/lang/String;)V", main_class.name())))?;

		let args_array = self.build_args_array()?;
		let thread = self.current_thread();
		crate::interp::execute(self, &thread, method, &[Value::Reference(Some(args_array))])?;
		Ok(())
	}

	fn build_args_array(&self) -> VmResult<ObjectRef> {
		let string_ty = self.loader.load_class(self, "java/lang/String")?;
		let array_ty = self.types.get_array(string_ty);
		let array = self.heap.allocate_array(array_ty, self.config.args.len() as i32)?;
		for (i, arg) in self.config.args.iter().enumerate() {
			let value = self.strings.intern_str(self, arg)?;
			let ptr = unsafe { array.field_ptr::<u8>(i as u32 * SlotKind::Reference.size()) };
			unsafe { write_slot(ptr, SlotKind::Reference, false, Value::Reference(Some(value))) };
		}
		Ok(array)
	}
}

fn spawn_gc_thread(runtime: Arc<Runtime>) {
	Builder::new()
		.name("vm-gc".into())
		.spawn(move || loop {
			std::thread::sleep(GC_POLL_INTERVAL);
			if runtime.gc.should_run_cycle() {
				runtime.gc.run_cycle(&runtime.heap, &runtime.threads);
			}
			while let Some(object) = runtime.gc.next_pending_finalization() {
				run_finalizer(&runtime, object);
			}
		})
		.expect("failed to spawn GC thread");
}

/// Walks the super chain for `finalize()V`, matching `heap::gc::has_finalizer`'s
/// virtual lookup — a subtype that inherits rather than redeclares `finalize`
/// still runs its ancestor's override.
fn find_finalizer(object: ObjectRef) -> Option<&'static crate::model::Method> {
	let mut current = Some(object.ty());
	while let Some(ty) = current {
		if let Some(found) = ty.declared_methods().iter().find(|m| m.name() == "finalize" && m.descriptor() == "()V") {
			return Some(found);
		}
		current = ty.super_type();
	}
	None
}

fn run_finalizer(runtime: &Runtime, object: ObjectRef) {
	if let Some(method) = find_finalizer(object) {
		let thread = runtime.current_thread();
		let _ = crate::interp::execute(runtime, &thread, method, &[Value::Reference(Some(object))]);
	}
	unsafe { runtime.heap.deallocate(object.raw()) };
}

/// Builds the guest exception object for a native-raised `Throwable`, only
/// once a handler is actually found (§4.6, §7) — a zero-sized handle rather
/// than a field on `Runtime`, since every method it needs already lives on
/// the `Runtime` it's handed.
pub(crate) struct ExceptionFactory;

impl ExceptionFactory {
	pub(crate) fn instantiate(&self, runtime: &Runtime, thrown: Throwable) -> VmResult<ObjectRef> {
		let class_name = thrown.class_name();
		let ty = runtime.loader.load_class(runtime, class_name)?;
		runtime.loader.ensure_initialized(runtime, ty)?;
		let object = runtime.heap.allocate_object(ty)?;

		let ctor = ty.declared_methods().iter().find(|m| m.name() == "<init>" && m.descriptor() == "(Ljava/lang/String;)V");
		if let Some(ctor) = ctor {
			let message = runtime.strings.intern_str(runtime, &thrown.to_string())?;
			let thread = runtime.current_thread();
			crate::interp::execute(runtime, &thread, ctor, &[Value::Reference(Some(object)), Value::Reference(Some(message))])?;
		}
		Ok(object)
	}
}
