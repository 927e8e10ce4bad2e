//! Bridges `ACC_NATIVE` methods to host shared libraries loaded with
//! `libloading`. There is no JNI here — native functions are called through
//! a single fixed C ABI rather than per-signature generated glue, which is
//! enough for an embedding host to provide the handful of primitives the
//! bootstrap classes need (`System.currentTimeMillis`, `Thread.sleep`, raw
//! I/O, ...) without a code generator (§5.e, §9).

use std::ffi::c_void;
use std::path::Path;
use std::sync::Mutex;

use libloading::Library;

use crate::error::{Fault, Throwable, VmResult};
use crate::heap::Value;
use crate::model::Method;
use crate::runtime::Runtime;
use crate::thread::Thread;

/// The one native function shape this runtime calls: the raw argument slots
/// (`this` first for instance methods, exactly as the interpreter already
/// lays them out) plus the calling `Runtime`/`Thread`, and a single `Value`
/// back. A `void`-returning native's result is simply ignored by the caller.
pub(crate) type NativeFn = unsafe extern "C" fn(runtime: *const Runtime, thread: *const Thread, args: *const Value, arg_count: usize) -> Value;

pub(crate) struct NativeRegistry {
	libraries: Mutex<Vec<Library>>,
}

impl NativeRegistry {
	pub(crate) fn new() -> Self {
		Self { libraries: Mutex::new(Vec::new()) }
	}

	/// Loads a shared library and keeps it mapped for the lifetime of the
	/// runtime; every native method lookup searches loaded libraries in
	/// load order, first match wins.
	pub(crate) fn load_library(&self, path: &Path) -> Result<(), Fault> {
		let library = unsafe { Library::new(path) }.map_err(|e| Fault::HostPrimitiveFailure(e.to_string()))?;
		self.libraries.lock().unwrap().push(library);
		Ok(())
	}

	pub(crate) fn invoke(&self, runtime: &Runtime, thread: &Thread, method: &'static Method, args: &[Value]) -> VmResult<Value> {
		let ptr = match method.native_ptr() {
			Some(ptr) => ptr,
			None => {
				let resolved = self.resolve(method)?;
				method.bind_native(resolved as *mut c_void);
				resolved
			}
		};
		let func: NativeFn = unsafe { std::mem::transmute(ptr) };
		Ok(unsafe { func(runtime, thread, args.as_ptr(), args.len()) })
	}

	fn resolve(&self, method: &Method) -> VmResult<*const c_void> {
		let symbol = mangled_symbol(method);
		let libraries = self.libraries.lock().unwrap();
		for library in libraries.iter() {
			let found = unsafe { library.get::<NativeFn>(symbol.as_bytes()) };
			if let Ok(func) = found {
				return Ok(*func as usize as *const c_void);
			}
		}
		Err(Throwable::UnsatisfiedLink(symbol))
	}
}

unsafe impl Send for NativeRegistry {}
unsafe impl Sync for NativeRegistry {}

/// `Java_<binary class name with `/` replaced by `_`>_<method name>`, the
/// same convention real JNI uses minus the descriptor-based overload
/// suffix (this runtime has no overload resolution ambiguity to break a
/// tie on, since `Method` identity already comes from the constant pool).
fn mangled_symbol(method: &Method) -> String {
	format!("Java_{}_{}", method.declaring_type().name().replace('/', "_"), method.name())
}
