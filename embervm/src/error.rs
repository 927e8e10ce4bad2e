//! Two error channels, matching the two ways this runtime can fail.
//!
//! [`Throwable`] is in-band: it is raised through the interpreter, unwound by
//! the exception-table machinery in [`crate::interp`], and recoverable by
//! guest code. [`Fault`] is out-of-band: malformed input, a broken host
//! primitive, or a programmer error in a native library. A fault terminates
//! the process; nothing in the interpreter catches it.

use std::fmt::{self, Display, Formatter};

use crate::heap::ObjectRef;

/// Result of an operation that may raise a guest-visible exception.
pub type VmResult<T> = Result<T, Throwable>;

#[derive(Debug, Clone)]
pub enum Throwable {
	/// A guest `throw` of an already-allocated exception object (including
	/// any application-defined `Throwable` subclass), as opposed to one of
	/// the variants below, which the interpreter raises itself and only
	/// materializes into a guest object lazily, the first time a `catch`
	/// handler actually needs one (§4.6, §7).
	Thrown(ObjectRef),
	Arithmetic(&'static str),
	ArrayIndexOutOfBounds { index: i32, length: i32 },
	NullPointer,
	ClassCast { from: String, to: String },
	ArrayStore { from: String, to: String },
	NegativeArraySize(i32),
	IllegalMonitorState,
	IllegalArgument(String),
	AbstractMethod(String),
	IncompatibleClassChange(String),
	Instantiation(String),
	Linkage(String),
	NoClassDefFound(String),
	NoSuchField(String),
	NoSuchMethod(String),
	OutOfMemory,
	StackOverflow,
	UnsatisfiedLink(String),
	ClassNotFound(String),
}

impl Throwable {
	/// The binary name of the guest-level exception class this throwable
	/// mirrors (`java/lang/...`-shaped, used by the loader to resolve the
	/// type when it needs to materialize a real guest object for it).
	pub fn class_name(&self) -> &'static str {
		match self {
			Throwable::Thrown(object) => object.ty().name(),
			Throwable::Arithmetic(_) => "java/lang/ArithmeticException",
			Throwable::ArrayIndexOutOfBounds { .. } => "java/lang/ArrayIndexOutOfBoundsException",
			Throwable::NullPointer => "java/lang/NullPointerException",
			Throwable::ClassCast { .. } => "java/lang/ClassCastException",
			Throwable::ArrayStore { .. } => "java/lang/ArrayStoreException",
			Throwable::NegativeArraySize(_) => "java/lang/NegativeArraySizeException",
			Throwable::IllegalMonitorState => "java/lang/IllegalMonitorStateException",
			Throwable::IllegalArgument(_) => "java/lang/IllegalArgumentException",
			Throwable::AbstractMethod(_) => "java/lang/AbstractMethodError",
			Throwable::IncompatibleClassChange(_) => "java/lang/IncompatibleClassChangeError",
			Throwable::Instantiation(_) => "java/lang/InstantiationError",
			Throwable::Linkage(_) => "java/lang/LinkageError",
			Throwable::NoClassDefFound(_) => "java/lang/NoClassDefFoundError",
			Throwable::NoSuchField(_) => "java/lang/NoSuchFieldError",
			Throwable::NoSuchMethod(_) => "java/lang/NoSuchMethodError",
			Throwable::OutOfMemory => "java/lang/OutOfMemoryError",
			Throwable::StackOverflow => "java/lang/StackOverflowError",
			Throwable::UnsatisfiedLink(_) => "java/lang/UnsatisfiedLinkError",
			Throwable::ClassNotFound(_) => "java/lang/ClassNotFoundException",
		}
	}
}

impl Display for Throwable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Throwable::Thrown(_) => write!(f, "{}", self.class_name()),
			Throwable::Arithmetic(msg) => write!(f, "{}: {msg}", self.class_name()),
			Throwable::ArrayIndexOutOfBounds { index, length } => {
				write!(f, "{}: index {index} out of bounds for length {length}", self.class_name())
			}
			Throwable::ClassCast { from, to } => write!(f, "{}: {from} cannot be cast to {to}", self.class_name()),
			Throwable::ArrayStore { from, to } => write!(f, "{}: {from} cannot be stored in an array of {to}", self.class_name()),
			Throwable::NegativeArraySize(n) => write!(f, "{}: {n}", self.class_name()),
			Throwable::IllegalArgument(msg)
			| Throwable::AbstractMethod(msg)
			| Throwable::IncompatibleClassChange(msg)
			| Throwable::Instantiation(msg)
			| Throwable::Linkage(msg)
			| Throwable::NoClassDefFound(msg)
			| Throwable::NoSuchField(msg)
			| Throwable::NoSuchMethod(msg)
			| Throwable::UnsatisfiedLink(msg)
			| Throwable::ClassNotFound(msg) => write!(f, "{}: {msg}", self.class_name()),
			_ => write!(f, "{}", self.class_name()),
		}
	}
}

impl std::error::Error for Throwable {}

/// Out-of-band, non-recoverable failure. Every variant here is fatal: the
/// CLI collaborator maps a `Fault` to a diagnostic and exit code 1.
#[derive(Debug)]
pub enum Fault {
	MalformedClass(String),
	CorruptedArchive(String),
	UnsupportedNativeAbi { library: String, version: i32 },
	DeadlockedInitializer(String),
	HostPrimitiveFailure(String),
	/// The boot-time main class could not be loaded or linked. Distinct from
	/// `MalformedClass` because the underlying cause may be a perfectly
	/// well-formed `NoClassDefFoundError`/`ClassNotFoundException` — there is
	/// simply no guest frame yet for it to be caught by (§7, §9).
	MainClassUnavailable(String),
	Io(std::io::Error),
}

impl Display for Fault {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Fault::MalformedClass(msg) => write!(f, "malformed class file: {msg}"),
			Fault::CorruptedArchive(msg) => write!(f, "corrupted archive: {msg}"),
			Fault::UnsupportedNativeAbi { library, version } => {
				write!(f, "unsupported native ABI version {version} reported by `{library}`")
			}
			Fault::DeadlockedInitializer(name) => write!(f, "deadlocked class initializer: {name}"),
			Fault::HostPrimitiveFailure(msg) => write!(f, "host primitive failure: {msg}"),
			Fault::MainClassUnavailable(msg) => write!(f, "main class unavailable: {msg}"),
			Fault::Io(err) => write!(f, "I/O error: {err}"),
		}
	}
}

impl std::error::Error for Fault {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Fault::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Fault {
	fn from(value: std::io::Error) -> Self {
		Fault::Io(value)
	}
}

impl From<zip::result::ZipError> for Fault {
	fn from(value: zip::result::ZipError) -> Self {
		match value {
			zip::result::ZipError::Io(err) => Fault::Io(err),
			other => Fault::CorruptedArchive(other.to_string()),
		}
	}
}

impl From<libloading::Error> for Fault {
	fn from(value: libloading::Error) -> Self {
		Fault::HostPrimitiveFailure(value.to_string())
	}
}
