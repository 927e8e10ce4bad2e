mod type_;
mod field;
mod method;
mod constant_pool;

pub use type_::{InitState, PrimitiveKind, Type, TypeKind, TypeModifiers, TypePool};
pub(crate) use type_::{InitCell, TypeData};
pub use field::{Field, FieldModifiers};
pub(crate) use field::FieldSlot;
pub use method::{ExceptionHandler, LineNumberEntry, Method, MethodCode, MethodModifiers};
pub use constant_pool::{ClassConstant, FieldRefConstant, MethodRefConstant, RuntimeConstant, RuntimeConstantPool};
