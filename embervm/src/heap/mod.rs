mod alloc;
mod gc;
mod object;
mod value;

pub use object::ObjectRef;
pub(crate) use object::ObjectHeader;
pub(crate) use value::{read_slot, write_slot, SlotKind, Value};
pub(crate) use alloc::Heap;
pub(crate) use gc::GarbageCollector;
