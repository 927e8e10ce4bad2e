use std::sync::Mutex;

use fxhash::FxHashMap;

use crate::heap::ObjectRef;

/// Maps a decoded code-unit sequence to the single `java.lang.String` mirror
/// shared by every class file `CONSTANT_String` entry and `String.intern()`
/// call that names it (§3 "Interned string pool"). One pool per runtime,
/// guarded by its own mutex rather than the loader's, since interning can
/// happen well after a class has finished loading.
pub(crate) struct StringPool {
	entries: Mutex<FxHashMap<Vec<u16>, ObjectRef>>,
}

impl StringPool {
	pub(crate) fn new() -> Self {
		Self { entries: Mutex::new(FxHashMap::default()) }
	}

	/// Returns the existing mirror for `units`, if one has already been
	/// interned.
	pub(crate) fn get(&self, units: &[u16]) -> Option<ObjectRef> {
		self.entries.lock().unwrap().get(units).copied()
	}

	/// Interns `units`, calling `make` to allocate a fresh `String` object
	/// only on the first occurrence. `make` runs under the pool's lock, so
	/// it must not attempt to intern another string itself.
	pub(crate) fn get_or_intern(&self, units: &[u16], make: impl FnOnce() -> crate::error::VmResult<ObjectRef>) -> crate::error::VmResult<ObjectRef> {
		let mut entries = self.entries.lock().unwrap();
		if let Some(existing) = entries.get(units) {
			return Ok(*existing);
		}
		let object = make()?;
		entries.insert(units.to_vec(), object);
		Ok(object)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.lock().unwrap().len()
	}

	/// Interns a host `&str`, constructing the backing `java.lang.String`
	/// guest object (a `char[]` `value` field, UTF-16 encoded) only the
	/// first time this exact code unit sequence is seen (§3 "interned
	/// string pool", §4.3 `CONSTANT_String`).
	pub(crate) fn intern_str(&self, runtime: &crate::runtime::Runtime, s: &str) -> crate::error::VmResult<ObjectRef> {
		let units: Vec<u16> = s.encode_utf16().collect();
		if let Some(existing) = self.get(&units) {
			return Ok(existing);
		}
		let object = Self::make_string(runtime, &units)?;
		self.get_or_intern(&units, || Ok(object))
	}

	fn make_string(runtime: &crate::runtime::Runtime, units: &[u16]) -> crate::error::VmResult<ObjectRef> {
		use crate::heap::{write_slot, SlotKind, Value};
		use crate::model::PrimitiveKind;

		let string_ty = runtime.loader().load_class(runtime, "java/lang/String")?;
		runtime.loader().ensure_initialized(runtime, string_ty)?;

		let char_ty = runtime.types().get_primitive(PrimitiveKind::Char);
		let array_ty = runtime.types().get_array(char_ty);
		let array = runtime.heap().allocate_array(array_ty, units.len() as i32)?;
		for (i, unit) in units.iter().enumerate() {
			let ptr = unsafe { array.field_ptr::<u8>(i as u32 * SlotKind::Char.size()) };
			unsafe { write_slot(ptr, SlotKind::Char, false, Value::Int(*unit as i32)) };
		}

		let object = runtime.heap().allocate_object(string_ty)?;
		let value_field = string_ty
			.declared_fields()
			.iter()
			.find(|f| f.name() == "value")
			.ok_or_else(|| crate::error::Throwable::NoSuchField("java/lang/String.value".into()))?;
		let ptr = unsafe { object.field_ptr::<u8>(value_field.offset()) };
		unsafe { write_slot(ptr, SlotKind::Reference, false, Value::Reference(Some(array))) };
		Ok(object)
	}
}
