mod frame;
mod opcodes;

use frame::Frame;

use crate::error::{Throwable, VmResult};
use crate::heap::{read_slot, write_slot, ObjectRef, SlotKind, Value};
use crate::model::{Method, RuntimeConstant, Type};
use crate::runtime::Runtime;
use crate::thread::Thread;

/// Runs `method` to completion on `thread`, with `args` already converted to
/// `Value` slots in left-to-right parameter order (`this` first, for
/// instance methods). Returns the method's result, or propagates a thrown
/// exception that no handler in this call chain caught (§4.5, §4.6).
///
/// Native methods are dispatched through [`crate::natives`] instead of
/// interpreted; this function is only ever called with a method that has a
/// `Code` attribute.
pub(crate) fn execute(runtime: &Runtime, thread: &Thread, method: &'static Method, args: &[Value]) -> VmResult<Value> {
	if method.is_native() {
		return runtime.natives().invoke(runtime, thread, method, args);
	}
	if method.is_abstract() {
		return Err(Throwable::AbstractMethod(format!("{}.{}{}", method.declaring_type().name(), method.name(), method.descriptor())));
	}

	let _monitor_guard = match method.is_synchronized() {
		true => Some(enter_method_monitor(runtime, method, args)?),
		false => None,
	};

	let mut frame = Frame::new(method, args);
	let _roots = thread.enter_frame(&frame.locals, &frame.stack);

	loop {
		let at_pc = frame.pc;
		let op = frame.fetch_u8();
		match run_one(runtime, thread, &mut frame, op) {
			Ok(Some(result)) => return Ok(result),
			Ok(None) => continue,
			Err(thrown) => match dispatch_exception(runtime, &mut frame, at_pc, thrown) {
				Ok((handler_pc, exception)) => {
					frame.stack.clear();
					frame.push(Value::Reference(Some(exception)));
					frame.pc = handler_pc as usize;
				}
				Err(propagated) => return Err(propagated),
			},
		}
	}
}

/// Acquires the monitor a `synchronized` method locks on entry: the
/// receiver for an instance method, the declaring type's `Class` mirror for
/// a static one (§4.2 "synchronized", §4.6). Released by the returned
/// guard's `Drop`, including when an exception unwinds through the call.
fn enter_method_monitor(runtime: &Runtime, method: &'static Method, args: &[Value]) -> VmResult<MonitorGuard> {
	let object = match method.is_static() {
		false => args[0].as_reference().ok_or(Throwable::NullPointer)?,
		true => runtime.loader().ensure_class_mirror(runtime, method.declaring_type())?,
	};
	object.monitor().enter();
	Ok(MonitorGuard { object })
}

struct MonitorGuard {
	object: ObjectRef,
}

impl Drop for MonitorGuard {
	fn drop(&mut self) {
		let _ = self.object.monitor().exit();
	}
}

/// Resolves the exception object a thrown value carries, materializing one
/// for a native-raised `Throwable` the first time it is needed (§4.6, §7).
fn resolve_exception_object(runtime: &Runtime, thrown: Throwable) -> VmResult<ObjectRef> {
	match thrown {
		Throwable::Thrown(object) => Ok(object),
		other => runtime.exceptions().instantiate(runtime, other),
	}
}

/// Looks up the handler for a thrown exception against the frame's
/// exception table by the *start* of the instruction that threw (`at_pc`).
/// On a match, materializes a guest exception object (only needed now that
/// a handler will actually observe it) and hands back its PC and object;
/// on no match, hands the original error straight back to the caller to
/// propagate up the call stack (§4.5, §4.6).
fn dispatch_exception(runtime: &Runtime, frame: &mut Frame, at_pc: usize, thrown: Throwable) -> Result<(u16, ObjectRef), Throwable> {
	let ty = match &thrown {
		Throwable::Thrown(object) => object.ty(),
		other => match runtime.loader().find_loaded(other.class_name()) {
			Some(ty) => ty,
			None => return Err(thrown),
		},
	};
	match frame.find_handler(at_pc, ty) {
		Some(handler_pc) => Ok((handler_pc, resolve_exception_object(runtime, thrown)?)),
		None => Err(thrown),
	}
}

macro_rules! binop {
	($frame:expr, $variant:ident, $op:tt) => {{
		let b = $frame.pop().$variant();
		let a = $frame.pop().$variant();
		$frame.push(Value::$variant(a $op b));
	}};
}

/// Runs exactly one instruction. Returns `Ok(Some(value))` on a `*return`,
/// `Ok(None)` to keep looping, or `Err` on a thrown exception for the
/// caller's unwinder to handle.
fn run_one(runtime: &Runtime, thread: &Thread, frame: &mut Frame, op: u8) -> VmResult<Option<Value>> {
	use opcodes::*;

	match op {
		NOP => {}
		ACONST_NULL => frame.push(Value::Reference(None)),
		ICONST_M1..=ICONST_5 => frame.push(Value::Int(op as i32 - ICONST_0 as i32)),
		LCONST_0 => frame.push(Value::Long(0)),
		LCONST_1 => frame.push(Value::Long(1)),
		FCONST_0 => frame.push(Value::Float(0.0)),
		FCONST_1 => frame.push(Value::Float(1.0)),
		FCONST_2 => frame.push(Value::Float(2.0)),
		DCONST_0 => frame.push(Value::Double(0.0)),
		DCONST_1 => frame.push(Value::Double(1.0)),
		BIPUSH => frame.push(Value::Int(frame.fetch_i8() as i32)),
		SIPUSH => frame.push(Value::Int(frame.fetch_i16() as i32)),
		LDC => {
			let index = frame.fetch_u8() as u16;
			frame.push(load_constant(runtime, frame.method, index)?)
		}
		LDC_W | LDC2_W => {
			let index = frame.fetch_u16();
			frame.push(load_constant(runtime, frame.method, index)?)
		}
		ILOAD | FLOAD | ALOAD => {
			let index = frame.fetch_u8() as usize;
			frame.push(frame.locals[index]);
		}
		LLOAD | DLOAD => {
			let index = frame.fetch_u8() as usize;
			frame.push(frame.locals[index]);
		}
		ILOAD_0..=ILOAD_3 => frame.push(frame.locals[(op - ILOAD_0) as usize]),
		LLOAD_0..=LLOAD_3 => frame.push(frame.locals[(op - LLOAD_0) as usize]),
		FLOAD_0..=FLOAD_3 => frame.push(frame.locals[(op - FLOAD_0) as usize]),
		DLOAD_0..=DLOAD_3 => frame.push(frame.locals[(op - DLOAD_0) as usize]),
		ALOAD_0..=ALOAD_3 => frame.push(frame.locals[(op - ALOAD_0) as usize]),
		IALOAD => array_load(frame, SlotKind::Int)?,
		LALOAD => array_load(frame, SlotKind::Long)?,
		FALOAD => array_load(frame, SlotKind::Float)?,
		DALOAD => array_load(frame, SlotKind::Double)?,
		AALOAD => array_load(frame, SlotKind::Reference)?,
		BALOAD => array_load(frame, SlotKind::Byte)?,
		CALOAD => array_load(frame, SlotKind::Char)?,
		SALOAD => array_load(frame, SlotKind::Short)?,
		ISTORE | FSTORE | ASTORE | LSTORE | DSTORE => {
			let index = frame.fetch_u8() as usize;
			frame.locals[index] = frame.pop();
		}
		ISTORE_0..=ISTORE_3 => {
			let v = frame.pop();
			frame.locals[(op - ISTORE_0) as usize] = v;
		}
		LSTORE_0..=LSTORE_3 => {
			let v = frame.pop();
			frame.locals[(op - LSTORE_0) as usize] = v;
		}
		FSTORE_0..=FSTORE_3 => {
			let v = frame.pop();
			frame.locals[(op - FSTORE_0) as usize] = v;
		}
		DSTORE_0..=DSTORE_3 => {
			let v = frame.pop();
			frame.locals[(op - DSTORE_0) as usize] = v;
		}
		ASTORE_0..=ASTORE_3 => {
			let v = frame.pop();
			frame.locals[(op - ASTORE_0) as usize] = v;
		}
		IASTORE => array_store(frame, SlotKind::Int)?,
		LASTORE => array_store(frame, SlotKind::Long)?,
		FASTORE => array_store(frame, SlotKind::Float)?,
		DASTORE => array_store(frame, SlotKind::Double)?,
		AASTORE => array_store(frame, SlotKind::Reference)?,
		BASTORE => array_store(frame, SlotKind::Byte)?,
		CASTORE => array_store(frame, SlotKind::Char)?,
		SASTORE => array_store(frame, SlotKind::Short)?,
		POP => {
			frame.pop();
		}
		POP2 => {
			frame.pop();
			frame.pop();
		}
		DUP => {
			let v = frame.peek();
			frame.push(v);
		}
		DUP_X1 => {
			let b = frame.pop();
			let a = frame.pop();
			frame.push(b);
			frame.push(a);
			frame.push(b);
		}
		DUP2 => {
			let b = frame.pop();
			let a = frame.pop();
			frame.push(a);
			frame.push(b);
			frame.push(a);
			frame.push(b);
		}
		SWAP => {
			let b = frame.pop();
			let a = frame.pop();
			frame.push(b);
			frame.push(a);
		}
		IADD => binop!(frame, Int, +),
		LADD => binop!(frame, Long, +),
		FADD => binop!(frame, Float, +),
		DADD => binop!(frame, Double, +),
		ISUB => binop!(frame, Int, -),
		LSUB => binop!(frame, Long, -),
		FSUB => binop!(frame, Float, -),
		DSUB => binop!(frame, Double, -),
		IMUL => binop!(frame, Int, *),
		LMUL => binop!(frame, Long, *),
		FMUL => binop!(frame, Float, *),
		DMUL => binop!(frame, Double, *),
		IDIV => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_int();
			if b == 0 {
				return Err(Throwable::Arithmetic("/ by zero"));
			}
			frame.push(Value::Int(a.wrapping_div(b)));
		}
		LDIV => {
			let b = frame.pop().as_long();
			let a = frame.pop().as_long();
			if b == 0 {
				return Err(Throwable::Arithmetic("/ by zero"));
			}
			frame.push(Value::Long(a.wrapping_div(b)));
		}
		FDIV => binop!(frame, Float, /),
		DDIV => binop!(frame, Double, /),
		IREM => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_int();
			if b == 0 {
				return Err(Throwable::Arithmetic("/ by zero"));
			}
			frame.push(Value::Int(a.wrapping_rem(b)));
		}
		LREM => {
			let b = frame.pop().as_long();
			let a = frame.pop().as_long();
			if b == 0 {
				return Err(Throwable::Arithmetic("/ by zero"));
			}
			frame.push(Value::Long(a.wrapping_rem(b)));
		}
		FREM => binop!(frame, Float, %),
		DREM => binop!(frame, Double, %),
		INEG => {
			let a = frame.pop().as_int();
			frame.push(Value::Int(a.wrapping_neg()));
		}
		LNEG => {
			let a = frame.pop().as_long();
			frame.push(Value::Long(a.wrapping_neg()));
		}
		FNEG => {
			let a = frame.pop().as_float();
			frame.push(Value::Float(-a));
		}
		DNEG => {
			let a = frame.pop().as_double();
			frame.push(Value::Double(-a));
		}
		ISHL => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_int();
			frame.push(Value::Int(a.wrapping_shl(b as u32 & 0x1F)));
		}
		LSHL => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_long();
			frame.push(Value::Long(a.wrapping_shl(b as u32 & 0x3F)));
		}
		ISHR => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_int();
			frame.push(Value::Int(a.wrapping_shr(b as u32 & 0x1F)));
		}
		LSHR => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_long();
			frame.push(Value::Long(a.wrapping_shr(b as u32 & 0x3F)));
		}
		IUSHR => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_int() as u32;
			frame.push(Value::Int((a.wrapping_shr(b as u32 & 0x1F)) as i32));
		}
		LUSHR => {
			let b = frame.pop().as_int();
			let a = frame.pop().as_long() as u64;
			frame.push(Value::Long((a.wrapping_shr(b as u32 & 0x3F)) as i64));
		}
		IAND => binop!(frame, Int, &),
		LAND => binop!(frame, Long, &),
		IOR => binop!(frame, Int, |),
		LOR => binop!(frame, Long, |),
		IXOR => binop!(frame, Int, ^),
		LXOR => binop!(frame, Long, ^),
		IINC => {
			let index = frame.fetch_u8() as usize;
			let delta = frame.fetch_i8() as i32;
			let v = frame.locals[index].as_int();
			frame.locals[index] = Value::Int(v.wrapping_add(delta));
		}
		I2L => {
			let v = frame.pop().as_int();
			frame.push(Value::Long(v as i64));
		}
		I2F => {
			let v = frame.pop().as_int();
			frame.push(Value::Float(v as f32));
		}
		I2D => {
			let v = frame.pop().as_int();
			frame.push(Value::Double(v as f64));
		}
		L2I => {
			let v = frame.pop().as_long();
			frame.push(Value::Int(v as i32));
		}
		L2F => {
			let v = frame.pop().as_long();
			frame.push(Value::Float(v as f32));
		}
		L2D => {
			let v = frame.pop().as_long();
			frame.push(Value::Double(v as f64));
		}
		F2I => {
			let v = frame.pop().as_float();
			frame.push(Value::Int(v as i32));
		}
		F2L => {
			let v = frame.pop().as_float();
			frame.push(Value::Long(v as i64));
		}
		F2D => {
			let v = frame.pop().as_float();
			frame.push(Value::Double(v as f64));
		}
		D2I => {
			let v = frame.pop().as_double();
			frame.push(Value::Int(v as i32));
		}
		D2L => {
			let v = frame.pop().as_double();
			frame.push(Value::Long(v as i64));
		}
		D2F => {
			let v = frame.pop().as_double();
			frame.push(Value::Float(v as f32));
		}
		I2B => {
			let v = frame.pop().as_int();
			frame.push(Value::Int(v as i8 as i32));
		}
		I2C => {
			let v = frame.pop().as_int();
			frame.push(Value::Int(v as u16 as i32));
		}
		I2S => {
			let v = frame.pop().as_int();
			frame.push(Value::Int(v as i16 as i32));
		}
		LCMP => {
			let b = frame.pop().as_long();
			let a = frame.pop().as_long();
			frame.push(Value::Int(a.cmp(&b) as i32));
		}
		FCMPL | FCMPG => {
			let b = frame.pop().as_float();
			let a = frame.pop().as_float();
			frame.push(Value::Int(float_cmp(a, b, op == FCMPG)));
		}
		DCMPL | DCMPG => {
			let b = frame.pop().as_double();
			let a = frame.pop().as_double();
			frame.push(Value::Int(float_cmp(a as f32, b as f32, op == DCMPG)));
		}
		IFEQ | IFNE | IFLT | IFGE | IFGT | IFLE => {
			let offset = frame.fetch_i16();
			let v = frame.pop().as_int();
			let taken = match op {
				IFEQ => v == 0,
				IFNE => v != 0,
				IFLT => v < 0,
				IFGE => v >= 0,
				IFGT => v > 0,
				_ => v <= 0,
			};
			if taken {
				branch(frame, offset);
			}
		}
		IF_ICMPEQ..=IF_ICMPLE => {
			let offset = frame.fetch_i16();
			let b = frame.pop().as_int();
			let a = frame.pop().as_int();
			let taken = match op {
				IF_ICMPEQ => a == b,
				IF_ICMPNE => a != b,
				IF_ICMPLT => a < b,
				IF_ICMPGE => a >= b,
				IF_ICMPGT => a > b,
				_ => a <= b,
			};
			if taken {
				branch(frame, offset);
			}
		}
		IF_ACMPEQ | IF_ACMPNE => {
			let offset = frame.fetch_i16();
			let b = frame.pop().as_reference();
			let a = frame.pop().as_reference();
			let taken = (a == b) == (op == IF_ACMPEQ);
			if taken {
				branch(frame, offset);
			}
		}
		IFNULL | IFNONNULL => {
			let offset = frame.fetch_i16();
			let v = frame.pop().as_reference();
			let taken = v.is_none() == (op == IFNULL);
			if taken {
				branch(frame, offset);
			}
		}
		GOTO => {
			let offset = frame.fetch_i16();
			branch(frame, offset);
		}
		GOTO_W => {
			let offset = frame.fetch_i32();
			frame.pc = (frame.pc as i64 - 5 + offset as i64) as usize;
		}
		RETURN => return Ok(Some(Value::Int(0))),
		IRETURN | FRETURN | ARETURN | LRETURN | DRETURN => return Ok(Some(frame.pop())),
		GETSTATIC => return get_static(runtime, frame).map(|_| None),
		PUTSTATIC => return put_static(runtime, frame).map(|_| None),
		GETFIELD => return get_field(runtime, frame).map(|_| None),
		PUTFIELD => return put_field(runtime, frame).map(|_| None),
		INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
			let index = frame.fetch_u16();
			if op == INVOKEINTERFACE {
				frame.fetch_u8();
				frame.fetch_u8();
			}
			invoke(runtime, thread, frame, op, index)?;
		}
		NEW => {
			let index = frame.fetch_u16();
			let ty = resolve_class(runtime, frame.method, index)?;
			if ty.is_abstract() {
				return Err(Throwable::Instantiation(ty.name().to_string()));
			}
			runtime.loader().ensure_initialized(runtime, ty)?;
			let object = runtime.heap().allocate_object(ty)?;
			frame.push(Value::Reference(Some(object)));
		}
		NEWARRAY => {
			let type_code = frame.fetch_u8();
			let length = frame.pop().as_int();
			let component = primitive_array_component(runtime, type_code);
			let array_ty = runtime.types().get_array(component);
			let array = runtime.heap().allocate_array(array_ty, length)?;
			frame.push(Value::Reference(Some(array)));
		}
		ANEWARRAY => {
			let index = frame.fetch_u16();
			let component = resolve_class(runtime, frame.method, index)?;
			let array_ty = runtime.types().get_array(component);
			let length = frame.pop().as_int();
			let array = runtime.heap().allocate_array(array_ty, length)?;
			frame.push(Value::Reference(Some(array)));
		}
		ARRAYLENGTH => {
			let array = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
			frame.push(Value::Int(array.array_length().expect("arraylength on non-array")));
		}
		ATHROW => {
			let exception = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
			return Err(Throwable::Thrown(exception));
		}
		CHECKCAST => {
			let index = frame.fetch_u16();
			let ty = resolve_class(runtime, frame.method, index)?;
			if let Some(object) = frame.peek().as_reference() {
				if !object.ty().is_assignable_to(ty) {
					return Err(Throwable::ClassCast { from: object.ty().name().to_string(), to: ty.name().to_string() });
				}
			}
		}
		INSTANCEOF => {
			let index = frame.fetch_u16();
			let ty = resolve_class(runtime, frame.method, index)?;
			let object = frame.pop().as_reference();
			let result = object.map(|o| o.ty().is_assignable_to(ty)).unwrap_or(false);
			frame.push(Value::Int(result as i32));
		}
		MONITORENTER => {
			let object = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
			object.monitor().enter();
		}
		MONITOREXIT => {
			let object = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
			object.monitor().exit()?;
		}
		_ => return Err(Throwable::Linkage(format!("unsupported opcode 0x{op:02X}"))),
	}
	Ok(None)
}

fn branch(frame: &mut Frame, offset: i16) {
	let base = frame.pc as i64 - 3;
	frame.pc = (base + offset as i64) as usize;
}

fn float_cmp(a: f32, b: f32, greater_on_nan: bool) -> i32 {
	match a.partial_cmp(&b) {
		Some(std::cmp::Ordering::Less) => -1,
		Some(std::cmp::Ordering::Equal) => 0,
		Some(std::cmp::Ordering::Greater) => 1,
		None => if greater_on_nan { 1 } else { -1 },
	}
}

fn array_load(frame: &mut Frame, kind: SlotKind) -> VmResult<()> {
	let index = frame.pop().as_int();
	let array = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
	let length = array.array_length().unwrap_or(0);
	if index < 0 || index >= length {
		return Err(Throwable::ArrayIndexOutOfBounds { index, length });
	}
	let offset = index as u32 * kind.size();
	let ptr = unsafe { array.field_ptr::<u8>(offset) };
	frame.push(unsafe { read_slot(ptr, kind, false) });
	Ok(())
}

fn array_store(frame: &mut Frame, kind: SlotKind) -> VmResult<()> {
	let value = frame.pop();
	let index = frame.pop().as_int();
	let array = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
	let length = array.array_length().unwrap_or(0);
	if index < 0 || index >= length {
		return Err(Throwable::ArrayIndexOutOfBounds { index, length });
	}
	if kind == SlotKind::Reference {
		if let Value::Reference(Some(element)) = value {
			let component = array.ty().component_type().expect("array type has a component type");
			if !element.ty().is_assignable_to(component) {
				return Err(Throwable::ArrayStore { from: element.ty().name().to_string(), to: component.name().to_string() });
			}
		}
	}
	let offset = index as u32 * kind.size();
	let ptr = unsafe { array.field_ptr::<u8>(offset) };
	unsafe { write_slot(ptr, kind, false, value) };
	Ok(())
}

fn load_constant(runtime: &Runtime, method: &'static Method, index: u16) -> VmResult<Value> {
	let pool = method.declaring_type().constant_pool().expect("linked type has a constant pool");
	match pool.get(index) {
		Some(RuntimeConstant::Integer(v)) => Ok(Value::Int(*v)),
		Some(RuntimeConstant::Float(v)) => Ok(Value::Float(*v)),
		Some(RuntimeConstant::Long(v)) => Ok(Value::Long(*v)),
		Some(RuntimeConstant::Double(v)) => Ok(Value::Double(*v)),
		Some(RuntimeConstant::String(s)) => runtime.strings().intern_str(runtime, s).map(|o| Value::Reference(Some(o))),
		Some(RuntimeConstant::Class(class)) => {
			let ty = class.resolve(runtime)?;
			runtime.loader().ensure_initialized(runtime, ty)?;
			let mirror = runtime.loader().ensure_class_mirror(runtime, ty)?;
			Ok(Value::Reference(Some(mirror)))
		}
		Some(RuntimeConstant::MethodHandle | RuntimeConstant::MethodType) => Err(Throwable::Linkage("method handles are not supported".into())),
		_ => Err(Throwable::Linkage(format!("bad constant pool index {index}"))),
	}
}

fn resolve_class(runtime: &Runtime, method: &'static Method, index: u16) -> VmResult<&'static Type> {
	let pool = method.declaring_type().constant_pool().expect("linked type has a constant pool");
	match pool.get(index) {
		Some(RuntimeConstant::Class(class)) => class.resolve(runtime),
		_ => Err(Throwable::Linkage(format!("constant pool entry {index} is not a class"))),
	}
}

fn primitive_array_component(runtime: &Runtime, type_code: u8) -> &'static Type {
	use crate::model::PrimitiveKind::*;
	use opcodes::*;
	let kind = match type_code {
		ARRAY_TYPE_BOOLEAN => Boolean,
		ARRAY_TYPE_CHAR => Char,
		ARRAY_TYPE_FLOAT => Float,
		ARRAY_TYPE_DOUBLE => Double,
		ARRAY_TYPE_BYTE => Byte,
		ARRAY_TYPE_SHORT => Short,
		ARRAY_TYPE_INT => Int,
		ARRAY_TYPE_LONG => Long,
		_ => unreachable!("invalid newarray type code"),
	};
	runtime.types().get_primitive(kind)
}

fn get_static(runtime: &Runtime, frame: &mut Frame) -> VmResult<()> {
	let index = frame.fetch_u16();
	let field = resolve_field(runtime, frame.method, index)?;
	runtime.loader().ensure_initialized(runtime, field.declaring_type())?;
	let ptr = unsafe { field.static_ptr() };
	frame.push(unsafe { read_slot(ptr, field.slot_kind(), field.is_volatile()) });
	Ok(())
}

fn put_static(runtime: &Runtime, frame: &mut Frame) -> VmResult<()> {
	let index = frame.fetch_u16();
	let field = resolve_field(runtime, frame.method, index)?;
	let value = frame.pop();
	let ptr = unsafe { field.static_ptr() };
	unsafe { write_slot(ptr, field.slot_kind(), field.is_volatile(), value) };
	Ok(())
}

fn get_field(runtime: &Runtime, frame: &mut Frame) -> VmResult<()> {
	let index = frame.fetch_u16();
	let field = resolve_field(runtime, frame.method, index)?;
	let object = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
	let ptr = unsafe { object.field_ptr::<u8>(field.offset()) };
	frame.push(unsafe { read_slot(ptr, field.slot_kind(), field.is_volatile()) });
	Ok(())
}

fn put_field(runtime: &Runtime, frame: &mut Frame) -> VmResult<()> {
	let index = frame.fetch_u16();
	let field = resolve_field(runtime, frame.method, index)?;
	let value = frame.pop();
	let object = frame.pop().as_reference().ok_or(Throwable::NullPointer)?;
	let ptr = unsafe { object.field_ptr::<u8>(field.offset()) };
	unsafe { write_slot(ptr, field.slot_kind(), field.is_volatile(), value) };
	Ok(())
}

fn resolve_field(runtime: &Runtime, method: &'static Method, index: u16) -> VmResult<&'static crate::model::Field> {
	let pool = method.declaring_type().constant_pool().expect("linked type has a constant pool");
	match pool.get(index) {
		Some(RuntimeConstant::FieldRef(field_ref)) => field_ref.resolve(runtime),
		_ => Err(Throwable::NoSuchField(format!("constant pool entry {index}"))),
	}
}

fn invoke(runtime: &Runtime, thread: &Thread, frame: &mut Frame, op: u8, index: u16) -> VmResult<()> {
	use opcodes::{INVOKEINTERFACE, INVOKESPECIAL, INVOKESTATIC, INVOKEVIRTUAL};

	let pool = frame.method.declaring_type().constant_pool().expect("linked type has a constant pool");
	let target = match pool.get(index) {
		Some(RuntimeConstant::MethodRef(m)) | Some(RuntimeConstant::InterfaceMethodRef(m)) => m.resolve(runtime)?,
		_ => return Err(Throwable::NoSuchMethod(format!("constant pool entry {index}"))),
	};

	let param_count = target.parameter_types().len();
	let receiver_count = usize::from(op != INVOKESTATIC);
	let mut args = vec![Value::default(); param_count + receiver_count];
	for slot in args.iter_mut().rev() {
		*slot = frame.pop();
	}

	let resolved = match op {
		INVOKEVIRTUAL | INVOKEINTERFACE => {
			let receiver = args[0].as_reference().ok_or(Throwable::NullPointer)?;
			target.resolve_virtual(receiver.ty()).ok_or_else(|| Throwable::AbstractMethod(format!("{}.{}{}", receiver.ty().name(), target.name(), target.descriptor())))?
		}
		INVOKESPECIAL => target,
		_ => target,
	};

	if resolved.is_abstract() {
		return Err(Throwable::AbstractMethod(format!("{}.{}{}", resolved.declaring_type().name(), resolved.name(), resolved.descriptor())));
	}

	if op == INVOKESTATIC {
		runtime.loader().ensure_initialized(runtime, resolved.declaring_type())?;
	}

	let result = crate::interp::execute(runtime, thread, resolved, &args)?;
	if resolved.return_type().primitive_kind() != Some(crate::model::PrimitiveKind::Void) {
		frame.push(result);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Config;
	use crate::model::{MethodCode, MethodModifiers, PrimitiveKind, TypePool};

	fn test_runtime() -> std::sync::Arc<Runtime> {
		Runtime::boot(Config::new("Test", vec![])).unwrap()
	}

	fn leak_method(max_stack: u16, max_locals: u16) -> &'static Method {
		let declaring_type = TypePool::new().get_primitive(PrimitiveKind::Int);
		Box::leak(Box::new(Method {
			name: "test",
			descriptor: "()V",
			modifiers: MethodModifiers::empty(),
			declaring_type,
			parameter_types: &[],
			return_type: declaring_type,
			code: Some(MethodCode {
				max_stack,
				max_locals,
				code: &[],
				exception_table: &[],
				line_numbers: &[],
			}),
			native: std::sync::atomic::AtomicPtr::new(std::ptr::null_mut()),
		}))
	}

	#[test]
	fn ishl_masks_shift_amount_to_low_five_bits() {
		let runtime = test_runtime();
		let thread = Thread::new("t".into(), true);
		let method = leak_method(4, 0);
		let mut frame = Frame::new(method, &[]);
		frame.push(Value::Int(255));
		frame.push(Value::Int(24));
		run_one(&runtime, &thread, &mut frame, opcodes::ISHL).unwrap();
		assert_eq!(frame.pop().as_int(), 255i32.wrapping_shl(24));
	}

	#[test]
	fn lushr_of_a_negative_long_by_four_fills_with_zero_not_sign_bits() {
		let runtime = test_runtime();
		let thread = Thread::new("t".into(), true);
		let method = leak_method(4, 0);
		let mut frame = Frame::new(method, &[]);
		frame.push(Value::Long(-1));
		frame.push(Value::Int(4));
		run_one(&runtime, &thread, &mut frame, opcodes::LUSHR).unwrap();
		assert_eq!(frame.pop().as_long(), ((-1i64 as u64) >> 4) as i64);
	}

	#[test]
	fn idiv_by_zero_raises_arithmetic_exception() {
		let runtime = test_runtime();
		let thread = Thread::new("t".into(), true);
		let method = leak_method(4, 0);
		let mut frame = Frame::new(method, &[]);
		frame.push(Value::Int(10));
		frame.push(Value::Int(0));
		let result = run_one(&runtime, &thread, &mut frame, opcodes::IDIV);
		assert!(matches!(result, Err(Throwable::Arithmetic("/ by zero"))));
	}

	#[test]
	fn float_cmp_orders_nan_by_the_g_l_variant() {
		assert_eq!(float_cmp(1.0, f32::NAN, true), 1);
		assert_eq!(float_cmp(1.0, f32::NAN, false), -1);
		assert_eq!(float_cmp(2.0, 1.0, true), 1);
	}
}
