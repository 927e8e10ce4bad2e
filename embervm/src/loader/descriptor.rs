//! Field/method descriptor grammar (`I`, `[Ljava/lang/String;`, `(IJ)V`),
//! resolved into actual `Type`s through a caller-supplied class resolver so
//! this module stays independent of how a class name is ultimately loaded.

use crate::error::{Fault, VmResult};
use crate::model::{PrimitiveKind, Type, TypePool};

pub(crate) fn parse_field_descriptor<'d>(
	descriptor: &'d str,
	types: &TypePool,
	mut resolve_class: impl FnMut(&str) -> VmResult<&'static Type>,
) -> Result<(&'static Type, &'d str), Fault> {
	parse_one(descriptor, types, &mut resolve_class)
}

fn parse_one<'d>(
	descriptor: &'d str,
	types: &TypePool,
	resolve_class: &mut impl FnMut(&str) -> VmResult<&'static Type>,
) -> Result<(&'static Type, &'d str), Fault> {
	let mut chars = descriptor.char_indices();
	let (_, first) = chars.next().ok_or_else(|| Fault::MalformedClass("empty descriptor".into()))?;

	if let Some(primitive) = PrimitiveKind::from_descriptor(first) {
		return Ok((types.get_primitive(primitive), &descriptor[1..]));
	}

	match first {
		'[' => {
			let (component, rest) = parse_one(&descriptor[1..], types, resolve_class)?;
			Ok((types.get_array(component), rest))
		}
		'L' => {
			let end = descriptor.find(';').ok_or_else(|| Fault::MalformedClass(format!("unterminated class descriptor: {descriptor}")))?;
			let name = &descriptor[1..end];
			let ty = resolve_class(name).map_err(|e| Fault::MalformedClass(format!("failed to resolve {name}: {e}")))?;
			Ok((ty, &descriptor[end + 1..]))
		}
		other => Err(Fault::MalformedClass(format!("invalid descriptor character '{other}'"))),
	}
}

/// Parses a full method descriptor `(ParamDescs)ReturnDesc` into its
/// parameter types (in order) and return type.
pub(crate) fn parse_method_descriptor(
	descriptor: &str,
	types: &TypePool,
	mut resolve_class: impl FnMut(&str) -> VmResult<&'static Type>,
) -> Result<(Vec<&'static Type>, &'static Type), Fault> {
	let body = descriptor.strip_prefix('(').ok_or_else(|| Fault::MalformedClass(format!("bad method descriptor: {descriptor}")))?;
	let (params_str, return_str) = body.split_once(')').ok_or_else(|| Fault::MalformedClass(format!("bad method descriptor: {descriptor}")))?;

	let mut params = Vec::new();
	let mut rest = params_str;
	while !rest.is_empty() {
		let (ty, tail) = parse_one(rest, types, &mut resolve_class)?;
		params.push(ty);
		rest = tail;
	}

	let (return_type, _) = parse_one(return_str, types, &mut resolve_class)?;
	Ok((params, return_type))
}
