use std::io::{Cursor, Read};
use std::mem::{size_of, MaybeUninit};
use std::slice::from_raw_parts_mut;

#[inline]
pub(crate) unsafe fn read_pod_from_stream<T: Copy>(stream: &mut impl Read) -> std::io::Result<T> {
	let mut value = MaybeUninit::<T>::uninit();
	stream.read_exact(from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size_of::<T>()))?;
	Ok(value.assume_init())
}

/// Reads a fixed-size record from a byte cursor. The class file format is
/// exclusively big-endian; every multi-byte integer implementation below
/// reads through `from_be_bytes`, never the host's native order.
pub trait FromByteStream
where
	Self: Sized,
{
	type Deps;
	fn read(stream: &mut Cursor<&[u8]>, deps: &Self::Deps) -> std::io::Result<Self>;
}

macro_rules! impl_from_be_byte_stream {
	($($ty: ty),*) => {$(
		impl crate::utilities::FromByteStream for $ty {
			type Deps = ();
			#[inline]
			fn read(stream: &mut std::io::Cursor<&[u8]>, _: &Self::Deps) -> std::io::Result<Self> {
				let bytes = <[u8; size_of::<Self>()]>::read(stream, &())?;
				Ok(Self::from_be_bytes(bytes))
			}
		}
	)*};
}

impl FromByteStream for u8 {
	type Deps = ();
	#[inline]
	fn read(stream: &mut Cursor<&[u8]>, _: &Self::Deps) -> std::io::Result<Self> {
		let mut byte = 0u8;
		stream.read_exact(std::slice::from_mut(&mut byte))?;
		Ok(byte)
	}
}

impl FromByteStream for i8 {
	type Deps = ();
	#[inline]
	fn read(stream: &mut Cursor<&[u8]>, deps: &Self::Deps) -> std::io::Result<Self> {
		Ok(u8::read(stream, deps)? as i8)
	}
}

impl_from_be_byte_stream!(u16, i16, u32, i32, u64, i64, f32, f64);

impl<const SIZE: usize> FromByteStream for [u8; SIZE] {
	type Deps = ();
	#[inline]
	fn read(stream: &mut Cursor<&[u8]>, _: &Self::Deps) -> std::io::Result<Self> {
		let mut bytes = [0u8; SIZE];
		stream.read_exact(&mut bytes)?;
		Ok(bytes)
	}
}

impl<T: FromByteStream<Deps = ()>> FromByteStream for Vec<T> {
	type Deps = u16;
	fn read(stream: &mut Cursor<&[u8]>, count: &Self::Deps) -> std::io::Result<Self> {
		let mut values = Vec::with_capacity(*count as usize);
		for _ in 0..*count {
			values.push(T::read(stream, &())?);
		}
		Ok(values)
	}
}
