use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field};

/// Generates a `FromByteStream` impl for a struct whose fields are read
/// sequentially, each through its own `FromByteStream` impl. Used for the
/// fixed-layout attribute records of the class file format (the ones that
/// are not a closed tagged sum and need no extra parsing context).
pub fn derive(tokens: proc_macro::TokenStream) -> TokenStream {
	let DeriveInput { ident, data, .. } = syn::parse(tokens).unwrap();

	let data = match data {
		Data::Struct(data) => data,
		Data::Enum(_) => panic!("Enums are not supported"),
		Data::Union(_) => panic!("Unions are not supported"),
	};

	let reads = data.fields.iter().map(|Field { ident, ty, .. }| {
		quote! { #ident: <#ty as crate::utilities::FromByteStream>::read(stream, &())? }
	});

	quote! {
		impl<'l> crate::utilities::FromByteStream for #ident {
			type Deps = ();

			fn read(stream: &mut std::io::Cursor<&[u8]>, _: &Self::Deps) -> std::io::Result<Self> {
				Ok(Self { #(#reads),* })
			}
		}
	}
}
