mod modutf;
mod intern;

pub use modutf::{decode_modified_utf8, encode_modified_utf8, ModUtfError};
pub(crate) use intern::StringPool;
