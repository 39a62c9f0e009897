//! Various utilities shared by the Holocron crates

pub mod color;
pub mod packed;

mod ascii_display;
pub use ascii_display::*;

mod result_ext;
pub use result_ext::*;

mod shared_take;
pub use shared_take::*;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Converts a 4-byte string into a u32 (little endian)
///
/// ## Example
/// ```
/// use holocron_utils::string_as_u32;
/// assert_eq!(string_as_u32("MAT "), 0x2054414D);
/// ```
pub const fn string_as_u32(s: &str) -> u32 {
    if s.len() == 4 {
        let bytes = s.as_bytes();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    } else {
        panic!("Invalid string length");
    }
}

/// Used by the [`holocron_proc::ext_repr`] proc macro
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("value doesn't name any known variant")]
pub struct EnumParseError;
