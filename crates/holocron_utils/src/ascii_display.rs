use crate::ok;
use std::fmt::{self, Display};

/// Wrapper type for displaying byte buffers that contain all, or mostly all ASCII text, like
/// fixed-size name fields of binary containers. Display stops at the first NUL byte. Any other
/// non-printable bytes are displayed as `\xNN` where `NN` is their hex code, and `\` is shown
/// as `\\`.
///
/// ## Example
/// ```
/// # use holocron_utils::AsciiDisplay;
/// let a = AsciiDisplay(b"mat\\dflt.mat\0\0\0");
/// assert_eq!(a.to_string(), "mat\\\\dflt.mat");
///
/// let b = AsciiDisplay(b"a\xABbc");
/// assert_eq!(b.to_string(), "a\\xABbc");
/// ```
pub struct AsciiDisplay<'a>(pub &'a [u8]);

impl<'a> From<&'a [u8]> for AsciiDisplay<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self(value)
    }
}

impl<'a> Display for AsciiDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0.iter().take_while(|&&byte| byte != 0) {
            if byte == b'\\' {
                write!(f, "\\\\")?;
            } else if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, r"\x{byte:02X}")?;
            }
        }
        ok()
    }
}
