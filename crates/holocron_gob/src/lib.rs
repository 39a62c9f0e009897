//! GOB archive support
//!
//! GOB files are flat containers of named records. This crate indexes them ([`GobContainer`]),
//! hands out bounded streams over their records, and layers several containers and plain disk
//! directories into a single case-insensitive namespace ([`Vfs`]).

mod container;
pub use container::*;

mod error;
pub use error::*;

mod vfs;
pub use vfs::*;

mod writer;
pub use writer::*;
