//! Parsers for the content formats of the Sith engine games
//!
//! Text formats (`.jkl`/`.ndy` levels, `.3do` models, `.spr` sprites, `.key` animations and
//! `.pup` puppets) share the line tokenizer in [`tokenizer`]. Binary formats (`.mat` materials
//! and `.cmp` colormaps) are read with `byteorder` and `PackedData` headers.
//!
//! Every parser takes the file name (for diagnostics) and a reader, and produces plain data.
//! Coordinates are kept in the games' own space; converting them is the world builder's job.

pub mod cmp;
pub mod flags;
pub mod jkl;
pub mod key;
pub mod mat;
pub mod model;
pub mod puppet;
pub mod sprite;
pub mod tokenizer;

mod error;
pub use error::*;
