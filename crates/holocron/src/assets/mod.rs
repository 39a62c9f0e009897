//! Loading and caching of game assets through the virtual file system

mod error;
pub use error::*;

mod store;
pub use store::*;
