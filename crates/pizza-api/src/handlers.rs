//! Request handlers.

pub mod health;
pub mod index;
pub mod process;
pub mod reports;

pub use health::*;
pub use index::*;
pub use process::*;
pub use reports::*;
