#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the other Erynoa crates: the multibase [codec] used for every
//! byte/string conversion, cross-target `Send`/`Sync` bounds and a clock.

pub mod codec;
pub use codec::*;

mod sync;
pub use sync::*;

mod time;
pub use time::*;
