//! The rules engine: a pure function library over [`Position`] values.
//! Nothing here holds state beyond the position it is given.

mod error;
mod movegen;
pub mod notation;
mod position;
mod status;
mod types;

pub use error::*;
pub use movegen::*;
pub use notation::{parse_move, parse_san, parse_uci, to_san, to_uci};
pub use position::*;
pub use status::*;
pub use types::*;
