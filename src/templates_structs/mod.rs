mod boa;
mod common;

pub use boa::*;
pub use common::*;
