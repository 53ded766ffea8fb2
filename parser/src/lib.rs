#![forbid(unsafe_code)]
extern crate enquote;
extern crate serde;
extern crate thiserror;

pub mod ast;
pub mod common;
pub mod label;
pub mod parser;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::common::*;
    pub use crate::label::*;
    pub use crate::parser::*;
}
