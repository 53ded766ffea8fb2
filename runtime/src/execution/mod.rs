pub use context::*;
pub use eval::*;
pub use exec::*;
pub use parser_cache::*;
pub use traits::*;

mod context;
mod eval;
mod exec;
mod parser_cache;
mod traits;
mod window;

#[cfg(test)]
mod exec_test;
