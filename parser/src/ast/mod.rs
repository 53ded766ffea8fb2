pub use expr::*;

mod expr;
