extern crate byte_pool;
extern crate integer_encoding;

pub mod duration;
pub mod encoding;
pub mod error;
pub mod pool;

pub mod prelude {
    pub use crate::duration::*;
    pub use crate::encoding::*;
    pub use crate::error::*;
    pub use crate::pool::*;
}
