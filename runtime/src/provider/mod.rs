pub use deadline::*;
pub use query_result::*;

mod deadline;
mod query_result;
