extern crate ahash;
extern crate chrono;
extern crate enquote;
extern crate parking_lot;
extern crate prometheus_client;
extern crate scopeguard;

pub use execution::*;
pub use metrics::*;
pub use provider::*;
pub use runtime_error::*;
pub use types::*;

pub mod execution;
pub mod metrics;
pub mod provider;
pub mod runtime_error;
mod types;

pub mod prelude {
    pub use crate::execution::*;
    pub use crate::metrics::*;
    pub use crate::provider::*;
    pub use crate::runtime_error::*;
    pub use crate::types::*;
}
