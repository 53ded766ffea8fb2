pub use metric_name::*;
pub use timeseries::*;
pub use traits::*;

mod metric_name;
mod timeseries;
mod traits;
