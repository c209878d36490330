mod device;
mod driver;
mod driver_config;
mod queue;

pub use driver::*;
pub use driver_config::*;
