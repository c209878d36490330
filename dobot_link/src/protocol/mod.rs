mod frame;
mod ids;
mod message;
pub mod params;

pub use frame::*;
pub use ids::*;
pub use message::*;
