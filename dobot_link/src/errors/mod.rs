mod dobot_error;
pub use dobot_error::*;
