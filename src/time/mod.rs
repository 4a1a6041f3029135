pub mod duration;
pub mod error;
pub mod timeunit;

pub use self::duration::{Duration, DurationMs};
