mod expiring_map;
mod limiter;

pub use expiring_map::*;
pub use limiter::*;
