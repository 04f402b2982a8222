mod rate;
mod token;
mod user;

pub use rate::*;
pub use token::*;
pub use user::*;
