mod error;
mod handler;
mod identity;
mod router;

pub use error::recover_error;
pub use router::routes;
