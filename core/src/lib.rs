pub mod auth;
pub mod dates;
pub mod error;

pub use error::TcError;
