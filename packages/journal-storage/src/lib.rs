pub mod db;
pub mod entries;
pub mod models;
pub mod queue;
pub mod quotes;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
