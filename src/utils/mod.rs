pub mod datetime;
pub mod error;
pub mod json;
pub mod response;

pub use error::AppError;
pub use json::AppJson;
