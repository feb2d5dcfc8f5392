pub mod error;
pub mod logger;
pub mod uid;
pub mod validation;
