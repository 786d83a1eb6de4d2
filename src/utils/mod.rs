pub mod error;
pub mod logging;
pub mod validation;

pub use error::*;
pub use validation::{is_valid_email, normalize_email, normalize_phone, validate_subdomain};
