//! Utility functions for common operations.
//!
//! - **URL validation**: checks the configured listing endpoint
//! - **Text processing**: terminal-safe, width-aware rendering of server text
//!
//! # Examples
//!
//! ```
//! use jobfeed::util::{sanitize, truncate_to_width, validate_api_url};
//!
//! let url = validate_api_url("https://example.com/common/jobs").unwrap();
//! assert_eq!(url.path(), "/common/jobs");
//!
//! assert_eq!(sanitize("\x1b[1mCook\x1b[0m"), "Cook");
//! assert_eq!(truncate_to_width("Delivery Executive", 11), "Delivery...");
//! ```

mod text;
mod url_validator;

pub use text::{or_not_specified, sanitize, truncate_to_width, NOT_SPECIFIED};
pub use url_validator::{validate_api_url, UrlValidationError};
