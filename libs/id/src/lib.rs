//! # amicopy-id
//!
//! Typed identifiers for the provider resources the copy workflow touches.
//!
//! ## ID Format
//!
//! Provider IDs use a prefixed format: `{prefix}-{hex}`
//!
//! Examples:
//! - `ami-0abcdef1234567890`
//! - `snap-0123456789abcdef0`
//!
//! Typing the IDs keeps an image ID from being passed where a snapshot ID
//! is expected.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Checks the part of an ID after the prefix separator.
#[doc(hidden)]
pub fn validate_suffix(suffix: &str) -> Result<(), IdError> {
    let valid = !suffix.is_empty()
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

    if valid {
        Ok(())
    } else {
        Err(IdError::InvalidSuffix(suffix.to_string()))
    }
}
