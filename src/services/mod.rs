//! Domain operations. Each function validates its input, authorizes the
//! actor against current state, and performs one store operation or view
//! assembly. Handlers in `crate::api` are thin wrappers around these.

pub mod comments;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod videos;

use crate::error::{ApiError, ApiResult};

/// Trimmed text, or `InvalidInput(message)` when absent or all whitespace.
pub fn required_text(value: Option<&str>, message: &str) -> ApiResult<String> {
    optional_text(value).ok_or_else(|| ApiError::invalid(message))
}

/// Trimmed text, or `None` when absent or all whitespace.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_helpers_trim_and_reject_blank() {
        assert_eq!(optional_text(Some("  hi ")), Some("hi".to_string()));
        assert_eq!(optional_text(Some(" \t\n")), None);
        assert_eq!(optional_text(None), None);
        let err = required_text(Some("   "), "content is required").unwrap_err();
        assert_eq!(err.to_string(), "content is required");
    }
}
