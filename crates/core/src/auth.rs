use std::fmt::{Debug, Formatter};

use crate::{AppError, AppResult};

/// Bearer credential attached to every remote request.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Creates a token, rejecting empty values as an authentication failure.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::missing_token());
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl Debug for BearerToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BearerToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::BearerToken;

    #[test]
    fn blank_token_is_an_auth_error() {
        let result = BearerToken::new("  ");
        assert!(matches!(result, Err(error) if error.is_auth()));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let token = BearerToken::new("abc123").unwrap_or_else(|_| unreachable!());
        assert_eq!(format!("{token:?}"), "BearerToken(***)");
        assert_eq!(token.header_value(), "Bearer abc123");
    }
}
