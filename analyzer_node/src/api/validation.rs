//! Request validation utilities.

use crate::api::errors::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex"));

/// Validate an EVM-style address (`0x` + 40 hex characters).
///
/// Every address-taking operation rejects non-matching inputs before any
/// network call is made.
pub fn validate_address(address: &str) -> Result<(), ApiError> {
    if address.is_empty() {
        return Err(ApiError::InvalidInput(
            "Contract address is required".to_string(),
        ));
    }
    if !ADDRESS_RE.is_match(address) {
        return Err(ApiError::InvalidInput(
            "Invalid Ethereum address format".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_addresses() {
        assert!(validate_address("0x0000000000000000000000000000000000000001").is_ok());
        assert!(validate_address("0xdAC17F958D2ee523a2206206994597C13D831ec7").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_address("").is_err());
        assert!(validate_address("dAC17F958D2ee523a2206206994597C13D831ec7").is_err());
        assert!(validate_address("0x123").is_err());
        assert!(validate_address("0xZZC17F958D2ee523a2206206994597C13D831ec7").is_err());
        // 41 hex chars
        assert!(validate_address("0x0000000000000000000000000000000000000001f").is_err());
    }

    #[test]
    fn rejection_is_invalid_input() {
        match validate_address("nope") {
            Err(ApiError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }
}
