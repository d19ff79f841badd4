//! # Validation Module
//!
//! Input validation applied before any store access.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler (out of this workspace)                      │
//! │  └── Shape checks (required fields, JSON types)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Amount > 0, price ≥ 0, username format                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                        │
//! │  ├── CHECK (balance >= 0), CHECK (amount > 0)                          │
//! │  ├── UNIQUE (username), PRIMARY KEY (account_id, item_id)              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::coins::Coins;
use crate::error::ValidationError;
use crate::MAX_USERNAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a transfer amount.
///
/// ## Example
/// ```rust
/// use coinshop_core::coins::Coins;
/// use coinshop_core::validation::validate_transfer_amount;
///
/// assert!(validate_transfer_amount(Coins::new(1)).is_ok());
/// assert!(validate_transfer_amount(Coins::zero()).is_err());
/// ```
pub fn validate_transfer_amount(amount: Coins) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an item price. Free items are allowed.
pub fn validate_price(price: Coins) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_USERNAME_LENGTH`] characters
/// - No whitespace
///
/// ## Example
/// ```rust
/// use coinshop_core::validation::validate_username;
///
/// assert!(validate_username("alice").is_ok());
/// assert!(validate_username("").is_err());
/// assert!(validate_username("al ice").is_err());
/// ```
pub fn validate_username(username: &str) -> ValidationResult<()> {
    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LENGTH,
        });
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates an item name used for catalog lookup.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "item".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
