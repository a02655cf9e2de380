//! # Validation Module
//!
//! Input validation for tools, clients and tariffs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (external)                                     │
//! │  └── Parsing: ids, dates, numbers                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, formats (RUT, email, phone)             │
//! │  └── Positive amounts                                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (rut) and FOREIGN KEY constraints                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before the engine opens a transaction.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ClientDetails, NewClient, NewTool, TariffValues, ToolDetails};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CATEGORY_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// Generic Validators
// =============================================================================

/// Validates a required free-text field and its maximum length.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates that an amount is strictly greater than zero.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// RUT
// =============================================================================

/// Computes the modulo-11 verifier for a RUT body.
///
/// ## Algorithm
/// ```text
/// digits right-to-left × 2,3,4,5,6,7,2,3,...  → sum
/// 11 - (sum mod 11)  →  11 ⇒ '0', 10 ⇒ 'K', n ⇒ digit n
/// ```
///
/// ## Example
/// ```rust
/// use toolshed_core::validation::rut_verifier;
///
/// assert_eq!(rut_verifier(12_345_678), '5');
/// ```
pub fn rut_verifier(body: u32) -> char {
    let mut sum = 0u32;
    let mut factor = 2u32;
    let mut rest = body;

    while rest > 0 {
        sum += (rest % 10) * factor;
        rest /= 10;
        factor = if factor == 7 { 2 } else { factor + 1 };
    }

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

/// Validates a RUT and returns its normalised form (`12345678-5`).
///
/// Accepts dots as thousands separators and a lower-case `k` verifier.
///
/// ## Example
/// ```rust
/// use toolshed_core::validation::normalize_rut;
///
/// assert_eq!(normalize_rut("12.345.678-5").unwrap(), "12345678-5");
/// assert!(normalize_rut("12.345.678-4").is_err());
/// ```
pub fn normalize_rut(rut: &str) -> ValidationResult<String> {
    let compact: String = rut
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_uppercase();

    if compact.is_empty() {
        return Err(ValidationError::Required {
            field: "rut".to_string(),
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "rut".to_string(),
        reason: reason.to_string(),
    };

    let (body, verifier) = compact
        .split_once('-')
        .ok_or_else(|| invalid("expected <number>-<verifier>"))?;

    if body.is_empty() || body.len() > 8 || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("number must have 1 to 8 digits"));
    }

    let mut verifier_chars = verifier.chars();
    let supplied = match (verifier_chars.next(), verifier_chars.next()) {
        (Some(c), None) if c.is_ascii_digit() || c == 'K' => c,
        _ => return Err(invalid("verifier must be a digit or K")),
    };

    let body_value: u32 = body
        .parse()
        .map_err(|_| invalid("number must have 1 to 8 digits"))?;
    if body_value == 0 {
        return Err(invalid("number must be greater than 0"));
    }

    if rut_verifier(body_value) != supplied {
        return Err(invalid("verifier digit does not match"));
    }

    Ok(format!("{}-{}", body_value, supplied))
}

// =============================================================================
// Contact Data
// =============================================================================

/// Validates an email address (shape only, no deliverability).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required("email", email, MAX_EMAIL_LEN)?;
    let email = email.trim();

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a phone number: 7 to 25 of `0-9 + - ( ) .` and spaces.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let len = phone.chars().count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();

    if !(7..=25).contains(&len) || !allowed || digits == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 7-25 characters of digits, spaces, + - ( ) .".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

/// Validates a tool intake.
pub fn validate_new_tool(tool: &NewTool) -> ValidationResult<()> {
    validate_required("name", &tool.name, MAX_NAME_LEN)?;
    validate_required("category", &tool.category, MAX_CATEGORY_LEN)?;
    validate_positive_amount("replacement_value", tool.replacement_value)?;

    if tool.stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates descriptive tool fields.
pub fn validate_tool_details(details: &ToolDetails) -> ValidationResult<()> {
    validate_required("name", &details.name, MAX_NAME_LEN)?;
    validate_required("category", &details.category, MAX_CATEGORY_LEN)?;
    validate_positive_amount("replacement_value", details.replacement_value)
}

/// Validates a client registration and returns the normalised RUT.
pub fn validate_new_client(client: &NewClient) -> ValidationResult<String> {
    let rut = normalize_rut(&client.rut)?;
    validate_required("name", &client.name, MAX_NAME_LEN)?;
    validate_phone(&client.phone)?;
    validate_email(&client.email)?;
    Ok(rut)
}

/// Validates client contact details.
pub fn validate_client_details(details: &ClientDetails) -> ValidationResult<()> {
    validate_required("name", &details.name, MAX_NAME_LEN)?;
    validate_phone(&details.phone)?;
    validate_email(&details.email)
}

/// Validates a full tariff write. All three amounts must be > 0.
pub fn validate_tariff(values: &TariffValues) -> ValidationResult<()> {
    validate_positive_amount("daily_rental_fee", values.daily_rental_fee)?;
    validate_positive_amount("daily_late_fee", values.daily_late_fee)?;
    validate_positive_amount("repair_fee", values.repair_fee)
}

// =============================================================================
// Unit Tests
// =============================================================================
