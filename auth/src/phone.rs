//! Phone number normalization applied before passcode issuance.

use crate::error::AuthError;

/// Country calling code used when the caller omits the `+` prefix.
pub const DEFAULT_COUNTRY_CODE: &str = "1";

/// Normalize user-entered phone input into the form sent to the provider.
///
/// Input that already starts with `+` is passed through untouched (after
/// trimming surrounding whitespace). Anything else has every non-digit
/// stripped and `+{country_code}` prepended.
///
/// # Errors
///
/// Returns [`AuthError::InvalidPhoneNumber`] for blank input or input with
/// no digits at all.
pub fn normalize_phone_number(raw: &str, country_code: &str) -> Result<String, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidPhoneNumber);
    }

    if trimmed.starts_with('+') {
        if !trimmed.chars().any(|c| c.is_ascii_digit()) {
            return Err(AuthError::InvalidPhoneNumber);
        }
        return Ok(trimmed.to_owned());
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(AuthError::InvalidPhoneNumber);
    }
    let country = country_code.trim_start_matches('+');
    Ok(format!("+{country}{digits}"))
}

/// Mask all but the last four digits, for logs.
#[must_use]
pub fn mask_phone_number(phone: &str) -> String {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0;
    phone
        .chars()
        .map(|c| {
            if !c.is_ascii_digit() {
                return c;
            }
            seen += 1;
            if digits - seen < 4 { c } else { '*' }
        })
        .collect()
}

#[cfg(test)]
#[path = "phone_test.rs"]
mod tests;
