// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Contact form validator.
//!
//! Trims the free-text fields, applies the language default and checks
//! that name, email and message are present and that the email looks
//! like an address.

use crate::compose::Lang;
use crate::form::ContactForm;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name, email, and message are required")]
    MissingRequired,

    #[error("invalid email address")]
    InvalidEmail,
}

/// Normalize and validate a decoded form.
///
/// On success the returned form has trimmed `name`, `email`, `message`
/// and `lang`, with `lang` defaulted when it was empty.
pub fn validate(mut form: ContactForm) -> Result<ContactForm, ValidationError> {
    form.name = form.name.trim().to_string();
    form.email = form.email.trim().to_string();
    form.message = form.message.trim().to_string();
    form.lang = form.lang.trim().to_string();
    if form.lang.is_empty() {
        form.lang = Lang::default().tag().to_string();
    }

    if form.name.is_empty() || form.email.is_empty() || form.message.is_empty() {
        debug!("Missing required field");
        return Err(ValidationError::MissingRequired);
    }

    if !is_plausible_email(&form.email) {
        debug!(email = %form.email, "Invalid email address");
        return Err(ValidationError::InvalidEmail);
    }

    Ok(form)
}

fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
