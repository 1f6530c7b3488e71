//! Checkout form validation.
//!
//! Pure field-level checks with no network access. Validation collects
//! every field error in one pass so the UI can highlight all invalid
//! fields at once instead of surfacing them one at a time.

use serde::{Deserialize, Serialize};

use haberdash_core::{Email, Phone};

use crate::platform::types::{Address, CustomerDetails};

/// Transient checkout form state, mutated field-by-field by user input
/// and discarded after a submission attempt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutDraft {
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// A single invalid field with an operator-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validated contact and shipping details ready for session creation.
#[derive(Debug, Clone)]
pub struct ContactDetails {
    pub email: Email,
    pub phone: Option<Phone>,
    pub name: String,
    pub address: Address,
}

impl ContactDetails {
    /// Convert into the wire shape sent to the session-creation function.
    #[must_use]
    pub fn into_customer_details(self) -> CustomerDetails {
        CustomerDetails {
            name: self.name,
            phone: self.phone.map(|p| p.as_str().to_string()),
            address: self.address,
        }
    }
}

impl CheckoutDraft {
    /// Validate the draft, returning either typed contact details or the
    /// complete list of field errors.
    ///
    /// # Errors
    ///
    /// Returns every failing field in one pass - required fields that are
    /// blank, a malformed email, or a malformed (optional) phone.
    pub fn validate(&self) -> Result<ContactDetails, Vec<FieldError>> {
        let mut errors = Vec::new();

        let required = [
            ("first_name", self.first_name.trim(), "First name is required"),
            ("last_name", self.last_name.trim(), "Last name is required"),
            ("address_line1", self.address_line1.trim(), "Address is required"),
            ("city", self.city.trim(), "City is required"),
            ("state", self.state.trim(), "State is required"),
            ("postal_code", self.postal_code.trim(), "Postal code is required"),
        ];
        for (field, value, message) in required {
            if value.is_empty() {
                errors.push(FieldError::new(field, message));
            }
        }

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError::new("email", e.to_string()));
                None
            }
        };

        let phone = if self.phone.trim().is_empty() {
            None
        } else {
            match Phone::parse(&self.phone) {
                Ok(phone) => Some(phone),
                Err(e) => {
                    errors.push(FieldError::new("phone", e.to_string()));
                    None
                }
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let email = email.unwrap_or_else(|| unreachable!("email validated above"));

        Ok(ContactDetails {
            email,
            phone,
            name: format!("{} {}", self.first_name.trim(), self.last_name.trim()),
            address: Address {
                line1: self.address_line1.trim().to_string(),
                line2: some_if_present(&self.address_line2),
                city: self.city.trim().to_string(),
                state: self.state.trim().to_string(),
                postal_code: self.postal_code.trim().to_string(),
                country: self.country.trim().to_string(),
            },
        })
    }
}

fn some_if_present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
