//! Saved addresses and checkout destinations.

use serde::{Deserialize, Serialize};

use crate::types::{AddressId, AddressType, UserId};

/// Errors validating address input.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The postal code has no digits or too many.
    #[error("invalid postal code: {0}")]
    InvalidPostalCode(String),
}

/// A saved address belonging to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub street: String,
    pub house_number: String,
    pub complement: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub is_default: bool,
}

/// Address fields submitted by a user, before they are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AddressInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub street: String,
    pub house_number: String,
    pub complement: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub is_default: bool,
}

impl AddressInput {
    /// Trim every field and check the required ones.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] for a blank street, city, state
    /// or postal code, and [`AddressError::InvalidPostalCode`] when the postal
    /// code does not contain 5 to 9 digits.
    pub fn validated(self) -> Result<Self, AddressError> {
        let trim = |s: String| s.trim().to_owned();
        let optional = |s: Option<String>| s.map(trim).filter(|s| !s.is_empty());

        let input = Self {
            name: optional(self.name),
            email: optional(self.email),
            street: trim(self.street),
            house_number: trim(self.house_number),
            complement: trim(self.complement),
            city: trim(self.city),
            state: trim(self.state).to_uppercase(),
            zip_code: trim(self.zip_code),
            country: {
                let c = trim(self.country);
                if c.is_empty() { "Brasil".to_owned() } else { c }
            },
            address_type: self.address_type,
            is_default: self.is_default,
        };

        for (field, value) in [
            ("street", &input.street),
            ("city", &input.city),
            ("state", &input.state),
            ("zip_code", &input.zip_code),
        ] {
            if value.is_empty() {
                return Err(AddressError::MissingField(field));
            }
        }

        let digits = postal_code_digits(&input.zip_code);
        if !(5..=9).contains(&digits.len()) {
            return Err(AddressError::InvalidPostalCode(input.zip_code));
        }

        Ok(input)
    }
}

/// Strip everything but ASCII digits from a postal code (`30130-010` -> `30130010`).
#[must_use]
pub fn postal_code_digits(zip_code: &str) -> String {
    zip_code.chars().filter(char::is_ascii_digit).collect()
}

/// The address a user flagged as default, if any.
#[must_use]
pub fn default_address(addresses: &[Address]) -> Option<&Address> {
    addresses.iter().find(|a| a.is_default)
}

/// A destination typed in at checkout instead of picked from saved addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ManualAddress {
    pub name: String,
    pub email: String,
    pub street: String,
    pub house_number: String,
    pub complement: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Where the order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShippingDestination {
    Saved(Address),
    Manual(ManualAddress),
}

/// Uniform read-only view over either destination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationFields<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub street: &'a str,
    pub house_number: &'a str,
    pub complement: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub zip_code: &'a str,
    pub country: &'a str,
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl ShippingDestination {
    /// Normalized field access regardless of the destination kind.
    #[must_use]
    pub fn fields(&self) -> DestinationFields<'_> {
        match self {
            Self::Saved(a) => DestinationFields {
                name: a.name.as_deref().and_then(non_blank),
                email: a.email.as_deref().and_then(non_blank),
                street: a.street.trim(),
                house_number: a.house_number.trim(),
                complement: a.complement.trim(),
                city: a.city.trim(),
                state: a.state.trim(),
                zip_code: a.zip_code.trim(),
                country: a.country.trim(),
            },
            Self::Manual(m) => DestinationFields {
                name: non_blank(&m.name),
                email: non_blank(&m.email),
                street: m.street.trim(),
                house_number: m.house_number.trim(),
                complement: m.complement.trim(),
                city: m.city.trim(),
                state: m.state.trim(),
                zip_code: m.zip_code.trim(),
                country: m.country.trim(),
            },
        }
    }

    /// Whether the destination has enough to ship to: street, city and postal code.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let f = self.fields();
        !f.street.is_empty() && !f.city.is_empty() && !f.zip_code.is_empty()
    }

    /// Postal code, `None` if blank.
    #[must_use]
    pub fn postal_code(&self) -> Option<&str> {
        non_blank(self.fields().zip_code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn saved(city: &str, state: &str) -> Address {
        Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            name: None,
            email: None,
            street: "Av. Afonso Pena".to_owned(),
            house_number: "1500".to_owned(),
            complement: String::new(),
            city: city.to_owned(),
            state: state.to_owned(),
            zip_code: "30130-005".to_owned(),
            country: "Brasil".to_owned(),
            address_type: AddressType::Shipping,
            is_default: false,
        }
    }

    #[test]
    fn test_manual_destination_needs_street_city_zip() {
        let mut manual = ManualAddress {
            street: "Rua A".to_owned(),
            city: "Curitiba".to_owned(),
            zip_code: "   ".to_owned(),
            ..ManualAddress::default()
        };
        assert!(!ShippingDestination::Manual(manual.clone()).is_complete());
        manual.zip_code = "80010-000".to_owned();
        let dest = ShippingDestination::Manual(manual);
        assert!(dest.is_complete());
        assert_eq!(dest.postal_code(), Some("80010-000"));
    }

    #[test]
    fn test_fields_normalize_saved_and_manual_alike() {
        let mut a = saved(" Belo Horizonte ", "MG");
        a.name = Some("  ".to_owned());
        let dest = ShippingDestination::Saved(a);
        let fields = dest.fields();
        assert_eq!(fields.city, "Belo Horizonte");
        assert_eq!(fields.name, None);
    }

    #[test]
    fn test_destination_serde_is_tagged() {
        let json = r#"{"kind":"manual","street":"Rua B","city":"Recife","zip_code":"50000-000"}"#;
        let dest: ShippingDestination = serde_json::from_str(json).unwrap();
        assert!(matches!(dest, ShippingDestination::Manual(_)));
        assert!(dest.is_complete());
    }

    #[test]
    fn test_input_validation() {
        let input = AddressInput {
            street: " Rua C ".to_owned(),
            city: "Salvador".to_owned(),
            state: "ba".to_owned(),
            zip_code: "40000-000".to_owned(),
            ..AddressInput::default()
        };
        let valid = input.clone().validated().unwrap();
        assert_eq!(valid.street, "Rua C");
        assert_eq!(valid.state, "BA");
        assert_eq!(valid.country, "Brasil");

        let missing = AddressInput {
            city: String::new(),
            ..input.clone()
        };
        assert_eq!(
            missing.validated(),
            Err(AddressError::MissingField("city"))
        );

        let bad_zip = AddressInput {
            zip_code: "abc".to_owned(),
            ..input
        };
        assert!(matches!(
            bad_zip.validated(),
            Err(AddressError::InvalidPostalCode(_))
        ));
    }

    #[test]
    fn test_default_address() {
        let mut b = saved("Recife", "PE");
        b.id = AddressId::new(2);
        b.is_default = true;
        let list = vec![saved("Recife", "PE"), b];
        assert_eq!(default_address(&list).map(|a| a.id), Some(AddressId::new(2)));
        assert!(default_address(&list[..1]).is_none());
    }
}
