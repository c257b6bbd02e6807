//! Email addresses and recipient list parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator for multiple addresses (and names) given as one string.
pub const ADDRESS_SEPARATOR: char = ';';

/// An email address with an optional display name.
///
/// Two addresses are equal when both the email and the name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    email: String,
    name: Option<String>,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// The email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Replaces the display name.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Display name when it is set and not empty.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Converts to a header mailbox.
    #[must_use]
    pub fn to_mailbox(&self) -> mailkite_mime::Mailbox {
        mailkite_mime::Mailbox::new(self.email.clone(), self.display_name())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

/// `(email, name)`.
impl From<(&str, &str)> for Address {
    fn from((email, name): (&str, &str)) -> Self {
        Self::with_name(email, name)
    }
}

/// Splits `;`-delimited addresses and names and zips them by position.
///
/// Tokens are trimmed. Addresses without a matching name token get an empty
/// name, extra name tokens are ignored and empty address tokens are skipped.
#[must_use]
pub fn split_addresses(addresses: &str, names: &str) -> Vec<Address> {
    let names: Vec<&str> = names.split(ADDRESS_SEPARATOR).map(str::trim).collect();

    addresses
        .split(ADDRESS_SEPARATOR)
        .map(str::trim)
        .enumerate()
        .filter(|(_, email)| !email.is_empty())
        .map(|(i, email)| Address::with_name(email, names.get(i).copied().unwrap_or_default()))
        .collect()
}

/// Parses a single string that may hold several `;`-delimited addresses.
///
/// A lone address keeps `name = None`; delimited ones get empty names.
#[must_use]
pub fn parse_addresses(addresses: &str) -> Vec<Address> {
    if addresses.contains(ADDRESS_SEPARATOR) {
        split_addresses(addresses, "")
    } else {
        let email = addresses.trim();
        if email.is_empty() {
            Vec::new()
        } else {
            vec![Address::new(email)]
        }
    }
}

/// Values accepted wherever the builder takes recipients.
pub trait IntoAddresses {
    /// Converts into an ordered list of addresses.
    fn into_addresses(self) -> Vec<Address>;
}

impl IntoAddresses for Address {
    fn into_addresses(self) -> Vec<Address> {
        vec![self]
    }
}

impl IntoAddresses for &Address {
    fn into_addresses(self) -> Vec<Address> {
        vec![self.clone()]
    }
}

impl IntoAddresses for &str {
    fn into_addresses(self) -> Vec<Address> {
        parse_addresses(self)
    }
}

impl IntoAddresses for String {
    fn into_addresses(self) -> Vec<Address> {
        parse_addresses(&self)
    }
}

impl IntoAddresses for &String {
    fn into_addresses(self) -> Vec<Address> {
        parse_addresses(self)
    }
}

/// `(addresses, names)` pair of `;`-delimited strings.
impl IntoAddresses for (&str, &str) {
    fn into_addresses(self) -> Vec<Address> {
        if self.0.contains(ADDRESS_SEPARATOR) {
            split_addresses(self.0, self.1)
        } else {
            let email = self.0.trim();
            if email.is_empty() {
                Vec::new()
            } else {
                vec![Address::with_name(email, self.1.trim())]
            }
        }
    }
}

impl IntoAddresses for Vec<Address> {
    fn into_addresses(self) -> Vec<Address> {
        self
    }
}

impl IntoAddresses for &[Address] {
    fn into_addresses(self) -> Vec<Address> {
        self.to_vec()
    }
}

impl IntoAddresses for Vec<String> {
    fn into_addresses(self) -> Vec<Address> {
        self.into_iter().map(Address::new).collect()
    }
}

impl IntoAddresses for Vec<&str> {
    fn into_addresses(self) -> Vec<Address> {
        self.into_iter().map(Address::new).collect()
    }
}

impl<const N: usize> IntoAddresses for [&str; N] {
    fn into_addresses(self) -> Vec<Address> {
        self.into_iter().map(Address::new).collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(addresses: &[Address]) -> Vec<Option<&str>> {
        addresses.iter().map(Address::name).collect()
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new("a@test.com").to_string(), "a@test.com");
        assert_eq!(
            Address::with_name("a@test.com", "Alice").to_string(),
            "Alice <a@test.com>"
        );
        assert_eq!(Address::with_name("a@test.com", "").to_string(), "a@test.com");
    }

    #[test]
    fn test_equality_uses_both_fields() {
        assert_eq!(Address::new("a@test.com"), Address::new("a@test.com"));
        assert_ne!(
            Address::new("a@test.com"),
            Address::with_name("a@test.com", "Alice")
        );
        assert_ne!(Address::new("a@test.com"), Address::new("b@test.com"));
    }

    #[test]
    fn test_set_name() {
        let mut address = Address::new("a@test.com");
        address.set_name(Some("Alice".to_string()));
        assert_eq!(address.name(), Some("Alice"));
    }

    #[test]
    fn test_split_with_matching_names() {
        let addresses = split_addresses("james@test.com;john@test.com", "James 1;John 2");
        assert_eq!(addresses.len(), 2);
        assert_eq!(names(&addresses), vec![Some("James 1"), Some("John 2")]);
    }

    #[test]
    fn test_split_backfills_missing_names() {
        let addresses = split_addresses("james@test.com; john@test.com", "James 1");
        assert_eq!(addresses[1].email(), "john@test.com");
        assert_eq!(names(&addresses), vec![Some("James 1"), Some("")]);
    }

    #[test]
    fn test_split_empty_name_token() {
        let addresses = split_addresses(
            "james@test.com; john@test.com;   Fred@test.com",
            "James 1;;Fred",
        );
        assert_eq!(addresses.len(), 3);
        assert_eq!(addresses[2].email(), "Fred@test.com");
        assert_eq!(names(&addresses), vec![Some("James 1"), Some(""), Some("Fred")]);
    }

    #[test]
    fn test_split_ignores_extra_names_and_empty_addresses() {
        let addresses = split_addresses("a@test.com;", "A;B;C");
        assert_eq!(addresses, vec![Address::with_name("a@test.com", "A")]);
    }

    #[test]
    fn test_single_string_without_name() {
        assert_eq!("a@test.com".into_addresses(), vec![Address::new("a@test.com")]);
        assert!("  ".into_addresses().is_empty());
    }

    #[test]
    fn test_into_addresses_variants() {
        assert_eq!(vec!["a@test.com", "b@test.com"].into_addresses().len(), 2);
        assert_eq!(["a@test.com", "b@test.com"].into_addresses().len(), 2);
        assert_eq!(
            vec!["a@test.com".to_string()].into_addresses(),
            vec![Address::new("a@test.com")]
        );
        assert_eq!(
            ("a@test.com", "Alice").into_addresses(),
            vec![Address::with_name("a@test.com", "Alice")]
        );
    }

    proptest! {
        #[test]
        fn prop_split_yields_one_address_per_token(
            emails in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.com", 1..6),
            name_list in prop::collection::vec("[A-Za-z ]{0,8}", 0..8),
        ) {
            let addresses = split_addresses(&emails.join(";"), &name_list.join(";"));
            prop_assert_eq!(addresses.len(), emails.len());

            for (i, address) in addresses.iter().enumerate() {
                prop_assert_eq!(address.email(), emails[i].as_str());
                // A missing token and an empty name list both backfill ""
                let expected = name_list.get(i).map_or("", |n| n.trim());
                prop_assert_eq!(address.name(), Some(expected));
            }
        }
    }
}
