// Rideshare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! The `EmailAddress` data type.

use crate::model::{ModelError, ModelResult};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// Maximum length of email addresses per the schema.
pub(crate) const MAX_EMAIL_LENGTH: usize = 128;

/// Represents a correctly-formatted email address.
///
/// Email addresses identify accounts at login time, so they are normalized to lowercase and
/// stripped of surrounding whitespace on construction.  Two addresses that only differ in case
/// are the same account.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: AsRef<str>>(s: S) -> ModelResult<Self> {
        let s = s.as_ref().trim().to_lowercase();

        if s.is_empty() {
            return Err(ModelError("Email address cannot be empty".to_owned()));
        }
        if s.len() > MAX_EMAIL_LENGTH {
            return Err(ModelError("Email address is too long".to_owned()));
        }

        // Attempting to fully validate email addresses is futile.  We only make sure that there
        // is a non-empty local part and a non-empty domain.
        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !s.contains(char::is_whitespace) =>
            {
                Ok(Self(s))
            }
            _ => Err(ModelError(format!("Email does not look like a valid address '{}'", s))),
        }
    }

    /// Creates a new email address from an untrusted string `s`, without validation.  Useful for
    /// testing purposes only.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the email address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&str> for EmailAddress {
    fn from(raw_email: &str) -> Self {
        Self::new(raw_email).expect("Hardcoded email addresses for testing must be valid")
    }
}

/// Visitor to deserialize an `EmailAddress` from a string.
struct EmailAddressVisitor;

impl Visitor<'_> for EmailAddressVisitor {
    type Value = EmailAddress;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str(r#"an email address"#)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(EmailAddressVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens_error, assert_tokens, Token};

    #[test]
    fn test_emailaddress_ok() {
        assert_eq!("simple@example.com", EmailAddress::new("simple@example.com").unwrap().as_str());
        assert_eq!("a!b@c", EmailAddress::new("a!b@c").unwrap().as_str());
    }

    #[test]
    fn test_emailaddress_normalized() {
        assert_eq!("foo@example.com", EmailAddress::new("  Foo@Example.COM ").unwrap().as_str());
        assert_eq!(
            EmailAddress::new("foo@example.com").unwrap(),
            EmailAddress::new("FOO@example.com").unwrap()
        );
    }

    #[test]
    fn test_emailaddress_error() {
        assert!(EmailAddress::new("").is_err());
        assert!(EmailAddress::new("   ").is_err());
        assert!(EmailAddress::new("foo").is_err());
        assert!(EmailAddress::new("@example.com").is_err());
        assert!(EmailAddress::new("foo@").is_err());
        assert!(EmailAddress::new("foo bar@example.com").is_err());

        let mut long_string = format!("a@{}", "b".repeat(MAX_EMAIL_LENGTH - 2));
        assert!(EmailAddress::new(&long_string).is_ok());
        long_string.push('x');
        assert!(EmailAddress::new(&long_string).is_err());
    }

    #[test]
    fn test_emailaddress_invalid() {
        assert!(EmailAddress::new(EmailAddress::new_invalid("a").as_str()).is_err());
    }

    #[test]
    fn test_emailaddress_ser_de_ok() {
        let email = EmailAddress::new("hello@example.com").unwrap();
        assert_tokens(&email, &[Token::Str("hello@example.com")]);
    }

    #[test]
    fn test_emailaddress_de_error() {
        assert_de_tokens_error::<EmailAddress>(
            &[Token::Str("HelloWorld")],
            "Email does not look like a valid address 'helloworld'",
        );
    }
}
