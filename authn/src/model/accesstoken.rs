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

//! The `AccessToken` data type and the claims it carries.

use crate::model::{AccountId, Role};
use rideshare_core::model::{EmailAddress, ModelError, ModelResult};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length we accept for a token.  Our tokens are far shorter than this; the limit only
/// protects the decoder from garbage.
const MAX_TOKEN_LENGTH: usize = 2048;

/// An opaque type to hold a signed access token, protecting it from leaking into logs.
///
/// The contents are a JWT: three dot-separated segments of URL-safe base64.  Only the shape is
/// validated here; the signature and the claims are checked by the driver.
#[derive(Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new access token from a raw string, validating its shape.
    pub fn new<S: Into<String>>(token: S) -> ModelResult<Self> {
        let token = token.into();
        if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
            return Err(ModelError("Invalid access token".to_owned()));
        }

        let segments = token.split('.').collect::<Vec<&str>>();
        let valid_segment =
            |s: &&str| s.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if segments.len() != 3 || segments[..2].iter().any(|s| s.is_empty()) {
            return Err(ModelError("Invalid access token".to_owned()));
        }
        if !segments.iter().all(valid_segment) {
            return Err(ModelError("Invalid access token".to_owned()));
        }

        Ok(Self(token))
    }

    /// Returns a string view of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed access token")
    }
}

/// Visitor to deserialize an `AccessToken` from a string.
struct AccessTokenVisitor;

impl Visitor<'_> for AccessTokenVisitor {
    type Value = AccessToken;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(r#"an access token"#)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        AccessToken::new(v).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for AccessToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AccessTokenVisitor)
    }
}

/// Claims embedded in an access token.
///
/// The `role` is informational only: authorization decisions use the role stored in the database
/// at the time the token is presented.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct Claims {
    /// Identifier of the account the token was issued to.
    pub id: AccountId,

    /// Email address of the account at issuance time.
    pub email: EmailAddress,

    /// Role of the account at issuance time.
    pub role: Role,

    /// Issuance time, in seconds since the epoch.
    pub iat: i64,

    /// Expiration time, in seconds since the epoch.
    pub exp: i64,
}
