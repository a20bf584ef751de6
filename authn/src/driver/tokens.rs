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

//! Extends the driver with the issuance and validation of access tokens.

use crate::db;
use crate::driver::AuthnDriver;
use crate::model::{AccessToken, Account, Claims};
use jsonwebtoken::{Algorithm, Header, Validation};
use log::debug;
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};

impl AuthnDriver {
    /// Issues a new signed access token for `account`.
    pub(crate) fn issue_token(&self, account: &Account) -> DriverResult<AccessToken> {
        let now = self.clock.now_utc();
        let claims = Claims {
            id: account.id(),
            email: account.email().clone(),
            role: account.role(),
            iat: now.unix_timestamp(),
            exp: (now + self.opts.token_max_age).unix_timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| DriverError::BackendError(format!("Cannot sign access token: {}", e)))?;
        AccessToken::new(token)
            .map_err(|e| DriverError::BackendError(format!("Generated bad access token: {}", e)))
    }

    /// Verifies the signature of `token` and its validity period, returning its claims.
    fn decode_token(&self, token: &AccessToken) -> DriverResult<Claims> {
        // Expiration is checked by hand against our own clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = match jsonwebtoken::decode::<Claims>(
            token.as_str(),
            &self.decoding_key,
            &validation,
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Rejecting access token: {}", e);
                return Err(DriverError::Unauthorized("Invalid access token".to_owned()));
            }
        };

        let now = self.clock.now_utc();
        if now.unix_timestamp() >= claims.exp {
            return Err(DriverError::Unauthorized("Access token has expired".to_owned()));
        }
        if claims.iat > (now + self.opts.token_max_skew).unix_timestamp() {
            return Err(DriverError::Unauthorized("Access token issued in the future".to_owned()));
        }

        Ok(claims)
    }

    /// Validates `token` and returns the account it belongs to.
    ///
    /// The returned account is freshly loaded from the database, so its role and blocked state
    /// reflect the current values and not those at token issuance time.
    pub async fn authenticate(self, token: AccessToken) -> DriverResult<Account> {
        let claims = self.decode_token(&token)?;

        let mut ex = self.db.ex().await?;
        let account = match db::get_account(&mut ex, claims.id).await {
            Ok(account) => account,
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized("Unknown account".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if account.blocked() {
            return Err(DriverError::Forbidden("Account is blocked".to_owned()));
        }

        Ok(account)
    }
}
