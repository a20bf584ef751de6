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

//! Extends the driver with the `login` method.

use crate::db;
use crate::driver::{run_blocking, AuthnDriver};
use crate::model::{AccessToken, Account, Password};
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::model::EmailAddress;

impl AuthnDriver {
    /// Logs the account with `email` in with `password` and returns a new access token for it.
    ///
    /// Unknown accounts and wrong passwords are indistinguishable to the caller.
    pub async fn login(
        self,
        email: EmailAddress,
        password: Password,
    ) -> DriverResult<(AccessToken, Account)> {
        let mut ex = self.db.ex().await?;

        let account = match db::get_account_by_email(&mut ex, &email).await {
            Ok(account) => account,
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized("Invalid credentials".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        let hash = account.password().clone();
        let valid = run_blocking(move || password.verify(&hash))
            .await?
            .map_err(|e| DriverError::BackendError(e.to_string()))?;
        if !valid {
            return Err(DriverError::Unauthorized("Invalid credentials".to_owned()));
        }

        if account.blocked() {
            return Err(DriverError::Forbidden("Account is blocked".to_owned()));
        }

        let access_token = self.issue_token(&account)?;
        Ok((access_token, account))
    }
}
