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

//! Extends the driver with account management operations.

use crate::db;
use crate::driver::{require_role, AuthnDriver};
use crate::model::{Account, AccountId, AccountKind, AccountName, Availability, Password, Role};
use log::{info, warn};
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::model::EmailAddress;

impl AuthnDriver {
    /// Changes the availability of the driver `whoami` and returns its updated account.
    pub async fn set_availability(
        self,
        whoami: &Account,
        availability: Availability,
    ) -> DriverResult<Account> {
        require_role(whoami, Role::Driver)?;

        let mut tx = self.db.begin().await?;
        db::set_driver_availability(tx.ex(), whoami.id(), availability).await?;
        let account = db::get_account(tx.ex(), whoami.id()).await?;
        tx.commit().await?;

        info!("Driver {} is now {}", account.id(), availability.as_str());
        Ok(account)
    }

    /// Lists all accounts, optionally restricted to those with `role`.  Admins only.
    pub async fn list_accounts(
        self,
        whoami: &Account,
        role: Option<Role>,
    ) -> DriverResult<Vec<Account>> {
        require_role(whoami, Role::Admin)?;

        let mut ex = self.db.ex().await?;
        Ok(db::list_accounts(&mut ex, role).await?)
    }

    /// Creates a new admin account on behalf of the admin `whoami`.
    pub async fn create_admin(
        self,
        whoami: &Account,
        email: EmailAddress,
        password: Password,
        name: AccountName,
    ) -> DriverResult<Account> {
        require_role(whoami, Role::Admin)?;

        let account = self.create_account(email, password, name, AccountKind::Admin).await?;
        info!("Admin {} created admin account {}", whoami.id(), account.id());
        Ok(account)
    }

    /// Blocks or unblocks the account `id` on behalf of the admin `whoami`.
    pub async fn set_blocked(
        self,
        whoami: &Account,
        id: AccountId,
        blocked: bool,
    ) -> DriverResult<Account> {
        require_role(whoami, Role::Admin)?;
        if blocked && whoami.id() == id {
            return Err(DriverError::InvalidInput("Admins cannot block themselves".to_owned()));
        }

        let mut tx = self.db.begin().await?;
        match db::set_account_blocked(tx.ex(), id, blocked).await {
            Ok(()) => (),
            Err(DbError::NotFound) => {
                return Err(DriverError::NotFound(format!("Account {} not found", id)));
            }
            Err(e) => return Err(e.into()),
        }
        let account = db::get_account(tx.ex(), id).await?;
        tx.commit().await?;

        info!(
            "Admin {} {} account {}",
            whoami.id(),
            if blocked { "blocked" } else { "unblocked" },
            id
        );
        Ok(account)
    }

    /// Creates the initial admin account with `email` unless an account with that email exists.
    ///
    /// Returns the new account, or `None` if nothing was created.
    pub async fn bootstrap_admin(
        self,
        email: EmailAddress,
        password: Password,
        name: AccountName,
    ) -> DriverResult<Option<Account>> {
        {
            let mut ex = self.db.ex().await?;
            match db::get_account_by_email(&mut ex, &email).await {
                Ok(existing) => {
                    if existing.role() != Role::Admin {
                        warn!(
                            "Bootstrap admin {} exists with role {}; leaving it alone",
                            email.as_str(),
                            existing.role()
                        );
                    }
                    return Ok(None);
                }
                Err(DbError::NotFound) => (),
                Err(e) => return Err(e.into()),
            }
        }

        let account = self.create_account(email, password, name, AccountKind::Admin).await?;
        info!("Bootstrapped admin account {}", account.id());
        Ok(Some(account))
    }
}
