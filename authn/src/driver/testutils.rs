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

//! Utilities to help testing services that integrate with the `authn` features.

use crate::db;
use crate::driver::{AuthnDriver, AuthnOptions};
use crate::model::{
    AccessToken, Account, AccountId, AccountKind, AccountName, DriverProfile, HashedPassword,
    Password, Vehicle,
};
use rideshare_core::clocks::testutils::SettableClock;
use rideshare_core::clocks::Clock;
use rideshare_core::db::{Db, Executor};
use rideshare_core::model::EmailAddress;
use std::sync::{Arc, OnceLock};
use time::OffsetDateTime;

/// Password assigned to all accounts created by these utilities.
pub const TEST_PASSWORD: &str = "test0password";

/// Returns the hash of `TEST_PASSWORD`, computed only once per process.
fn test_password_hash() -> HashedPassword {
    static HASH: OnceLock<HashedPassword> = OnceLock::new();
    HASH.get_or_init(|| Password::from(TEST_PASSWORD).validate_and_hash(|_| None).unwrap())
        .clone()
}

/// Returns the options used by test contexts unless told otherwise.
pub fn test_options() -> AuthnOptions {
    AuthnOptions::new("test-secret")
}

/// Returns a vehicle suitable for test drivers.
pub fn test_vehicle() -> Vehicle {
    Vehicle::new("Seat Leon", "1234 XYZ", Some("blue".to_owned())).unwrap()
}

/// Inserts an account with `email` and `kind` directly into the database, bypassing any
/// validation done by the driver.  The account's password is `TEST_PASSWORD`.
pub async fn create_test_account(
    ex: &mut Executor,
    email: &str,
    kind: AccountKind,
    created: OffsetDateTime,
) -> Account {
    let name = email.split('@').next().unwrap_or(email).to_owned();
    let account = Account::new(
        AccountId::generate(),
        EmailAddress::new(email).unwrap(),
        test_password_hash(),
        AccountName::new(name).unwrap(),
        created,
        kind,
    );
    db::create_account(ex, &account).await.unwrap();
    account
}

/// State of a running test.
pub struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock backing the driver, which tests can manipulate.
    clock: Arc<SettableClock>,

    /// The driver to handle authentication flows.
    driver: AuthnDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    #[cfg(test)]
    pub(crate) async fn setup() -> Self {
        Self::setup_with_options(test_options()).await
    }

    /// Initializes the driver using an in-memory database, a settable clock and `opts`.
    #[cfg(test)]
    pub(crate) async fn setup_with_options(opts: AuthnOptions) -> Self {
        let db = Arc::from(rideshare_core::db::sqlite::testutils::setup().await);
        Self::setup_with(db, opts).await
    }

    /// Initializes the test context using an already-initialized database.
    pub async fn setup_with(db: Arc<dyn Db + Send + Sync>, opts: AuthnOptions) -> Self {
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::from(SettableClock::new(
            OffsetDateTime::from_unix_timestamp(1_685_620_800).unwrap(),
        ));
        let driver = AuthnDriver::new(db.clone(), clock.clone(), opts);
        Self { db, clock, driver }
    }

    /// Gets access to the database used by this test context.
    pub fn db(&self) -> Arc<dyn Db + Send + Sync> {
        self.db.clone()
    }

    /// Gets access to the clock used by this test context.
    pub fn clock(&self) -> Arc<SettableClock> {
        self.clock.clone()
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> AuthnDriver {
        self.driver.clone()
    }

    /// Gets a direct executor against the database.
    pub async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Creates an account of the given `kind` for testing purposes.
    async fn create(&self, email: &str, kind: AccountKind) -> Account {
        let created = self.clock.now_utc();
        create_test_account(&mut self.ex().await, email, kind, created).await
    }

    /// Creates a customer account for testing purposes.
    pub async fn create_customer(&self, email: &str) -> Account {
        self.create(email, AccountKind::Customer).await
    }

    /// Creates an offline driver account for testing purposes.
    pub async fn create_driver(&self, email: &str) -> Account {
        self.create(email, AccountKind::Driver(DriverProfile::new(test_vehicle()))).await
    }

    /// Creates an admin account for testing purposes.
    pub async fn create_admin(&self, email: &str) -> Account {
        self.create(email, AccountKind::Admin).await
    }

    /// Issues an access token for `account` as of the current fake time.
    pub fn access_token(&self, account: &Account) -> AccessToken {
        self.driver.issue_token(account).unwrap()
    }

    /// Reloads `id` from the database.
    pub async fn get_account(&self, id: AccountId) -> Account {
        db::get_account(&mut self.ex().await, id).await.unwrap()
    }
}
