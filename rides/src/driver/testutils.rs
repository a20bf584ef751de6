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

//! Test utilities for the rides driver.

use crate::db;
use crate::driver::{RidesDriver, RidesOptions};
use crate::model::{DistanceKm, Location, Ride, RideId};
use rideshare_authn::driver::testutils::{test_options, TestContext as AuthnTestContext};
use rideshare_authn::driver::AuthnOptions;
use rideshare_authn::model::{Account, AccountId};
use rideshare_core::clocks::Clock;
use rideshare_core::db::{Db, Executor};
use rideshare_core::model::Money;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Returns a location to use as the pickup point of test rides.
pub fn home() -> Location {
    Location::new("1 Home Street", Some((41.3874, 2.1686))).unwrap()
}

/// Returns a location to use as the dropoff point of test rides.
pub fn work() -> Location {
    Location::new("99 Work Avenue", None).unwrap()
}

/// State of a running test.
pub struct TestContext {
    /// The accounts side of the test, which owns the database and the clock.
    authn: AuthnTestContext,

    /// The driver to handle rides.
    driver: RidesDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and default options.
    #[cfg(test)]
    pub(crate) async fn setup() -> Self {
        Self::setup_with_options(RidesOptions::default()).await
    }

    /// Initializes the driver using an in-memory database and `opts`.
    #[cfg(test)]
    pub(crate) async fn setup_with_options(opts: RidesOptions) -> Self {
        let db = Arc::from(rideshare_core::db::sqlite::testutils::setup().await);
        Self::setup_with(db, test_options(), opts).await
    }

    /// Initializes the test context using an already-initialized database.
    pub async fn setup_with(
        db: Arc<dyn Db + Send + Sync>,
        authn_opts: AuthnOptions,
        rides_opts: RidesOptions,
    ) -> Self {
        let authn = AuthnTestContext::setup_with(db.clone(), authn_opts).await;
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let driver = RidesDriver::new(db, authn.clock(), rides_opts);
        Self { authn, driver }
    }

    /// Gets access to the accounts side of the test.
    pub fn authn(&self) -> &AuthnTestContext {
        &self.authn
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> RidesDriver {
        self.driver.clone()
    }

    /// Gets a direct executor against the database.
    pub async fn ex(&self) -> Executor {
        self.authn.ex().await
    }

    /// Returns the current fake time.
    pub fn now(&self) -> OffsetDateTime {
        self.authn.clock().now_utc()
    }

    /// Moves the fake time forward by one second.
    pub fn advance_clock(&self) {
        self.authn.clock().advance(Duration::from_secs(1));
    }

    /// Requests a ride of `km` kilometers on behalf of `customer`.
    pub async fn request_ride(&self, customer: &Account, km: f64) -> Ride {
        self.driver()
            .request_ride(customer, home(), work(), DistanceKm::new(km).unwrap())
            .await
            .unwrap()
    }

    /// Reloads the ride `id` from the database.
    pub async fn get_ride(&self, id: RideId) -> Ride {
        db::get_ride(&mut self.ex().await, id).await.unwrap()
    }

    /// Gets the wallet balance of the driver `id`.
    pub async fn wallet(&self, id: AccountId) -> Money {
        let account = self.authn.get_account(id).await;
        account.driver_profile().map(|p| p.wallet).unwrap()
    }
}
