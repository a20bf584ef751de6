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

//! Business logic for rides and fares.

use crate::db;
use crate::model::{RateCard, Ride, RideId};
use rideshare_core::clocks::Clock;
use rideshare_core::db::{Db, DbError, Executor};
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::env::get_optional_var;
use rideshare_core::model::Money;
use std::sync::Arc;
use time::OffsetDateTime;

mod fares;
mod rides;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod transitions;

/// Default value for the `DEFAULT_BASE_FARE` setting when not specified, in cents.
const DEFAULT_BASE_FARE_CENTS: i64 = 500;

/// Default value for the `DEFAULT_PER_KM` setting when not specified, in cents.
const DEFAULT_PER_KM_CENTS: i64 = 250;

/// Configuration options for the rides driver.
#[derive(Clone, Debug, PartialEq)]
pub struct RidesOptions {
    /// Base fare to use until an admin configures the rates.
    pub default_base_fare: Money,

    /// Per-kilometer fare to use until an admin configures the rates.
    pub default_per_km: Money,
}

impl Default for RidesOptions {
    fn default() -> Self {
        Self {
            default_base_fare: Money::from_cents(DEFAULT_BASE_FARE_CENTS).unwrap_or_default(),
            default_per_km: Money::from_cents(DEFAULT_PER_KM_CENTS).unwrap_or_default(),
        }
    }
}

impl RidesOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_DEFAULT_BASE_FARE` and
    /// `<prefix>_DEFAULT_PER_KM`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            default_base_fare: get_optional_var::<Money>(prefix, "DEFAULT_BASE_FARE")?
                .unwrap_or(defaults.default_base_fare),
            default_per_km: get_optional_var::<Money>(prefix, "DEFAULT_PER_KM")?
                .unwrap_or(defaults.default_per_km),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct RidesDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Options for the rides driver.
    opts: Arc<RidesOptions>,
}

impl RidesDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: RidesOptions,
    ) -> Self {
        Self { db, clock, opts: Arc::from(opts) }
    }

    /// Returns the rate card built from the configured defaults.
    fn default_rates(&self) -> RateCard {
        RateCard {
            version: 0,
            base_fare: self.opts.default_base_fare,
            per_km: self.opts.default_per_km,
            updated: OffsetDateTime::UNIX_EPOCH,
            updated_by: None,
        }
    }

    /// Gets the rate card in effect, falling back to the defaults if none was ever stored.
    async fn current_rates(&self, ex: &mut Executor) -> DriverResult<RateCard> {
        match db::get_current_rates(ex).await? {
            Some(rates) => Ok(rates),
            None => Ok(self.default_rates()),
        }
    }
}

/// Gets the ride `id`, turning a missing ride into a descriptive error.
async fn get_ride_or_not_found(ex: &mut Executor, id: RideId) -> DriverResult<Ride> {
    match db::get_ride(ex, id).await {
        Ok(ride) => Ok(ride),
        Err(DbError::NotFound) => Err(DriverError::NotFound(format!("Ride {} not found", id))),
        Err(e) => Err(e.into()),
    }
}
