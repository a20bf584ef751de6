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

//! Extends the driver with fare estimation and rate card management.

use crate::db;
use crate::driver::RidesDriver;
use crate::model::{DistanceKm, RateCard};
use log::info;
use rideshare_authn::driver::require_role;
use rideshare_authn::model::{Account, Role};
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::model::Money;

impl RidesDriver {
    /// Computes the fare of a ride of length `distance` under the current rates.
    ///
    /// Returns the fare along with the rate card used to compute it.
    pub async fn estimate_fare(self, distance: DistanceKm) -> DriverResult<(Money, RateCard)> {
        let mut ex = self.db.ex().await?;
        let rates = self.current_rates(&mut ex).await?;
        let fare = rates.estimate(distance)?;
        Ok((fare, rates))
    }

    /// Gets the rate card in effect.
    pub async fn get_rates(self) -> DriverResult<RateCard> {
        let mut ex = self.db.ex().await?;
        self.current_rates(&mut ex).await
    }

    /// Replaces the rates with a new card on behalf of the admin `whoami`.
    ///
    /// The new card gets the next version number.  If another update claims that version first,
    /// this fails with a conflict and nothing changes.
    pub async fn put_rates(
        self,
        whoami: &Account,
        base_fare: Money,
        per_km: Money,
    ) -> DriverResult<RateCard> {
        require_role(whoami, Role::Admin)?;

        let mut ex = self.db.ex().await?;
        let current = self.current_rates(&mut ex).await?;
        let rates = RateCard {
            version: current.version + 1,
            base_fare,
            per_km,
            updated: self.clock.now_utc(),
            updated_by: Some(whoami.id()),
        };
        match db::insert_rates(&mut ex, &rates).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::Conflict(format!(
                    "Rates version {} was created concurrently; try again",
                    rates.version
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Admin {} set rates v{}: base {} + {} per km",
            whoami.id(),
            rates.version,
            base_fare,
            per_km
        );
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::driver::RidesOptions;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_estimate_fare_default_rates() {
        let context = TestContext::setup().await;

        let (fare, rates) =
            context.driver().estimate_fare(DistanceKm::new(5.0).unwrap()).await.unwrap();
        assert_eq!("17.50", fare.to_string());
        assert_eq!(0, rates.version);
    }

    #[tokio::test]
    async fn test_estimate_fare_configured_defaults() {
        let opts = RidesOptions {
            default_base_fare: Money::from_cents(100).unwrap(),
            default_per_km: Money::from_cents(33).unwrap(),
        };
        let context = TestContext::setup_with_options(opts).await;

        let (fare, _) =
            context.driver().estimate_fare(DistanceKm::new(1.5).unwrap()).await.unwrap();
        assert_eq!("1.50", fare.to_string());
    }

    #[tokio::test]
    async fn test_get_rates_default() {
        let context = TestContext::setup().await;

        let rates = context.driver().get_rates().await.unwrap();
        assert_eq!(
            RateCard {
                version: 0,
                base_fare: Money::from_cents(500).unwrap(),
                per_km: Money::from_cents(250).unwrap(),
                updated: OffsetDateTime::UNIX_EPOCH,
                updated_by: None,
            },
            rates
        );
    }

    #[tokio::test]
    async fn test_put_rates_versions() {
        let context = TestContext::setup().await;
        let admin = context.authn().create_admin("a@example.com").await;

        let v1 = context
            .driver()
            .put_rates(&admin, Money::from_cents(300).unwrap(), Money::from_cents(100).unwrap())
            .await
            .unwrap();
        assert_eq!(1, v1.version);
        assert_eq!(Some(admin.id()), v1.updated_by);
        assert_eq!(context.now(), v1.updated);
        assert_eq!(v1, context.driver().get_rates().await.unwrap());

        context.advance_clock();
        let v2 = context
            .driver()
            .put_rates(&admin, Money::from_cents(400).unwrap(), Money::from_cents(200).unwrap())
            .await
            .unwrap();
        assert_eq!(2, v2.version);
        assert_eq!(v2, context.driver().get_rates().await.unwrap());

        let (fare, rates) =
            context.driver().estimate_fare(DistanceKm::new(2.0).unwrap()).await.unwrap();
        assert_eq!("8.00", fare.to_string());
        assert_eq!(v2, rates);
    }

    #[tokio::test]
    async fn test_put_rates_after_concurrent_update() {
        let context = TestContext::setup().await;
        let admin = context.authn().create_admin("a@example.com").await;

        // Another writer got version 1 in first: reusing it fails and the next update skips it.
        let taken = RateCard {
            version: 1,
            base_fare: Money::from_cents(1).unwrap(),
            per_km: Money::from_cents(1).unwrap(),
            updated: context.now(),
            updated_by: None,
        };
        db::insert_rates(&mut context.ex().await, &taken).await.unwrap();
        assert_eq!(
            DbError::AlreadyExists,
            db::insert_rates(&mut context.ex().await, &taken).await.unwrap_err()
        );

        let v2 = context
            .driver()
            .put_rates(&admin, Money::from_cents(2).unwrap(), Money::from_cents(2).unwrap())
            .await
            .unwrap();
        assert_eq!(2, v2.version);
    }

    #[tokio::test]
    async fn test_put_rates_only_admins() {
        let context = TestContext::setup().await;
        let customer = context.authn().create_customer("c@example.com").await;

        assert_eq!(
            DriverError::Forbidden("Only admins can perform this operation".to_owned()),
            context
                .driver()
                .put_rates(&customer, Money::default(), Money::default())
                .await
                .unwrap_err()
        );
    }
}
