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

//! Extends the driver with operations to create, query and delete rides.

use crate::db::{self, RideFilter};
use crate::driver::{get_ride_or_not_found, RidesDriver};
use crate::model::{DistanceKm, Location, Ride, RideId, RideStatus};
use log::info;
use rideshare_authn::driver::require_role;
use rideshare_authn::model::{Account, Role};
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};

/// Returns true if `whoami` is allowed to see `ride`.
///
/// Admins see everything, customers see their own rides and drivers see the rides assigned to
/// them as well as any ride that is still waiting for a driver.
fn can_view(whoami: &Account, ride: &Ride) -> bool {
    match whoami.role() {
        Role::Admin => true,
        Role::Customer => ride.customer_id() == whoami.id(),
        Role::Driver => {
            ride.driver_id() == Some(whoami.id()) || ride.status() == RideStatus::Requested
        }
    }
}

impl RidesDriver {
    /// Requests a new ride on behalf of the customer `whoami`.
    ///
    /// The fare is estimated with the rate card in effect at this moment and never changes
    /// afterwards even if the rates do.
    pub async fn request_ride(
        self,
        whoami: &Account,
        pickup: Location,
        dropoff: Location,
        distance: DistanceKm,
    ) -> DriverResult<Ride> {
        require_role(whoami, Role::Customer)?;

        let mut ex = self.db.ex().await?;
        let rates = self.current_rates(&mut ex).await?;
        let estimated_fare = rates.estimate(distance)?;

        let ride = Ride::new(
            RideId::generate(),
            whoami.id(),
            pickup,
            dropoff,
            distance,
            estimated_fare,
            rates.version,
            self.clock.now_utc(),
        );
        db::create_ride(&mut ex, &ride).await?;

        info!(
            "Customer {} requested ride {} with estimated fare {} (rates v{})",
            whoami.id(),
            ride.id(),
            estimated_fare,
            rates.version
        );
        Ok(ride)
    }

    /// Gets the ride `id` if `whoami` is allowed to see it.
    pub async fn get_ride(self, whoami: &Account, id: RideId) -> DriverResult<Ride> {
        let mut ex = self.db.ex().await?;
        let ride = get_ride_or_not_found(&mut ex, id).await?;
        if !can_view(whoami, &ride) {
            return Err(DriverError::Forbidden(format!("Cannot view ride {}", id)));
        }
        Ok(ride)
    }

    /// Lists the rides relevant to `whoami`, newest first.
    ///
    /// Customers get the rides they requested, drivers get the rides assigned to them and
    /// admins get all rides.
    pub async fn list_rides(self, whoami: &Account) -> DriverResult<Vec<Ride>> {
        let filter = match whoami.role() {
            Role::Admin => RideFilter::All,
            Role::Customer => RideFilter::Customer(whoami.id()),
            Role::Driver => RideFilter::Driver(whoami.id()),
        };

        let mut ex = self.db.ex().await?;
        Ok(db::list_rides(&mut ex, filter).await?)
    }

    /// Lists the rides waiting for a driver, oldest first.  Drivers only.
    pub async fn list_open_rides(self, whoami: &Account) -> DriverResult<Vec<Ride>> {
        require_role(whoami, Role::Driver)?;

        let mut ex = self.db.ex().await?;
        Ok(db::list_open_rides(&mut ex).await?)
    }

    /// Deletes the ride `id` regardless of its status.  Admins only.
    pub async fn delete_ride(self, whoami: &Account, id: RideId) -> DriverResult<()> {
        require_role(whoami, Role::Admin)?;

        let mut ex = self.db.ex().await?;
        match db::delete_ride(&mut ex, id).await {
            Ok(()) => (),
            Err(DbError::NotFound) => {
                return Err(DriverError::NotFound(format!("Ride {} not found", id)));
            }
            Err(e) => return Err(e.into()),
        }

        info!("Admin {} deleted ride {}", whoami.id(), id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use rideshare_core::model::Money;

    #[tokio::test]
    async fn test_request_ride_uses_default_rates() {
        let context = TestContext::setup().await;
        let customer = context.authn().create_customer("c@example.com").await;

        let ride = context
            .driver()
            .request_ride(&customer, home(), work(), DistanceKm::new(5.0).unwrap())
            .await
            .unwrap();
        assert_eq!(RideStatus::Requested, ride.status());
        assert_eq!(customer.id(), ride.customer_id());
        assert_eq!(None, ride.driver_id());
        assert_eq!("17.50", ride.estimated_fare().to_string());
        assert_eq!(0, ride.rate_version());
        assert_eq!(context.now(), ride.requested_at());

        assert_eq!(ride, context.get_ride(ride.id()).await);
    }

    #[tokio::test]
    async fn test_request_ride_uses_current_rates() {
        let context = TestContext::setup().await;
        let admin = context.authn().create_admin("a@example.com").await;
        let customer = context.authn().create_customer("c@example.com").await;

        let old = context.request_ride(&customer, 10.0).await;

        context
            .driver()
            .put_rates(&admin, Money::from_cents(100).unwrap(), Money::from_cents(100).unwrap())
            .await
            .unwrap();

        let new = context.request_ride(&customer, 10.0).await;
        assert_eq!("11.00", new.estimated_fare().to_string());
        assert_eq!(1, new.rate_version());

        // Existing rides keep the estimate they were created with.
        let old_reloaded = context.get_ride(old.id()).await;
        assert_eq!("30.00", old_reloaded.estimated_fare().to_string());
        assert_eq!(0, old_reloaded.rate_version());
    }

    #[tokio::test]
    async fn test_request_ride_only_customers() {
        let context = TestContext::setup().await;
        let driver = context.authn().create_driver("d@example.com").await;
        let admin = context.authn().create_admin("a@example.com").await;

        for account in [driver, admin] {
            let err = context
                .driver()
                .request_ride(&account, home(), work(), DistanceKm::new(1.0).unwrap())
                .await
                .unwrap_err();
            assert_eq!(
                DriverError::Forbidden("Only customers can perform this operation".to_owned()),
                err
            );
        }
    }

    #[tokio::test]
    async fn test_get_ride_visibility() {
        let context = TestContext::setup().await;
        let customer = context.authn().create_customer("c@example.com").await;
        let other_customer = context.authn().create_customer("o@example.com").await;
        let driver = context.authn().create_driver("d@example.com").await;
        let other_driver = context.authn().create_driver("e@example.com").await;
        let admin = context.authn().create_admin("a@example.com").await;

        let ride = context.request_ride(&customer, 1.0).await;

        // While open, any driver can see the ride.
        for account in [&customer, &driver, &other_driver, &admin] {
            assert_eq!(ride, context.driver().get_ride(account, ride.id()).await.unwrap());
        }
        assert_eq!(
            DriverError::Forbidden(format!("Cannot view ride {}", ride.id())),
            context.driver().get_ride(&other_customer, ride.id()).await.unwrap_err()
        );

        // Once taken, only the assigned driver can.
        context.driver().accept_ride(&driver, ride.id()).await.unwrap();
        for account in [&customer, &driver, &admin] {
            context.driver().get_ride(account, ride.id()).await.unwrap();
        }
        for account in [&other_customer, &other_driver] {
            let err = context.driver().get_ride(account, ride.id()).await.unwrap_err();
            assert!(matches!(err, DriverError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn test_get_ride_not_found() {
        let context = TestContext::setup().await;
        let admin = context.authn().create_admin("a@example.com").await;

        let id = RideId::generate();
        assert_eq!(
            DriverError::NotFound(format!("Ride {} not found", id)),
            context.driver().get_ride(&admin, id).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_list_rides_by_role() {
        let context = TestContext::setup().await;
        let customer1 = context.authn().create_customer("c1@example.com").await;
        let customer2 = context.authn().create_customer("c2@example.com").await;
        let driver = context.authn().create_driver("d@example.com").await;
        let admin = context.authn().create_admin("a@example.com").await;

        let ride1 = context.request_ride(&customer1, 1.0).await;
        context.advance_clock();
        let ride2 = context.request_ride(&customer2, 2.0).await;
        context.advance_clock();
        let ride3 = context.request_ride(&customer1, 3.0).await;
        let ride2 = context.driver().accept_ride(&driver, ride2.id()).await.unwrap();

        assert_eq!(
            vec![ride3.clone(), ride1.clone()],
            context.driver().list_rides(&customer1).await.unwrap()
        );
        assert_eq!(vec![ride2.clone()], context.driver().list_rides(&driver).await.unwrap());
        assert_eq!(vec![ride3, ride2, ride1], context.driver().list_rides(&admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_open_rides() {
        let context = TestContext::setup().await;
        let customer = context.authn().create_customer("c@example.com").await;
        let driver = context.authn().create_driver("d@example.com").await;

        let ride1 = context.request_ride(&customer, 1.0).await;
        context.advance_clock();
        let ride2 = context.request_ride(&customer, 2.0).await;
        context.advance_clock();
        let ride3 = context.request_ride(&customer, 3.0).await;
        context.driver().accept_ride(&driver, ride2.id()).await.unwrap();

        assert_eq!(vec![ride1, ride3], context.driver().list_open_rides(&driver).await.unwrap());

        assert_eq!(
            DriverError::Forbidden("Only drivers can perform this operation".to_owned()),
            context.driver().list_open_rides(&customer).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_delete_ride() {
        let context = TestContext::setup().await;
        let customer = context.authn().create_customer("c@example.com").await;
        let driver = context.authn().create_driver("d@example.com").await;
        let admin = context.authn().create_admin("a@example.com").await;

        let ride = context.request_ride(&customer, 1.0).await;
        context.driver().accept_ride(&driver, ride.id()).await.unwrap();

        assert_eq!(
            DriverError::Forbidden("Only admins can perform this operation".to_owned()),
            context.driver().delete_ride(&customer, ride.id()).await.unwrap_err()
        );

        context.driver().delete_ride(&admin, ride.id()).await.unwrap();
        assert_eq!(
            DriverError::NotFound(format!("Ride {} not found", ride.id())),
            context.driver().delete_ride(&admin, ride.id()).await.unwrap_err()
        );
    }
}
