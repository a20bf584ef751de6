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

//! Extends the driver with the operations that move rides through their lifecycle.
//!
//! Every operation here issues its conditional update first and only looks at the ride
//! afterwards.  If the update did not apply, the ride is read back exclusively to explain why,
//! so the outcome of a race is always decided by the database.

use crate::db;
use crate::driver::{get_ride_or_not_found, RidesDriver};
use crate::model::{validate_comment, Rating, Review, Ride, RideId, RideStatus};
use log::{debug, info};
use rideshare_authn::driver::require_role;
use rideshare_authn::model::{Account, Role};
use rideshare_core::db::Executor;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::model::Money;

/// Explains why the transition of ride `id` into `next` on behalf of `whoami` did not apply.
///
/// `is_party` tells whether `whoami` is allowed to act on the ride at all, and is only invoked
/// once the ride is known to exist.
async fn explain_failure<F>(
    ex: &mut Executor,
    id: RideId,
    whoami: &Account,
    next: RideStatus,
    is_party: F,
) -> DriverError
where
    F: FnOnce(&Ride) -> bool,
{
    let ride = match get_ride_or_not_found(ex, id).await {
        Ok(ride) => ride,
        Err(e) => return e,
    };

    if !is_party(&ride) {
        return DriverError::Forbidden(format!("Ride {} does not belong to you", id));
    }

    debug!(
        "Account {} could not move ride {} from {} to {}",
        whoami.id(),
        id,
        ride.status(),
        next
    );
    if next == RideStatus::Accepted && ride.status().has_driver() {
        return DriverError::Conflict("Ride has already been taken".to_owned());
    }
    DriverError::Conflict(format!("Cannot move a ride that is {} to {}", ride.status(), next))
}

impl RidesDriver {
    /// Assigns the ride `id` to the driver `whoami`.
    ///
    /// Only one driver can ever take a given ride: concurrent attempts are decided by the
    /// database and all but one fail with a conflict.
    pub async fn accept_ride(self, whoami: &Account, id: RideId) -> DriverResult<Ride> {
        require_role(whoami, Role::Driver)?;

        let now = self.clock.now_utc();
        let mut tx = self.db.begin().await?;
        if !db::accept_ride(tx.ex(), id, whoami.id(), now).await? {
            let is_party = |_: &Ride| true;
            return Err(explain_failure(tx.ex(), id, whoami, RideStatus::Accepted, is_party).await);
        }
        let ride = db::get_ride(tx.ex(), id).await?;
        tx.commit().await?;

        info!("Driver {} accepted ride {}", whoami.id(), id);
        Ok(ride)
    }

    /// Marks the ride `id` as started by its assigned driver `whoami`.
    pub async fn start_ride(self, whoami: &Account, id: RideId) -> DriverResult<Ride> {
        require_role(whoami, Role::Driver)?;

        let now = self.clock.now_utc();
        let mut tx = self.db.begin().await?;
        if !db::start_ride(tx.ex(), id, whoami.id(), now).await? {
            let is_party = |ride: &Ride| ride.driver_id() == Some(whoami.id());
            return Err(explain_failure(tx.ex(), id, whoami, RideStatus::Started, is_party).await);
        }
        let ride = db::get_ride(tx.ex(), id).await?;
        tx.commit().await?;

        info!("Driver {} started ride {}", whoami.id(), id);
        Ok(ride)
    }

    /// Marks the ride `id` as completed by its assigned driver `whoami` and pays the driver.
    ///
    /// The final fare is `final_fare` if given or the estimated fare otherwise.  The driver's
    /// wallet is credited within the same transaction that completes the ride.
    pub async fn complete_ride(
        self,
        whoami: &Account,
        id: RideId,
        final_fare: Option<Money>,
    ) -> DriverResult<Ride> {
        require_role(whoami, Role::Driver)?;

        let now = self.clock.now_utc();
        let mut tx = self.db.begin().await?;
        if !db::complete_ride(tx.ex(), id, whoami.id(), final_fare, now).await? {
            let is_party = |ride: &Ride| ride.driver_id() == Some(whoami.id());
            return Err(
                explain_failure(tx.ex(), id, whoami, RideStatus::Completed, is_party).await
            );
        }
        let ride = db::get_ride(tx.ex(), id).await?;
        let fare = match ride.final_fare() {
            Some(fare) => fare,
            None => {
                return Err(DriverError::BackendError(format!(
                    "Completed ride {} has no final fare",
                    id
                )));
            }
        };
        rideshare_authn::db::credit_driver_wallet(tx.ex(), whoami.id(), fare).await?;
        tx.commit().await?;

        info!("Driver {} completed ride {} for {}", whoami.id(), id, fare);
        Ok(ride)
    }

    /// Cancels the ride `id` on behalf of `whoami`, who must be its customer or an admin.
    ///
    /// Rides can only be cancelled while they wait for a driver.
    pub async fn cancel_ride(self, whoami: &Account, id: RideId) -> DriverResult<Ride> {
        let customer_id = match whoami.role() {
            Role::Customer => Some(whoami.id()),
            Role::Admin => None,
            Role::Driver => {
                return Err(DriverError::Forbidden(
                    "Only customers and admins can cancel rides".to_owned(),
                ));
            }
        };

        let now = self.clock.now_utc();
        let mut tx = self.db.begin().await?;
        if !db::cancel_ride(tx.ex(), id, customer_id, now).await? {
            let is_party = |ride: &Ride| customer_id.map_or(true, |c| ride.customer_id() == c);
            return Err(
                explain_failure(tx.ex(), id, whoami, RideStatus::Cancelled, is_party).await
            );
        }
        let ride = db::get_ride(tx.ex(), id).await?;
        tx.commit().await?;

        info!("Account {} cancelled ride {}", whoami.id(), id);
        Ok(ride)
    }

    /// Attaches a review to the ride `id` on behalf of its customer `whoami`.
    ///
    /// Only completed rides can be reviewed, and only once.
    pub async fn review_ride(
        self,
        whoami: &Account,
        id: RideId,
        rating: Rating,
        comment: Option<String>,
    ) -> DriverResult<Ride> {
        require_role(whoami, Role::Customer)?;
        let comment = validate_comment(comment)?;
        let review = Review { rating, comment, created: self.clock.now_utc() };

        let mut tx = self.db.begin().await?;
        if !db::review_ride(tx.ex(), id, whoami.id(), &review).await? {
            let ride = get_ride_or_not_found(tx.ex(), id).await?;
            if ride.customer_id() != whoami.id() {
                return Err(DriverError::Forbidden(format!("Ride {} does not belong to you", id)));
            }
            if ride.status() != RideStatus::Completed {
                return Err(DriverError::Conflict(format!(
                    "Cannot review a ride that is {}",
                    ride.status()
                )));
            }
            return Err(DriverError::Conflict("Ride has already been reviewed".to_owned()));
        }
        let ride = db::get_ride(tx.ex(), id).await?;
        tx.commit().await?;

        info!("Customer {} rated ride {} with {} stars", whoami.id(), id, rating.stars());
        Ok(ride)
    }
}
