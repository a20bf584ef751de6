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

//! The `Ride` data type and its status lifecycle.

use crate::model::{DistanceKm, Location};
use rideshare_authn::model::AccountId;
use rideshare_core::model::{ModelError, ModelResult, Money};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of a review comment.
const MAX_COMMENT_LENGTH: usize = 1024;

/// Unique identifier of a ride.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RideId(Uuid);

impl RideId {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the identifier as a UUID for storage purposes.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RideId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Status of a ride within its lifecycle.
///
/// ```text
/// requested -> accepted -> started -> completed
///     |            |                     ^
///     |            +---------------------+
///     +-> cancelled
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    /// A customer asked for the ride and no driver has taken it yet.
    Requested,

    /// A driver took the ride.
    Accepted,

    /// The driver picked the customer up.
    Started,

    /// The ride finished and has a final fare.
    Completed,

    /// The ride was called off before a driver took it.
    Cancelled,
}

impl RideStatus {
    /// Returns the textual representation of the status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "requested",
            RideStatus::Accepted => "accepted",
            RideStatus::Started => "started",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Returns the statuses from which `next` can be reached in one step.
    pub fn sources(next: RideStatus) -> &'static [RideStatus] {
        match next {
            RideStatus::Requested => &[],
            RideStatus::Accepted => &[RideStatus::Requested],
            RideStatus::Started => &[RideStatus::Accepted],
            RideStatus::Completed => &[RideStatus::Accepted, RideStatus::Started],
            RideStatus::Cancelled => &[RideStatus::Requested],
        }
    }

    /// Returns true if a ride in this status can move to `next`.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        RideStatus::sources(next).contains(&self)
    }

    /// Returns true if no transition is possible out of this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Returns true if a ride in this status must have a driver assigned.
    pub fn has_driver(self) -> bool {
        matches!(self, RideStatus::Accepted | RideStatus::Started | RideStatus::Completed)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(RideStatus::Requested),
            "accepted" => Ok(RideStatus::Accepted),
            "started" => Ok(RideStatus::Started),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            s => Err(ModelError(format!("Unknown ride status '{}'", s))),
        }
    }
}

/// A customer's rating of a ride, from 1 to 5 stars.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Creates a new rating after checking that it is within range.
    pub fn new(stars: u8) -> ModelResult<Self> {
        if !(1..=5).contains(&stars) {
            return Err(ModelError(format!("Rating must be between 1 and 5; got {}", stars)));
        }
        Ok(Self(stars))
    }

    /// Returns the number of stars.
    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ModelError;

    fn try_from(stars: u8) -> ModelResult<Self> {
        Rating::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Validates an optional review comment, returning it trimmed and with empty values dropped.
pub fn validate_comment(comment: Option<String>) -> ModelResult<Option<String>> {
    match comment {
        None => Ok(None),
        Some(comment) => {
            let comment = comment.trim();
            if comment.is_empty() {
                Ok(None)
            } else if comment.chars().count() > MAX_COMMENT_LENGTH {
                Err(ModelError("Review comment is too long".to_owned()))
            } else {
                Ok(Some(comment.to_owned()))
            }
        }
    }
}

/// A customer's review of a completed ride.
#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    /// Star rating.
    pub rating: Rating,

    /// Free-form comment, if any.
    pub comment: Option<String>,

    /// Time at which the review was left.
    pub created: OffsetDateTime,
}

/// Raw contents of a ride before its invariants are checked.
///
/// This exists so that the database layer can hand over whatever it read and let `Ride` decide
/// whether the combination is valid.
#[derive(Clone, Debug)]
pub struct RideParts {
    /// Unique identifier of the ride.
    pub id: RideId,

    /// The customer who requested the ride.
    pub customer_id: AccountId,

    /// The driver who took the ride, if any.
    pub driver_id: Option<AccountId>,

    /// Where the customer wants to be picked up.
    pub pickup: Location,

    /// Where the customer wants to go.
    pub dropoff: Location,

    /// Length of the trip.
    pub distance: DistanceKm,

    /// Fare computed when the ride was requested.
    pub estimated_fare: Money,

    /// Version of the rate card used to compute `estimated_fare`.
    pub rate_version: u32,

    /// Fare charged once the ride completed.
    pub final_fare: Option<Money>,

    /// Current status.
    pub status: RideStatus,

    /// Time of the request.
    pub requested_at: OffsetDateTime,

    /// Time at which a driver took the ride.
    pub accepted_at: Option<OffsetDateTime>,

    /// Time at which the ride started.
    pub started_at: Option<OffsetDateTime>,

    /// Time at which the ride completed.
    pub completed_at: Option<OffsetDateTime>,

    /// Time at which the ride was cancelled.
    pub cancelled_at: Option<OffsetDateTime>,

    /// The customer's review, if any.
    pub review: Option<Review>,
}

/// A trip tracked through its status lifecycle.
///
/// All instances satisfy these invariants: a driver is assigned if and only if the status is
/// accepted, started or completed; the final fare is set if and only if the ride completed; a
/// review only exists on completed rides; and the timestamps match the statuses the ride went
/// through.
#[derive(Clone, Debug, PartialEq)]
pub struct Ride {
    /// Unique identifier of the ride.
    id: RideId,

    /// The customer who requested the ride.
    customer_id: AccountId,

    /// The driver who took the ride, if any.
    driver_id: Option<AccountId>,

    /// Where the customer wants to be picked up.
    pickup: Location,

    /// Where the customer wants to go.
    dropoff: Location,

    /// Length of the trip.
    distance: DistanceKm,

    /// Fare computed when the ride was requested.
    estimated_fare: Money,

    /// Version of the rate card used to compute `estimated_fare`.
    rate_version: u32,

    /// Fare charged once the ride completed.
    final_fare: Option<Money>,

    /// Current status.
    status: RideStatus,

    /// Time of the request.
    requested_at: OffsetDateTime,

    /// Time at which a driver took the ride.
    accepted_at: Option<OffsetDateTime>,

    /// Time at which the ride started.
    started_at: Option<OffsetDateTime>,

    /// Time at which the ride completed.
    completed_at: Option<OffsetDateTime>,

    /// Time at which the ride was cancelled.
    cancelled_at: Option<OffsetDateTime>,

    /// The customer's review, if any.
    review: Option<Review>,
}

impl Ride {
    /// Creates a new ride in the requested status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RideId,
        customer_id: AccountId,
        pickup: Location,
        dropoff: Location,
        distance: DistanceKm,
        estimated_fare: Money,
        rate_version: u32,
        requested_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            customer_id,
            driver_id: None,
            pickup,
            dropoff,
            distance,
            estimated_fare,
            rate_version,
            final_fare: None,
            status: RideStatus::Requested,
            requested_at,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            review: None,
        }
    }

    /// Gets the ride's identifier.
    pub fn id(&self) -> RideId {
        self.id
    }

    /// Gets the customer who requested the ride.
    pub fn customer_id(&self) -> AccountId {
        self.customer_id
    }

    /// Gets the driver assigned to the ride, if any.
    pub fn driver_id(&self) -> Option<AccountId> {
        self.driver_id
    }

    /// Gets the pickup location.
    pub fn pickup(&self) -> &Location {
        &self.pickup
    }

    /// Gets the dropoff location.
    pub fn dropoff(&self) -> &Location {
        &self.dropoff
    }

    /// Gets the length of the trip.
    pub fn distance(&self) -> DistanceKm {
        self.distance
    }

    /// Gets the fare estimated at request time.
    pub fn estimated_fare(&self) -> Money {
        self.estimated_fare
    }

    /// Gets the version of the rate card used for the estimate.
    pub fn rate_version(&self) -> u32 {
        self.rate_version
    }

    /// Gets the final fare, only present on completed rides.
    pub fn final_fare(&self) -> Option<Money> {
        self.final_fare
    }

    /// Gets the current status.
    pub fn status(&self) -> RideStatus {
        self.status
    }

    /// Gets the time of the request.
    pub fn requested_at(&self) -> OffsetDateTime {
        self.requested_at
    }

    /// Gets the time at which a driver took the ride.
    pub fn accepted_at(&self) -> Option<OffsetDateTime> {
        self.accepted_at
    }

    /// Gets the time at which the ride started.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    /// Gets the time at which the ride completed.
    pub fn completed_at(&self) -> Option<OffsetDateTime> {
        self.completed_at
    }

    /// Gets the time at which the ride was cancelled.
    pub fn cancelled_at(&self) -> Option<OffsetDateTime> {
        self.cancelled_at
    }

    /// Gets the customer's review, if any.
    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    /// Returns true if `account` is the customer or the driver of this ride.
    pub fn involves(&self, account: AccountId) -> bool {
        self.customer_id == account || self.driver_id == Some(account)
    }
}

impl TryFrom<RideParts> for Ride {
    type Error = ModelError;

    fn try_from(parts: RideParts) -> ModelResult<Self> {
        let status = parts.status;
        let id = parts.id;

        if status.has_driver() != parts.driver_id.is_some() {
            return Err(ModelError(format!(
                "Ride {} is {} but its driver is {}",
                id,
                status,
                if parts.driver_id.is_some() { "set" } else { "missing" }
            )));
        }
        if (status == RideStatus::Completed) != parts.final_fare.is_some() {
            return Err(ModelError(format!(
                "Ride {} is {} but its final fare is {}",
                id,
                status,
                if parts.final_fare.is_some() { "set" } else { "missing" }
            )));
        }
        if parts.review.is_some() && status != RideStatus::Completed {
            return Err(ModelError(format!("Ride {} is {} but has a review", id, status)));
        }

        let timestamps_ok = parts.accepted_at.is_some() == status.has_driver()
            && (parts.started_at.is_none()
                || matches!(status, RideStatus::Started | RideStatus::Completed))
            && (status != RideStatus::Started || parts.started_at.is_some())
            && parts.completed_at.is_some() == (status == RideStatus::Completed)
            && parts.cancelled_at.is_some() == (status == RideStatus::Cancelled);
        if !timestamps_ok {
            return Err(ModelError(format!(
                "Ride {} is {} but its timestamps do not match",
                id, status
            )));
        }

        Ok(Self {
            id,
            customer_id: parts.customer_id,
            driver_id: parts.driver_id,
            pickup: parts.pickup,
            dropoff: parts.dropoff,
            distance: parts.distance,
            estimated_fare: parts.estimated_fare,
            rate_version: parts.rate_version,
            final_fare: parts.final_fare,
            status,
            requested_at: parts.requested_at,
            accepted_at: parts.accepted_at,
            started_at: parts.started_at,
            completed_at: parts.completed_at,
            cancelled_at: parts.cancelled_at,
            review: parts.review,
        })
    }
}
