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

//! REST interface for rides and fares.

use crate::driver::RidesDriver;
use crate::model::{DistanceKm, Location, RateCard, Rating, Review, Ride, RideId, RideStatus};
use axum::Router;
use rideshare_authn::driver::AuthnDriver;
use rideshare_authn::model::AccountId;
use rideshare_core::model::Money;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;

mod fares_estimate_get;
mod rates_get;
mod rates_put;
mod ride_accept_post;
mod ride_cancel_post;
mod ride_complete_post;
mod ride_delete;
mod ride_get;
mod ride_review_post;
mod ride_start_post;
mod rides_get;
mod rides_open_get;
mod rides_post;
#[cfg(test)]
mod testutils;

/// State shared by all rides APIs.
///
/// The accounts driver authenticates callers and the rides driver does the actual work.
pub(crate) type RidesState = (AuthnDriver, RidesDriver);

/// Public representation of a review.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewResponse {
    /// Star rating given by the customer.
    pub(crate) rating: Rating,

    /// Free-form comment.
    pub(crate) comment: Option<String>,

    /// Time at which the review was left.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created: OffsetDateTime,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        Self { rating: review.rating, comment: review.comment.clone(), created: review.created }
    }
}

/// Public representation of a ride.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct RideResponse {
    /// Unique identifier of the ride.
    pub(crate) id: RideId,

    /// Customer that requested the ride.
    pub(crate) customer_id: AccountId,

    /// Driver that took the ride, if any.
    pub(crate) driver_id: Option<AccountId>,

    /// Where the ride starts.
    pub(crate) pickup_location: Location,

    /// Where the ride ends.
    pub(crate) dropoff_location: Location,

    /// Length of the ride.
    pub(crate) distance_km: DistanceKm,

    /// Fare computed when the ride was requested.
    pub(crate) estimated_fare: Money,

    /// Version of the rates used to compute the estimated fare.
    pub(crate) rate_version: u32,

    /// Fare charged on completion.
    pub(crate) final_fare: Option<Money>,

    /// Current status.
    pub(crate) status: RideStatus,

    /// Creation time of the ride.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) requested_at: OffsetDateTime,

    /// Time at which a driver took the ride.
    #[serde(with = "time::serde::rfc3339::option")]
    pub(crate) accepted_at: Option<OffsetDateTime>,

    /// Time at which the ride started.
    #[serde(with = "time::serde::rfc3339::option")]
    pub(crate) started_at: Option<OffsetDateTime>,

    /// Time at which the ride was completed.
    #[serde(with = "time::serde::rfc3339::option")]
    pub(crate) completed_at: Option<OffsetDateTime>,

    /// Time at which the ride was cancelled.
    #[serde(with = "time::serde::rfc3339::option")]
    pub(crate) cancelled_at: Option<OffsetDateTime>,

    /// Review left by the customer.
    pub(crate) review: Option<ReviewResponse>,
}

impl From<Ride> for RideResponse {
    fn from(ride: Ride) -> Self {
        Self {
            id: ride.id(),
            customer_id: ride.customer_id(),
            driver_id: ride.driver_id(),
            pickup_location: ride.pickup().clone(),
            dropoff_location: ride.dropoff().clone(),
            distance_km: ride.distance(),
            estimated_fare: ride.estimated_fare(),
            rate_version: ride.rate_version(),
            final_fare: ride.final_fare(),
            status: ride.status(),
            requested_at: ride.requested_at(),
            accepted_at: ride.accepted_at(),
            started_at: ride.started_at(),
            completed_at: ride.completed_at(),
            cancelled_at: ride.cancelled_at(),
            review: ride.review().map(ReviewResponse::from),
        }
    }
}

/// Public representation of a rate card.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatesResponse {
    /// Version of the rates.  Zero means that the configured defaults are in effect.
    pub(crate) version: u32,

    /// Flat amount charged for every ride.
    pub(crate) base_fare: Money,

    /// Amount charged per kilometer.
    pub(crate) per_km: Money,

    /// Time at which these rates were set.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated: OffsetDateTime,

    /// Admin that set these rates.
    pub(crate) updated_by: Option<AccountId>,
}

impl From<RateCard> for RatesResponse {
    fn from(rates: RateCard) -> Self {
        Self {
            version: rates.version,
            base_fare: rates.base_fare,
            per_km: rates.per_km,
            updated: rates.updated,
            updated_by: rates.updated_by,
        }
    }
}

/// Creates the router for the whole service, including the account and authentication APIs.
pub(crate) fn app(authn: AuthnDriver, rides: RidesDriver) -> Router {
    use axum::routing::{get, post};
    let rides_router = Router::new()
        .route("/rides", get(rides_get::handler).post(rides_post::handler))
        .route("/rides/open", get(rides_open_get::handler))
        .route("/rides/:id", get(ride_get::handler).delete(ride_delete::handler))
        .route("/rides/:id/accept", post(ride_accept_post::handler))
        .route("/rides/:id/start", post(ride_start_post::handler))
        .route("/rides/:id/complete", post(ride_complete_post::handler))
        .route("/rides/:id/cancel", post(ride_cancel_post::handler))
        .route("/rides/:id/review", post(ride_review_post::handler))
        .route("/fares/estimate", get(fares_estimate_get::handler))
        .route("/rates", get(rates_get::handler).put(rates_put::handler))
        .with_state((authn.clone(), rides));

    let api = rideshare_authn::rest::app(authn).merge(rides_router);
    Router::new().nest("/api/v1", api).layer(CorsLayer::permissive())
}
