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

//! API for customers to request a ride.

use crate::model::{DistanceKm, Location};
use crate::rest::{RideResponse, RidesState};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::rest::{JsonBody, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to request a ride.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct RideRequest {
    /// Where the customer wants to be picked up.
    pub(crate) pickup_location: Location,

    /// Where the customer wants to go.
    pub(crate) dropoff_location: Location,

    /// Length of the trip as computed by the client.
    pub(crate) distance_km: DistanceKm,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    headers: HeaderMap,
    body: RestResult<JsonBody<RideRequest>>,
) -> Result<(StatusCode, Json<RideResponse>), RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let JsonBody(request) = body?;
    let ride = driver
        .request_ride(
            &whoami,
            request.pickup_location,
            request.dropoff_location,
            request.distance_km,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RideResponse::from(ride))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::{home, work};
    use crate::model::RideStatus;
    use crate::rest::testutils::*;
    use axum::http;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_json;
    use serde_json::json;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/api/v1/rides".to_owned())
    }

    fn request(km: f64) -> RideRequest {
        RideRequest {
            pickup_location: home(),
            dropoff_location: work(),
            distance_km: DistanceKm::new(km).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_json(request(5.0))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<RideResponse>()
            .await;
        assert_eq!(customer.id(), response.customer_id);
        assert_eq!(None, response.driver_id);
        assert_eq!(RideStatus::Requested, response.status);
        assert_eq!("17.50", response.estimated_fare.to_string());
        assert_eq!(None, response.final_fare);
        assert_eq!(0, response.rate_version);

        let ride = context.inner().get_ride(response.id).await;
        assert_eq!(RideResponse::from(ride), response);
    }

    #[tokio::test]
    async fn test_wire_format() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({
                "pickupLocation": {"address": "Here", "latitude": 1.5, "longitude": -2.5},
                "dropoffLocation": {"address": "There"},
                "distanceKm": 2,
            }))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(
            json!({"address": "Here", "latitude": 1.5, "longitude": -2.5}),
            response["pickupLocation"]
        );
        assert_eq!(json!({"address": "There"}), response["dropoffLocation"]);
        assert_eq!(json!(2.0), response["distanceKm"]);
        assert_eq!(json!(10.0), response["estimatedFare"]);
        assert_eq!(json!("requested"), response["status"]);
        assert_eq!(serde_json::Value::Null, response["acceptedAt"]);
        assert_eq!(serde_json::Value::Null, response["review"]);
    }

    #[tokio::test]
    async fn test_only_customers() {
        let context = TestContext::setup().await;
        let driver = context.inner().authn().create_driver("d@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&driver))
            .send_json(request(1.0))
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Only customers")
            .await;
    }

    #[tokio::test]
    async fn test_not_authenticated() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_json(request(1.0))
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .take_response()
            .await;
        assert_eq!(
            "Bearer realm=\"rideshare\"",
            response.headers().get(http::header::WWW_AUTHENTICATE).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_distance() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({
                "pickupLocation": {"address": "Here"},
                "dropoffLocation": {"address": "There"},
                "distanceKm": -3,
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("distanceKm: Distance must be positive; got -3")
            .await;
    }

    #[tokio::test]
    async fn test_invalid_location() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({
                "pickupLocation": {"address": "Here", "latitude": 100, "longitude": 0},
                "dropoffLocation": {"address": "There"},
                "distanceKm": 3,
            }))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Invalid latitude 100")
            .await;
    }

    #[tokio::test]
    async fn test_missing_field() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({"pickupLocation": {"address": "Here"}, "distanceKm": 3}))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("missing field `dropoffLocation`")
            .await;
    }

    #[tokio::test]
    async fn test_not_authenticated_before_invalid_body() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(json!({"distanceKm": -3}))
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .take_response()
            .await;
    }

    test_payload_must_be_json!(authenticated: TestContext::setup_with_token().await, route());
}
