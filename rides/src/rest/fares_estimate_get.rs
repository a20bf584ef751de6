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

//! API to estimate the fare of a ride before requesting it.

use crate::model::DistanceKm;
use crate::rest::RidesState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::model::Money;
use rideshare_core::rest::{EmptyBody, QueryParams, RestError, RestResult};
use serde::{Deserialize, Serialize};

/// Query parameters of this API.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateQuery {
    /// Length of the hypothetical ride.
    pub(crate) distance_km: DistanceKm,
}

/// Message returned by the server with the estimate.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateResponse {
    /// Length of the hypothetical ride.
    pub(crate) distance_km: DistanceKm,

    /// Fare that a ride of this length would get if requested now.
    pub(crate) estimated_fare: Money,

    /// Version of the rates used for the estimate.
    pub(crate) rate_version: u32,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    query: RestResult<QueryParams<EstimateQuery>>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<Json<EstimateResponse>, RestError> {
    get_whoami(authn, &headers).await?;
    let QueryParams(query) = query?;
    let (fare, rates) = driver.estimate_fare(query.distance_km).await?;
    Ok(Json(EstimateResponse {
        distance_km: query.distance_km,
        estimated_fare: fare,
        rate_version: rates.version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use axum::http;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_empty;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/v1/fares/estimate".to_owned())
    }

    fn query(km: f64) -> EstimateQuery {
        EstimateQuery { distance_km: DistanceKm::new(km).unwrap() }
    }

    #[tokio::test]
    async fn test_default_rates() {
        let context = TestContext::setup().await;
        let driver = context.inner().authn().create_driver("d@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_query(query(5.0))
            .with_bearer_auth(context.token(&driver))
            .send_empty()
            .await
            .expect_json::<EstimateResponse>()
            .await;
        assert_eq!(
            EstimateResponse {
                distance_km: DistanceKm::new(5.0).unwrap(),
                estimated_fare: Money::from_cents(1750).unwrap(),
                rate_version: 0,
            },
            response
        );
    }

    #[tokio::test]
    async fn test_updated_rates() {
        let context = TestContext::setup().await;
        let admin = context.inner().authn().create_admin("a@example.com").await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        context
            .inner()
            .driver()
            .put_rates(&admin, Money::from_cents(150).unwrap(), Money::from_cents(99).unwrap())
            .await
            .unwrap();

        let response = OneShotBuilder::new(context.app(), route())
            .with_query(query(2.5))
            .with_bearer_auth(context.token(&customer))
            .send_empty()
            .await
            .expect_json::<EstimateResponse>()
            .await;
        assert_eq!("3.98", response.estimated_fare.to_string());
        assert_eq!(1, response.rate_version);
    }

    #[tokio::test]
    async fn test_bad_distance() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        for (uri, error) in [
            ("/api/v1/fares/estimate", "missing field `distanceKm`"),
            ("/api/v1/fares/estimate?distanceKm=0", "Distance must be positive; got 0"),
            ("/api/v1/fares/estimate?distanceKm=far", "Failed to deserialize query string"),
        ] {
            OneShotBuilder::new(context.app(), (http::Method::GET, uri))
                .with_bearer_auth(context.token(&customer))
                .send_empty()
                .await
                .expect_status(http::StatusCode::BAD_REQUEST)
                .expect_error(error)
                .await;
        }
    }

    #[tokio::test]
    async fn test_not_authenticated() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .with_query(query(5.0))
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Missing Authorization header")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route(), query(1.0));
}
