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

//! API for customers to review a completed ride.

use crate::model::{Rating, RideId};
use crate::rest::{RideResponse, RidesState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::rest::{JsonBody, PathParams, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to review a ride.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct ReviewRequest {
    /// Star rating.
    pub(crate) rating: Rating,

    /// Free-form comment.
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    path: RestResult<PathParams<RideId>>,
    headers: HeaderMap,
    body: RestResult<JsonBody<ReviewRequest>>,
) -> Result<Json<RideResponse>, RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let PathParams(id) = path?;
    let JsonBody(request) = body?;
    let ride = driver.review_ride(&whoami, id, request.rating, request.comment).await?;
    Ok(Json(RideResponse::from(ride)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ride;
    use crate::rest::testutils::*;
    use crate::rest::ReviewResponse;
    use axum::http;
    use rideshare_authn::model::Account;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_json;
    use serde_json::json;

    fn route(id: RideId) -> (http::Method, String) {
        (http::Method::POST, format!("/api/v1/rides/{}/review", id))
    }

    /// Creates a ride for `customer` and takes it all the way to completion.
    async fn completed_ride(context: &TestContext, customer: &Account) -> Ride {
        let driver = context.inner().authn().create_driver("d@example.com").await;
        let ride = context.inner().request_ride(customer, 5.0).await;
        context.inner().driver().accept_ride(&driver, ride.id()).await.unwrap();
        context.inner().driver().complete_ride(&driver, ride.id(), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let ride = completed_ride(&context, &customer).await;

        let response = OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({"rating": 4, "comment": "  Smooth ride  "}))
            .await
            .expect_json::<RideResponse>()
            .await;
        assert_eq!(
            Some(ReviewResponse {
                rating: Rating::new(4).unwrap(),
                comment: Some("Smooth ride".to_owned()),
                created: context.inner().now(),
            }),
            response.review
        );
    }

    #[tokio::test]
    async fn test_twice() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let ride = completed_ride(&context, &customer).await;

        let request = ReviewRequest { rating: Rating::new(5).unwrap(), comment: None };
        OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&customer))
            .send_json(request)
            .await
            .expect_json::<RideResponse>()
            .await;

        let request = ReviewRequest { rating: Rating::new(1).unwrap(), comment: None };
        OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&customer))
            .send_json(request)
            .await
            .expect_status(http::StatusCode::CONFLICT)
            .expect_error("already been reviewed")
            .await;

        let review = context.inner().get_ride(ride.id()).await.review().cloned().unwrap();
        assert_eq!(5, review.rating.stars());
    }

    #[tokio::test]
    async fn test_not_completed() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let ride = context.inner().request_ride(&customer, 5.0).await;

        OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({"rating": 3}))
            .await
            .expect_status(http::StatusCode::CONFLICT)
            .expect_error("Cannot review a ride that is requested")
            .await;
    }

    #[tokio::test]
    async fn test_bad_rating() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let ride = completed_ride(&context, &customer).await;

        for rating in [0, 6] {
            OneShotBuilder::new(context.app(), route(ride.id()))
                .with_bearer_auth(context.token(&customer))
                .send_json(json!({"rating": rating}))
                .await
                .expect_status(http::StatusCode::BAD_REQUEST)
                .expect_error(&format!("Rating must be between 1 and 5; got {}", rating))
                .await;
        }
    }

    #[tokio::test]
    async fn test_comment_too_long() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let ride = completed_ride(&context, &customer).await;

        OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&customer))
            .send_json(json!({"rating": 3, "comment": "x".repeat(1025)}))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("too long")
            .await;
    }

    #[tokio::test]
    async fn test_not_the_customer() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;
        let other = context.inner().authn().create_customer("o@example.com").await;
        let ride = completed_ride(&context, &customer).await;

        OneShotBuilder::new(context.app(), route(ride.id()))
            .with_bearer_auth(context.token(&other))
            .send_json(json!({"rating": 3}))
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("does not belong to you")
            .await;
    }

    test_payload_must_be_json!(
        authenticated: TestContext::setup_with_token().await,
        route(RideId::generate())
    );
}
