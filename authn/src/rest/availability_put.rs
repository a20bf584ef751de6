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

//! API for drivers to go on or off duty.

use crate::driver::AuthnDriver;
use crate::model::Availability;
use crate::rest::{get_whoami, AccountResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_core::rest::{JsonBody, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to change the availability of a driver.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct AvailabilityRequest {
    /// New availability of the driver.
    pub(crate) availability: Availability,
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    headers: HeaderMap,
    body: RestResult<JsonBody<AvailabilityRequest>>,
) -> Result<Json<AccountResponse>, RestError> {
    let whoami = get_whoami(driver.clone(), &headers).await?;
    let JsonBody(request) = body?;
    let account = driver.set_availability(&whoami, request.availability).await?;
    Ok(Json(AccountResponse::from(account)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountKind;
    use crate::rest::testutils::*;
    use axum::http;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_json;

    fn route() -> (http::Method, String) {
        (http::Method::PUT, "/api/v1/drivers/me/availability".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let driver = context.inner().create_driver("d@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.inner().access_token(&driver).as_str())
            .send_json(AvailabilityRequest { availability: Availability::Available })
            .await
            .expect_json::<AccountResponse>()
            .await;

        let stored = context.inner().get_account(driver.id()).await;
        assert_eq!(AccountResponse::from(stored), response);
        match response.kind {
            AccountKind::Driver(profile) => {
                assert_eq!(Availability::Available, profile.availability)
            }
            kind => panic!("{:?}", kind),
        }
    }

    #[tokio::test]
    async fn test_not_a_driver() {
        let context = TestContext::setup().await;
        let customer = context.inner().create_customer("c@example.com").await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.inner().access_token(&customer).as_str())
            .send_json(AvailabilityRequest { availability: Availability::Available })
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("Only drivers")
            .await;
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_json(AvailabilityRequest { availability: Availability::Offline })
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Missing Authorization")
            .await;
    }

    test_payload_must_be_json!(authenticated: TestContext::setup_with_token().await, route());
}
