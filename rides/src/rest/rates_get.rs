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

//! API to get the rates in effect.

use crate::rest::{RatesResponse, RidesState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<Json<RatesResponse>, RestError> {
    get_whoami(authn, &headers).await?;
    let rates = driver.get_rates().await?;
    Ok(Json(RatesResponse::from(rates)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use axum::http;
    use rideshare_core::model::Money;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_empty;
    use serde_json::json;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/v1/rates".to_owned())
    }

    #[tokio::test]
    async fn test_defaults() {
        let context = TestContext::setup().await;
        let customer = context.inner().authn().create_customer("c@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&customer))
            .send_empty()
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(
            json!({
                "version": 0,
                "baseFare": 5.0,
                "perKm": 2.5,
                "updated": "1970-01-01T00:00:00Z",
                "updatedBy": null,
            }),
            response
        );
    }

    #[tokio::test]
    async fn test_latest() {
        let context = TestContext::setup().await;
        let admin = context.inner().authn().create_admin("a@example.com").await;
        let driver = context.inner().authn().create_driver("d@example.com").await;
        for cents in [100, 200] {
            context
                .inner()
                .driver()
                .put_rates(&admin, Money::from_cents(cents).unwrap(), Money::default())
                .await
                .unwrap();
        }

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.token(&driver))
            .send_empty()
            .await
            .expect_json::<RatesResponse>()
            .await;
        assert_eq!(2, response.version);
        assert_eq!(Money::from_cents(200).unwrap(), response.base_fare);
        assert_eq!(Some(admin.id()), response.updated_by);
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
