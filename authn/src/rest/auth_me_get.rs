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

//! API to query the details of the authenticated account.

use crate::driver::AuthnDriver;
use crate::rest::{get_whoami, AccountResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<Json<AccountResponse>, RestError> {
    let whoami = get_whoami(driver, &headers).await?;
    Ok(Json(AccountResponse::from(whoami)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use axum::http;
    use rideshare_core::rest::testutils::OneShotBuilder;
    use rideshare_core::test_payload_must_be_empty;
    use std::time::Duration;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/api/v1/auth/me".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let account = context.inner().create_driver("d@example.com").await;

        let response = OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(context.inner().access_token(&account).as_str())
            .send_empty()
            .await
            .expect_json::<AccountResponse>()
            .await;
        assert_eq!(AccountResponse::from(account), response);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Missing Authorization header")
            .await;
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth("not-a-token")
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Invalid access token")
            .await;
    }

    #[tokio::test]
    async fn test_expired_token() {
        let context = TestContext::setup().await;
        let account = context.inner().create_customer("c@example.com").await;
        let token = context.inner().access_token(&account);

        context.inner().clock().advance(Duration::from_secs(24 * 60 * 60));

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("expired")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
