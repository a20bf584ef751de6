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

//! API to obtain an access token for an existing account.

use crate::driver::AuthnDriver;
use crate::model::{AccessToken, Password};
use crate::rest::AccountResponse;
use axum::extract::State;
use axum::Json;
use rideshare_core::model::EmailAddress;
use rideshare_core::rest::{JsonBody, RestError};
use serde::{Deserialize, Serialize};

/// Message sent to the server to log in.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct LoginRequest {
    /// Email address of the account.
    pub(crate) email: EmailAddress,

    /// Password of the account.
    pub(crate) password: Password,
}

/// Message returned by the server after a successful login attempt.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    /// Access token to authenticate subsequent requests.
    pub(crate) access_token: AccessToken,

    /// Details of the account that logged in.
    pub(crate) account: AccountResponse,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, RestError> {
    let (access_token, account) = driver.login(request.email, request.password).await?;
    Ok(Json(LoginResponse { access_token, account: AccountResponse::from(account) }))
}
