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

//! API to register a new customer or driver account.

use crate::driver::AuthnDriver;
use crate::model::{AccountName, Password, Role, Vehicle};
use crate::rest::AccountResponse;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rideshare_core::model::EmailAddress;
use rideshare_core::rest::{JsonBody, RestError};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to register an account.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct RegisterRequest {
    /// Email address to log in with.
    pub(crate) email: EmailAddress,

    /// Desired password.
    pub(crate) password: Password,

    /// Display name.
    pub(crate) name: AccountName,

    /// Role of the new account.  Only customers and drivers can register themselves.
    pub(crate) role: Role,

    /// Vehicle details, required for drivers only.
    #[serde(default)]
    pub(crate) vehicle: Option<Vehicle>,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), RestError> {
    let account = driver
        .register(request.email, request.password, request.name, request.role, request.vehicle)
        .await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}
