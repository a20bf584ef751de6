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

//! API for admins to create other admin accounts.

use crate::driver::AuthnDriver;
use crate::model::{AccountName, Password};
use crate::rest::{get_whoami, AccountResponse};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rideshare_core::model::EmailAddress;
use rideshare_core::rest::{JsonBody, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to create an admin account.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct CreateAdminRequest {
    /// Email address of the new admin.
    pub(crate) email: EmailAddress,

    /// Initial password of the new admin.
    pub(crate) password: Password,

    /// Display name of the new admin.
    pub(crate) name: AccountName,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    headers: HeaderMap,
    body: RestResult<JsonBody<CreateAdminRequest>>,
) -> Result<(StatusCode, Json<AccountResponse>), RestError> {
    let whoami = get_whoami(driver.clone(), &headers).await?;
    let JsonBody(request) = body?;
    let account =
        driver.create_admin(&whoami, request.email, request.password, request.name).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}
