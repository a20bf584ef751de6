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

//! API for admins to block or unblock an account.

use crate::driver::AuthnDriver;
use crate::model::AccountId;
use crate::rest::{get_whoami, AccountResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_core::rest::{JsonBody, PathParams, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to change the blocked state of an account.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct BlockedRequest {
    /// Whether the account should be blocked.
    pub(crate) blocked: bool,
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    path: RestResult<PathParams<AccountId>>,
    headers: HeaderMap,
    body: RestResult<JsonBody<BlockedRequest>>,
) -> Result<Json<AccountResponse>, RestError> {
    let whoami = get_whoami(driver.clone(), &headers).await?;
    let PathParams(id) = path?;
    let JsonBody(request) = body?;
    let account = driver.set_blocked(&whoami, id, request.blocked).await?;
    Ok(Json(AccountResponse::from(account)))
}
