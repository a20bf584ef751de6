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

//! API for admins to list accounts.

use crate::driver::AuthnDriver;
use crate::model::Role;
use crate::rest::{get_whoami, AccountResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_core::rest::{EmptyBody, QueryParams, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Query parameters of this API.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct AccountsQuery {
    /// If present, only return accounts with this role.
    #[serde(default)]
    pub(crate) role: Option<Role>,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    query: RestResult<QueryParams<AccountsQuery>>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<Json<Vec<AccountResponse>>, RestError> {
    let whoami = get_whoami(driver.clone(), &headers).await?;
    let QueryParams(query) = query?;
    let accounts = driver.list_accounts(&whoami, query.role).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}
