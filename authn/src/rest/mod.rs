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

//! REST interface for accounts and authentication.

use crate::driver::AuthnDriver;
use crate::model::{Account, AccountId, AccountKind, AccountName};
use axum::Router;
use http::HeaderMap;
use rideshare_core::model::EmailAddress;
use rideshare_core::rest::RestResult;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

mod account_blocked_put;
mod accounts_get;
mod accounts_post;
mod auth_login_post;
mod auth_me_get;
mod auth_register_post;
mod availability_put;
mod httputils;
#[cfg(test)]
mod testutils;

pub use httputils::get_bearer_auth;

/// Public representation of an account.  Never includes the password hash.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize, PartialEq))]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Unique identifier of the account.
    pub id: AccountId,

    /// Email address used to log in.
    pub email: EmailAddress,

    /// Display name.
    pub name: AccountName,

    /// Whether the account has been blocked by an admin.
    pub blocked: bool,

    /// Creation time of the account.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,

    /// Role of the account along with any role-specific details.
    #[serde(flatten)]
    pub kind: AccountKind,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id(),
            email: account.email().clone(),
            name: account.name().clone(),
            blocked: account.blocked(),
            created: account.created(),
            kind: account.kind().clone(),
        }
    }
}

/// Authenticates the caller of an API by validating the bearer token in its `headers`.
///
/// Services that expose authenticated APIs call this at the beginning of every handler to obtain
/// the account of the caller.
pub async fn get_whoami(driver: AuthnDriver, headers: &HeaderMap) -> RestResult<Account> {
    let token = get_bearer_auth(headers)?;
    Ok(driver.authenticate(token).await?)
}

/// Creates the router for the account and authentication endpoints.
///
/// The returned routes are relative and are expected to be nested under the API prefix.
pub fn app(driver: AuthnDriver) -> Router {
    use axum::routing::{get, post, put};
    Router::new()
        .route("/auth/register", post(auth_register_post::handler))
        .route("/auth/login", post(auth_login_post::handler))
        .route("/auth/me", get(auth_me_get::handler))
        .route("/drivers/me/availability", put(availability_put::handler))
        .route("/admin/accounts", get(accounts_get::handler).post(accounts_post::handler))
        .route("/admin/accounts/:id/blocked", put(account_blocked_put::handler))
        .with_state(driver)
}
