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

//! API for admins to change the rates used for new rides.

use crate::rest::{RatesResponse, RidesState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::model::Money;
use rideshare_core::rest::{JsonBody, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to change the rates.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatesRequest {
    /// Flat amount charged for every ride.
    pub(crate) base_fare: Money,

    /// Amount charged per kilometer.
    pub(crate) per_km: Money,
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    headers: HeaderMap,
    body: RestResult<JsonBody<RatesRequest>>,
) -> Result<Json<RatesResponse>, RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let JsonBody(request) = body?;
    let rates = driver.put_rates(&whoami, request.base_fare, request.per_km).await?;
    Ok(Json(RatesResponse::from(rates)))
}
