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

//! API for the assigned driver to complete a ride.

use crate::model::RideId;
use crate::rest::{RideResponse, RidesState};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rideshare_authn::rest::get_whoami;
use rideshare_core::model::Money;
use rideshare_core::rest::{JsonBody, PathParams, RestError, RestResult};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Message sent to the server to complete a ride.
#[derive(Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteRequest {
    /// Amount to charge.  Defaults to the estimated fare.
    #[serde(default)]
    pub(crate) final_fare: Option<Money>,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    path: RestResult<PathParams<RideId>>,
    headers: HeaderMap,
    body: RestResult<JsonBody<CompleteRequest>>,
) -> Result<Json<RideResponse>, RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let PathParams(id) = path?;
    let JsonBody(request) = body?;
    let ride = driver.complete_ride(&whoami, id, request.final_fare).await?;
    Ok(Json(RideResponse::from(ride)))
}
