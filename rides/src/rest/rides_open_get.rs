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

//! API for drivers to list the rides that are waiting for a driver.

use crate::rest::{RideResponse, RidesState};
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
) -> Result<Json<Vec<RideResponse>>, RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let rides = driver.list_open_rides(&whoami).await?;
    Ok(Json(rides.into_iter().map(RideResponse::from).collect()))
}
