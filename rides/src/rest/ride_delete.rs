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

//! API for admins to delete a ride.

use crate::model::RideId;
use crate::rest::RidesState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use rideshare_authn::rest::get_whoami;
use rideshare_core::rest::{EmptyBody, PathParams, RestError, RestResult};

/// DELETE handler for this API.
pub(crate) async fn handler(
    State((authn, driver)): State<RidesState>,
    path: RestResult<PathParams<RideId>>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let whoami = get_whoami(authn, &headers).await?;
    let PathParams(id) = path?;
    driver.delete_ride(&whoami, id).await?;
    Ok(())
}
