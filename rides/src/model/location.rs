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

//! Places and distances.

use rideshare_core::model::{decimal_from_f64, ModelError, ModelResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum length of a location's address.
const MAX_ADDRESS_LENGTH: usize = 256;

/// Maximum distance of a single ride.
const MAX_DISTANCE_KM: f64 = 1000.0;

/// Wire representation of a `Location` before validation.
#[derive(Deserialize, Serialize)]
struct RawLocation {
    /// Human-readable address.
    address: String,

    /// Latitude in degrees, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,

    /// Longitude in degrees, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
}

/// A place where a ride starts or ends.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "RawLocation", into = "RawLocation")]
pub struct Location {
    /// Human-readable address.
    address: String,

    /// Coordinates as a `(latitude, longitude)` pair.
    coordinates: Option<(f64, f64)>,
}

impl Location {
    /// Creates a new location after validating the address and the coordinates.
    pub fn new<S: Into<String>>(address: S, coordinates: Option<(f64, f64)>) -> ModelResult<Self> {
        let address = address.into();
        let address = address.trim();
        if address.is_empty() {
            return Err(ModelError("Address cannot be empty".to_owned()));
        }
        if address.chars().count() > MAX_ADDRESS_LENGTH {
            return Err(ModelError("Address is too long".to_owned()));
        }

        if let Some((latitude, longitude)) = coordinates {
            if !(-90.0..=90.0).contains(&latitude) {
                return Err(ModelError(format!("Invalid latitude {}", latitude)));
            }
            if !(-180.0..=180.0).contains(&longitude) {
                return Err(ModelError(format!("Invalid longitude {}", longitude)));
            }
        }

        Ok(Self { address: address.to_owned(), coordinates })
    }

    /// Returns the human-readable address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the `(latitude, longitude)` pair, if known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
    }
}

impl TryFrom<RawLocation> for Location {
    type Error = ModelError;

    fn try_from(raw: RawLocation) -> ModelResult<Self> {
        let coordinates = match (raw.latitude, raw.longitude) {
            (Some(latitude), Some(longitude)) => Some((latitude, longitude)),
            (None, None) => None,
            _ => {
                return Err(ModelError(
                    "Latitude and longitude must be given together".to_owned(),
                ))
            }
        };
        Location::new(raw.address, coordinates)
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        let (latitude, longitude) = match location.coordinates {
            Some((latitude, longitude)) => (Some(latitude), Some(longitude)),
            None => (None, None),
        };
        RawLocation { address: location.address, latitude, longitude }
    }
}

/// Length of a ride in kilometers.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DistanceKm {
    /// The distance as given.
    km: f64,

    /// The decimal number that `km` is written as, used for fare computations.
    exact: Decimal,
}

impl DistanceKm {
    /// Creates a new distance after checking that it is positive and within range.
    pub fn new(km: f64) -> ModelResult<Self> {
        if !km.is_finite() || km <= 0.0 {
            return Err(ModelError(format!("Distance must be positive; got {}", km)));
        }
        if km > MAX_DISTANCE_KM {
            return Err(ModelError(format!(
                "Distance cannot exceed {} km; got {}",
                MAX_DISTANCE_KM, km
            )));
        }
        let exact = decimal_from_f64(km)?;
        Ok(Self { km, exact })
    }

    /// Returns the distance in kilometers.
    pub fn as_km(self) -> f64 {
        self.km
    }

    /// Returns the distance in kilometers as an exact decimal number.
    pub fn as_decimal(self) -> Decimal {
        self.exact
    }
}

impl TryFrom<f64> for DistanceKm {
    type Error = ModelError;

    fn try_from(km: f64) -> ModelResult<Self> {
        DistanceKm::new(km)
    }
}

impl From<DistanceKm> for f64 {
    fn from(distance: DistanceKm) -> Self {
        distance.km
    }
}
