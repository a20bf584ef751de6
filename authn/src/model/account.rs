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

//! The `Account` data type and its components.

use crate::model::HashedPassword;
use rideshare_core::model::{EmailAddress, ModelError, ModelResult, Money};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of an account's display name.
const MAX_NAME_LENGTH: usize = 128;

/// Maximum length of a vehicle's model description.
const MAX_VEHICLE_MODEL_LENGTH: usize = 64;

/// Maximum length of a vehicle's license plate.
const MAX_VEHICLE_PLATE_LENGTH: usize = 16;

/// Maximum length of a vehicle's color.
const MAX_VEHICLE_COLOR_LENGTH: usize = 32;

/// Unique identifier of an account.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the raw UUID behind this identifier.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for AccountId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of an account, which determines the operations it can perform.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A person that requests rides.
    Customer,

    /// A person that fulfills rides.
    Driver,

    /// An operator of the service.
    Admin,
}

impl Role {
    /// Returns the textual representation of the role as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            s => Err(ModelError(format!("Unknown role '{}'", s))),
        }
    }
}

/// Whether a driver is taking rides or not.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// The driver is on duty.
    Available,

    /// The driver is off duty.
    Offline,
}

impl Availability {
    /// Returns the textual representation of the availability as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Offline => "offline",
        }
    }
}

impl FromStr for Availability {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Availability::Available),
            "offline" => Ok(Availability::Offline),
            s => Err(ModelError(format!("Unknown availability '{}'", s))),
        }
    }
}

/// Checks that `value` is a non-blank string of at most `max_length` characters and returns it
/// without surrounding whitespace.
fn validate_text(what: &str, value: String, max_length: usize) -> ModelResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ModelError(format!("{} cannot be empty", what)));
    }
    if value.chars().count() > max_length {
        return Err(ModelError(format!("{} is too long", what)));
    }
    Ok(value.to_owned())
}

/// The display name of an account.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// Creates a new name from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        validate_text("Name", s.into(), MAX_NAME_LENGTH).map(Self)
    }

    /// Returns a string view of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountName {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        AccountName::new(s)
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for AccountName {
    fn from(s: &'static str) -> Self {
        AccountName::new(s).expect("Hardcoded names must be valid")
    }
}

/// Wire representation of a `Vehicle` before validation.
#[derive(Deserialize, Serialize)]
struct RawVehicle {
    /// Make and model of the vehicle.
    model: String,

    /// License plate of the vehicle.
    plate: String,

    /// Color of the vehicle, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

/// The vehicle a driver uses to fulfill rides.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "RawVehicle", into = "RawVehicle")]
pub struct Vehicle {
    /// Make and model of the vehicle.
    model: String,

    /// License plate of the vehicle.
    plate: String,

    /// Color of the vehicle, if known.
    color: Option<String>,
}

impl Vehicle {
    /// Creates a new vehicle description after validating its fields.
    pub fn new<S1, S2>(model: S1, plate: S2, color: Option<String>) -> ModelResult<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let model = validate_text("Vehicle model", model.into(), MAX_VEHICLE_MODEL_LENGTH)?;
        let plate = validate_text("Vehicle plate", plate.into(), MAX_VEHICLE_PLATE_LENGTH)?;
        let color = match color {
            Some(color) => Some(validate_text("Vehicle color", color, MAX_VEHICLE_COLOR_LENGTH)?),
            None => None,
        };
        Ok(Self { model, plate, color })
    }

    /// Returns the make and model of the vehicle.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the license plate of the vehicle.
    pub fn plate(&self) -> &str {
        &self.plate
    }

    /// Returns the color of the vehicle, if known.
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

impl TryFrom<RawVehicle> for Vehicle {
    type Error = ModelError;

    fn try_from(raw: RawVehicle) -> ModelResult<Self> {
        Vehicle::new(raw.model, raw.plate, raw.color)
    }
}

impl From<Vehicle> for RawVehicle {
    fn from(vehicle: Vehicle) -> Self {
        RawVehicle { model: vehicle.model, plate: vehicle.plate, color: vehicle.color }
    }
}

/// Data specific to driver accounts.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DriverProfile {
    /// The vehicle the driver uses.
    pub vehicle: Vehicle,

    /// Whether the driver is currently taking rides.
    pub availability: Availability,

    /// Accumulated earnings of the driver.
    pub wallet: Money,
}

impl DriverProfile {
    /// Creates the profile of a newly-registered driver: offline and with an empty wallet.
    pub fn new(vehicle: Vehicle) -> Self {
        Self { vehicle, availability: Availability::Offline, wallet: Money::default() }
    }
}

/// Role-specific data of an account.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AccountKind {
    /// A customer account.
    Customer,

    /// A driver account along with its driving details.
    Driver(DriverProfile),

    /// An administrator account.
    Admin,
}

impl AccountKind {
    /// Returns the role of this kind of account.
    pub fn role(&self) -> Role {
        match self {
            AccountKind::Customer => Role::Customer,
            AccountKind::Driver(_) => Role::Driver,
            AccountKind::Admin => Role::Admin,
        }
    }
}

/// A registered account of any role.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    /// Unique identifier of the account.
    id: AccountId,

    /// Email address used to log in.  Unique across all accounts.
    email: EmailAddress,

    /// Hash of the account's password.
    password: HashedPassword,

    /// Display name.
    name: AccountName,

    /// Whether the account has been blocked by an admin.
    blocked: bool,

    /// Creation time of the account.
    created: OffsetDateTime,

    /// Role and role-specific data.
    kind: AccountKind,
}

impl Account {
    /// Creates a new, unblocked account.
    pub fn new(
        id: AccountId,
        email: EmailAddress,
        password: HashedPassword,
        name: AccountName,
        created: OffsetDateTime,
        kind: AccountKind,
    ) -> Self {
        Self { id, email, password, name, blocked: false, created, kind }
    }

    /// Modifies the account to set its blocked state.
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    /// Gets the account's identifier.
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Gets the account's email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Gets the account's password hash.
    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Gets the account's display name.
    pub fn name(&self) -> &AccountName {
        &self.name
    }

    /// Returns true if the account has been blocked.
    pub fn blocked(&self) -> bool {
        self.blocked
    }

    /// Gets the account's creation time.
    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    /// Gets the account's role-specific data.
    pub fn kind(&self) -> &AccountKind {
        &self.kind
    }

    /// Gets the account's role.
    pub fn role(&self) -> Role {
        self.kind.role()
    }

    /// Gets the driver profile if this is a driver account.
    pub fn driver_profile(&self) -> Option<&DriverProfile> {
        match &self.kind {
            AccountKind::Driver(profile) => Some(profile),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens_error, assert_tokens, Token};

    #[test]
    fn test_role_str_roundtrip() {
        for role in [Role::Customer, Role::Driver, Role::Admin] {
            assert_eq!(role, Role::from_str(role.as_str()).unwrap());
        }
        assert_eq!(
            ModelError("Unknown role 'pilot'".to_owned()),
            Role::from_str("pilot").unwrap_err()
        );
    }

    #[test]
    fn test_role_ser_de() {
        assert_tokens(&Role::Admin, &[Token::UnitVariant { name: "Role", variant: "admin" }]);
    }

    #[test]
    fn test_availability_from_str() {
        assert_eq!(Availability::Available, Availability::from_str("available").unwrap());
        assert_eq!(Availability::Offline, Availability::from_str("offline").unwrap());
        Availability::from_str("busy").unwrap_err();
    }

    #[test]
    fn test_account_name_ok() {
        assert_eq!("Jane Doe", AccountName::new("  Jane Doe ").unwrap().as_str());
        assert_eq!(MAX_NAME_LENGTH, AccountName::new("x".repeat(MAX_NAME_LENGTH)).unwrap().0.len());
    }

    #[test]
    fn test_account_name_error() {
        assert_eq!(
            ModelError("Name cannot be empty".to_owned()),
            AccountName::new("   ").unwrap_err()
        );
        assert_eq!(
            ModelError("Name is too long".to_owned()),
            AccountName::new("x".repeat(MAX_NAME_LENGTH + 1)).unwrap_err()
        );
    }

    #[test]
    fn test_account_name_de_error() {
        assert_de_tokens_error::<AccountName>(&[Token::Str("")], "Name cannot be empty");
    }

    #[test]
    fn test_vehicle_ok() {
        let vehicle = Vehicle::new(" Toyota Prius ", "ABC-123", None).unwrap();
        assert_eq!("Toyota Prius", vehicle.model());
        assert_eq!("ABC-123", vehicle.plate());
        assert_eq!(None, vehicle.color());

        let vehicle = Vehicle::new("Seat Leon", "1234 XYZ", Some("red".to_owned())).unwrap();
        assert_eq!(Some("red"), vehicle.color());
    }

    #[test]
    fn test_vehicle_errors() {
        Vehicle::new("", "ABC-123", None).unwrap_err();
        Vehicle::new("Seat Leon", " ", None).unwrap_err();
        Vehicle::new("Seat Leon", "X".repeat(MAX_VEHICLE_PLATE_LENGTH + 1), None).unwrap_err();
        Vehicle::new("Seat Leon", "1234", Some("".to_owned())).unwrap_err();
    }

    #[test]
    fn test_account_kind_json_is_tagged_by_role() {
        let kind = AccountKind::Driver(DriverProfile::new(
            Vehicle::new("Seat Leon", "1234 XYZ", None).unwrap(),
        ));
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(
            serde_json::json!({
                "role": "driver",
                "vehicle": {"model": "Seat Leon", "plate": "1234 XYZ"},
                "availability": "offline",
                "wallet": 0.0,
            }),
            json
        );
        assert_eq!(kind, serde_json::from_value::<AccountKind>(json).unwrap());

        let json = serde_json::to_value(AccountKind::Customer).unwrap();
        assert_eq!(serde_json::json!({"role": "customer"}), json);
    }

    #[test]
    fn test_account_accessors() {
        let id = AccountId::generate();
        let created = OffsetDateTime::from_unix_timestamp(1000).unwrap();
        let account = Account::new(
            id,
            EmailAddress::from("a@example.com"),
            HashedPassword::new("hash"),
            AccountName::from("A"),
            created,
            AccountKind::Admin,
        );
        assert_eq!(id, account.id());
        assert_eq!(Role::Admin, account.role());
        assert!(!account.blocked());
        assert!(account.driver_profile().is_none());
        assert!(account.with_blocked(true).blocked());
    }
}
