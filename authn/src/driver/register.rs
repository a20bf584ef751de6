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

//! Extends the driver with the `register` method.

use crate::db;
use crate::driver::{run_blocking, AuthnDriver};
use crate::model::{
    Account, AccountId, AccountKind, AccountName, DriverProfile, Password, Role, Vehicle,
};
use log::info;
use rideshare_core::db::DbError;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::model::EmailAddress;

/// Minimum length of a password.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Password validator to ensure passwords meet minimum complexity requirements.
fn password_validator(s: &str) -> Option<&'static str> {
    if s.len() < MIN_PASSWORD_LENGTH {
        return Some("Too short");
    }

    let mut alphabetic = false;
    let mut numeric = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            alphabetic = true;
        } else if ch.is_numeric() {
            numeric = true;
        }
    }
    if !alphabetic || !numeric {
        return Some("Must contain letters and numbers");
    }

    None
}

impl AuthnDriver {
    /// Creates a new account of the given `kind`, hashing its `password`.
    pub(super) async fn create_account(
        self,
        email: EmailAddress,
        password: Password,
        name: AccountName,
        kind: AccountKind,
    ) -> DriverResult<Account> {
        let password = run_blocking(move || password.validate_and_hash(password_validator)).await??;
        let account = Account::new(
            AccountId::generate(),
            email,
            password,
            name,
            self.clock.now_utc(),
            kind,
        );

        let mut ex = self.db.ex().await?;
        match db::create_account(&mut ex, &account).await {
            Ok(()) => Ok(account),
            Err(DbError::AlreadyExists) => Err(DriverError::AlreadyExists(format!(
                "Email {} already registered",
                account.email().as_str()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Registers a new customer or driver account.  Drivers must provide their `vehicle`.
    pub async fn register(
        self,
        email: EmailAddress,
        password: Password,
        name: AccountName,
        role: Role,
        vehicle: Option<Vehicle>,
    ) -> DriverResult<Account> {
        let kind = match (role, vehicle) {
            (Role::Customer, None) => AccountKind::Customer,
            (Role::Customer, Some(_)) => {
                return Err(DriverError::InvalidInput(
                    "Only drivers can register a vehicle".to_owned(),
                ));
            }
            (Role::Driver, Some(vehicle)) => AccountKind::Driver(DriverProfile::new(vehicle)),
            (Role::Driver, None) => {
                return Err(DriverError::InvalidInput("Drivers must register a vehicle".to_owned()));
            }
            (Role::Admin, _) => {
                return Err(DriverError::InvalidInput(
                    "Cannot self-register as an admin".to_owned(),
                ));
            }
        };

        let account = self.create_account(email, password, name, kind).await?;
        info!("Registered {} account {}", account.role(), account.id());
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::Availability;
    use rideshare_core::model::Money;

    #[test]
    fn test_password_validator() {
        assert_eq!(Some("Too short"), password_validator(""));
        assert_eq!(Some("Too short"), password_validator("abc1234"));
        assert_eq!(Some("Must contain letters and numbers"), password_validator("abcdefgh"));
        assert_eq!(Some("Must contain letters and numbers"), password_validator("12345678"));
        assert_eq!(None, password_validator("abcd1234"));
    }

    #[tokio::test]
    async fn test_register_customer() {
        let context = TestContext::setup().await;

        let account = context
            .driver()
            .register(
                EmailAddress::from("c@example.com"),
                Password::from("abcd1234"),
                AccountName::from("Some Customer"),
                Role::Customer,
                None,
            )
            .await
            .unwrap();
        assert_eq!(&AccountKind::Customer, account.kind());
        assert_eq!(context.driver().now_utc(), account.created());
        assert!(!account.blocked());

        let stored = db::get_account(&mut context.ex().await, account.id()).await.unwrap();
        assert_eq!(account, stored);
        assert!(Password::from("abcd1234").verify(stored.password()).unwrap());
    }

    #[tokio::test]
    async fn test_register_driver() {
        let context = TestContext::setup().await;

        let vehicle = Vehicle::new("Seat Leon", "1234 XYZ", None).unwrap();
        let account = context
            .driver()
            .register(
                EmailAddress::from("d@example.com"),
                Password::from("abcd1234"),
                AccountName::from("Some Driver"),
                Role::Driver,
                Some(vehicle.clone()),
            )
            .await
            .unwrap();

        let profile = account.driver_profile().unwrap();
        assert_eq!(vehicle, profile.vehicle);
        assert_eq!(Availability::Offline, profile.availability);
        assert_eq!(Money::default(), profile.wallet);

        let stored = db::get_account(&mut context.ex().await, account.id()).await.unwrap();
        assert_eq!(account, stored);
    }

    #[tokio::test]
    async fn test_register_role_and_vehicle_mismatch() {
        let context = TestContext::setup().await;

        let vehicle = Vehicle::new("Seat Leon", "1234 XYZ", None).unwrap();
        for (role, vehicle, exp_error) in [
            (Role::Customer, Some(vehicle.clone()), "Only drivers"),
            (Role::Driver, None, "must register a vehicle"),
            (Role::Admin, None, "as an admin"),
            (Role::Admin, Some(vehicle), "as an admin"),
        ] {
            match context
                .driver()
                .register(
                    EmailAddress::from("x@example.com"),
                    Password::from("abcd1234"),
                    AccountName::from("Someone"),
                    role,
                    vehicle,
                )
                .await
            {
                Err(DriverError::InvalidInput(e)) => assert!(e.contains(exp_error)),
                e => panic!("{:?}", e),
            }
        }

        assert_eq!(
            db::list_accounts(&mut context.ex().await, None).await.unwrap(),
            vec![]
        );
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let context = TestContext::setup().await;

        match context
            .driver()
            .register(
                EmailAddress::from("c@example.com"),
                Password::from("abcdefgh"),
                AccountName::from("Some Customer"),
                Role::Customer,
                None,
            )
            .await
        {
            Err(DriverError::InvalidInput(e)) => assert!(e.contains("Weak password")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let context = TestContext::setup().await;
        context.create_driver("dup@example.com").await;

        assert_eq!(
            DriverError::AlreadyExists("Email dup@example.com already registered".to_owned()),
            context
                .driver()
                .register(
                    EmailAddress::from("DUP@example.com"),
                    Password::from("abcd1234"),
                    AccountName::from("Some Customer"),
                    Role::Customer,
                    None,
                )
                .await
                .unwrap_err()
        );
    }
}
