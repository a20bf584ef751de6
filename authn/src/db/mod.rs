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

//! Database abstraction to manipulate accounts.

use crate::model::{
    Account, AccountId, AccountKind, AccountName, Availability, DriverProfile, HashedPassword,
    Role, Vehicle,
};
#[cfg(feature = "postgres")]
use rideshare_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use rideshare_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use rideshare_core::db::{DbError, DbResult, Executor};
use rideshare_core::model::{EmailAddress, Money};
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Raw contents of a row in the `accounts` table, decoded in a backend-specific manner.
struct AccountRow {
    /// Value of the `id` column.
    id: Uuid,

    /// Value of the `email` column.
    email: String,

    /// Value of the `password` column.
    password: String,

    /// Value of the `name` column.
    name: String,

    /// Value of the `role` column.
    role: String,

    /// Value of the `blocked` column.
    blocked: bool,

    /// Value of the `created` column or columns.
    created: OffsetDateTime,

    /// Value of the `vehicle_model` column.
    vehicle_model: Option<String>,

    /// Value of the `vehicle_plate` column.
    vehicle_plate: Option<String>,

    /// Value of the `vehicle_color` column.
    vehicle_color: Option<String>,

    /// Value of the `availability` column.
    availability: Option<String>,

    /// Value of the `wallet_cents` column.
    wallet_cents: Option<i64>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DbError;

    fn try_from(row: AccountRow) -> DbResult<Self> {
        let id = AccountId::from(row.id);
        let role = row.role.parse::<Role>()?;

        let kind = match (
            role,
            row.vehicle_model,
            row.vehicle_plate,
            row.vehicle_color,
            row.availability,
            row.wallet_cents,
        ) {
            (Role::Driver, Some(model), Some(plate), color, Some(availability), Some(wallet)) => {
                AccountKind::Driver(DriverProfile {
                    vehicle: Vehicle::new(model, plate, color)?,
                    availability: availability.parse::<Availability>()?,
                    wallet: Money::from_cents(wallet)?,
                })
            }
            (Role::Driver, _, _, _, _, _) => {
                return Err(DbError::DataIntegrityError(format!(
                    "Driver account {} lacks driver details",
                    id
                )));
            }
            (Role::Customer, None, None, None, None, None) => AccountKind::Customer,
            (Role::Admin, None, None, None, None, None) => AccountKind::Admin,
            (role, _, _, _, _, _) => {
                return Err(DbError::DataIntegrityError(format!(
                    "Account {} with role {} has driver details",
                    id, role
                )));
            }
        };

        let account = Account::new(
            id,
            EmailAddress::new(row.email)?,
            HashedPassword::new(row.password),
            AccountName::new(row.name)?,
            row.created,
            kind,
        )
        .with_blocked(row.blocked);
        Ok(account)
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Account {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let map_err = postgres::map_sqlx_error;
        let row = AccountRow {
            id: row.try_get("id").map_err(map_err)?,
            email: row.try_get("email").map_err(map_err)?,
            password: row.try_get("password").map_err(map_err)?,
            name: row.try_get("name").map_err(map_err)?,
            role: row.try_get("role").map_err(map_err)?,
            blocked: row.try_get("blocked").map_err(map_err)?,
            created: row.try_get("created").map_err(map_err)?,
            vehicle_model: row.try_get("vehicle_model").map_err(map_err)?,
            vehicle_plate: row.try_get("vehicle_plate").map_err(map_err)?,
            vehicle_color: row.try_get("vehicle_color").map_err(map_err)?,
            availability: row.try_get("availability").map_err(map_err)?,
            wallet_cents: row.try_get("wallet_cents").map_err(map_err)?,
        };
        Account::try_from(row)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Account {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let map_err = sqlite::map_sqlx_error;
        let created_secs: i64 = row.try_get("created_secs").map_err(map_err)?;
        let created_nsecs: i64 = row.try_get("created_nsecs").map_err(map_err)?;
        let row = AccountRow {
            id: row.try_get("id").map_err(map_err)?,
            email: row.try_get("email").map_err(map_err)?,
            password: row.try_get("password").map_err(map_err)?,
            name: row.try_get("name").map_err(map_err)?,
            role: row.try_get("role").map_err(map_err)?,
            blocked: row.try_get("blocked").map_err(map_err)?,
            created: build_timestamp(created_secs, created_nsecs)?,
            vehicle_model: row.try_get("vehicle_model").map_err(map_err)?,
            vehicle_plate: row.try_get("vehicle_plate").map_err(map_err)?,
            vehicle_color: row.try_get("vehicle_color").map_err(map_err)?,
            availability: row.try_get("availability").map_err(map_err)?,
            wallet_cents: row.try_get("wallet_cents").map_err(map_err)?,
        };
        Account::try_from(row)
    }
}

/// Creates a new `account`.  Fails with `AlreadyExists` if the email address is taken.
pub async fn create_account(ex: &mut Executor, account: &Account) -> DbResult<()> {
    let profile = account.driver_profile();
    let vehicle_model = profile.map(|p| p.vehicle.model());
    let vehicle_plate = profile.map(|p| p.vehicle.plate());
    let vehicle_color = profile.and_then(|p| p.vehicle.color());
    let availability = profile.map(|p| p.availability.as_str());
    let wallet_cents = profile.map(|p| p.wallet.cents());

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO accounts
                    (id, email, password, name, role, blocked, created,
                    vehicle_model, vehicle_plate, vehicle_color, availability, wallet_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";
            let done = sqlx::query(query_str)
                .bind(*account.id().as_uuid())
                .bind(account.email().as_str())
                .bind(account.password().as_str())
                .bind(account.name().as_str())
                .bind(account.role().as_str())
                .bind(account.blocked())
                .bind(account.created())
                .bind(vehicle_model)
                .bind(vehicle_plate)
                .bind(vehicle_color)
                .bind(availability)
                .bind(wallet_cents)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (created_secs, created_nsecs) = unpack_timestamp(account.created())?;

            let query_str = "
                INSERT INTO accounts
                    (id, email, password, name, role, blocked, created_secs, created_nsecs,
                    vehicle_model, vehicle_plate, vehicle_color, availability, wallet_cents)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(*account.id().as_uuid())
                .bind(account.email().as_str())
                .bind(account.password().as_str())
                .bind(account.name().as_str())
                .bind(account.role().as_str())
                .bind(account.blocked())
                .bind(created_secs)
                .bind(created_nsecs)
                .bind(vehicle_model)
                .bind(vehicle_plate)
                .bind(vehicle_color)
                .bind(availability)
                .bind(wallet_cents)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Gets an existing account by its `id`.
pub async fn get_account(ex: &mut Executor, id: AccountId) -> DbResult<Account> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM accounts WHERE id = $1";
            let raw_account = sqlx::query(query_str)
                .bind(*id.as_uuid())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Account::try_from(raw_account)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM accounts WHERE id = ?";
            let raw_account = sqlx::query(query_str)
                .bind(*id.as_uuid())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Account::try_from(raw_account)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets an existing account by its `email` address.
pub async fn get_account_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<Account> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM accounts WHERE email = $1";
            let raw_account = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Account::try_from(raw_account)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM accounts WHERE email = ?";
            let raw_account = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Account::try_from(raw_account)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Lists all accounts sorted by email address, optionally restricted to those with `role`.
pub async fn list_accounts(ex: &mut Executor, role: Option<Role>) -> DbResult<Vec<Account>> {
    let role = role.map(|r| r.as_str());

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM accounts
                WHERE $1::VARCHAR IS NULL OR role = $1
                ORDER BY email";
            let rows = sqlx::query(query_str)
                .bind(role)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Account::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM accounts
                WHERE ?1 IS NULL OR role = ?1
                ORDER BY email";
            let rows = sqlx::query(query_str)
                .bind(role)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Account::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Sets the `blocked` state of the account `id`.
pub async fn set_account_blocked(ex: &mut Executor, id: AccountId, blocked: bool) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "UPDATE accounts SET blocked = $1 WHERE id = $2";
            let done = sqlx::query(query_str)
                .bind(blocked)
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "UPDATE accounts SET blocked = ? WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(blocked)
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("UPDATE affected more than one row".to_owned())),
    }
}

/// Sets the `availability` of the driver account `id`.  Fails with `NotFound` if the account
/// does not exist or is not a driver.
pub async fn set_driver_availability(
    ex: &mut Executor,
    id: AccountId,
    availability: Availability,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE accounts SET availability = $1
                WHERE id = $2 AND role = 'driver'";
            let done = sqlx::query(query_str)
                .bind(availability.as_str())
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE accounts SET availability = ?
                WHERE id = ? AND role = 'driver'";
            let done = sqlx::query(query_str)
                .bind(availability.as_str())
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("UPDATE affected more than one row".to_owned())),
    }
}

/// Adds `amount` to the wallet of the driver account `id`.  Fails with `NotFound` if the account
/// does not exist or is not a driver.
///
/// The increment happens in the database so that concurrent credits never lose updates.
pub async fn credit_driver_wallet(ex: &mut Executor, id: AccountId, amount: Money) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE accounts SET wallet_cents = wallet_cents + $1
                WHERE id = $2 AND role = 'driver'";
            let done = sqlx::query(query_str)
                .bind(amount.cents())
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE accounts SET wallet_cents = wallet_cents + ?
                WHERE id = ? AND role = 'driver'";
            let done = sqlx::query(query_str)
                .bind(amount.cents())
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("UPDATE affected more than one row".to_owned())),
    }
}
