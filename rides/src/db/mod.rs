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

//! Database abstraction to manipulate rides and rate cards.
//!
//! Status changes are never written blindly: every transition is a single `UPDATE` whose `WHERE`
//! clause restates the statuses the transition can start from, and the caller learns whether the
//! transition happened by looking at the returned flag.  This is what resolves races between
//! concurrent requests for the same ride.

use crate::model::{
    DistanceKm, Location, RateCard, Rating, Review, Ride, RideId, RideParts, RideStatus,
};
use rideshare_authn::model::AccountId;
#[cfg(feature = "postgres")]
use rideshare_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use rideshare_core::db::sqlite::{self, build_optional_timestamp, build_timestamp, unpack_timestamp};
use rideshare_core::db::{DbError, DbResult, Executor};
use rideshare_core::model::Money;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;


/// Initializes the database schema.
///
/// The accounts schema must have been initialized first because rides reference accounts.
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

/// Formats the statuses from which `next` can be reached as the body of an SQL `IN` clause.
fn sources_sql(next: RideStatus) -> String {
    let sources = RideStatus::sources(next)
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<String>>();
    if sources.is_empty() {
        // An empty IN list is not valid SQL; NULL never matches.
        "NULL".to_owned()
    } else {
        sources.join(", ")
    }
}

/// Interprets the number of rows touched by a conditional update.
fn conditional_update_result(rows_affected: u64) -> DbResult<bool> {
    match rows_affected {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DbError::BackendError("UPDATE affected more than one row".to_owned())),
    }
}

/// Raw contents of a row in the `rides` table, decoded in a backend-specific manner.
struct RideRow {
    /// Value of the `id` column.
    id: Uuid,

    /// Value of the `customer_id` column.
    customer_id: Uuid,

    /// Value of the `driver_id` column.
    driver_id: Option<Uuid>,

    /// Value of the `pickup` column.
    pickup: Location,

    /// Value of the `dropoff` column.
    dropoff: Location,

    /// Value of the `distance_km` column.
    distance_km: f64,

    /// Value of the `estimated_fare_cents` column.
    estimated_fare_cents: i64,

    /// Value of the `rate_version` column.
    rate_version: i64,

    /// Value of the `final_fare_cents` column.
    final_fare_cents: Option<i64>,

    /// Value of the `status` column.
    status: String,

    /// Value of the `requested_at` column or columns.
    requested_at: OffsetDateTime,

    /// Value of the `accepted_at` column or columns.
    accepted_at: Option<OffsetDateTime>,

    /// Value of the `started_at` column or columns.
    started_at: Option<OffsetDateTime>,

    /// Value of the `completed_at` column or columns.
    completed_at: Option<OffsetDateTime>,

    /// Value of the `cancelled_at` column or columns.
    cancelled_at: Option<OffsetDateTime>,

    /// Value of the `review_rating` column.
    review_rating: Option<i16>,

    /// Value of the `review_comment` column.
    review_comment: Option<String>,

    /// Value of the `review_created` column or columns.
    review_created: Option<OffsetDateTime>,
}

impl TryFrom<RideRow> for Ride {
    type Error = DbError;

    fn try_from(row: RideRow) -> DbResult<Self> {
        let id = RideId::from(row.id);

        let review = match (row.review_rating, row.review_comment, row.review_created) {
            (Some(rating), comment, Some(created)) => {
                let rating = u8::try_from(rating).map_err(|_| {
                    DbError::DataIntegrityError(format!("Ride {} has bad rating {}", id, rating))
                })?;
                Some(Review { rating: Rating::new(rating)?, comment, created })
            }
            (None, None, None) => None,
            (_, _, _) => {
                return Err(DbError::DataIntegrityError(format!(
                    "Ride {} has an incomplete review",
                    id
                )));
            }
        };

        let rate_version = u32::try_from(row.rate_version).map_err(|_| {
            DbError::DataIntegrityError(format!(
                "Ride {} has bad rate version {}",
                id, row.rate_version
            ))
        })?;

        let parts = RideParts {
            id,
            customer_id: AccountId::from(row.customer_id),
            driver_id: row.driver_id.map(AccountId::from),
            pickup: row.pickup,
            dropoff: row.dropoff,
            distance: DistanceKm::new(row.distance_km)?,
            estimated_fare: Money::from_cents(row.estimated_fare_cents)?,
            rate_version,
            final_fare: row.final_fare_cents.map(Money::from_cents).transpose()?,
            status: row.status.parse::<RideStatus>()?,
            requested_at: row.requested_at,
            accepted_at: row.accepted_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            review,
        };
        Ok(Ride::try_from(parts)?)
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Ride {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let map_err = postgres::map_sqlx_error;
        let pickup: Json<Location> = row.try_get("pickup").map_err(map_err)?;
        let dropoff: Json<Location> = row.try_get("dropoff").map_err(map_err)?;
        let row = RideRow {
            id: row.try_get("id").map_err(map_err)?,
            customer_id: row.try_get("customer_id").map_err(map_err)?,
            driver_id: row.try_get("driver_id").map_err(map_err)?,
            pickup: pickup.0,
            dropoff: dropoff.0,
            distance_km: row.try_get("distance_km").map_err(map_err)?,
            estimated_fare_cents: row.try_get("estimated_fare_cents").map_err(map_err)?,
            rate_version: row.try_get("rate_version").map_err(map_err)?,
            final_fare_cents: row.try_get("final_fare_cents").map_err(map_err)?,
            status: row.try_get("status").map_err(map_err)?,
            requested_at: row.try_get("requested_at").map_err(map_err)?,
            accepted_at: row.try_get("accepted_at").map_err(map_err)?,
            started_at: row.try_get("started_at").map_err(map_err)?,
            completed_at: row.try_get("completed_at").map_err(map_err)?,
            cancelled_at: row.try_get("cancelled_at").map_err(map_err)?,
            review_rating: row.try_get("review_rating").map_err(map_err)?,
            review_comment: row.try_get("review_comment").map_err(map_err)?,
            review_created: row.try_get("review_created").map_err(map_err)?,
        };
        Ride::try_from(row)
    }
}

/// Extracts the optional timestamp stored in the `<name>_secs` and `<name>_nsecs` columns.
#[cfg(any(feature = "sqlite", test))]
fn get_optional_timestamp(row: &SqliteRow, name: &str) -> DbResult<Option<OffsetDateTime>> {
    let map_err = sqlite::map_sqlx_error;
    let secs: Option<i64> = row.try_get(format!("{}_secs", name).as_str()).map_err(map_err)?;
    let nsecs: Option<i64> = row.try_get(format!("{}_nsecs", name).as_str()).map_err(map_err)?;
    build_optional_timestamp(secs, nsecs)
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Ride {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let map_err = sqlite::map_sqlx_error;
        let pickup: Json<Location> = row.try_get("pickup").map_err(map_err)?;
        let dropoff: Json<Location> = row.try_get("dropoff").map_err(map_err)?;
        let requested_at_secs: i64 = row.try_get("requested_at_secs").map_err(map_err)?;
        let requested_at_nsecs: i64 = row.try_get("requested_at_nsecs").map_err(map_err)?;
        let ride_row = RideRow {
            id: row.try_get("id").map_err(map_err)?,
            customer_id: row.try_get("customer_id").map_err(map_err)?,
            driver_id: row.try_get("driver_id").map_err(map_err)?,
            pickup: pickup.0,
            dropoff: dropoff.0,
            distance_km: row.try_get("distance_km").map_err(map_err)?,
            estimated_fare_cents: row.try_get("estimated_fare_cents").map_err(map_err)?,
            rate_version: row.try_get("rate_version").map_err(map_err)?,
            final_fare_cents: row.try_get("final_fare_cents").map_err(map_err)?,
            status: row.try_get("status").map_err(map_err)?,
            requested_at: build_timestamp(requested_at_secs, requested_at_nsecs)?,
            accepted_at: get_optional_timestamp(&row, "accepted_at")?,
            started_at: get_optional_timestamp(&row, "started_at")?,
            completed_at: get_optional_timestamp(&row, "completed_at")?,
            cancelled_at: get_optional_timestamp(&row, "cancelled_at")?,
            review_rating: row.try_get("review_rating").map_err(map_err)?,
            review_comment: row.try_get("review_comment").map_err(map_err)?,
            review_created: get_optional_timestamp(&row, "review_created")?,
        };
        Ride::try_from(ride_row)
    }
}

/// Creates a new `ride` as given.
///
/// Fails with `NotFound` if the customer does not exist.
pub async fn create_ride(ex: &mut Executor, ride: &Ride) -> DbResult<()> {
    debug_assert_eq!(RideStatus::Requested, ride.status());

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO rides
                    (id, customer_id, pickup, dropoff, distance_km,
                    estimated_fare_cents, rate_version, status, requested_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
            let done = sqlx::query(query_str)
                .bind(*ride.id().as_uuid())
                .bind(*ride.customer_id().as_uuid())
                .bind(Json(ride.pickup()))
                .bind(Json(ride.dropoff()))
                .bind(ride.distance().as_km())
                .bind(ride.estimated_fare().cents())
                .bind(i64::from(ride.rate_version()))
                .bind(ride.status().as_str())
                .bind(ride.requested_at())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (requested_at_secs, requested_at_nsecs) = unpack_timestamp(ride.requested_at())?;

            let query_str = "
                INSERT INTO rides
                    (id, customer_id, pickup, dropoff, distance_km,
                    estimated_fare_cents, rate_version, status,
                    requested_at_secs, requested_at_nsecs)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(*ride.id().as_uuid())
                .bind(*ride.customer_id().as_uuid())
                .bind(Json(ride.pickup()))
                .bind(Json(ride.dropoff()))
                .bind(ride.distance().as_km())
                .bind(ride.estimated_fare().cents())
                .bind(i64::from(ride.rate_version()))
                .bind(ride.status().as_str())
                .bind(requested_at_secs)
                .bind(requested_at_nsecs)
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

/// Gets an existing ride by its `id`.
pub async fn get_ride(ex: &mut Executor, id: RideId) -> DbResult<Ride> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM rides WHERE id = $1";
            let raw_ride = sqlx::query(query_str)
                .bind(*id.as_uuid())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Ride::try_from(raw_ride)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM rides WHERE id = ?";
            let raw_ride = sqlx::query(query_str)
                .bind(*id.as_uuid())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Ride::try_from(raw_ride)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Subset of rides to return from `list_rides`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RideFilter {
    /// All rides.
    All,

    /// Rides requested by the given customer.
    Customer(AccountId),

    /// Rides assigned to the given driver.
    Driver(AccountId),
}

/// Lists the rides that match `filter`, newest first.
pub async fn list_rides(ex: &mut Executor, filter: RideFilter) -> DbResult<Vec<Ride>> {
    let (customer_id, driver_id) = match filter {
        RideFilter::All => (None, None),
        RideFilter::Customer(id) => (Some(*id.as_uuid()), None),
        RideFilter::Driver(id) => (None, Some(*id.as_uuid())),
    };

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM rides
                WHERE ($1::UUID IS NULL OR customer_id = $1)
                    AND ($2::UUID IS NULL OR driver_id = $2)
                ORDER BY requested_at DESC, id";
            let rows = sqlx::query(query_str)
                .bind(customer_id)
                .bind(driver_id)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Ride::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM rides
                WHERE (?1 IS NULL OR customer_id = ?1)
                    AND (?2 IS NULL OR driver_id = ?2)
                ORDER BY requested_at_secs DESC, requested_at_nsecs DESC, id";
            let rows = sqlx::query(query_str)
                .bind(customer_id)
                .bind(driver_id)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Ride::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Lists the rides that are waiting for a driver, oldest first.
pub async fn list_open_rides(ex: &mut Executor) -> DbResult<Vec<Ride>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM rides
                WHERE status = 'requested'
                ORDER BY requested_at ASC, id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Ride::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM rides
                WHERE status = 'requested'
                ORDER BY requested_at_secs ASC, requested_at_nsecs ASC, id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Ride::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Deletes the ride `id` regardless of its status.
pub async fn delete_ride(ex: &mut Executor, id: RideId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM rides WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM rides WHERE id = ?";
            let done = sqlx::query(query_str)
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
        _ => Err(DbError::BackendError("DELETE affected more than one row".to_owned())),
    }
}

/// Assigns the ride `id` to `driver_id` if the ride is still waiting for a driver.
///
/// Returns false if the ride does not exist or if it cannot be accepted.
pub async fn accept_ride(
    ex: &mut Executor,
    id: RideId,
    driver_id: AccountId,
    now: OffsetDateTime,
) -> DbResult<bool> {
    let sources = sources_sql(RideStatus::Accepted);

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "UPDATE rides SET status = 'accepted', driver_id = $1, accepted_at = $2
                WHERE id = $3 AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(*driver_id.as_uuid())
                .bind(now)
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now)?;

            let query_str = format!(
                "UPDATE rides
                SET status = 'accepted', driver_id = ?,
                    accepted_at_secs = ?, accepted_at_nsecs = ?
                WHERE id = ? AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(*driver_id.as_uuid())
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(*id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    conditional_update_result(rows_affected)
}

/// Marks the ride `id` as started if it is assigned to `driver_id` and can be started.
///
/// Returns false if the ride does not exist or if the conditions do not hold.
pub async fn start_ride(
    ex: &mut Executor,
    id: RideId,
    driver_id: AccountId,
    now: OffsetDateTime,
) -> DbResult<bool> {
    let sources = sources_sql(RideStatus::Started);

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "UPDATE rides SET status = 'started', started_at = $1
                WHERE id = $2 AND driver_id = $3 AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(now)
                .bind(*id.as_uuid())
                .bind(*driver_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now)?;

            let query_str = format!(
                "UPDATE rides SET status = 'started', started_at_secs = ?, started_at_nsecs = ?
                WHERE id = ? AND driver_id = ? AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(*id.as_uuid())
                .bind(*driver_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    conditional_update_result(rows_affected)
}

/// Marks the ride `id` as completed if it is assigned to `driver_id` and can be completed.
///
/// The final fare is set to `final_fare` or, if not given, to the estimated fare.
///
/// Returns false if the ride does not exist or if the conditions do not hold.
pub async fn complete_ride(
    ex: &mut Executor,
    id: RideId,
    driver_id: AccountId,
    final_fare: Option<Money>,
    now: OffsetDateTime,
) -> DbResult<bool> {
    let sources = sources_sql(RideStatus::Completed);
    let final_fare_cents = final_fare.map(Money::cents);

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "UPDATE rides
                SET status = 'completed',
                    final_fare_cents = COALESCE($1, estimated_fare_cents),
                    completed_at = $2
                WHERE id = $3 AND driver_id = $4 AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(final_fare_cents)
                .bind(now)
                .bind(*id.as_uuid())
                .bind(*driver_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now)?;

            let query_str = format!(
                "UPDATE rides
                SET status = 'completed',
                    final_fare_cents = COALESCE(?, estimated_fare_cents),
                    completed_at_secs = ?,
                    completed_at_nsecs = ?
                WHERE id = ? AND driver_id = ? AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(final_fare_cents)
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(*id.as_uuid())
                .bind(*driver_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    conditional_update_result(rows_affected)
}

/// Marks the ride `id` as cancelled if it can still be cancelled.
///
/// If `customer_id` is given, the ride must also belong to that customer.
///
/// Returns false if the ride does not exist or if the conditions do not hold.
pub async fn cancel_ride(
    ex: &mut Executor,
    id: RideId,
    customer_id: Option<AccountId>,
    now: OffsetDateTime,
) -> DbResult<bool> {
    let sources = sources_sql(RideStatus::Cancelled);
    let customer_id = customer_id.map(|id| *id.as_uuid());

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "UPDATE rides SET status = 'cancelled', cancelled_at = $1
                WHERE id = $2 AND ($3::UUID IS NULL OR customer_id = $3) AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(now)
                .bind(*id.as_uuid())
                .bind(customer_id)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now)?;

            let query_str = format!(
                "UPDATE rides
                SET status = 'cancelled', cancelled_at_secs = ?1, cancelled_at_nsecs = ?2
                WHERE id = ?3 AND (?4 IS NULL OR customer_id = ?4) AND status IN ({})",
                sources
            );
            let done = sqlx::query(&query_str)
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(*id.as_uuid())
                .bind(customer_id)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    conditional_update_result(rows_affected)
}

/// Attaches `review` to the ride `id` if the ride belongs to `customer_id`, is completed and has
/// not been reviewed yet.
///
/// Returns false if the ride does not exist or if the conditions do not hold.
pub async fn review_ride(
    ex: &mut Executor,
    id: RideId,
    customer_id: AccountId,
    review: &Review,
) -> DbResult<bool> {
    let rating = i16::from(review.rating.stars());
    let comment = review.comment.as_deref();

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE rides SET review_rating = $1, review_comment = $2, review_created = $3
                WHERE id = $4 AND customer_id = $5
                    AND status = 'completed' AND review_rating IS NULL";
            let done = sqlx::query(query_str)
                .bind(rating)
                .bind(comment)
                .bind(review.created)
                .bind(*id.as_uuid())
                .bind(*customer_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (created_secs, created_nsecs) = unpack_timestamp(review.created)?;

            let query_str = "
                UPDATE rides
                SET review_rating = ?, review_comment = ?,
                    review_created_secs = ?, review_created_nsecs = ?
                WHERE id = ? AND customer_id = ?
                    AND status = 'completed' AND review_rating IS NULL";
            let done = sqlx::query(query_str)
                .bind(rating)
                .bind(comment)
                .bind(created_secs)
                .bind(created_nsecs)
                .bind(*id.as_uuid())
                .bind(*customer_id.as_uuid())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    conditional_update_result(rows_affected)
}

/// Raw contents of a row in the `rates` table, decoded in a backend-specific manner.
struct RatesRow {
    /// Value of the `version` column.
    version: i64,

    /// Value of the `base_fare_cents` column.
    base_fare_cents: i64,

    /// Value of the `per_km_cents` column.
    per_km_cents: i64,

    /// Value of the `updated` column or columns.
    updated: OffsetDateTime,

    /// Value of the `updated_by` column.
    updated_by: Option<Uuid>,
}

impl TryFrom<RatesRow> for RateCard {
    type Error = DbError;

    fn try_from(row: RatesRow) -> DbResult<Self> {
        let version = u32::try_from(row.version).map_err(|_| {
            DbError::DataIntegrityError(format!("Invalid rate card version {}", row.version))
        })?;
        Ok(RateCard {
            version,
            base_fare: Money::from_cents(row.base_fare_cents)?,
            per_km: Money::from_cents(row.per_km_cents)?,
            updated: row.updated,
            updated_by: row.updated_by.map(AccountId::from),
        })
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for RateCard {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let map_err = postgres::map_sqlx_error;
        let row = RatesRow {
            version: row.try_get("version").map_err(map_err)?,
            base_fare_cents: row.try_get("base_fare_cents").map_err(map_err)?,
            per_km_cents: row.try_get("per_km_cents").map_err(map_err)?,
            updated: row.try_get("updated").map_err(map_err)?,
            updated_by: row.try_get("updated_by").map_err(map_err)?,
        };
        RateCard::try_from(row)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for RateCard {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let map_err = sqlite::map_sqlx_error;
        let updated_secs: i64 = row.try_get("updated_secs").map_err(map_err)?;
        let updated_nsecs: i64 = row.try_get("updated_nsecs").map_err(map_err)?;
        let row = RatesRow {
            version: row.try_get("version").map_err(map_err)?,
            base_fare_cents: row.try_get("base_fare_cents").map_err(map_err)?,
            per_km_cents: row.try_get("per_km_cents").map_err(map_err)?,
            updated: build_timestamp(updated_secs, updated_nsecs)?,
            updated_by: row.try_get("updated_by").map_err(map_err)?,
        };
        RateCard::try_from(row)
    }
}

/// Gets the rate card with the highest version, if any has ever been stored.
pub async fn get_current_rates(ex: &mut Executor) -> DbResult<Option<RateCard>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM rates ORDER BY version DESC LIMIT 1";
            let raw_rates = sqlx::query(query_str)
                .fetch_optional(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            raw_rates.map(RateCard::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM rates ORDER BY version DESC LIMIT 1";
            let raw_rates = sqlx::query(query_str)
                .fetch_optional(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            raw_rates.map(RateCard::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Stores a new rate card.
///
/// Fails with `AlreadyExists` if a card with the same version exists, which happens when two
/// updates race for the same version number.
pub async fn insert_rates(ex: &mut Executor, rates: &RateCard) -> DbResult<()> {
    let updated_by = rates.updated_by.map(|id| *id.as_uuid());

    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO rates (version, base_fare_cents, per_km_cents, updated, updated_by)
                VALUES ($1, $2, $3, $4, $5)";
            let done = sqlx::query(query_str)
                .bind(i64::from(rates.version))
                .bind(rates.base_fare.cents())
                .bind(rates.per_km.cents())
                .bind(rates.updated)
                .bind(updated_by)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (updated_secs, updated_nsecs) = unpack_timestamp(rates.updated)?;

            let query_str = "
                INSERT INTO rates
                    (version, base_fare_cents, per_km_cents,
                    updated_secs, updated_nsecs, updated_by)
                VALUES (?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(i64::from(rates.version))
                .bind(rates.base_fare.cents())
                .bind(rates.per_km.cents())
                .bind(updated_secs)
                .bind(updated_nsecs)
                .bind(updated_by)
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
