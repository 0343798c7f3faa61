//! `PostgreSQL` implementation of the concert record store.

use bandstand_core::catalog::{ConcertStore, ConcertStoreError};
use bandstand_core::status::ConcertStatus;
use bandstand_core::types::{Capacity, Concert, ConcertId, Money, UserId};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Concert records backed by the `concerts` table.
///
/// Status is stored as TEXT (`scheduled`/`full`/`cancelled`) matching
/// [`ConcertStatus::as_str`]; the table's CHECK constraint rejects anything
/// else.
#[derive(Clone)]
pub struct PostgresConcertStore {
    pool: PgPool,
}

impl PostgresConcertStore {
    /// Create a new store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConcertStore for PostgresConcertStore {
    fn insert(
        &self,
        concert: Concert,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>> {
        Box::pin(async move {
            let (price, max_tickets) = encode_counts(&concert)?;

            sqlx::query(
                r"
                INSERT INTO concerts (
                    id, band_name, venue, starts_at, ticket_price_cents,
                    max_tickets, status, owner_id, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(concert.id.as_uuid())
            .bind(&concert.band_name)
            .bind(&concert.venue)
            .bind(concert.starts_at)
            .bind(price)
            .bind(max_tickets)
            .bind(concert.status.as_str())
            .bind(concert.owner.as_uuid())
            .bind(concert.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

            Ok(())
        })
    }

    fn get(
        &self,
        id: ConcertId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Concert>, ConcertStoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, band_name, venue, starts_at, ticket_price_cents,
                       max_tickets, status, owner_id, created_at
                FROM concerts
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

            row.as_ref().map(row_to_concert).transpose()
        })
    }

    fn update(
        &self,
        concert: Concert,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConcertStoreError>> + Send + '_>> {
        Box::pin(async move {
            let (price, max_tickets) = encode_counts(&concert)?;

            let result = sqlx::query(
                r"
                UPDATE concerts
                SET band_name = $2, venue = $3, starts_at = $4,
                    ticket_price_cents = $5, max_tickets = $6, status = $7
                WHERE id = $1
                ",
            )
            .bind(concert.id.as_uuid())
            .bind(&concert.band_name)
            .bind(&concert.venue)
            .bind(concert.starts_at)
            .bind(price)
            .bind(max_tickets)
            .bind(concert.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

            if result.rows_affected() == 0 {
                return Err(ConcertStoreError::NotFound(concert.id));
            }
            Ok(())
        })
    }

    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Concert>, ConcertStoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, band_name, venue, starts_at, ticket_price_cents,
                       max_tickets, status, owner_id, created_at
                FROM concerts
                ORDER BY starts_at ASC
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

            rows.iter().map(row_to_concert).collect()
        })
    }
}

fn encode_counts(concert: &Concert) -> Result<(i64, i32), ConcertStoreError> {
    let price = i64::try_from(concert.ticket_price.cents())
        .map_err(|_| ConcertStoreError::Storage("ticket price out of range".to_string()))?;
    let max_tickets = i32::try_from(concert.max_tickets.value())
        .map_err(|_| ConcertStoreError::Storage("capacity out of range".to_string()))?;
    Ok((price, max_tickets))
}

fn row_to_concert(row: &PgRow) -> Result<Concert, ConcertStoreError> {
    let id: Uuid = row.try_get("id").map_err(storage)?;
    let band_name: String = row.try_get("band_name").map_err(storage)?;
    let venue: String = row.try_get("venue").map_err(storage)?;
    let starts_at: DateTime<Utc> = row.try_get("starts_at").map_err(storage)?;
    let price: i64 = row.try_get("ticket_price_cents").map_err(storage)?;
    let max_tickets: i32 = row.try_get("max_tickets").map_err(storage)?;
    let status: String = row.try_get("status").map_err(storage)?;
    let owner: Uuid = row.try_get("owner_id").map_err(storage)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(storage)?;

    let status = ConcertStatus::parse(&status)
        .map_err(|error| ConcertStoreError::Storage(error.to_string()))?;

    let mut concert = Concert::new(
        ConcertId::from_uuid(id),
        band_name,
        venue,
        starts_at,
        Money::from_cents(u64::try_from(price).unwrap_or(0)),
        Capacity::new(u32::try_from(max_tickets).unwrap_or(0)),
        UserId::from_uuid(owner),
        created_at,
    );
    concert.status = status;
    Ok(concert)
}

fn storage(error: sqlx::Error) -> ConcertStoreError {
    ConcertStoreError::Storage(error.to_string())
}
