//! `PostgreSQL` implementation of the ticket sales ledger.

use bandstand_core::ledger::{LedgerError, LedgerVersion, TicketLedger};
use bandstand_core::types::{ConcertId, TicketSale, UserId};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Append-only ticket ledger backed by the `ticket_sales` table.
///
/// Appends insert at `expected_version + 1`; the `(concert_id, position)`
/// primary key rejects the insert when another purchase took that position
/// first, which surfaces as [`LedgerError::Conflict`]. No row is ever
/// updated or deleted.
#[derive(Clone)]
pub struct PostgresTicketLedger {
    pool: PgPool,
}

impl PostgresTicketLedger {
    /// Create a new ledger with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, concert_id: ConcertId) -> Result<LedgerVersion, LedgerError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(MAX(position), 0) AS version
            FROM ticket_sales
            WHERE concert_id = $1
            ",
        )
        .bind(concert_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        let version: i64 = row.try_get("version").map_err(storage)?;
        Ok(LedgerVersion::new(u64::try_from(version).unwrap_or(0)))
    }
}

impl TicketLedger for PostgresTicketLedger {
    fn append_sale(
        &self,
        concert_id: ConcertId,
        expected_version: LedgerVersion,
        sale: TicketSale,
    ) -> Pin<Box<dyn Future<Output = Result<LedgerVersion, LedgerError>> + Send + '_>> {
        Box::pin(async move {
            let position = i64::try_from(expected_version.next().value())
                .map_err(|_| LedgerError::Storage("ledger position overflow".to_string()))?;
            let quantity = i32::try_from(sale.quantity)
                .map_err(|_| LedgerError::Storage("quantity out of range".to_string()))?;

            let result = sqlx::query(
                r"
                INSERT INTO ticket_sales (concert_id, position, buyer_id, quantity, purchased_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(concert_id.as_uuid())
            .bind(position)
            .bind(sale.buyer_id.as_uuid())
            .bind(quantity)
            .bind(sale.purchased_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(expected_version.next()),
                Err(error)
                    if error
                        .as_database_error()
                        .is_some_and(|db| db.is_unique_violation()) =>
                {
                    let actual = self.current_version(concert_id).await?;
                    tracing::debug!(
                        concert_id = %concert_id,
                        expected = %expected_version,
                        actual = %actual,
                        "Ledger append lost the optimistic concurrency race"
                    );
                    Err(LedgerError::Conflict {
                        concert_id,
                        expected: expected_version,
                        actual,
                    })
                }
                Err(error) => Err(storage(error)),
            }
        })
    }

    fn load_sales(
        &self,
        concert_id: ConcertId,
    ) -> Pin<
        Box<
            dyn Future<Output = Result<(LedgerVersion, Vec<TicketSale>), LedgerError>> + Send + '_,
        >,
    > {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT position, buyer_id, quantity, purchased_at
                FROM ticket_sales
                WHERE concert_id = $1
                ORDER BY position ASC
                ",
            )
            .bind(concert_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

            let version = rows
                .last()
                .map(|row| row.try_get::<i64, _>("position"))
                .transpose()
                .map_err(storage)?
                .map_or(LedgerVersion::INITIAL, |position| {
                    LedgerVersion::new(u64::try_from(position).unwrap_or(0))
                });

            let sales = rows
                .iter()
                .map(|row| {
                    let buyer: Uuid = row.try_get("buyer_id").map_err(storage)?;
                    let quantity: i32 = row.try_get("quantity").map_err(storage)?;
                    let purchased_at: DateTime<Utc> =
                        row.try_get("purchased_at").map_err(storage)?;

                    Ok(TicketSale::new(
                        concert_id,
                        UserId::from_uuid(buyer),
                        u32::try_from(quantity).map_err(|_| {
                            LedgerError::Storage("negative quantity in ledger".to_string())
                        })?,
                        purchased_at,
                    ))
                })
                .collect::<Result<Vec<_>, LedgerError>>()?;

            Ok((version, sales))
        })
    }
}

fn storage(error: sqlx::Error) -> LedgerError {
    LedgerError::Storage(error.to_string())
}
