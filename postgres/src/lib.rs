//! `PostgreSQL` storage backends for Bandstand.
//!
//! This crate provides production implementations of the core's storage
//! traits:
//!
//! - [`PostgresTicketLedger`]: the append-only sales ledger. Optimistic
//!   concurrency rides on the `(concert_id, position)` primary key — an
//!   append inserts at `expected_version + 1` and a duplicate key means
//!   another purchase landed first.
//! - [`PostgresConcertStore`]: the concert record table.
//!
//! # Initialization
//!
//! Schema setup is explicit and happens once at startup via
//! [`init_schema`] — there is no lazy, checked-every-request
//! initialization.
//!
//! # Example
//!
//! ```ignore
//! use bandstand_postgres::{connect_pool, init_schema, PostgresTicketLedger};
//!
//! let pool = connect_pool("postgres://localhost/bandstand", 10).await?;
//! init_schema(&pool).await?;
//! let ledger = PostgresTicketLedger::new(pool);
//! ```

use sqlx::postgres::{PgPool, PgPoolOptions};

mod concerts;
mod ledger;

pub use concerts::PostgresConcertStore;
pub use ledger::PostgresTicketLedger;

/// Database schema for the ledger and concert tables.
///
/// `ticket_sales` is append-only: rows are never updated or deleted by the
/// application. The composite primary key doubles as the optimistic
/// concurrency check for appends.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS concerts (
    id UUID PRIMARY KEY,
    band_name TEXT NOT NULL,
    venue TEXT NOT NULL,
    starts_at TIMESTAMPTZ NOT NULL,
    ticket_price_cents BIGINT NOT NULL,
    max_tickets INTEGER NOT NULL CHECK (max_tickets > 0),
    status TEXT NOT NULL CHECK (status IN ('scheduled', 'full', 'cancelled')),
    owner_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS ticket_sales (
    concert_id UUID NOT NULL,
    position BIGINT NOT NULL,
    buyer_id UUID NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    purchased_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (concert_id, position)
);
";

/// Connect a `PostgreSQL` pool with the given connection cap.
///
/// # Errors
///
/// Returns the underlying `sqlx` error if the connection fails.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Create the ledger and concert tables if they do not exist.
///
/// Call once at startup, before serving requests.
///
/// # Errors
///
/// Returns the underlying `sqlx` error if schema creation fails.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema initialized");
    Ok(())
}
