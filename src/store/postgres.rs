use super::{InsertOutcome, PersistenceGateway};
use crate::error::{EtlError, Result, ResultExt as _};
use crate::records::{AcceptedClient, AnonymizedCard};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres, Row as _};
use std::collections::HashSet;
use std::str::FromStr as _;
use std::time::Duration;

const CREATE_CLIENTES: &str = "CREATE TABLE IF NOT EXISTS clientes (
    cod_cliente TEXT PRIMARY KEY,
    nombre TEXT,
    apellido1 TEXT,
    apellido2 TEXT,
    dni TEXT,
    correo TEXT NOT NULL UNIQUE,
    telefono TEXT
)";

const CREATE_TARJETAS: &str = "CREATE TABLE IF NOT EXISTS tarjetas (
    cod_cliente TEXT NOT NULL REFERENCES clientes (cod_cliente),
    numero_tarjeta TEXT PRIMARY KEY,
    fecha_exp TEXT,
    cvv TEXT
)";

const INSERT_CLIENTE: &str = "INSERT INTO clientes \
    (cod_cliente, nombre, apellido1, apellido2, dni, correo, telefono) \
    VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT DO NOTHING";

const INSERT_TARJETA: &str = "INSERT INTO tarjetas \
    (cod_cliente, numero_tarjeta, fecha_exp, cvv) \
    VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING";

/// Postgres-backed store.
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    /// Builds a lazily connecting pool.
    ///
    /// No connection is attempted here; an unreachable server surfaces as a
    /// persistence error on the first call so the batch can still run and
    /// quarantine what it reads.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Config`] if the URL cannot be parsed.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| EtlError::Config(format!("Failed to parse database URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }
}

#[async_trait]
impl PersistenceGateway for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Connectivity check (SELECT 1) failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in [CREATE_CLIENTES, CREATE_TARJETAS] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create table")?;
        }
        Ok(())
    }

    async fn fetch_customer_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT cod_cliente FROM clientes")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read cod_cliente from clientes")?;

        let mut ids = HashSet::with_capacity(rows.len());
        for row in rows {
            let id: Option<String> = row.try_get(0)?;
            if let Some(id) = id {
                ids.insert(id.trim().to_owned());
            }
        }
        Ok(ids)
    }

    async fn insert_clients(&self, clients: &[AcceptedClient]) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome::default();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open transaction on clientes")?;

        for client in clients {
            let record = &client.record;
            let result = sqlx::query(INSERT_CLIENTE)
                .bind(&client.customer_id)
                .bind(record.first_name.as_deref())
                .bind(record.last_name1.as_deref())
                .bind(record.last_name2.as_deref())
                .bind(record.identity_document.as_deref())
                .bind(record.email.as_deref())
                .bind(record.phone.as_deref())
                .execute(&mut *tx)
                .await
                .context("Failed to insert into clientes")?;

            if result.rows_affected() > 0 {
                outcome.inserted.push(client.customer_id.clone());
            } else {
                outcome.ignored += 1;
            }
        }

        tx.commit()
            .await
            .context("Failed to commit clientes transaction")?;
        Ok(outcome)
    }

    async fn insert_cards(&self, cards: &[AnonymizedCard]) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome::default();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open transaction on tarjetas")?;

        for card in cards {
            let result = sqlx::query(INSERT_TARJETA)
                .bind(&card.customer_id)
                .bind(&card.card_hash)
                .bind(card.expiration.as_deref())
                .bind(card.cvv_hash.as_deref())
                .execute(&mut *tx)
                .await
                .context("Failed to insert into tarjetas")?;

            if result.rows_affected() > 0 {
                outcome.inserted.push(card.customer_id.clone());
            } else {
                outcome.ignored += 1;
            }
        }

        tx.commit()
            .await
            .context("Failed to commit tarjetas transaction")?;
        Ok(outcome)
    }
}
