//! SQL backend for the record store.
//!
//! Works against SQLite or MySQL through sqlx's `Any` driver:
//!
//! ```sql
//! CREATE TABLE customers (
//!   id    BIGINT PRIMARY KEY AUTO_INCREMENT,
//!   name  VARCHAR(255) NOT NULL,
//!   email VARCHAR(255) NOT NULL
//! )
//! ```
//!
//! ## sqlx Any Driver Quirks
//!
//! The `Any` driver sometimes surfaces MySQL TEXT/VARCHAR columns as byte
//! blobs, so reads try `String` first and fall back to `Vec<u8>` + UTF-8
//! conversion.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};

use super::retry::{connect_with_backoff, ConnectRetry};
use super::traits::{RecordStore, StoreError};
use crate::customer::{Customer, CustomerId, NewCustomer};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

pub struct SqlRecordStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlRecordStore {
    /// Connect and initialize the schema, retrying with backoff during
    /// startup so a misconfigured URL fails fast.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = connect_with_backoff("sql", &ConnectRetry::default(), || async {
            AnyPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(connection_string)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))
        })
        .await?;

        let store = Self { pool, is_sqlite };
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a clone of the connection pool (for health probes).
    #[must_use]
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let sql = if self.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            )
            "#
        } else {
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL
            )
            "#
        };

        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Read a text column, trying `String` first (SQLite TEXT) then bytes
    /// (MySQL VARCHAR via the Any driver).
    fn text_column(row: &sqlx::any::AnyRow, column: &str) -> Result<String, StoreError> {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .ok_or_else(|| StoreError::Backend(format!("unreadable column '{column}'")))
    }

    fn row_to_customer(row: &sqlx::any::AnyRow) -> Result<Customer, StoreError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Customer {
            id,
            name: Self::text_column(row, "name")?,
            email: Self::text_column(row, "email")?,
        })
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let result = sqlx::query("INSERT INTO customers (name, email) VALUES (?, ?)")
            .bind(&customer.name)
            .bind(&customer.email)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let id = result
            .last_insert_id()
            .ok_or_else(|| StoreError::Backend("no id assigned by insert".to_string()))?;

        Ok(customer.into_customer(id))
    }

    async fn replace(&self, customer: Customer) -> Result<Customer, StoreError> {
        let sql = if self.is_sqlite {
            "INSERT INTO customers (id, name, email) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email"
        } else {
            "INSERT INTO customers (id, name, email) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE name = VALUES(name), email = VALUES(email)"
        };

        sqlx::query(sql)
            .bind(customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(customer)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT id, name, email FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query("SELECT id, name, email FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
