//! SQLite-backed order store.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::{info, warn};

use super::error::CollaboratorError;
use super::traits::OrderStore;
use super::types::DocumentCategory;

/// SQLite-backed store for order totals (`ord_<category>`) and order lines
/// (`invoices_<category>`).
pub struct SqliteOrderStore {
    conn: Mutex<Connection>,
}

impl SqliteOrderStore {
    /// Opens the database file, creating the tables if needed.
    pub fn new(path: &Path) -> Result<Self, CollaboratorError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CollaboratorError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CollaboratorError> {
        for category in DocumentCategory::ALL {
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {totals} (
                    order_id INTEGER PRIMARY KEY,
                    total REAL NOT NULL
                );

                CREATE TABLE IF NOT EXISTS {lines} (
                    order_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    product TEXT NOT NULL,
                    quantity TEXT NOT NULL,
                    product_total REAL NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_{lines}_order ON {lines}(order_id);
                "#,
                totals = totals_table(category),
                lines = lines_table(category),
            ))?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CollaboratorError> {
        self.conn
            .lock()
            .map_err(|_| CollaboratorError::failed("order_store", "connection lock poisoned"))
    }

    /// Order total as stored, if the order exists.
    pub fn order_total(
        &self,
        order_id: i64,
        category: DocumentCategory,
    ) -> Result<Option<f64>, CollaboratorError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT total FROM {} WHERE order_id = ?1",
            totals_table(category)
        ))?;
        let mut rows = stmt.query(params![order_id])?;
        let total = match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        Ok(total)
    }

    /// Lines of an order as `(product, quantity, product_total)`.
    pub fn order_lines(
        &self,
        order_id: i64,
        category: DocumentCategory,
    ) -> Result<Vec<(String, String, f64)>, CollaboratorError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT product, quantity, product_total FROM {} WHERE order_id = ?1 ORDER BY rowid",
            lines_table(category)
        ))?;
        let lines = stmt
            .query_map(params![order_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}

fn totals_table(category: DocumentCategory) -> String {
    format!("ord_{}", category.code())
}

fn lines_table(category: DocumentCategory) -> String {
    format!("invoices_{}", category.code())
}

/// Parses an amount such as `"1,234.50"`; unparseable amounts become 0.0.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    match cleaned.trim().parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            warn!("Could not parse amount '{}', storing 0.0", raw);
            0.0
        }
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn upsert_order_total(
        &self,
        order_id: i64,
        total: &str,
        category: DocumentCategory,
    ) -> Result<(), CollaboratorError> {
        let table = totals_table(category);
        let total = parse_amount(total);
        let conn = self.lock()?;

        let updated = conn.execute(
            &format!("UPDATE {} SET total = ?1 WHERE order_id = ?2", table),
            params![total, order_id],
        )?;
        if updated == 0 {
            conn.execute(
                &format!("INSERT INTO {} (order_id, total) VALUES (?1, ?2)", table),
                params![order_id, total],
            )?;
            info!("Order {} inserted into {}", order_id, table);
        } else {
            info!("Order {} updated in {}", order_id, table);
        }
        Ok(())
    }

    async fn replace_order_lines(
        &self,
        order_id: i64,
        date: &str,
        items: &[String],
        quantities: &[String],
        totals: &[String],
        category: DocumentCategory,
    ) -> Result<(), CollaboratorError> {
        if items.len() != quantities.len() || items.len() != totals.len() {
            return Err(CollaboratorError::InvalidInput(format!(
                "order {}: {} items, {} quantities and {} totals do not line up",
                order_id,
                items.len(),
                quantities.len(),
                totals.len()
            )));
        }

        let table = lines_table(category);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE order_id = ?1", table),
            params![order_id],
        )?;
        for ((item, quantity), total) in items.iter().zip(quantities).zip(totals) {
            tx.execute(
                &format!(
                    "INSERT INTO {} (order_id, created_at, product, quantity, product_total) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    table
                ),
                params![order_id, date, item, quantity, parse_amount(total)],
            )?;
        }
        tx.commit()?;

        info!(
            "Order {} written to {}: {} lines",
            order_id,
            table,
            items.len()
        );
        Ok(())
    }
}
