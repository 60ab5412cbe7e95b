//! Store adapter - synchronous facade over the SQLite database
//!
//! Every operation opens its own connection and drops it when done, so no
//! state survives between requests. Client-supplied SQL only runs through
//! [`Store::run_guarded`], which consults the query guard before touching the
//! file and then executes on a read-only connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Params};
use serde_json::Value;

use crate::error::StoreError;
use crate::guard;
use crate::types::{ColumnInfo, Row, SeedReport, TableSchema};

/// How long a statement waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest busy timeout SQLite accepts (`i32::MAX` milliseconds)
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

const SAMPLE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        age INTEGER,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        price REAL NOT NULL,
        category TEXT,
        in_stock BOOLEAN DEFAULT 1,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
"#;

const SAMPLE_USERS: &[(&str, &str, i64)] = &[
    ("John Doe", "john@example.com", 30),
    ("Jane Smith", "jane@example.com", 25),
    ("Bob Johnson", "bob@example.com", 35),
    ("Alice Brown", "alice@example.com", 28),
];

const SAMPLE_PRODUCTS: &[(&str, f64, &str, bool)] = &[
    ("Laptop", 999.99, "Electronics", true),
    ("Mouse", 29.99, "Electronics", true),
    ("Keyboard", 79.99, "Electronics", false),
    ("Desk Chair", 199.99, "Furniture", true),
    ("Monitor", 299.99, "Electronics", true),
];

/// Handle to a SQLite database file
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Create a store without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Create a store, creating an empty database file if none exists yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.ensure_exists()?;
        Ok(store)
    }

    /// Set the lock wait, clamped to [`MAX_BUSY_TIMEOUT`]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        if timeout > MAX_BUSY_TIMEOUT {
            tracing::warn!(
                requested_secs = timeout.as_secs(),
                max_secs = MAX_BUSY_TIMEOUT.as_secs(),
                "Busy timeout too large, clamping"
            );
        }
        self.busy_timeout = timeout.min(MAX_BUSY_TIMEOUT);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }

        let conn = self.connect()?;
        conn.execute_batch("SELECT 1")?;
        tracing::info!(path = %self.path.display(), "Created empty database");
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn connect_read_only(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// All user tables with their columns, ordered by table name
    pub fn schema(&self) -> Result<Vec<TableSchema>, StoreError> {
        let conn = self.connect_read_only()?;

        let mut tables_stmt = conn.prepare(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let tables = tables_stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns_stmt = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk \
             FROM pragma_table_info(?1) ORDER BY cid",
        )?;

        let schema = tables
            .into_iter()
            .map(|(name, sql)| -> Result<TableSchema, StoreError> {
                let columns = columns_stmt
                    .query_map([&name], |row| {
                        Ok(ColumnInfo {
                            name: row.get(0)?,
                            data_type: row.get(1)?,
                            not_null: row.get::<_, i64>(2)? != 0,
                            default_value: row.get(3)?,
                            primary_key: row.get::<_, i64>(4)? != 0,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(TableSchema { name, sql, columns })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(tables = schema.len(), "Read schema");
        Ok(schema)
    }

    /// Schema of one table, looked up in a fresh listing
    pub fn table_schema(&self, table_name: &str) -> Result<Option<TableSchema>, StoreError> {
        Ok(self
            .schema()?
            .into_iter()
            .find(|table| table.name == table_name))
    }

    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.schema()?.into_iter().map(|table| table.name).collect())
    }

    /// Run a client-supplied query if the guard classifies it as read-only
    ///
    /// A rejected query never opens a connection.
    pub fn run_guarded(&self, query: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        if let Err(rejection) = guard::check(query) {
            tracing::warn!(reason = %rejection.reason_code(), "Rejected query");
            return Err(StoreError::Rejected(rejection));
        }

        let conn = self.connect_read_only()?;
        let rows = query_rows(&conn, query, params_from_iter(params.iter().map(json_to_sql)))?;

        tracing::debug!(rows = rows.len(), "Executed query");
        Ok(rows)
    }

    /// Up to `limit` rows of a table, in storage order
    ///
    /// The name must pass the identifier allow-list before it is spliced into
    /// the statement; the limit is always bound.
    pub fn table_data(&self, table_name: &str, limit: u32) -> Result<Vec<Row>, StoreError> {
        let table = guard::validate_identifier(table_name)?;
        let conn = self.connect_read_only()?;

        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let sql = format!("SELECT * FROM \"{}\" LIMIT ?1", table);
        let rows = query_rows(&conn, &sql, params![i64::from(limit)])?;

        tracing::debug!(table, limit, rows = rows.len(), "Read table data");
        Ok(rows)
    }

    /// Create the demonstration tables and rows
    ///
    /// Safe to call repeatedly: tables are created only if missing and rows
    /// that would break a uniqueness constraint are skipped.
    pub fn seed_sample_data(&self) -> Result<SeedReport, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(SAMPLE_SCHEMA)?;

        let mut report = SeedReport::default();
        {
            let mut insert_user =
                tx.prepare("INSERT OR IGNORE INTO users (name, email, age) VALUES (?1, ?2, ?3)")?;
            for &(name, email, age) in SAMPLE_USERS {
                report.users_inserted += insert_user.execute(params![name, email, age])?;
            }

            let mut insert_product = tx.prepare(
                "INSERT OR IGNORE INTO products (name, price, category, in_stock) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for &(name, price, category, in_stock) in SAMPLE_PRODUCTS {
                report.products_inserted +=
                    insert_product.execute(params![name, price, category, in_stock])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            users = report.users_inserted,
            products = report.products_inserted,
            "Seeded sample data"
        );
        Ok(report)
    }
}

/// Execute a statement and collect every row as an ordered column map
fn query_rows<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value: SqlValue = row.get(i)?;
            record.insert(column.clone(), sql_to_json(value));
        }
        records.push(record);
    }

    Ok(records)
}

fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
