//! Analytics engine using DuckDB for batch flight queries.
//!
//! The engine is an explicit context: construct it at pipeline start, load one
//! dataset, query, then [`close`](AnalyticsEngine::close) it. [`scoped`]
//! guarantees the close on every exit path.
//!
//! [`scoped`]: AnalyticsEngine::scoped

use crate::config::{AnalyzerConfig, S3Config};
use crate::error::{AnalyticsError, Result};
use crate::source::DataSource;
use duckdb::Connection;
use flight_domain::TelemetryColumn;
use tracing::{debug, info, warn};

/// Raw CSV contents as sniffed by DuckDB.
const RAW_TABLE: &str = "raw_telemetry";

/// Validated dataset, every column DOUBLE. Queries read from here.
pub(crate) const TELEMETRY_TABLE: &str = "telemetry";

/// DuckDB-based analytics engine for telemetry logs.
pub struct AnalyticsEngine {
    pub(crate) conn: Connection,
    config: AnalyzerConfig,
    object_store_ready: bool,
    dataset: Option<String>,
}

impl AnalyticsEngine {
    /// Create an in-memory engine.
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        if let Some(threads) = config.threads {
            conn.execute_batch(&format!("SET threads = {threads};"))?;
        }
        debug!(threads = ?config.threads, "Analytics engine opened");

        Ok(Self {
            conn,
            config: config.clone(),
            object_store_ready: false,
            dataset: None,
        })
    }

    /// Run `f` against a fresh engine and close the engine afterwards,
    /// whether `f` succeeded or not.
    pub fn scoped<T, F>(config: &AnalyzerConfig, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut engine = Self::new(config)?;
        let outcome = f(&mut engine);
        let closed = engine.close();

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "Failed to close analytics engine");
                }
                Err(err)
            }
        }
    }

    /// Release the DuckDB connection.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| AnalyticsError::from(err))?;
        debug!("Analytics engine closed");
        Ok(())
    }

    /// Name of the loaded dataset, if any.
    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub(crate) fn require_dataset(&self) -> Result<&str> {
        self.dataset().ok_or(AnalyticsError::NoDataset)
    }

    /// Load a telemetry CSV, replacing any previously loaded dataset.
    ///
    /// Column types are inferred from the whole file. Every required column
    /// must be present and numeric; the first offending value is reported
    /// with its data row. Returns the number of records.
    pub fn load(&mut self, source: &DataSource) -> Result<u64> {
        let source_name = source.to_string();

        match source {
            DataSource::Local(path) => {
                let metadata = std::fs::metadata(path).map_err(|err| match err.kind() {
                    std::io::ErrorKind::NotFound => {
                        AnalyticsError::SourceNotFound(source_name.clone())
                    }
                    _ => AnalyticsError::Io(err),
                })?;
                if metadata.len() == 0 {
                    return Err(AnalyticsError::EmptyDataset { source_name });
                }
            }
            DataSource::ObjectStore { .. } => self.prepare_object_store()?,
        }

        self.dataset = None;
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {TELEMETRY_TABLE}; DROP TABLE IF EXISTS {RAW_TABLE};"
        ))?;
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE {RAW_TABLE} AS SELECT * FROM read_csv({}, header = true, delim = ',', sample_size = -1);",
                sql_literal(&source.location())
            ))
            .map_err(|err| AnalyticsError::MalformedCsv {
                source_name: source_name.clone(),
                reason: first_line(&err.to_string()),
            })?;

        self.validate_schema(&source_name)?;

        let casts = TelemetryColumn::ALL
            .iter()
            .map(|column| {
                let ident = quote_ident(column.as_str());
                format!("CAST({ident} AS DOUBLE) AS {ident}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute_batch(&format!(
            "CREATE TABLE {TELEMETRY_TABLE} AS SELECT {casts} FROM {RAW_TABLE}; DROP TABLE {RAW_TABLE};"
        ))?;

        let records: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {TELEMETRY_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        let records = u64::try_from(records).unwrap_or_default();

        info!(source = %source_name, records, "Dataset loaded");
        self.dataset = Some(source_name);
        Ok(records)
    }

    /// Column names and DuckDB types of the raw table, in file order.
    fn raw_columns(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT column_name, data_type
            FROM information_schema.columns
            WHERE table_name = ?
            ORDER BY ordinal_position
            "#,
        )?;
        let rows = stmt.query_map([RAW_TABLE], |row| Ok((row.get(0)?, row.get(1)?)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    fn validate_schema(&self, source_name: &str) -> Result<()> {
        let columns = self.raw_columns()?;

        for (name, _) in &columns {
            if let Err(err) = name.parse::<TelemetryColumn>() {
                debug!(error = %err, "Ignoring extra column");
            }
        }

        for required in TelemetryColumn::ALL {
            let name = required.as_str();
            let Some((_, data_type)) = columns.iter().find(|(column, _)| column == name) else {
                return Err(AnalyticsError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: name,
                    found: columns
                        .iter()
                        .map(|(column, _)| column.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            };

            if is_numeric_type(data_type) {
                continue;
            }

            // Typed as text: a header-only file, an all-empty column, or a
            // genuinely bad value somewhere in the column.
            if let Some((row, value)) = self.first_non_numeric(name)? {
                return Err(AnalyticsError::NonNumericValue {
                    source_name: source_name.to_string(),
                    column: name,
                    row,
                    value,
                });
            }
            debug!(column = name, data_type = %data_type, "Text column holds only numbers");
        }
        Ok(())
    }

    /// First value in `column` that does not parse as a number, with its
    /// 1-based data row.
    fn first_non_numeric(&self, column: &str) -> Result<Option<(i64, String)>> {
        let query = format!(
            r#"
            SELECT rn, v
            FROM (
                SELECT row_number() OVER () AS rn, CAST({} AS VARCHAR) AS v
                FROM {RAW_TABLE}
            )
            WHERE v IS NOT NULL AND TRY_CAST(v AS DOUBLE) IS NULL
            ORDER BY rn
            LIMIT 1
            "#,
            quote_ident(column)
        );

        let mut stmt = self.conn.prepare(&query)?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }

    /// Install httpfs and register S3 credentials from the environment.
    fn prepare_object_store(&mut self) -> Result<()> {
        if self.object_store_ready {
            return Ok(());
        }

        let s3 = &self.config.s3;
        let (setup, create_secret) = s3_secret_sql(s3);
        self.conn.execute_batch(&setup)?;
        self.conn.execute_batch(&create_secret)?;

        info!(
            endpoint = %s3.endpoint,
            region = %s3.region,
            static_credentials = s3.has_static_credentials(),
            "Object storage configured"
        );
        self.object_store_ready = true;
        Ok(())
    }
}

/// Extension setup and `CREATE SECRET` statement for object storage.
/// Static keys win; otherwise the AWS credential chain is used.
fn s3_secret_sql(s3: &S3Config) -> (String, String) {
    let mut options = vec![
        "TYPE S3".to_string(),
        format!("REGION {}", sql_literal(&s3.region)),
        format!("ENDPOINT {}", sql_literal(&s3.endpoint)),
        format!("USE_SSL {}", s3.use_ssl),
    ];

    let mut setup = String::from("INSTALL httpfs; LOAD httpfs;");
    match (&s3.access_key_id, &s3.secret_access_key) {
        (Some(key_id), Some(secret)) => {
            options.push(format!("KEY_ID {}", sql_literal(key_id)));
            options.push(format!("SECRET {}", sql_literal(secret)));
            if let Some(token) = &s3.session_token {
                options.push(format!("SESSION_TOKEN {}", sql_literal(token)));
            }
        }
        _ => {
            setup.push_str(" INSTALL aws; LOAD aws;");
            options.push("PROVIDER CREDENTIAL_CHAIN".to_string());
        }
    }

    let create_secret = format!("CREATE OR REPLACE SECRET flight_s3 ({});", options.join(", "));
    (setup, create_secret)
}

/// DuckDB errors carry multi-paragraph diagnostics; keep the headline.
fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

fn is_numeric_type(data_type: &str) -> bool {
    matches!(
        data_type,
        "TINYINT"
            | "SMALLINT"
            | "INTEGER"
            | "BIGINT"
            | "HUGEINT"
            | "UTINYINT"
            | "USMALLINT"
            | "UINTEGER"
            | "UBIGINT"
            | "UHUGEINT"
            | "FLOAT"
            | "DOUBLE"
    ) || data_type.starts_with("DECIMAL")
}

/// Single-quoted SQL string literal.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Double-quoted SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
