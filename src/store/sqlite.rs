use crate::core::error::SinkError;
use crate::core::{DailyRecord, RecordSink};
use chrono::NaiveDate;
use rusqlite::{
    Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior, params,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS daily_rates (
        date TEXT NOT NULL PRIMARY KEY,
        rate INTEGER NOT NULL CHECK (rate >= 0),
        gold_sell_price INTEGER NOT NULL CHECK (gold_sell_price >= 0)
    )";

const UPSERT: &str = "
    INSERT INTO daily_rates (date, rate, gold_sell_price)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(date) DO UPDATE SET
        rate = excluded.rate,
        gold_sell_price = excluded.gold_sell_price";

const TABLE_EXISTS: &str =
    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'daily_rates')";

const SELECT_BY_DATE: &str =
    "SELECT date, rate, gold_sell_price FROM daily_rates WHERE date = ?1";

const SELECT_RECENT: &str =
    "SELECT date, rate, gold_sell_price FROM daily_rates ORDER BY date DESC LIMIT ?1";

/// SQLite-backed sink. A connection is opened per call and closed when it returns.
///
/// Reads never create the database: a missing file or table reads as empty.
pub struct SqliteSink {
    path: PathBuf,
}

impl SqliteSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteSink { path: path.into() }
    }

    fn connection_failure(&self, e: &dyn std::fmt::Display) -> SinkError {
        SinkError::ConnectionFailure(format!("{}: {e}", self.path.display()))
    }

    fn connect(&self) -> Result<Connection, SinkError> {
        let connection_failure = |e: &dyn std::fmt::Display| self.connection_failure(e);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| connection_failure(&e))?;
        }

        let conn = Connection::open(&self.path).map_err(|e| connection_failure(&e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| connection_failure(&e))?;
        conn.execute_batch(CREATE_TABLE).map_err(classify)?;
        debug!(path = %self.path.display(), "Opened record store");
        Ok(conn)
    }

    /// Opens the store read-only, or `None` when there is nothing to read yet.
    fn connect_read_only(&self) -> Result<Option<Connection>, SinkError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Record store not created yet");
            return Ok(None);
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| self.connection_failure(&e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| self.connection_failure(&e))?;

        let has_table: bool = conn
            .query_row(TABLE_EXISTS, [], |row| row.get(0))
            .map_err(classify)?;
        Ok(has_table.then_some(conn))
    }
}

/// Maps SQLite failures onto the sink's error kinds.
fn classify(err: rusqlite::Error) -> SinkError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => SinkError::ConstraintViolation(err.to_string()),
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::PermissionDenied,
        ) => SinkError::ConnectionFailure(err.to_string()),
        _ => SinkError::Database(err),
    }
}

fn row_to_record(date: String, rate: i64, gold_sell_price: i64) -> Result<DailyRecord, SinkError> {
    let parsed = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|_| SinkError::CorruptRow(date.clone()))?;
    Ok(DailyRecord {
        date: parsed,
        rate,
        gold_sell_price,
    })
}

impl RecordSink for SqliteSink {
    fn upsert(&self, record: &DailyRecord) -> Result<(), SinkError> {
        self.upsert_all(std::slice::from_ref(record))
    }

    fn upsert_all(&self, records: &[DailyRecord]) -> Result<(), SinkError> {
        let mut conn = self.connect()?;
        // Take the write lock up front so concurrent runs queue on the busy timeout
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;
        {
            let mut stmt = tx.prepare_cached(UPSERT).map_err(classify)?;
            for record in records {
                stmt.execute(params![
                    record.date.format(DATE_FORMAT).to_string(),
                    record.rate,
                    record.gold_sell_price
                ])
                .map_err(classify)?;
                debug!(date = %record.date, "Upserted daily record");
            }
        }
        tx.commit().map_err(classify)
    }

    fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, SinkError> {
        let Some(conn) = self.connect_read_only()? else {
            return Ok(None);
        };
        let row = conn
            .query_row(
                SELECT_BY_DATE,
                params![date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(classify)?;

        row.map(|(date, rate, gold)| row_to_record(date, rate, gold))
            .transpose()
    }

    fn recent(&self, limit: usize) -> Result<Vec<DailyRecord>, SinkError> {
        let Some(conn) = self.connect_read_only()? else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(SELECT_RECENT).map_err(classify)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(classify)?;

        let mut records = Vec::new();
        for row in rows {
            let (date, rate, gold) = row.map_err(classify)?;
            records.push(row_to_record(date, rate, gold)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn record(day: u32, rate: i64, gold_sell_price: i64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            rate,
            gold_sell_price,
        }
    }

    fn sink(dir: &TempDir) -> SqliteSink {
        SqliteSink::new(dir.path().join("data").join("kurs_emas.db"))
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);
        let original = record(19, 15567, 1_234_500);

        sink.upsert(&original).unwrap();
        assert_eq!(sink.get(original.date).unwrap(), Some(original));
        assert_eq!(sink.get(record(20, 0, 0).date).unwrap(), None);
    }

    #[test]
    fn test_upsert_is_idempotent_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        sink.upsert(&record(19, 15567, 1_234_500)).unwrap();
        sink.upsert(&record(19, 15567, 1_234_500)).unwrap();
        sink.upsert(&record(19, 15600, 1_240_000)).unwrap();

        let rows = sink.recent(10).unwrap();
        assert_eq!(rows, vec![record(19, 15600, 1_240_000)]);
    }

    #[test]
    fn test_other_dates_untouched() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        sink.upsert(&record(18, 15600, 1_230_000)).unwrap();
        sink.upsert(&record(19, 15567, 1_234_500)).unwrap();
        sink.upsert(&record(19, 15570, 1_235_000)).unwrap();

        assert_eq!(
            sink.recent(10).unwrap(),
            vec![record(19, 15570, 1_235_000), record(18, 15600, 1_230_000)]
        );
        assert_eq!(sink.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_constraint_violation_rolls_back_batch() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let err = sink
            .upsert_all(&[record(18, 15600, 1_230_000), record(19, -1, 1_234_500)])
            .unwrap_err();
        assert!(matches!(err, SinkError::ConstraintViolation(_)), "{err:?}");
        assert!(sink.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_connection_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let sink = SqliteSink::new(blocker.join("kurs_emas.db"));
        let err = sink.upsert(&record(19, 15567, 1_234_500)).unwrap_err();
        assert!(matches!(err, SinkError::ConnectionFailure(_)), "{err:?}");
    }

    #[test]
    fn test_not_a_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = SqliteSink::new(path.clone()).recent(1).unwrap_err();
        assert!(matches!(err, SinkError::ConnectionFailure(_)), "{err:?}");
    }

    #[test]
    fn test_reads_do_not_create_store() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        assert!(sink.recent(10).unwrap().is_empty());
        assert_eq!(sink.get(record(19, 0, 0).date).unwrap(), None);
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_reads_on_store_without_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER)")
            .unwrap();

        let sink = SqliteSink::new(path.clone());
        assert!(sink.recent(10).unwrap().is_empty());

        let conn = Connection::open(&path).unwrap();
        let has_table: bool = conn.query_row(TABLE_EXISTS, [], |row| row.get(0)).unwrap();
        assert!(!has_table);
    }

    #[test]
    fn test_concurrent_upserts_same_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("kurs_emas.db");
        let writes = [record(19, 15567, 1_234_500), record(19, 15600, 1_240_000)];
        let barrier = Arc::new(Barrier::new(writes.len()));

        let handles: Vec<_> = writes
            .iter()
            .map(|write| {
                let write = *write;
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let sink = SqliteSink::new(path);
                    barrier.wait();
                    sink.upsert(&write)
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let rows = SqliteSink::new(path).recent(10).unwrap();
        assert_eq!(rows.len(), 1, "{rows:?}");
        assert!(writes.contains(&rows[0]), "{rows:?}");
    }
}
