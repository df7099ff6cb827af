//! SQLite store holding the two study tables.
//!
//! `sample_metadata` has one row per sample keyed by `sample_id`;
//! `cell_counts` has one row per (sample, population) pair. Loading replaces
//! both tables wholesale inside a single transaction.

use crate::data::{CellCount, CountTable, Response, Sample, SampleTable};
use crate::error::{CellFreqError, Result};
use crate::io::import::{read_csv, ImportedData};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sample_metadata (
        sample_id TEXT PRIMARY KEY,
        project TEXT,
        subject TEXT,
        condition TEXT,
        age INTEGER,
        sex TEXT,
        treatment TEXT,
        response TEXT,
        sample_type TEXT,
        time_from_treatment_start INTEGER
    );
    CREATE TABLE IF NOT EXISTS cell_counts (
        sample_id TEXT NOT NULL,
        cell_type TEXT NOT NULL,
        count INTEGER NOT NULL,
        FOREIGN KEY (sample_id) REFERENCES sample_metadata(sample_id)
    );
";

/// Handle to the study database.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        let store = Self {
            conn,
            path: Some(path),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Open the database, importing `csv_path` first if the database file is absent.
    pub fn open_or_import<P: AsRef<Path>, Q: AsRef<Path>>(db_path: P, csv_path: Q) -> Result<Self> {
        let db_path = db_path.as_ref();
        if db_path.exists() {
            debug!(path = %db_path.display(), "opening existing database");
            return Self::open(db_path);
        }

        info!(
            db = %db_path.display(),
            csv = %csv_path.as_ref().display(),
            "database absent; importing CSV"
        );
        Self::load_csv(db_path, csv_path).map(|(store, _)| store)
    }

    /// Open the database at `db_path` and replace its contents with `csv_path`.
    ///
    /// The CSV is parsed before the database is opened, so a bad CSV neither
    /// creates a database file nor touches an existing one.
    pub fn load_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        db_path: P,
        csv_path: Q,
    ) -> Result<(Self, ImportedData)> {
        let data = read_csv(csv_path)?;
        let mut store = Self::open(db_path)?;
        store.replace_all(&data)?;
        Ok((store, data))
    }

    /// Path of the database file, if not in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Import a CSV file, replacing all existing rows.
    pub fn import_csv<P: AsRef<Path>>(&mut self, csv_path: P) -> Result<ImportedData> {
        let data = read_csv(csv_path)?;
        self.replace_all(&data)?;
        Ok(data)
    }

    /// Replace both tables with the given data.
    pub fn replace_all(&mut self, data: &ImportedData) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS cell_counts;
             DROP TABLE IF EXISTS sample_metadata;",
        )?;
        tx.execute_batch(SCHEMA)?;

        {
            let mut insert_sample = tx.prepare(
                "INSERT INTO sample_metadata (
                    sample_id, project, subject, condition, age, sex,
                    treatment, response, sample_type, time_from_treatment_start
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for s in data.samples.iter() {
                insert_sample.execute(params![
                    s.sample_id,
                    s.project,
                    s.subject,
                    s.condition,
                    s.age,
                    s.sex,
                    s.treatment,
                    s.response.as_stored(),
                    s.sample_type,
                    s.time_from_treatment_start,
                ])?;
            }

            let mut insert_count = tx.prepare(
                "INSERT INTO cell_counts (sample_id, cell_type, count) VALUES (?1, ?2, ?3)",
            )?;
            for c in data.counts.records() {
                let count = i64::try_from(c.count).map_err(|_| {
                    CellFreqError::InvalidParameter(format!(
                        "Count {} for sample '{}' exceeds storage range",
                        c.count, c.sample_id
                    ))
                })?;
                insert_count.execute(params![c.sample_id, c.cell_type, count])?;
            }
        }

        tx.commit()?;
        info!(
            samples = data.samples.len(),
            counts = data.counts.len(),
            "loaded data into database"
        );
        Ok(())
    }

    /// Number of samples stored.
    pub fn n_samples(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sample_metadata", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Load all sample metadata in insertion order.
    pub fn load_samples(&self) -> Result<SampleTable> {
        let mut stmt = self.conn.prepare(
            "SELECT sample_id, project, subject, condition, age, sex,
                    treatment, response, sample_type, time_from_treatment_start
             FROM sample_metadata
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let response: Option<String> = row.get(7)?;
            Ok(Sample {
                sample_id: row.get(0)?,
                project: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                subject: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                condition: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                age: row.get(4)?,
                sex: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                treatment: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                response: response
                    .as_deref()
                    .map(Response::parse)
                    .unwrap_or(Response::Missing),
                sample_type: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                time_from_treatment_start: row.get(9)?,
            })
        })?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        SampleTable::from_samples(samples)
    }

    /// Load all cell counts in insertion order.
    pub fn load_counts(&self) -> Result<CountTable> {
        let mut stmt = self
            .conn
            .prepare("SELECT sample_id, cell_type, count FROM cell_counts ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (sample_id, cell_type, count) = row?;
            let count = u64::try_from(count).map_err(|_| CellFreqError::InvalidCount {
                value: count.to_string(),
                row: records.len(),
                column: cell_type.clone(),
            })?;
            records.push(CellCount {
                sample_id,
                cell_type,
                count,
            });
        }
        Ok(CountTable::from_records(records))
    }
}
