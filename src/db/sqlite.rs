//! SQLite-backed metadata store.

use std::{fs, path::Path};

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use super::{seed, MetadataStore, Site};
use crate::{config::NWIS_SOURCE_ID, error::CatalogError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS source (
        source_id   INTEGER PRIMARY KEY,
        source_name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS site (
        site_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        site_code TEXT NOT NULL UNIQUE,
        site_name TEXT,
        source_id INTEGER NOT NULL REFERENCES source(source_id)
    );
    CREATE TABLE IF NOT EXISTS parameter (
        parameter_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        parameter_code TEXT NOT NULL UNIQUE,
        parameter_name TEXT
    );
    CREATE TABLE IF NOT EXISTS site_parameter (
        site_id      INTEGER NOT NULL REFERENCES site(site_id),
        parameter_id INTEGER NOT NULL REFERENCES parameter(parameter_id),
        PRIMARY KEY (site_id, parameter_id)
    );
";

/// Owns one connection for its lifetime.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens or creates the store, creating the parent directory if needed.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CatalogError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| CatalogError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(SqliteCatalog { conn })
    }

    /// Opens a store that must already exist.
    pub fn open_existing(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| CatalogError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(SqliteCatalog { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(|source| CatalogError::Open {
            path: ":memory:".into(),
            source,
        })?;

        Ok(SqliteCatalog { conn })
    }

    /// Creates the tables and the NWIS source row. Safe to repeat.
    pub fn create_schema(&self) -> Result<(), CatalogError> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(CatalogError::query("create schema"))?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO source (source_id, source_name) VALUES (?1, ?2)",
                params![NWIS_SOURCE_ID, "USGS NWIS"],
            )
            .map_err(CatalogError::query("insert source"))?;

        Ok(())
    }

    /// Registers the default basin sites. Returns the number of sites seeded.
    pub fn seed_defaults(&mut self) -> Result<usize, CatalogError> {
        for (code, name) in seed::PARAMETERS {
            self.insert_parameter(code, Some(name))?;
        }

        for (code, name) in seed::RIVER_SITES {
            self.register_site(
                NWIS_SOURCE_ID,
                code,
                Some(name),
                &[seed::DISCHARGE, seed::GAGE_HEIGHT],
            )?;
        }

        for (code, name) in seed::RESERVOIR_SITES {
            self.register_site(NWIS_SOURCE_ID, code, Some(name), &[seed::LAKE_ELEVATION])?;
        }

        let seeded = seed::RIVER_SITES.len() + seed::RESERVOIR_SITES.len();
        info!(sites = seeded, "Seeded default sites");

        Ok(seeded)
    }

    /// Adds a site and links its parameters. Existing rows are left alone.
    pub fn register_site<S: AsRef<str>>(
        &mut self,
        source_id: i64,
        site_code: &str,
        site_name: Option<&str>,
        parameters: &[S],
    ) -> Result<i64, CatalogError> {
        let tx = self
            .conn
            .transaction()
            .map_err(CatalogError::query("begin transaction"))?;

        tx.execute(
            "INSERT OR IGNORE INTO site (site_code, site_name, source_id) VALUES (?1, ?2, ?3)",
            params![site_code, site_name, source_id],
        )
        .map_err(CatalogError::query("insert site"))?;

        let site_id: i64 = tx
            .query_row(
                "SELECT site_id FROM site WHERE site_code = ?1",
                params![site_code],
                |row| row.get(0),
            )
            .map_err(CatalogError::query("look up site"))?;

        for parameter in parameters {
            let parameter = parameter.as_ref();
            tx.execute(
                "INSERT OR IGNORE INTO parameter (parameter_code) VALUES (?1)",
                params![parameter],
            )
            .map_err(CatalogError::query("insert parameter"))?;

            tx.execute(
                "INSERT OR IGNORE INTO site_parameter (site_id, parameter_id)
                 SELECT ?1, parameter_id FROM parameter WHERE parameter_code = ?2",
                params![site_id, parameter],
            )
            .map_err(CatalogError::query("link site parameter"))?;
        }

        tx.commit().map_err(CatalogError::query("commit"))?;

        debug!(site = site_code, site_id, "Registered site");

        Ok(site_id)
    }

    fn insert_parameter(&self, code: &str, name: Option<&str>) -> Result<(), CatalogError> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO parameter (parameter_code, parameter_name) VALUES (?1, ?2)",
                params![code, name],
            )
            .map_err(CatalogError::query("insert parameter"))?;

        Ok(())
    }
}

impl MetadataStore for SqliteCatalog {
    fn list_sites(&self, source_id: i64) -> Result<Vec<Site>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT site_id, site_code FROM site WHERE source_id = ?1 ORDER BY site_code")
            .map_err(CatalogError::query("list sites"))?;

        let sites = stmt
            .query_map(params![source_id], |row| {
                Ok(Site {
                    site_id: row.get(0)?,
                    site_code: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(CatalogError::query("list sites"))?;

        Ok(sites)
    }

    fn list_parameters(&self, site_id: i64) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.parameter_code
                 FROM parameter p
                 INNER JOIN site_parameter sp ON p.parameter_id = sp.parameter_id
                 WHERE sp.site_id = ?1
                 ORDER BY p.parameter_code",
            )
            .map_err(CatalogError::query("list parameters"))?;

        let parameters = stmt
            .query_map(params![site_id], |row| row.get(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .map_err(CatalogError::query("list parameters"))?;

        Ok(parameters)
    }
}

// -- Tests -------------------------------------------------------------------
