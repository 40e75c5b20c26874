//! SQLite-backed record store
//!
//! Unique constraints live in the schema; upserts use
//! `ON CONFLICT ... DO UPDATE` and re-read the stored row so callers always
//! see the id that won.

use super::{RecordStore, StoreError, StoreResult, new_id};
use crate::models::{
    NewOffer, NewQualification, NewRto, NewStream, NewUnit, Offer, Owner, Qualification,
    RecordId, Rto, Stream, StreamUnitLink, Unit, UnitLink, UnitType,
};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Unit link table and owner column for an owner kind
fn link_table(owner: &Owner) -> (&'static str, &'static str) {
    match owner {
        Owner::Qualification(_) => ("qualification_units", "qualification_id"),
        Owner::Offer(_) => ("offer_units", "offer_id"),
    }
}

/// Stream table and owner column for an owner kind
fn stream_table(owner: &Owner) -> (&'static str, &'static str) {
    match owner {
        Owner::Qualification(_) => ("qualification_streams", "qualification_id"),
        Owner::Offer(_) => ("offer_streams", "offer_id"),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Owner ids split by kind, so each table gets one query
fn split_owners(owners: &[Owner]) -> [(Owner, Vec<String>); 2] {
    let mut qualifications = Vec::new();
    let mut offers = Vec::new();
    for owner in owners {
        match owner {
            Owner::Qualification(id) => qualifications.push(id.clone()),
            Owner::Offer(id) => offers.push(id.clone()),
        }
    }
    [
        (Owner::Qualification(String::new()), qualifications),
        (Owner::Offer(String::new()), offers),
    ]
}

fn with_id(kind: &Owner, id: String) -> Owner {
    match kind {
        Owner::Qualification(_) => Owner::Qualification(id),
        Owner::Offer(_) => Owner::Offer(id),
    }
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rtos(
            id TEXT PRIMARY KEY,
            rto_code TEXT NOT NULL UNIQUE,
            trading_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS qualifications(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            training_package TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS units(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS offers(
            id TEXT PRIMARY KEY,
            rto_id TEXT NOT NULL,
            qualification_id TEXT NOT NULL,
            company_id TEXT,
            status TEXT NOT NULL,
            is_public INTEGER NOT NULL,
            FOREIGN KEY(rto_id) REFERENCES rtos(id),
            FOREIGN KEY(qualification_id) REFERENCES qualifications(id),
            UNIQUE(rto_id, qualification_id)
        )",
        [],
    )?;

    for (table, owner_column, owner_table) in [
        ("qualification_units", "qualification_id", "qualifications"),
        ("offer_units", "offer_id", "offers"),
    ] {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table}(
                    {owner_column} TEXT NOT NULL,
                    unit_id TEXT NOT NULL,
                    unit_type TEXT NOT NULL,
                    group_code TEXT,
                    application_details TEXT,
                    PRIMARY KEY({owner_column}, unit_id),
                    FOREIGN KEY({owner_column}) REFERENCES {owner_table}(id),
                    FOREIGN KEY(unit_id) REFERENCES units(id)
                )"
            ),
            [],
        )?;
    }

    for (table, owner_column, owner_table) in [
        ("qualification_streams", "qualification_id", "qualifications"),
        ("offer_streams", "offer_id", "offers"),
    ] {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table}(
                    id TEXT PRIMARY KEY,
                    {owner_column} TEXT NOT NULL,
                    name TEXT NOT NULL COLLATE NOCASE,
                    FOREIGN KEY({owner_column}) REFERENCES {owner_table}(id),
                    UNIQUE({owner_column}, name)
                )"
            ),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stream_units(
            stream_id TEXT NOT NULL,
            unit_id TEXT NOT NULL,
            group_code TEXT,
            is_required INTEGER NOT NULL,
            PRIMARY KEY(stream_id, unit_id),
            FOREIGN KEY(unit_id) REFERENCES units(id)
        )",
        [],
    )?;

    Ok(())
}

/// Record store over a single SQLite connection
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file and ensure the schema exists
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::query("open", format!("{}: {}", parent.display(), e))
                })?;
            }
        }
        debug!("Opening SQLite store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_qualification(conn: &Connection, code: &str) -> rusqlite::Result<Option<Qualification>> {
    conn.query_row(
        "SELECT id, code, name, training_package FROM qualifications WHERE code = ?1",
        [code],
        |row| {
            Ok(Qualification {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
                training_package: row.get(3)?,
            })
        },
    )
    .optional()
}

fn read_unit(conn: &Connection, code: &str) -> rusqlite::Result<Option<Unit>> {
    conn.query_row(
        "SELECT id, code, name, description FROM units WHERE code = ?1",
        [code],
        |row| {
            Ok(Unit {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
            })
        },
    )
    .optional()
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn select_rtos(&self, codes: &[String]) -> StoreResult<Vec<Rto>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, rto_code, trading_name FROM rtos WHERE rto_code IN ({})",
            placeholders(codes.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(codes.iter()), |row| {
                Ok(Rto {
                    id: row.get(0)?,
                    rto_code: row.get(1)?,
                    trading_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn insert_rtos(&self, rows: &[NewRto]) -> StoreResult<Vec<Rto>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let id = new_id();
            tx.execute(
                "INSERT INTO rtos(id, rto_code, trading_name) VALUES(?1, ?2, ?3)",
                params![id, row.rto_code, row.trading_name],
            )?;
            created.push(Rto {
                id,
                rto_code: row.rto_code.clone(),
                trading_name: row.trading_name.clone(),
            });
        }
        tx.commit()?;
        Ok(created)
    }

    async fn select_qualifications(&self, codes: &[String]) -> StoreResult<Vec<Qualification>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, code, name, training_package FROM qualifications WHERE code IN ({})",
            placeholders(codes.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(codes.iter()), |row| {
                Ok(Qualification {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    training_package: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn upsert_qualifications(
        &self,
        rows: &[NewQualification],
    ) -> StoreResult<Vec<Qualification>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            tx.execute(
                "INSERT INTO qualifications(id, code, name, training_package)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(code) DO UPDATE SET
                    name = excluded.name,
                    training_package = COALESCE(excluded.training_package, qualifications.training_package)",
                params![new_id(), row.code, row.name, row.training_package],
            )?;
            let qualification = read_qualification(&tx, &row.code)?.ok_or_else(|| {
                StoreError::query("upsert_qualifications", format!("{} not stored", row.code))
            })?;
            stored.push(qualification);
        }
        tx.commit()?;
        Ok(stored)
    }

    async fn select_units(&self, codes: &[String]) -> StoreResult<Vec<Unit>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, code, name, description FROM units WHERE code IN ({})",
            placeholders(codes.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(codes.iter()), |row| {
                Ok(Unit {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn upsert_units(&self, rows: &[NewUnit]) -> StoreResult<Vec<Unit>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            tx.execute(
                "INSERT INTO units(id, code, name, description)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(code) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description",
                params![new_id(), row.code, row.name, row.description],
            )?;
            let unit = read_unit(&tx, &row.code)?.ok_or_else(|| {
                StoreError::query("upsert_units", format!("{} not stored", row.code))
            })?;
            stored.push(unit);
        }
        tx.commit()?;
        Ok(stored)
    }

    async fn select_offers(&self, rto_ids: &[RecordId]) -> StoreResult<Vec<Offer>> {
        if rto_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, rto_id, qualification_id, company_id, status, is_public
             FROM offers WHERE rto_id IN ({})",
            placeholders(rto_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(rto_ids.iter()), |row| {
                Ok(Offer {
                    id: row.get(0)?,
                    rto_id: row.get(1)?,
                    qualification_id: row.get(2)?,
                    company_id: row.get(3)?,
                    status: row.get(4)?,
                    is_public: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn insert_offers(&self, rows: &[NewOffer]) -> StoreResult<Vec<Offer>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let id = new_id();
            tx.execute(
                "INSERT INTO offers(id, rto_id, qualification_id, company_id, status, is_public)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    row.rto_id,
                    row.qualification_id,
                    row.company_id,
                    row.status,
                    row.is_public
                ],
            )?;
            created.push(Offer {
                id,
                rto_id: row.rto_id.clone(),
                qualification_id: row.qualification_id.clone(),
                company_id: row.company_id.clone(),
                status: row.status.clone(),
                is_public: row.is_public,
            });
        }
        tx.commit()?;
        Ok(created)
    }

    async fn select_unit_links(&self, owners: &[Owner]) -> StoreResult<Vec<UnitLink>> {
        let conn = self.conn()?;
        let mut links = Vec::new();
        for (kind, ids) in split_owners(owners) {
            if ids.is_empty() {
                continue;
            }
            let (table, column) = link_table(&kind);
            let sql = format!(
                "SELECT {column}, unit_id, unit_type, group_code, application_details
                 FROM {table} WHERE {column} IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    let unit_type: String = row.get(2)?;
                    Ok(UnitLink {
                        owner: with_id(&kind, row.get(0)?),
                        unit_id: row.get(1)?,
                        unit_type: UnitType::from_db(&unit_type),
                        group_code: row.get(3)?,
                        application_details: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            links.extend(rows);
        }
        Ok(links)
    }

    async fn upsert_unit_links(&self, rows: &[UnitLink]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for row in rows {
            let (table, column) = link_table(&row.owner);
            tx.execute(
                &format!(
                    "INSERT INTO {table}({column}, unit_id, unit_type, group_code, application_details)
                     VALUES(?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT({column}, unit_id) DO UPDATE SET
                        unit_type = excluded.unit_type,
                        group_code = excluded.group_code,
                        application_details = excluded.application_details"
                ),
                params![
                    row.owner.id(),
                    row.unit_id,
                    row.unit_type.as_str(),
                    row.group_code,
                    row.application_details
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn delete_unit_links(
        &self,
        owner: &Owner,
        unit_ids: &[RecordId],
    ) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let (table, column) = link_table(owner);
        let sql = format!("DELETE FROM {table} WHERE {column} = ?1 AND unit_id = ?2");
        let mut removed = 0;
        for unit_id in unit_ids {
            removed += tx.execute(&sql, params![owner.id(), unit_id])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    async fn select_streams(&self, owners: &[Owner]) -> StoreResult<Vec<Stream>> {
        let conn = self.conn()?;
        let mut streams = Vec::new();
        for (kind, ids) in split_owners(owners) {
            if ids.is_empty() {
                continue;
            }
            let (table, column) = stream_table(&kind);
            let sql = format!(
                "SELECT id, {column}, name FROM {table} WHERE {column} IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    Ok(Stream {
                        id: row.get(0)?,
                        owner: with_id(&kind, row.get(1)?),
                        name: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            streams.extend(rows);
        }
        Ok(streams)
    }

    async fn insert_streams(&self, rows: &[NewStream]) -> StoreResult<Vec<Stream>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let id = new_id();
            let (table, column) = stream_table(&row.owner);
            tx.execute(
                &format!("INSERT INTO {table}(id, {column}, name) VALUES(?1, ?2, ?3)"),
                params![id, row.owner.id(), row.name],
            )?;
            created.push(Stream {
                id,
                owner: row.owner.clone(),
                name: row.name.clone(),
            });
        }
        tx.commit()?;
        Ok(created)
    }

    async fn select_stream_units(
        &self,
        stream_ids: &[RecordId],
    ) -> StoreResult<Vec<StreamUnitLink>> {
        if stream_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT stream_id, unit_id, group_code, is_required
             FROM stream_units WHERE stream_id IN ({})",
            placeholders(stream_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(stream_ids.iter()), |row| {
                Ok(StreamUnitLink {
                    stream_id: row.get(0)?,
                    unit_id: row.get(1)?,
                    group_code: row.get(2)?,
                    is_required: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn upsert_stream_units(&self, rows: &[StreamUnitLink]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for row in rows {
            tx.execute(
                "INSERT INTO stream_units(stream_id, unit_id, group_code, is_required)
                 VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(stream_id, unit_id) DO UPDATE SET
                    group_code = excluded.group_code,
                    is_required = excluded.is_required",
                params![row.stream_id, row.unit_id, row.group_code, row.is_required],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn delete_stream_units(&self, stream_id: &RecordId) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM stream_units WHERE stream_id = ?1", [stream_id])?)
    }

    async fn offer_stream_unit_ids(&self, offer_id: &RecordId) -> StoreResult<Vec<RecordId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT su.unit_id
             FROM stream_units su
             JOIN offer_streams s ON s.id = su.stream_id
             WHERE s.offer_id = ?1
             ORDER BY su.unit_id",
        )?;
        let ids = stmt
            .query_map([offer_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
