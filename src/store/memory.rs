//! In-process record store
//!
//! Mirrors the unique constraints of the relational schema so the reconciler
//! can be exercised without a database. Every call is counted by operation
//! name, and any operation can be made to fail on demand.

use super::{RecordStore, StoreError, StoreResult, new_id};
use crate::models::{
    NewOffer, NewQualification, NewRto, NewStream, NewUnit, Offer, Owner, Qualification,
    RecordId, Rto, Stream, StreamUnitLink, Unit, UnitLink,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    rtos: Vec<Rto>,
    qualifications: Vec<Qualification>,
    units: Vec<Unit>,
    offers: Vec<Offer>,
    unit_links: Vec<UnitLink>,
    streams: Vec<Stream>,
    stream_units: Vec<StreamUnitLink>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, String>,
}

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and apply any injected failure
    fn begin(&self, operation: &str) -> StoreResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        *inner.calls.entry(operation.to_string()).or_default() += 1;
        if let Some(message) = inner.failures.get(operation) {
            return Err(StoreError::query(operation, message.clone()));
        }
        Ok(inner)
    }

    /// Make every later call to `operation` fail with `message`
    pub fn fail_on(&self, operation: &str, message: &str) {
        self.lock()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Calls made to one operation, e.g. `select_streams`
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Calls made to operations that change data
    pub fn write_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(op, _)| !op.starts_with("select") && !op.starts_with("offer_stream"))
            .map(|(_, count)| count)
            .sum()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn rtos(&self) -> Vec<Rto> {
        self.lock().rtos.clone()
    }

    pub fn qualifications(&self) -> Vec<Qualification> {
        self.lock().qualifications.clone()
    }

    pub fn units(&self) -> Vec<Unit> {
        self.lock().units.clone()
    }

    pub fn offers(&self) -> Vec<Offer> {
        self.lock().offers.clone()
    }

    pub fn unit_links(&self) -> Vec<UnitLink> {
        self.lock().unit_links.clone()
    }

    pub fn streams(&self) -> Vec<Stream> {
        self.lock().streams.clone()
    }

    pub fn stream_units(&self) -> Vec<StreamUnitLink> {
        self.lock().stream_units.clone()
    }
}

fn stream_key(owner: &Owner, name: &str) -> (Owner, String) {
    (owner.clone(), name.to_lowercase())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn select_rtos(&self, codes: &[String]) -> StoreResult<Vec<Rto>> {
        let inner = self.begin("select_rtos")?;
        Ok(inner
            .rtos
            .iter()
            .filter(|r| codes.contains(&r.rto_code))
            .cloned()
            .collect())
    }

    async fn insert_rtos(&self, rows: &[NewRto]) -> StoreResult<Vec<Rto>> {
        let mut inner = self.begin("insert_rtos")?;
        let mut seen: HashSet<&str> = inner.rtos.iter().map(|r| r.rto_code.as_str()).collect();
        for row in rows {
            if !seen.insert(row.rto_code.as_str()) {
                return Err(StoreError::constraint("rtos", &row.rto_code));
            }
        }

        let created: Vec<Rto> = rows
            .iter()
            .map(|row| Rto {
                id: new_id(),
                rto_code: row.rto_code.clone(),
                trading_name: row.trading_name.clone(),
            })
            .collect();
        inner.rtos.extend(created.iter().cloned());
        Ok(created)
    }

    async fn select_qualifications(&self, codes: &[String]) -> StoreResult<Vec<Qualification>> {
        let inner = self.begin("select_qualifications")?;
        Ok(inner
            .qualifications
            .iter()
            .filter(|q| codes.contains(&q.code))
            .cloned()
            .collect())
    }

    async fn upsert_qualifications(
        &self,
        rows: &[NewQualification],
    ) -> StoreResult<Vec<Qualification>> {
        let mut inner = self.begin("upsert_qualifications")?;
        let mut result = Vec::with_capacity(rows.len());

        for row in rows {
            let stored = match inner.qualifications.iter_mut().find(|q| q.code == row.code) {
                Some(existing) => {
                    existing.name = row.name.clone();
                    if row.training_package.is_some() {
                        existing.training_package = row.training_package.clone();
                    }
                    existing.clone()
                }
                None => {
                    let created = Qualification {
                        id: new_id(),
                        code: row.code.clone(),
                        name: row.name.clone(),
                        training_package: row.training_package.clone(),
                    };
                    inner.qualifications.push(created.clone());
                    created
                }
            };
            result.push(stored);
        }
        Ok(result)
    }

    async fn select_units(&self, codes: &[String]) -> StoreResult<Vec<Unit>> {
        let inner = self.begin("select_units")?;
        Ok(inner
            .units
            .iter()
            .filter(|u| codes.contains(&u.code))
            .cloned()
            .collect())
    }

    async fn upsert_units(&self, rows: &[NewUnit]) -> StoreResult<Vec<Unit>> {
        let mut inner = self.begin("upsert_units")?;
        let mut result = Vec::with_capacity(rows.len());

        for row in rows {
            let stored = match inner.units.iter_mut().find(|u| u.code == row.code) {
                Some(existing) => {
                    existing.name = row.name.clone();
                    existing.description = row.description.clone();
                    existing.clone()
                }
                None => {
                    let created = Unit {
                        id: new_id(),
                        code: row.code.clone(),
                        name: row.name.clone(),
                        description: row.description.clone(),
                    };
                    inner.units.push(created.clone());
                    created
                }
            };
            result.push(stored);
        }
        Ok(result)
    }

    async fn select_offers(&self, rto_ids: &[RecordId]) -> StoreResult<Vec<Offer>> {
        let inner = self.begin("select_offers")?;
        Ok(inner
            .offers
            .iter()
            .filter(|o| rto_ids.contains(&o.rto_id))
            .cloned()
            .collect())
    }

    async fn insert_offers(&self, rows: &[NewOffer]) -> StoreResult<Vec<Offer>> {
        let mut inner = self.begin("insert_offers")?;
        let mut seen: HashSet<(String, String)> = inner
            .offers
            .iter()
            .map(|o| (o.rto_id.clone(), o.qualification_id.clone()))
            .collect();
        for row in rows {
            if !seen.insert((row.rto_id.clone(), row.qualification_id.clone())) {
                return Err(StoreError::constraint(
                    "offers",
                    format!("{}/{}", row.rto_id, row.qualification_id),
                ));
            }
        }

        let created: Vec<Offer> = rows
            .iter()
            .map(|row| Offer {
                id: new_id(),
                rto_id: row.rto_id.clone(),
                qualification_id: row.qualification_id.clone(),
                company_id: row.company_id.clone(),
                status: row.status.clone(),
                is_public: row.is_public,
            })
            .collect();
        inner.offers.extend(created.iter().cloned());
        Ok(created)
    }

    async fn select_unit_links(&self, owners: &[Owner]) -> StoreResult<Vec<UnitLink>> {
        let inner = self.begin("select_unit_links")?;
        Ok(inner
            .unit_links
            .iter()
            .filter(|l| owners.contains(&l.owner))
            .cloned()
            .collect())
    }

    async fn upsert_unit_links(&self, rows: &[UnitLink]) -> StoreResult<()> {
        let mut inner = self.begin("upsert_unit_links")?;
        for row in rows {
            match inner
                .unit_links
                .iter_mut()
                .find(|l| l.owner == row.owner && l.unit_id == row.unit_id)
            {
                Some(existing) => *existing = row.clone(),
                None => inner.unit_links.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn delete_unit_links(
        &self,
        owner: &Owner,
        unit_ids: &[RecordId],
    ) -> StoreResult<usize> {
        let mut inner = self.begin("delete_unit_links")?;
        let before = inner.unit_links.len();
        inner
            .unit_links
            .retain(|l| !(l.owner == *owner && unit_ids.contains(&l.unit_id)));
        Ok(before - inner.unit_links.len())
    }

    async fn select_streams(&self, owners: &[Owner]) -> StoreResult<Vec<Stream>> {
        let inner = self.begin("select_streams")?;
        Ok(inner
            .streams
            .iter()
            .filter(|s| owners.contains(&s.owner))
            .cloned()
            .collect())
    }

    async fn insert_streams(&self, rows: &[NewStream]) -> StoreResult<Vec<Stream>> {
        let mut inner = self.begin("insert_streams")?;
        let mut seen: HashSet<(Owner, String)> = inner
            .streams
            .iter()
            .map(|s| stream_key(&s.owner, &s.name))
            .collect();
        for row in rows {
            if !seen.insert(stream_key(&row.owner, &row.name)) {
                return Err(StoreError::constraint(
                    "streams",
                    format!("{}/{}", row.owner, row.name),
                ));
            }
        }

        let created: Vec<Stream> = rows
            .iter()
            .map(|row| Stream {
                id: new_id(),
                owner: row.owner.clone(),
                name: row.name.clone(),
            })
            .collect();
        inner.streams.extend(created.iter().cloned());
        Ok(created)
    }

    async fn select_stream_units(
        &self,
        stream_ids: &[RecordId],
    ) -> StoreResult<Vec<StreamUnitLink>> {
        let inner = self.begin("select_stream_units")?;
        Ok(inner
            .stream_units
            .iter()
            .filter(|l| stream_ids.contains(&l.stream_id))
            .cloned()
            .collect())
    }

    async fn upsert_stream_units(&self, rows: &[StreamUnitLink]) -> StoreResult<()> {
        let mut inner = self.begin("upsert_stream_units")?;
        for row in rows {
            match inner
                .stream_units
                .iter_mut()
                .find(|l| l.stream_id == row.stream_id && l.unit_id == row.unit_id)
            {
                Some(existing) => *existing = row.clone(),
                None => inner.stream_units.push(row.clone()),
            }
        }
        Ok(())
    }

    async fn delete_stream_units(&self, stream_id: &RecordId) -> StoreResult<usize> {
        let mut inner = self.begin("delete_stream_units")?;
        let before = inner.stream_units.len();
        inner.stream_units.retain(|l| l.stream_id != *stream_id);
        Ok(before - inner.stream_units.len())
    }

    async fn offer_stream_unit_ids(&self, offer_id: &RecordId) -> StoreResult<Vec<RecordId>> {
        let inner = self.begin("offer_stream_unit_ids")?;
        let owner = Owner::Offer(offer_id.clone());
        let stream_ids: HashSet<&RecordId> = inner
            .streams
            .iter()
            .filter(|s| s.owner == owner)
            .map(|s| &s.id)
            .collect();

        let unit_ids: BTreeSet<RecordId> = inner
            .stream_units
            .iter()
            .filter(|l| stream_ids.contains(&l.stream_id))
            .map(|l| l.unit_id.clone())
            .collect();
        Ok(unit_ids.into_iter().collect())
    }
}
