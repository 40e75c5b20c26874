//! Reconciliation of normalized records against the record store
//!
//! A run walks fixed phases in order, each reading what it needs and
//! writing only the difference in batches:
//!
//! 0. RTOs referenced by records (offer scope or offer linking)
//! 1. Qualifications
//! 2. Units
//! 3. Offers, then owner to unit links
//! 4. Streams named by records
//! 5. Stream to unit links
//! 6. Removal of offer units no longer imported (offer scope, standard save)
//!
//! A store failure stops the run and names the phase; earlier phases stay
//! applied, and running the same import again converges.

mod catalog;
mod cleanup;
mod links;
pub mod state;
pub mod stats;
mod streams;

#[cfg(test)]
mod tests;

pub use state::{ResolvedRecord, RunState};
pub use stats::ReconcileSummary;

use crate::config::NameUpdatePolicy;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::error::Phase;
use crate::models::{ImportRecord, Owner};
use crate::store::{RecordStore, StoreResult};
use crate::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

/// Where unit links and streams attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkScope {
    #[default]
    Qualification,
    /// The (RTO, qualification) offer of each record
    Offer,
}

/// How stream links are written
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Merge links and, in offer scope, drop units no longer imported
    #[default]
    Standard,
    /// Every record belongs to the named variation, whose links are replaced
    Variation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOptions {
    pub scope: LinkScope,
    pub mode: SaveMode,
    pub batch_size: usize,
    pub name_policy: NameUpdatePolicy,
    /// Stamped on offers created by the run
    pub company_id: Option<String>,
    /// Ensure offers exist even when links attach to qualifications
    pub link_offers: bool,
    /// Run the stream phases
    pub link_streams: bool,
    /// Unit codes present in the input, including rows left out by
    /// validation; cleanup never unlinks these
    #[serde(default)]
    pub import_units: BTreeSet<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            scope: LinkScope::default(),
            mode: SaveMode::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            name_policy: NameUpdatePolicy::default(),
            company_id: None,
            link_offers: false,
            link_streams: true,
            import_units: BTreeSet::new(),
        }
    }
}

impl ReconcileOptions {
    pub fn with_scope(mut self, scope: LinkScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_name_policy(mut self, policy: NameUpdatePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn with_company_id(mut self, company_id: Option<String>) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn with_offer_linking(mut self) -> Self {
        self.link_offers = true;
        self
    }

    /// Stop after unit links; stream columns are ignored
    pub fn without_streams(mut self) -> Self {
        self.link_streams = false;
        self
    }

    /// Protect these unit codes from obsolete-unit removal
    pub fn with_import_units<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.import_units = codes.into_iter().filter(|c| !c.is_empty()).collect();
        self
    }

    fn uses_offers(&self) -> bool {
        self.scope == LinkScope::Offer || self.link_offers
    }
}

/// Tag store failures with the phase that issued the call
trait InPhase<T> {
    fn in_phase(self, phase: Phase) -> Result<T>;
}

impl<T> InPhase<T> for StoreResult<T> {
    fn in_phase(self, phase: Phase) -> Result<T> {
        self.map_err(|source| ImportError::store(phase, source))
    }
}

/// Distinct values in first-seen order
fn distinct<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

/// Drives one reconciliation run
pub struct Reconciler<'s> {
    store: &'s dyn RecordStore,
    options: ReconcileOptions,
    state: RunState,
    summary: ReconcileSummary,
}

impl<'s> Reconciler<'s> {
    pub fn new(store: &'s dyn RecordStore, options: ReconcileOptions) -> Self {
        Self {
            store,
            options,
            state: RunState::new(),
            summary: ReconcileSummary::default(),
        }
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size.max(1)
    }

    /// Run every phase over the records
    pub async fn run(mut self, records: &[ImportRecord]) -> Result<ReconcileSummary> {
        self.summary = ReconcileSummary::new(records.len());

        if self.options.uses_offers() {
            self.upsert_rtos(records).await?;
        }
        self.upsert_qualifications(records).await?;
        self.upsert_units(records).await?;
        if self.options.uses_offers() {
            self.ensure_offers(records).await?;
        }

        let resolved = self.resolve(records);
        self.link_units(&resolved).await?;
        if self.options.link_streams {
            self.create_streams(&resolved).await?;
            self.link_streams(&resolved).await?;
        }

        if self.options.scope == LinkScope::Offer && self.options.mode == SaveMode::Standard {
            self.remove_obsolete_units(&resolved).await?;
        }

        info!(
            "Reconciled {} records: {} entities created, {} unit links, {} stream links, {} removed",
            records.len(),
            self.summary.entities_created(),
            self.summary.created.unit_links + self.summary.updated.unit_links,
            self.summary.created.stream_links + self.summary.updated.stream_links,
            self.summary.removed.unit_links + self.summary.removed.stream_links
        );
        Ok(self.summary)
    }

    /// Owner a record's unit link attaches to
    fn owner_for(&self, record: &ImportRecord) -> Option<Owner> {
        let qualification = self.state.qualifications.get(&record.qualification_code)?;
        match self.options.scope {
            LinkScope::Qualification => Some(Owner::Qualification(qualification.id.clone())),
            LinkScope::Offer => {
                let rto = self.state.rtos.get(record.rto_code.as_deref()?)?;
                let offer = self
                    .state
                    .offers
                    .get(&(rto.id.clone(), qualification.id.clone()))?;
                Some(Owner::Offer(offer.id.clone()))
            }
        }
    }

    /// Pair each record with its owner and unit, counting the ones that fail
    fn resolve<'r>(&mut self, records: &'r [ImportRecord]) -> Vec<ResolvedRecord<'r>> {
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            let owner = self.owner_for(record);
            let unit = self.state.units.get(&record.unit_code);
            match (owner, unit) {
                (Some(owner), Some(unit)) => resolved.push(ResolvedRecord {
                    record,
                    owner,
                    unit_id: unit.id.clone(),
                }),
                _ => {
                    warn!(
                        "Row {}: cannot resolve owner or unit for {} / {}, skipped",
                        record.line, record.qualification_code, record.unit_code
                    );
                    self.summary.skipped.unresolved_records += 1;
                }
            }
        }
        resolved
    }
}

/// Reconcile records into the store with the given options
pub async fn reconcile(
    records: &[ImportRecord],
    store: &dyn RecordStore,
    options: &ReconcileOptions,
) -> Result<ReconcileSummary> {
    Reconciler::new(store, options.clone()).run(records).await
}
