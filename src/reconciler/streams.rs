//! Stream creation and stream to unit links

use super::state::ResolvedRecord;
use super::{InPhase, Reconciler, SaveMode};
use crate::Result;
use crate::error::Phase;
use crate::models::{NewStream, Owner, RecordId, StreamTargets, StreamUnitLink, UnitType};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

impl Reconciler<'_> {
    /// Stream names each owner needs, first spelling kept
    fn wanted_streams(&self, resolved: &[ResolvedRecord<'_>]) -> BTreeMap<Owner, Vec<String>> {
        let mut wanted: BTreeMap<Owner, Vec<String>> = BTreeMap::new();

        for item in resolved {
            let names: Vec<&str> = match &self.options.mode {
                SaveMode::Variation(name) => vec![name.as_str()],
                SaveMode::Standard => match &item.record.streams {
                    StreamTargets::Named(names) => names.iter().map(String::as_str).collect(),
                    StreamTargets::All if item.record.unit_type == UnitType::Elective => Vec::new(),
                    _ => continue,
                },
            };

            let entry = wanted.entry(item.owner.clone()).or_default();
            for name in names {
                if !entry.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    entry.push(name.to_string());
                }
            }
        }
        wanted
    }

    /// Load the stream index for owners not yet indexed this run
    async fn load_stream_index(&mut self, owners: &[Owner]) -> Result<()> {
        let pending: Vec<Owner> = owners
            .iter()
            .filter(|owner| !self.state.has_stream_index(owner))
            .cloned()
            .collect();

        for batch in pending.chunks(self.batch_size()) {
            let streams = self
                .store
                .select_streams(batch)
                .await
                .in_phase(Phase::Streams)?;
            for owner in batch {
                let owned = streams.iter().filter(|s| &s.owner == owner).cloned();
                self.state.index_streams(owner.clone(), owned);
            }
        }
        Ok(())
    }

    /// Phase 4: create every named stream missing for its owner
    pub(super) async fn create_streams(&mut self, resolved: &[ResolvedRecord<'_>]) -> Result<()> {
        let wanted = self.wanted_streams(resolved);
        if wanted.is_empty() {
            return Ok(());
        }

        let owners: Vec<Owner> = wanted.keys().cloned().collect();
        self.load_stream_index(&owners).await?;

        let missing: Vec<NewStream> = wanted
            .into_iter()
            .flat_map(|(owner, names)| names.into_iter().map(move |name| (owner.clone(), name)))
            .filter(|(owner, name)| self.state.find_stream(owner, name).is_none())
            .map(|(owner, name)| NewStream { owner, name })
            .collect();

        for batch in missing.chunks(self.batch_size()) {
            debug!("Inserting {} streams", batch.len());
            let created = self
                .store
                .insert_streams(batch)
                .await
                .in_phase(Phase::Streams)?;
            self.summary.created.streams += created.len();
            for stream in created {
                self.state.add_stream(stream);
            }
        }

        info!(
            "Streams: {} owners indexed, {} created",
            owners.len(),
            missing.len()
        );
        Ok(())
    }

    /// Stream ids a record links to, counting targets with no stream
    fn stream_targets(&mut self, item: &ResolvedRecord<'_>) -> Vec<RecordId> {
        let record = item.record;
        match &self.options.mode {
            SaveMode::Variation(name) => {
                let found = self.state.find_stream(&item.owner, name).map(|s| s.id.clone());
                if found.is_none() {
                    self.summary.skipped.unresolved_stream_targets += 1;
                }
                found.into_iter().collect()
            }
            SaveMode::Standard => {
                if record.unit_type != UnitType::Elective {
                    return Vec::new();
                }
                match &record.streams {
                    StreamTargets::None => Vec::new(),
                    StreamTargets::All => {
                        let ids: Vec<RecordId> = self
                            .state
                            .streams_of(&item.owner)
                            .into_iter()
                            .map(|s| s.id.clone())
                            .collect();
                        if ids.is_empty() {
                            warn!("Row {}: ALL given but the owner has no streams", record.line);
                            self.summary.skipped.unresolved_stream_targets += 1;
                        }
                        ids
                    }
                    StreamTargets::Named(names) => {
                        let mut ids = Vec::with_capacity(names.len());
                        for name in names {
                            match self.state.find_stream(&item.owner, name) {
                                Some(stream) => ids.push(stream.id.clone()),
                                None => {
                                    warn!("Row {}: no stream named '{}'", record.line, name);
                                    self.summary.skipped.unresolved_stream_targets += 1;
                                }
                            }
                        }
                        ids
                    }
                }
            }
        }
    }

    /// Phase 5: link units to their target streams
    ///
    /// A variation save replaces the variation's links outright; a standard
    /// save upserts by (stream, unit) and leaves other links alone.
    pub(super) async fn link_streams(&mut self, resolved: &[ResolvedRecord<'_>]) -> Result<()> {
        let mut links: BTreeMap<(RecordId, RecordId), StreamUnitLink> = BTreeMap::new();
        for item in resolved {
            for stream_id in self.stream_targets(item) {
                links.insert(
                    (stream_id.clone(), item.unit_id.clone()),
                    StreamUnitLink {
                        stream_id,
                        unit_id: item.unit_id.clone(),
                        group_code: item.record.group_label.clone(),
                        is_required: item.record.is_required,
                    },
                );
            }
        }

        let replace = matches!(self.options.mode, SaveMode::Variation(_));
        let stream_ids: BTreeSet<RecordId> = match &self.options.mode {
            SaveMode::Variation(name) => resolved
                .iter()
                .filter_map(|item| self.state.find_stream(&item.owner, name))
                .map(|s| s.id.clone())
                .collect(),
            SaveMode::Standard => links.keys().map(|(stream_id, _)| stream_id.clone()).collect(),
        };
        let stream_ids: Vec<RecordId> = stream_ids.into_iter().collect();
        if stream_ids.is_empty() {
            return Ok(());
        }

        let mut existing: HashSet<(RecordId, RecordId)> = HashSet::new();
        if replace {
            for stream_id in &stream_ids {
                let removed = self
                    .store
                    .delete_stream_units(stream_id)
                    .await
                    .in_phase(Phase::StreamLinks)?;
                self.summary.removed.stream_links += removed;
            }
        } else {
            for batch in stream_ids.chunks(self.batch_size()) {
                let current = self
                    .store
                    .select_stream_units(batch)
                    .await
                    .in_phase(Phase::StreamLinks)?;
                existing.extend(current.into_iter().map(|l| (l.stream_id, l.unit_id)));
            }
        }

        let created = links.keys().filter(|key| !existing.contains(*key)).count();
        let refreshed = links.len() - created;

        let rows: Vec<StreamUnitLink> = links.into_values().collect();
        for batch in rows.chunks(self.batch_size()) {
            debug!("Upserting {} stream links", batch.len());
            self.store
                .upsert_stream_units(batch)
                .await
                .in_phase(Phase::StreamLinks)?;
        }

        self.summary.created.stream_links += created;
        self.summary.updated.stream_links += refreshed;
        info!(
            "Stream links: {} streams, {} new, {} refreshed, {} replaced",
            stream_ids.len(),
            created,
            refreshed,
            self.summary.removed.stream_links
        );
        Ok(())
    }
}
