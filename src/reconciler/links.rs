//! Owner to unit links

use super::state::ResolvedRecord;
use super::{InPhase, Reconciler};
use crate::Result;
use crate::error::Phase;
use crate::models::{Owner, RecordId, UnitLink};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

impl Reconciler<'_> {
    /// Phase 3: upsert one link per (owner, unit), last record wins
    pub(super) async fn link_units(&mut self, resolved: &[ResolvedRecord<'_>]) -> Result<()> {
        if resolved.is_empty() {
            return Ok(());
        }

        let owners: Vec<Owner> = resolved
            .iter()
            .map(|r| r.owner.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for batch in owners.chunks(self.batch_size()) {
            let existing = self
                .store
                .select_unit_links(batch)
                .await
                .in_phase(Phase::UnitLinks)?;
            for owner in batch {
                self.state.linked_units.entry(owner.clone()).or_default();
            }
            for link in existing {
                self.state
                    .linked_units
                    .entry(link.owner)
                    .or_default()
                    .insert(link.unit_id);
            }
        }

        let mut links: BTreeMap<(Owner, RecordId), UnitLink> = BTreeMap::new();
        for item in resolved {
            links.insert(
                (item.owner.clone(), item.unit_id.clone()),
                UnitLink {
                    owner: item.owner.clone(),
                    unit_id: item.unit_id.clone(),
                    unit_type: item.record.unit_type,
                    group_code: item.record.group_label.clone(),
                    application_details: item.record.application_details.clone(),
                },
            );
        }

        let mut created = 0;
        let mut refreshed = 0;
        for (owner, unit_id) in links.keys() {
            let known = self
                .state
                .linked_units
                .get(owner)
                .is_some_and(|ids| ids.contains(unit_id));
            if known {
                refreshed += 1;
            } else {
                created += 1;
            }
        }

        let rows: Vec<UnitLink> = links.into_values().collect();
        for batch in rows.chunks(self.batch_size()) {
            debug!("Upserting {} unit links", batch.len());
            self.store
                .upsert_unit_links(batch)
                .await
                .in_phase(Phase::UnitLinks)?;
        }

        self.summary.created.unit_links += created;
        self.summary.updated.unit_links += refreshed;
        info!(
            "Unit links: {} owners, {} new, {} refreshed",
            owners.len(),
            created,
            refreshed
        );
        Ok(())
    }
}
