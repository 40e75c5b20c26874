//! Removal of offer units dropped from an import

use super::state::ResolvedRecord;
use super::{InPhase, Reconciler};
use crate::Result;
use crate::error::Phase;
use crate::models::{Owner, RecordId};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

impl Reconciler<'_> {
    /// Phase 6: unlink units the offer had before but the import omits
    ///
    /// Units still referenced by any stream of the offer are kept, as are
    /// units whose code appears in the input even on a row left out by
    /// validation.
    pub(super) async fn remove_obsolete_units(
        &mut self,
        resolved: &[ResolvedRecord<'_>],
    ) -> Result<()> {
        let mut imported: BTreeMap<Owner, HashSet<&RecordId>> = BTreeMap::new();
        for item in resolved {
            if let Owner::Offer(_) = item.owner {
                imported
                    .entry(item.owner.clone())
                    .or_default()
                    .insert(&item.unit_id);
            }
        }

        let kept_ids = self.import_unit_ids().await?;
        let mut removed = 0;
        for (owner, imported_ids) in &imported {
            let candidates: Vec<RecordId> = self
                .state
                .linked_units
                .get(owner)
                .map(|linked| {
                    linked
                        .iter()
                        .filter(|id| !imported_ids.contains(id) && !kept_ids.contains(*id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if candidates.is_empty() {
                continue;
            }

            let offer_id = owner.id().to_string();
            let protected: HashSet<RecordId> = self
                .store
                .offer_stream_unit_ids(&offer_id)
                .await
                .in_phase(Phase::Cleanup)?
                .into_iter()
                .collect();

            let mut to_delete: Vec<RecordId> = candidates
                .into_iter()
                .filter(|id| !protected.contains(id))
                .collect();
            to_delete.sort();
            if to_delete.is_empty() {
                continue;
            }

            for batch in to_delete.chunks(self.batch_size()) {
                debug!("Removing {} obsolete units from {}", batch.len(), owner);
                removed += self
                    .store
                    .delete_unit_links(owner, batch)
                    .await
                    .in_phase(Phase::Cleanup)?;
            }
        }

        self.summary.removed.unit_links += removed;
        info!(
            "Cleanup: {} offers checked, {} obsolete unit links removed",
            imported.len(),
            removed
        );
        Ok(())
    }

    /// Ids of the units named by `import_units`
    ///
    /// Codes resolved in phase 2 come from the run state; the rest belong to
    /// rows the reconciler never saw and are looked up in one read.
    async fn import_unit_ids(&self) -> Result<HashSet<RecordId>> {
        let mut ids = HashSet::new();
        let mut missing = Vec::new();
        for code in &self.options.import_units {
            match self.state.units.get(code) {
                Some(unit) => {
                    ids.insert(unit.id.clone());
                }
                None => missing.push(code.clone()),
            }
        }

        if !missing.is_empty() {
            let found = self
                .store
                .select_units(&missing)
                .await
                .in_phase(Phase::Cleanup)?;
            debug!(
                "{} of {} input-only unit codes already stored",
                found.len(),
                missing.len()
            );
            ids.extend(found.into_iter().map(|unit| unit.id));
        }
        Ok(ids)
    }
}
