//! RTO, qualification, unit and offer upserts

use super::{InPhase, Reconciler, distinct};
use crate::Result;
use crate::constants::{NEW_OFFER_STATUS, RTO_TRADING_NAME_PREFIX};
use crate::error::Phase;
use crate::models::{ImportRecord, NewOffer, NewQualification, NewRto, NewUnit, RecordId};
use crate::parser::field_parsers::training_package;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

impl Reconciler<'_> {
    /// Phase 0: make sure every referenced RTO exists
    pub(super) async fn upsert_rtos(&mut self, records: &[ImportRecord]) -> Result<()> {
        let codes = distinct(records.iter().filter_map(|r| r.rto_code.clone()));
        if codes.is_empty() {
            return Ok(());
        }

        for batch in codes.chunks(self.batch_size()) {
            let existing = self.store.select_rtos(batch).await.in_phase(Phase::Rtos)?;
            for rto in existing {
                self.state.rtos.insert(rto.rto_code.clone(), rto);
            }
        }

        let missing: Vec<NewRto> = codes
            .iter()
            .filter(|code| !self.state.rtos.contains_key(*code))
            .map(|code| NewRto {
                rto_code: code.clone(),
                trading_name: format!("{RTO_TRADING_NAME_PREFIX}{code}"),
            })
            .collect();

        for batch in missing.chunks(self.batch_size()) {
            debug!("Inserting {} RTOs", batch.len());
            let created = self.store.insert_rtos(batch).await.in_phase(Phase::Rtos)?;
            self.summary.created.rtos += created.len();
            for rto in created {
                self.state.rtos.insert(rto.rto_code.clone(), rto);
            }
        }

        info!(
            "RTOs: {} referenced, {} created",
            codes.len(),
            self.summary.created.rtos
        );
        Ok(())
    }

    /// Phase 1: insert new qualifications and refresh names per policy
    pub(super) async fn upsert_qualifications(&mut self, records: &[ImportRecord]) -> Result<()> {
        let codes = distinct(records.iter().map(|r| r.qualification_code.clone()));
        if codes.is_empty() {
            return Ok(());
        }

        let mut names: HashMap<&str, &str> = HashMap::new();
        for record in records {
            let name = names.entry(record.qualification_code.as_str()).or_default();
            if name.is_empty() {
                *name = record.qualification_name.as_str();
            }
        }

        for batch in codes.chunks(self.batch_size()) {
            let existing = self
                .store
                .select_qualifications(batch)
                .await
                .in_phase(Phase::Qualifications)?;
            for qualification in existing {
                self.state
                    .qualifications
                    .insert(qualification.code.clone(), qualification);
            }
        }

        let policy = self.options.name_policy;
        let mut writes = Vec::new();
        let mut created = 0;
        let mut updated = 0;

        for code in &codes {
            let incoming = names.get(code.as_str()).copied().unwrap_or("");
            match self.state.qualifications.get(code) {
                None => {
                    created += 1;
                    writes.push(NewQualification {
                        code: code.clone(),
                        name: if incoming.is_empty() { code.clone() } else { incoming.to_string() },
                        training_package: training_package(code),
                    });
                }
                Some(existing) if policy.should_replace(&existing.name, incoming, code) => {
                    updated += 1;
                    writes.push(NewQualification {
                        code: code.clone(),
                        name: incoming.to_string(),
                        training_package: existing
                            .training_package
                            .clone()
                            .or_else(|| training_package(code)),
                    });
                }
                Some(_) => {}
            }
        }

        for batch in writes.chunks(self.batch_size()) {
            debug!("Upserting {} qualifications", batch.len());
            let stored = self
                .store
                .upsert_qualifications(batch)
                .await
                .in_phase(Phase::Qualifications)?;
            for qualification in stored {
                self.state
                    .qualifications
                    .insert(qualification.code.clone(), qualification);
            }
        }

        self.summary.created.qualifications += created;
        self.summary.updated.qualifications += updated;
        info!(
            "Qualifications: {} seen, {} created, {} renamed",
            codes.len(),
            created,
            updated
        );
        Ok(())
    }

    /// Phase 2: insert new units and refresh name and description per policy
    pub(super) async fn upsert_units(&mut self, records: &[ImportRecord]) -> Result<()> {
        let codes = distinct(records.iter().map(|r| r.unit_code.clone()));
        if codes.is_empty() {
            return Ok(());
        }

        let mut first_seen: HashMap<&str, &ImportRecord> = HashMap::new();
        for record in records {
            first_seen.entry(record.unit_code.as_str()).or_insert(record);
        }

        for batch in codes.chunks(self.batch_size()) {
            let existing = self.store.select_units(batch).await.in_phase(Phase::Units)?;
            for unit in existing {
                self.state.units.insert(unit.code.clone(), unit);
            }
        }

        let policy = self.options.name_policy;
        let mut writes = Vec::new();
        let mut created = 0;
        let mut updated = 0;

        for code in &codes {
            let Some(record) = first_seen.get(code.as_str()) else {
                continue;
            };
            let name = record.unit_name.as_str();
            let description = record.unit_description.as_str();

            match self.state.units.get(code) {
                None => {
                    created += 1;
                    writes.push(NewUnit {
                        code: code.clone(),
                        name: if name.is_empty() { code.clone() } else { name.to_string() },
                        description: (!description.is_empty()).then(|| description.to_string()),
                    });
                }
                Some(existing) => {
                    let current_description = existing.description.as_deref().unwrap_or("");
                    let rename = policy.should_replace(&existing.name, name, code);
                    let redescribe = policy.should_replace(current_description, description, "");
                    if rename || redescribe {
                        updated += 1;
                        writes.push(NewUnit {
                            code: code.clone(),
                            name: if rename { name.to_string() } else { existing.name.clone() },
                            description: if redescribe {
                                Some(description.to_string())
                            } else {
                                existing.description.clone()
                            },
                        });
                    }
                }
            }
        }

        for batch in writes.chunks(self.batch_size()) {
            debug!("Upserting {} units", batch.len());
            let stored = self.store.upsert_units(batch).await.in_phase(Phase::Units)?;
            for unit in stored {
                self.state.units.insert(unit.code.clone(), unit);
            }
        }

        self.summary.created.units += created;
        self.summary.updated.units += updated;
        info!(
            "Units: {} seen, {} created, {} refreshed",
            codes.len(),
            created,
            updated
        );
        Ok(())
    }

    /// Offer for every (RTO, qualification) pair the records name
    pub(super) async fn ensure_offers(&mut self, records: &[ImportRecord]) -> Result<()> {
        let mut pairs: Vec<(RecordId, RecordId)> = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            let Some(rto) = record.rto_code.as_ref().and_then(|c| self.state.rtos.get(c)) else {
                continue;
            };
            let Some(qualification) = self.state.qualifications.get(&record.qualification_code)
            else {
                continue;
            };
            let pair = (rto.id.clone(), qualification.id.clone());
            if seen.insert(pair.clone()) {
                pairs.push(pair);
            }
        }
        if pairs.is_empty() {
            return Ok(());
        }

        let rto_ids = distinct(pairs.iter().map(|(rto_id, _)| rto_id.clone()));
        for batch in rto_ids.chunks(self.batch_size()) {
            let existing = self.store.select_offers(batch).await.in_phase(Phase::Offers)?;
            for offer in existing {
                self.state
                    .offers
                    .insert((offer.rto_id.clone(), offer.qualification_id.clone()), offer);
            }
        }

        let missing: Vec<NewOffer> = pairs
            .iter()
            .filter(|pair| !self.state.offers.contains_key(*pair))
            .map(|(rto_id, qualification_id)| NewOffer {
                rto_id: rto_id.clone(),
                qualification_id: qualification_id.clone(),
                company_id: self.options.company_id.clone(),
                status: NEW_OFFER_STATUS.to_string(),
                is_public: false,
            })
            .collect();

        for batch in missing.chunks(self.batch_size()) {
            debug!("Inserting {} offers", batch.len());
            let created = self.store.insert_offers(batch).await.in_phase(Phase::Offers)?;
            self.summary.created.offers += created.len();
            for offer in created {
                self.state
                    .offers
                    .insert((offer.rto_id.clone(), offer.qualification_id.clone()), offer);
            }
        }

        info!(
            "Offers: {} pairs, {} created",
            pairs.len(),
            self.summary.created.offers
        );
        Ok(())
    }
}
