//! Run-local lookup state
//!
//! Everything the phases learn from the store lives here for the duration of
//! one run and is dropped with it. Nothing is shared between runs.

use crate::models::{ImportRecord, Offer, Owner, Qualification, RecordId, Rto, Stream, Unit};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A record whose owner and unit both resolved
#[derive(Debug, Clone)]
pub struct ResolvedRecord<'r> {
    pub record: &'r ImportRecord,
    pub owner: Owner,
    pub unit_id: RecordId,
}

#[derive(Debug, Default)]
pub struct RunState {
    /// By RTO code
    pub rtos: HashMap<String, Rto>,
    /// By qualification code
    pub qualifications: HashMap<String, Qualification>,
    /// By unit code
    pub units: HashMap<String, Unit>,
    /// By (rto id, qualification id)
    pub offers: HashMap<(RecordId, RecordId), Offer>,
    /// Unit ids linked to each owner before this run wrote any links
    pub linked_units: HashMap<Owner, HashSet<RecordId>>,
    /// Streams per owner keyed by lower-cased name, loaded at most once
    stream_index: HashMap<Owner, BTreeMap<String, Stream>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_stream_index(&self, owner: &Owner) -> bool {
        self.stream_index.contains_key(owner)
    }

    /// Register the streams read for an owner, replacing nothing already indexed
    pub fn index_streams(&mut self, owner: Owner, streams: impl IntoIterator<Item = Stream>) {
        let index = self.stream_index.entry(owner).or_default();
        for stream in streams {
            index.entry(stream.name.to_lowercase()).or_insert(stream);
        }
    }

    pub fn add_stream(&mut self, stream: Stream) {
        self.stream_index
            .entry(stream.owner.clone())
            .or_default()
            .insert(stream.name.to_lowercase(), stream);
    }

    pub fn find_stream(&self, owner: &Owner, name: &str) -> Option<&Stream> {
        self.stream_index
            .get(owner)
            .and_then(|index| index.get(&name.to_lowercase()))
    }

    /// Every stream known for an owner, in name order
    pub fn streams_of(&self, owner: &Owner) -> Vec<&Stream> {
        self.stream_index
            .get(owner)
            .map(|index| index.values().collect())
            .unwrap_or_default()
    }
}
