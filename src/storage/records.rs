// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{ArtefactMeta, Pipeline, PipelineRun, StepRun};

/// Result of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    /// The closure accepted the record and the new value was stored
    Applied(T),
    /// The closure declined; the current record is returned unchanged
    Rejected(T),
    /// No record under that key
    Missing,
}

impl<T> UpdateOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            UpdateOutcome::Applied(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}

/// Closure used by the `update_*` methods. It may run more than once when a
/// concurrent writer wins the race, so it must only touch the record.
/// Returning `false` leaves the record unchanged.
pub type Mutation<'a, T> = &'a mut dyn FnMut(&mut T) -> bool;

/// Durable create/read/targeted-update/delete for every persistent record.
///
/// Updates are compare-and-swap on a single key, never whole-collection
/// rewrites, so sibling steps of a run can write concurrently.
pub trait RecordStore: Send + Sync {
    fn save_pipeline(&self, pipeline: &Pipeline) -> Result<(), StoreError>;
    fn load_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>, StoreError>;
    fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError>;

    /// Insert a new run; fails with `Duplicate` if the id exists.
    fn insert_run(&self, run: &PipelineRun) -> Result<(), StoreError>;
    /// Load a run with its `output_artefacts` merged in.
    fn load_run(&self, id: Uuid) -> Result<Option<PipelineRun>, StoreError>;
    fn update_run(
        &self,
        id: Uuid,
        mutation: Mutation<'_, PipelineRun>,
    ) -> Result<UpdateOutcome<PipelineRun>, StoreError>;

    /// Insert a step; `(run_id, node_id)` must be new.
    fn insert_step(&self, step: &StepRun) -> Result<(), StoreError>;
    fn load_step(&self, run_id: Uuid, node_id: &str) -> Result<Option<StepRun>, StoreError>;
    fn list_steps(&self, run_id: Uuid) -> Result<Vec<StepRun>, StoreError>;
    fn update_step(
        &self,
        run_id: Uuid,
        node_id: &str,
        mutation: Mutation<'_, StepRun>,
    ) -> Result<UpdateOutcome<StepRun>, StoreError>;

    /// Keyed write of one node's output hash.
    fn record_output(&self, run_id: Uuid, node_id: &str, hash: &str) -> Result<(), StoreError>;
    fn run_outputs(&self, run_id: Uuid) -> Result<BTreeMap<String, String>, StoreError>;

    /// Insert metadata unless a row for the hash exists. Returns whether it
    /// was inserted.
    fn insert_artefact(&self, meta: &ArtefactMeta) -> Result<bool, StoreError>;
    fn load_artefact(&self, hash: &str) -> Result<Option<ArtefactMeta>, StoreError>;
    fn update_artefact(
        &self,
        hash: &str,
        mutation: Mutation<'_, ArtefactMeta>,
    ) -> Result<UpdateOutcome<ArtefactMeta>, StoreError>;
    fn remove_artefact(&self, hash: &str) -> Result<bool, StoreError>;
    /// Remove the row only if `predicate` accepts its current value and no
    /// writer changes it before the removal lands. Returns whether it was
    /// removed.
    fn remove_artefact_if(
        &self,
        hash: &str,
        predicate: &dyn Fn(&ArtefactMeta) -> bool,
    ) -> Result<bool, StoreError>;
    fn list_artefacts(&self) -> Result<Vec<ArtefactMeta>, StoreError>;
}
