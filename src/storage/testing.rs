// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A record store that lets tests land a write from "another worker" at a
//! chosen point inside a caller's read-check-write sequence.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::records::{Mutation, RecordStore, UpdateOutcome};
use super::sled_store::SledRecordStore;
use crate::errors::StoreError;
use crate::model::{ArtefactMeta, Pipeline, PipelineRun, StepRun, StepStatus};

type Interleave = Box<dyn FnOnce(&SledRecordStore) + Send>;

pub struct InterleavingStore {
    pub inner: SledRecordStore,
    after_list_steps: Mutex<Option<Interleave>>,
    before_artefact_removal: Mutex<Option<Interleave>>,
    fail_running_updates: AtomicBool,
}

fn fire(slot: &Mutex<Option<Interleave>>, inner: &SledRecordStore) {
    let interleave = slot.lock().unwrap().take();
    if let Some(interleave) = interleave {
        interleave(inner);
    }
}

impl InterleavingStore {
    pub fn new() -> Self {
        Self {
            inner: SledRecordStore::temporary().unwrap(),
            after_list_steps: Mutex::new(None),
            before_artefact_removal: Mutex::new(None),
            fail_running_updates: AtomicBool::new(false),
        }
    }

    /// Run `f` once, right after the next `list_steps` has read its rows
    pub fn after_list_steps(&self, f: impl FnOnce(&SledRecordStore) + Send + 'static) {
        *self.after_list_steps.lock().unwrap() = Some(Box::new(f));
    }

    /// Run `f` once, after the next conditional artefact removal has checked
    /// the row and before it swaps the row out
    pub fn before_artefact_removal(&self, f: impl FnOnce(&SledRecordStore) + Send + 'static) {
        *self.before_artefact_removal.lock().unwrap() = Some(Box::new(f));
    }

    /// Make every update of a RUNNING step fail with a backend error
    pub fn fail_running_step_updates(&self) {
        self.fail_running_updates.store(true, Ordering::SeqCst);
    }
}

impl RecordStore for InterleavingStore {
    fn save_pipeline(&self, pipeline: &Pipeline) -> Result<(), StoreError> {
        self.inner.save_pipeline(pipeline)
    }

    fn load_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>, StoreError> {
        self.inner.load_pipeline(id)
    }

    fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        self.inner.list_pipelines()
    }

    fn insert_run(&self, run: &PipelineRun) -> Result<(), StoreError> {
        self.inner.insert_run(run)
    }

    fn load_run(&self, id: Uuid) -> Result<Option<PipelineRun>, StoreError> {
        self.inner.load_run(id)
    }

    fn update_run(
        &self,
        id: Uuid,
        mutation: Mutation<'_, PipelineRun>,
    ) -> Result<UpdateOutcome<PipelineRun>, StoreError> {
        self.inner.update_run(id, mutation)
    }

    fn insert_step(&self, step: &StepRun) -> Result<(), StoreError> {
        self.inner.insert_step(step)
    }

    fn load_step(&self, run_id: Uuid, node_id: &str) -> Result<Option<StepRun>, StoreError> {
        self.inner.load_step(run_id, node_id)
    }

    fn list_steps(&self, run_id: Uuid) -> Result<Vec<StepRun>, StoreError> {
        let steps = self.inner.list_steps(run_id)?;
        fire(&self.after_list_steps, &self.inner);
        Ok(steps)
    }

    fn update_step(
        &self,
        run_id: Uuid,
        node_id: &str,
        mutation: Mutation<'_, StepRun>,
    ) -> Result<UpdateOutcome<StepRun>, StoreError> {
        if self.fail_running_updates.load(Ordering::SeqCst) {
            let running = matches!(
                self.inner.load_step(run_id, node_id)?,
                Some(step) if step.status == StepStatus::Running
            );
            if running {
                return Err(StoreError::Backend(sled::Error::Unsupported(format!(
                    "write to {}/{} refused",
                    run_id, node_id
                ))));
            }
        }
        self.inner.update_step(run_id, node_id, mutation)
    }

    fn record_output(&self, run_id: Uuid, node_id: &str, hash: &str) -> Result<(), StoreError> {
        self.inner.record_output(run_id, node_id, hash)
    }

    fn run_outputs(&self, run_id: Uuid) -> Result<BTreeMap<String, String>, StoreError> {
        self.inner.run_outputs(run_id)
    }

    fn insert_artefact(&self, meta: &ArtefactMeta) -> Result<bool, StoreError> {
        self.inner.insert_artefact(meta)
    }

    fn load_artefact(&self, hash: &str) -> Result<Option<ArtefactMeta>, StoreError> {
        self.inner.load_artefact(hash)
    }

    fn update_artefact(
        &self,
        hash: &str,
        mutation: Mutation<'_, ArtefactMeta>,
    ) -> Result<UpdateOutcome<ArtefactMeta>, StoreError> {
        self.inner.update_artefact(hash, mutation)
    }

    fn remove_artefact(&self, hash: &str) -> Result<bool, StoreError> {
        self.inner.remove_artefact(hash)
    }

    fn remove_artefact_if(
        &self,
        hash: &str,
        predicate: &dyn Fn(&ArtefactMeta) -> bool,
    ) -> Result<bool, StoreError> {
        self.inner.remove_artefact_if(hash, &|meta: &ArtefactMeta| {
            let accepted = predicate(meta);
            fire(&self.before_artefact_removal, &self.inner);
            accepted
        })
    }

    fn list_artefacts(&self) -> Result<Vec<ArtefactMeta>, StoreError> {
        self.inner.list_artefacts()
    }
}
