// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use super::records::{Mutation, RecordStore, UpdateOutcome};
use crate::errors::StoreError;
use crate::model::{ArtefactMeta, Pipeline, PipelineRun, StepRun};

const PIPELINES_TREE: &str = "pipelines";
const RUNS_TREE: &str = "runs";
const STEPS_TREE: &str = "steps";
const RUN_OUTPUTS_TREE: &str = "run_outputs";
const ARTEFACTS_TREE: &str = "artefacts";

/// Record store on an embedded sled database, one tree per record kind.
///
/// Steps and run outputs are keyed `<run_id>/<node_id>` so that a run's
/// rows can be scanned by prefix and each row updated on its own.
#[derive(Clone)]
pub struct SledRecordStore {
    db: sled::Db,
    pipelines: sled::Tree,
    runs: sled::Tree,
    steps: sled::Tree,
    run_outputs: sled::Tree,
    artefacts: sled::Tree,
}

fn run_key(run_id: Uuid) -> String {
    run_id.to_string()
}

fn step_key(run_id: Uuid, node_id: &str) -> String {
    format!("{}/{}", run_id, node_id)
}

fn run_prefix(run_id: Uuid) -> String {
    format!("{}/", run_id)
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(record)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Insert only when the key is absent.
fn insert_new<T: Serialize>(tree: &sled::Tree, key: &str, record: &T) -> Result<bool, StoreError> {
    let swapped = tree.compare_and_swap(key, None::<&[u8]>, Some(encode(record)?))?;
    Ok(swapped.is_ok())
}

/// Read-modify-write under compare-and-swap, retrying when another writer
/// changed the record in between.
fn cas_update<T>(
    tree: &sled::Tree,
    key: &str,
    mutation: Mutation<'_, T>,
) -> Result<UpdateOutcome<T>, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    loop {
        let Some(current) = tree.get(key)? else {
            return Ok(UpdateOutcome::Missing);
        };
        let mut record: T = decode(&current)?;
        if !mutation(&mut record) {
            return Ok(UpdateOutcome::Rejected(record));
        }
        let updated = encode(&record)?;
        if tree
            .compare_and_swap(key, Some(&current), Some(updated))?
            .is_ok()
        {
            return Ok(UpdateOutcome::Applied(record));
        }
    }
}

impl SledRecordStore {
    /// Open (or create) a database directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// Database deleted when dropped; used in tests.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            pipelines: db.open_tree(PIPELINES_TREE)?,
            runs: db.open_tree(RUNS_TREE)?,
            steps: db.open_tree(STEPS_TREE)?,
            run_outputs: db.open_tree(RUN_OUTPUTS_TREE)?,
            artefacts: db.open_tree(ARTEFACTS_TREE)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    fn save_pipeline(&self, pipeline: &Pipeline) -> Result<(), StoreError> {
        self.pipelines
            .insert(pipeline.id.to_string(), encode(pipeline)?)?;
        Ok(())
    }

    fn load_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>, StoreError> {
        self.pipelines
            .get(id.to_string())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        self.pipelines
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    fn insert_run(&self, run: &PipelineRun) -> Result<(), StoreError> {
        let key = run_key(run.id);
        if insert_new(&self.runs, &key, run)? {
            Ok(())
        } else {
            Err(StoreError::Duplicate { key })
        }
    }

    fn load_run(&self, id: Uuid) -> Result<Option<PipelineRun>, StoreError> {
        let Some(bytes) = self.runs.get(run_key(id))? else {
            return Ok(None);
        };
        let mut run: PipelineRun = decode(&bytes)?;
        run.output_artefacts = self.run_outputs(id)?;
        Ok(Some(run))
    }

    fn update_run(
        &self,
        id: Uuid,
        mutation: Mutation<'_, PipelineRun>,
    ) -> Result<UpdateOutcome<PipelineRun>, StoreError> {
        cas_update(&self.runs, &run_key(id), mutation)
    }

    fn insert_step(&self, step: &StepRun) -> Result<(), StoreError> {
        let key = step_key(step.run_id, &step.node_id);
        if insert_new(&self.steps, &key, step)? {
            Ok(())
        } else {
            Err(StoreError::Duplicate { key })
        }
    }

    fn load_step(&self, run_id: Uuid, node_id: &str) -> Result<Option<StepRun>, StoreError> {
        self.steps
            .get(step_key(run_id, node_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn list_steps(&self, run_id: Uuid) -> Result<Vec<StepRun>, StoreError> {
        self.steps
            .scan_prefix(run_prefix(run_id))
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    fn update_step(
        &self,
        run_id: Uuid,
        node_id: &str,
        mutation: Mutation<'_, StepRun>,
    ) -> Result<UpdateOutcome<StepRun>, StoreError> {
        cas_update(&self.steps, &step_key(run_id, node_id), mutation)
    }

    fn record_output(&self, run_id: Uuid, node_id: &str, hash: &str) -> Result<(), StoreError> {
        self.run_outputs
            .insert(step_key(run_id, node_id), hash.as_bytes())?;
        Ok(())
    }

    fn run_outputs(&self, run_id: Uuid) -> Result<BTreeMap<String, String>, StoreError> {
        let prefix = run_prefix(run_id);
        let mut outputs = BTreeMap::new();
        for entry in self.run_outputs.scan_prefix(&prefix) {
            let (key, value) = entry?;
            let node_id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            outputs.insert(node_id, String::from_utf8_lossy(&value).into_owned());
        }
        Ok(outputs)
    }

    fn insert_artefact(&self, meta: &ArtefactMeta) -> Result<bool, StoreError> {
        insert_new(&self.artefacts, &meta.hash, meta)
    }

    fn load_artefact(&self, hash: &str) -> Result<Option<ArtefactMeta>, StoreError> {
        self.artefacts
            .get(hash)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn update_artefact(
        &self,
        hash: &str,
        mutation: Mutation<'_, ArtefactMeta>,
    ) -> Result<UpdateOutcome<ArtefactMeta>, StoreError> {
        cas_update(&self.artefacts, hash, mutation)
    }

    fn remove_artefact(&self, hash: &str) -> Result<bool, StoreError> {
        Ok(self.artefacts.remove(hash)?.is_some())
    }

    fn remove_artefact_if(
        &self,
        hash: &str,
        predicate: &dyn Fn(&ArtefactMeta) -> bool,
    ) -> Result<bool, StoreError> {
        loop {
            let Some(current) = self.artefacts.get(hash)? else {
                return Ok(false);
            };
            let meta: ArtefactMeta = decode(&current)?;
            if !predicate(&meta) {
                return Ok(false);
            }
            if self
                .artefacts
                .compare_and_swap(hash, Some(&current), None::<&[u8]>)?
                .is_ok()
            {
                return Ok(true);
            }
        }
    }

    fn list_artefacts(&self) -> Result<Vec<ArtefactMeta>, StoreError> {
        self.artefacts
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }
}
