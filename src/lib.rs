// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // feature implementations (local + command)
pub mod config;        // config + runtime wiring
pub mod engine;        // run orchestration and job queue
pub mod errors;        // error handling
pub mod features;      // packaging, catalog, registry
pub mod model;         // pipeline, run, step and artefact records
pub mod observability;
pub mod pipeline;      // graph model, validation, scheduling
pub mod sandbox;       // child-process isolation
pub mod storage;       // record store + artefact store
pub mod traits;        // unified abstractions
pub mod utils;
