// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! Messages are organized by subsystem:
//!
//! * `artefact` - blob storage, dedup, reference counting and sweeps
//! * `engine` - run and step lifecycle, layer dispatch, retries
//! * `feature` - catalog publishing, registry and feature invocation
//! * `sandbox` - child process staging, exit and timeout
//! * `validation` - graph validation findings

use tracing::Span;

pub mod artefact;
pub mod engine;
pub mod feature;
pub mod sandbox;
pub mod validation;

/// Emit a message as a structured tracing event, or open a span carrying
/// its fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
