// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational logging goes through message types in
//! [`messages`]. Each message is a plain struct with a `Display`
//! implementation and a [`messages::StructuredLog`] implementation that
//! emits it at the right level with its fields attached. Call sites never
//! format log strings themselves.
//!
//! # Usage
//!
//! ```rust
//! use featurepipe::observability::messages::{artefact::ArtefactStored, StructuredLog};
//!
//! let msg = ArtefactStored {
//!     hash: "ab12",
//!     raw_size: 2048,
//!     compressed_size: 310,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
