// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while ordering a graph for execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulingError {
    #[error("Graph contains a cycle: only {ordered} of {total} nodes could be ordered")]
    CycleDetected { ordered: usize, total: usize },

    #[error("Edge references unknown node '{node_id}'")]
    UnknownNode { node_id: String },
}
