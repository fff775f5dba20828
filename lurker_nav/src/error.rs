// Error taxonomy for the navigation core.
//
// Loader and config errors are fatal at startup: a graph that fails to parse
// leaves the creature with nowhere to go, so there is no partial recovery.
// Runtime errors (`EmptyIndex`, `InvalidEndpoint`) are programming errors and
// are surfaced rather than papered over.

use crate::types::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// A graph line is malformed: too few fields or an unparsable number.
    #[error("graph line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// The graph text parsed but violates a structural invariant
    /// (index/array-position mismatch, dangling connection).
    #[error("graph inconsistency: {0}")]
    Consistency(String),

    /// Nearest-neighbor query against an index built from zero nodes.
    #[error("spatial index is empty")]
    EmptyIndex,

    /// A node id used as a subscript is outside the graph.
    #[error("node {node} is outside the graph ({node_count} nodes)")]
    InvalidEndpoint { node: NodeId, node_count: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Config text that is not valid JSON for `NavConfig`.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// Config that parsed but holds values the navigator cannot run with.
    #[error("invalid config value: {0}")]
    InvalidConfig(String),
}

pub type NavResult<T> = Result<T, NavError>;
