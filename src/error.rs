//! Rich diagnostic error types for the gedgraph engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! so every failure carries a stable error code and a hint on how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for gedgraph.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum GedError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("node not found: {xref}")]
    #[diagnostic(
        code(gedgraph::graph::node_not_found),
        help(
            "No node in the graph carries this XREF. Check the spelling \
             (XREFs usually look like `@I12@`) or add the node first."
        )
    )]
    NodeNotFound { xref: String },

    #[error("individual not found: {xref}")]
    #[diagnostic(
        code(gedgraph::graph::individual_not_found),
        help("The XREF does not resolve to an individual node in the graph.")
    )]
    IndividualNotFound { xref: String },

    #[error("family not found: {xref}")]
    #[diagnostic(
        code(gedgraph::graph::family_not_found),
        help("The XREF does not resolve to a family node in the graph.")
    )]
    FamilyNotFound { xref: String },

    #[error("edge not found: {edge_id}")]
    #[diagnostic(
        code(gedgraph::graph::edge_not_found),
        help(
            "No edge with this ID exists. Edge IDs are built from the \
             endpoints and the edge type, e.g. `@F1@_HUSB_@I1@`."
        )
    )]
    EdgeNotFound { edge_id: String },

    #[error("duplicate node: {xref}")]
    #[diagnostic(
        code(gedgraph::graph::duplicate_node),
        help("A node with this XREF already exists. Remove it first or use a different XREF.")
    )]
    DuplicateNode { xref: String },

    #[error("duplicate edge: {edge_id}")]
    #[diagnostic(
        code(gedgraph::graph::duplicate_edge),
        help("An edge with this ID already exists. The mutation was rejected and the graph is unchanged.")
    )]
    DuplicateEdge { edge_id: String },

    #[error("invalid node: {message}")]
    #[diagnostic(
        code(gedgraph::graph::invalid_node),
        help("Nodes need a non-empty XREF.")
    )]
    InvalidNode { message: String },

    #[error("invalid edge: {message}")]
    #[diagnostic(
        code(gedgraph::graph::invalid_edge),
        help(
            "Edges need a non-empty ID and both endpoints must already exist \
             in the graph. A family back-reference must point at a family node."
        )
    )]
    InvalidEdge { message: String },

    #[error("internal ID space exhausted after {allocated} allocations")]
    #[diagnostic(
        code(gedgraph::graph::id_exhausted),
        help("The 32-bit ID space is full. Split the document into smaller graphs.")
    )]
    IdSpaceExhausted { allocated: u32 },
}

impl GraphError {
    /// Short, stable kind label used for metrics bucketing.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NodeNotFound { .. }
            | Self::IndividualNotFound { .. }
            | Self::FamilyNotFound { .. }
            | Self::EdgeNotFound { .. } => "not_found",
            Self::DuplicateNode { .. } | Self::DuplicateEdge { .. } => "duplicate",
            Self::InvalidNode { .. } | Self::InvalidEdge { .. } => "invalid_input",
            Self::IdSpaceExhausted { .. } => "exhausted",
        }
    }

    /// Whether this error means "the thing you asked for is not there".
    pub fn is_not_found(&self) -> bool {
        self.kind() == "not_found"
    }
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    #[error("{kind} record {xref} no longer resolves in the source tree")]
    #[diagnostic(
        code(gedgraph::snapshot::unresolved_record),
        help(
            "Snapshots store XREFs, not record payloads. Load the snapshot \
             against the same tree it was taken from."
        )
    )]
    UnresolvedRecord { kind: String, xref: String },

    #[error("snapshot references unknown internal id {id}")]
    #[diagnostic(
        code(gedgraph::snapshot::dangling_id),
        help("The snapshot is internally inconsistent: an edge points at a node that was not saved.")
    )]
    DanglingId { id: u32 },

    #[error("failed to encode snapshot: {message}")]
    #[diagnostic(code(gedgraph::snapshot::encode))]
    Encode { message: String },

    #[error("failed to decode snapshot: {message}")]
    #[diagnostic(
        code(gedgraph::snapshot::decode),
        help("The file may be truncated or written by an incompatible version.")
    )]
    Decode { message: String },

    #[error("snapshot I/O error: {source}")]
    #[diagnostic(code(gedgraph::snapshot::io))]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to parse configuration: {message}")]
    #[diagnostic(
        code(gedgraph::config::parse),
        help("The configuration must be valid TOML. Unknown keys are rejected.")
    )]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(gedgraph::config::invalid))]
    Invalid { message: String },

    #[error("cannot read configuration file: {source}")]
    #[diagnostic(code(gedgraph::config::io))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Tree errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("failed to parse tree document: {message}")]
    #[diagnostic(
        code(gedgraph::tree::parse),
        help("Tree documents are JSON objects with `individuals`, `families`, `notes`, `sources` and `repositories` arrays.")
    )]
    Parse { message: String },

    #[error("cannot read tree document: {source}")]
    #[diagnostic(code(gedgraph::tree::io))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for gedgraph operations.
pub type GedResult<T> = std::result::Result<T, GedError>;
