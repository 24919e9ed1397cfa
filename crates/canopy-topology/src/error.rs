//! Error types for topology construction and routing.

use std::path::PathBuf;

use canopy_types::GroupId;
use thiserror::Error;

/// Topology construction and routing errors.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// The group is not part of the topology.
    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),

    /// No downward path exists between the two groups.
    #[error("no path from group {from} to group {to}")]
    NoPath { from: GroupId, to: GroupId },

    /// An LCA query was made with an empty target list.
    #[error("target list is empty")]
    NoTargets,

    /// A group listed itself as its own child.
    #[error("group {0} lists itself as a child")]
    SelfChild(GroupId),

    /// A group was claimed as a child by two different parents.
    #[error("group {child} has two parents: {first} and {second}")]
    TwoParents {
        child: GroupId,
        first: GroupId,
        second: GroupId,
    },

    /// The same child appeared twice under one parent.
    #[error("group {parent} lists child {child} twice")]
    DuplicateChild { parent: GroupId, child: GroupId },

    /// A group's children were declared in more than one entry.
    #[error("group {0} is declared more than once")]
    DuplicateDeclaration(GroupId),

    /// Every group has a parent, so the declarations close a cycle.
    #[error("no root group: the declarations form a cycle")]
    MissingRoot,

    /// More than one group has no parent.
    #[error("multiple root groups: {0} and {1}")]
    MultipleRoots(GroupId, GroupId),

    /// A group is not reachable from the root.
    #[error("group {0} is not reachable from the root")]
    Unreachable(GroupId),

    /// The description contained no groups at all.
    #[error("topology is empty")]
    Empty,

    /// Reading a topology file failed.
    #[error("failed to read topology file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Parsing a topology file failed.
    #[error("failed to parse topology description: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;
