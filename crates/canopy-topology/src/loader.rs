//! Topology loading from JSON descriptions.
//!
//! Two interchangeable formats are accepted:
//!
//! - A list of group declarations:
//!   `[{"groupId": 0, "children": [1, 2]}, {"groupId": 1, "children": [3]}]`
//!   (the field names `groupID` and `associatedGroups` are accepted as
//!   aliases for compatibility with older deployments).
//! - An index-positional adjacency list, where element *i* holds the
//!   children of group *i*: `[[1, 2], [3], [], []]`.
//!
//! Both go through the same [`Topology::build`] validation, so a description
//! implying anything other than a single rooted tree is rejected.

use std::fs;
use std::path::Path;

use canopy_types::GroupId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::tree::Topology;

/// One group's declaration in the object format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDecl {
    #[serde(rename = "groupId", alias = "groupID")]
    pub group_id: u64,
    #[serde(rename = "children", alias = "associatedGroups")]
    pub children: Vec<u64>,
}

/// The two accepted file shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Declarations(Vec<GroupDecl>),
    Adjacency(Vec<Vec<u64>>),
}

/// Parses a topology from a JSON string.
///
/// # Errors
///
/// Returns [`TopologyError::Parse`] if the text matches neither format, and
/// any [`Topology::build`] validation error for a malformed tree.
pub fn from_json(text: &str) -> Result<Topology> {
    let description: Description = serde_json::from_str(text)?;
    let declarations: Vec<(GroupId, Vec<GroupId>)> = match description {
        Description::Declarations(groups) => groups
            .into_iter()
            .map(|decl| {
                (
                    GroupId::new(decl.group_id),
                    decl.children.into_iter().map(GroupId::new).collect(),
                )
            })
            .collect(),
        Description::Adjacency(rows) => rows
            .into_iter()
            .enumerate()
            .map(|(index, children)| {
                (
                    GroupId::new(index as u64),
                    children.into_iter().map(GroupId::new).collect(),
                )
            })
            .collect(),
    };
    Topology::build(declarations)
}

/// Loads and parses a topology file.
///
/// # Errors
///
/// Returns [`TopologyError::Io`] if the file cannot be read, plus everything
/// [`from_json`] can return.
pub fn from_file(path: impl AsRef<Path>) -> Result<Topology> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| TopologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let topology = from_json(&text)?;
    debug!(
        path = %path.display(),
        groups = topology.len(),
        root = %topology.root(),
        "topology loaded"
    );
    Ok(topology)
}
