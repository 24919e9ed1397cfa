//! canopy-topology: Group tree model and routing for `Canopy`
//!
//! Groups form a static rooted tree. Requests descend the tree along
//! parent→child edges, so routing is entirely determined by the shape of the
//! tree:
//! - [`Topology::next_hop`] picks the child to forward through on the way to
//!   a target group.
//! - [`Topology::route_targets`] buckets a request's targets by next hop —
//!   the batching key for forwarded batches.
//! - [`Topology::lowest_common_ancestor`] picks the entry group a client
//!   should submit to so that every target is reachable by descent.
//!
//! The tree is immutable after loading; [`loader`] builds it from a JSON
//! description and rejects anything that is not a single rooted tree.
//!
//! # Example
//!
//! ```
//! use canopy_topology::Topology;
//! use canopy_types::GroupId;
//!
//! // 0 → {1, 2}, 1 → {3}
//! let topology = Topology::build([
//!     (GroupId::new(0), vec![GroupId::new(1), GroupId::new(2)]),
//!     (GroupId::new(1), vec![GroupId::new(3)]),
//! ])
//! .unwrap();
//!
//! let hop = topology.next_hop(GroupId::new(0), GroupId::new(3)).unwrap();
//! assert_eq!(hop, GroupId::new(1));
//!
//! let entry = topology
//!     .lowest_common_ancestor(&[GroupId::new(3), GroupId::new(1)])
//!     .unwrap();
//! assert_eq!(entry, GroupId::new(1));
//! ```

pub mod error;
pub mod loader;
mod tree;

pub use error::{Result, TopologyError};
pub use loader::{GroupDecl, from_file, from_json};
pub use tree::Topology;
