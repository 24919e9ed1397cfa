//! The group tree and its routing operations.

use std::collections::{BTreeMap, BTreeSet};

use canopy_types::GroupId;

use crate::error::{Result, TopologyError};

/// An immutable rooted tree of replication groups.
///
/// Edges are directed parent→child: a request can only be forwarded *down*
/// the tree, which is why clients enter at the lowest common ancestor of
/// their target set. The tree is validated at construction and never changes
/// for the lifetime of the process.
///
/// # Thread Safety
///
/// `Topology` is immutable after construction and is typically wrapped in an
/// `Arc` and shared between the handler and any number of clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// The unique parentless group.
    root: GroupId,
    /// Direct children per group; leaves map to empty sets.
    children: BTreeMap<GroupId, BTreeSet<GroupId>>,
    /// Parent per non-root group.
    parents: BTreeMap<GroupId, GroupId>,
}

impl Topology {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Builds a topology from `(group, children)` declarations.
    ///
    /// Groups that only appear as children need no declaration of their own.
    ///
    /// # Errors
    ///
    /// Rejects anything that is not a single rooted tree: a group listing
    /// itself or an ancestor as a child, a group with two parents, duplicate
    /// declarations, multiple roots, groups unreachable from the root, and
    /// empty input.
    pub fn build(
        declarations: impl IntoIterator<Item = (GroupId, Vec<GroupId>)>,
    ) -> Result<Self> {
        let mut children: BTreeMap<GroupId, BTreeSet<GroupId>> = BTreeMap::new();
        let mut parents: BTreeMap<GroupId, GroupId> = BTreeMap::new();
        let mut declared: BTreeSet<GroupId> = BTreeSet::new();

        for (group, listed) in declarations {
            if !declared.insert(group) {
                return Err(TopologyError::DuplicateDeclaration(group));
            }
            let mut set = children.remove(&group).unwrap_or_default();
            for child in listed {
                if child == group {
                    return Err(TopologyError::SelfChild(group));
                }
                if !set.insert(child) {
                    return Err(TopologyError::DuplicateChild {
                        parent: group,
                        child,
                    });
                }
                if let Some(first) = parents.insert(child, group) {
                    return Err(TopologyError::TwoParents {
                        child,
                        first,
                        second: group,
                    });
                }
                children.entry(child).or_default();
            }
            children.insert(group, set);
        }

        if children.is_empty() {
            return Err(TopologyError::Empty);
        }

        // A node listing an ancestor as a child either gives that ancestor a
        // second parent (caught above) or leaves no parentless node at all.
        let mut roots = children.keys().filter(|g| !parents.contains_key(g));
        let root = *roots.next().ok_or(TopologyError::MissingRoot)?;
        if let Some(extra) = roots.next() {
            return Err(TopologyError::MultipleRoots(root, *extra));
        }

        // Every group must sit in the root's subtree; a stray group here
        // means a disconnected cycle survived the parent checks.
        let mut seen: BTreeSet<GroupId> = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(group) = stack.pop() {
            if seen.insert(group) {
                if let Some(kids) = children.get(&group) {
                    stack.extend(kids.iter().copied());
                }
            }
        }
        if let Some(stray) = children.keys().copied().find(|group| !seen.contains(group)) {
            return Err(TopologyError::Unreachable(stray));
        }

        Ok(Self {
            root,
            children,
            parents,
        })
    }

    // ========================================================================
    // Shape queries
    // ========================================================================

    /// The root group (the unique parentless node).
    pub fn root(&self) -> GroupId {
        self.root
    }

    /// Number of groups in the tree.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if the group is part of the topology.
    pub fn contains(&self, group: GroupId) -> bool {
        self.children.contains_key(&group)
    }

    /// Iterates over every group in ascending ID order.
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.children.keys().copied()
    }

    /// Direct children of a group.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownGroup`] if the group is not in the
    /// tree.
    pub fn children_of(&self, group: GroupId) -> Result<&BTreeSet<GroupId>> {
        self.children
            .get(&group)
            .ok_or(TopologyError::UnknownGroup(group))
    }

    /// Parent of a group, or `None` for the root.
    pub fn parent_of(&self, group: GroupId) -> Option<GroupId> {
        self.parents.get(&group).copied()
    }

    /// Length of the longest root→leaf path, counted in nodes.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((group, depth)) = stack.pop() {
            max = max.max(depth);
            if let Some(kids) = self.children.get(&group) {
                stack.extend(kids.iter().map(|&child| (child, depth + 1)));
            }
        }
        max
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// The unique downward path from `from` to `to`, inclusive on both ends.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownGroup`] if either endpoint is not in
    /// the tree, and [`TopologyError::NoPath`] if `to == from` or `to` is not
    /// in `from`'s subtree (paths never ascend).
    pub fn find_path(&self, from: GroupId, to: GroupId) -> Result<Vec<GroupId>> {
        if !self.contains(from) {
            return Err(TopologyError::UnknownGroup(from));
        }
        if !self.contains(to) {
            return Err(TopologyError::UnknownGroup(to));
        }
        if from == to {
            return Err(TopologyError::NoPath { from, to });
        }

        // Walk parent links from the target back up; cheaper than a
        // downward search and the path is unique anyway.
        let mut path = vec![to];
        let mut cursor = to;
        while cursor != from {
            match self.parents.get(&cursor) {
                Some(&parent) => {
                    path.push(parent);
                    cursor = parent;
                }
                None => return Err(TopologyError::NoPath { from, to }),
            }
        }
        path.reverse();
        Ok(path)
    }

    /// The immediate child of `from` on the path to `to`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`find_path`](Self::find_path).
    pub fn next_hop(&self, from: GroupId, to: GroupId) -> Result<GroupId> {
        let path = self.find_path(from, to)?;
        path.get(1)
            .copied()
            .ok_or(TopologyError::NoPath { from, to })
    }

    /// Buckets `targets` by their next hop from `from`.
    ///
    /// This is the batching key for forwarding: all targets sharing a next
    /// hop travel together in one forwarded batch. Bucket order is ascending
    /// by hop; within a bucket, targets keep their input order.
    ///
    /// # Errors
    ///
    /// Fails on the first target that equals `from` or is unreachable from
    /// it, with the same errors as [`find_path`](Self::find_path).
    pub fn route_targets(
        &self,
        from: GroupId,
        targets: &[GroupId],
    ) -> Result<BTreeMap<GroupId, Vec<GroupId>>> {
        let mut routes: BTreeMap<GroupId, Vec<GroupId>> = BTreeMap::new();
        for &target in targets {
            let hop = self.next_hop(from, target)?;
            routes.entry(hop).or_default().push(target);
        }
        Ok(routes)
    }

    /// The deepest group whose subtree contains every target.
    ///
    /// Clients submit to this group so that all targets are reachable by
    /// descent. A single target is its own LCA.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::NoTargets`] for an empty list and
    /// [`TopologyError::UnknownGroup`] for a target outside the tree.
    pub fn lowest_common_ancestor(&self, targets: &[GroupId]) -> Result<GroupId> {
        if targets.is_empty() {
            return Err(TopologyError::NoTargets);
        }
        let wanted: BTreeSet<GroupId> = targets.iter().copied().collect();
        for &target in &wanted {
            if !self.contains(target) {
                return Err(TopologyError::UnknownGroup(target));
            }
        }

        let mut found = None;
        self.count_targets(self.root, &wanted, wanted.len(), &mut found);
        // The root's subtree holds every group, so it is always a fallback.
        Ok(found.unwrap_or(self.root))
    }

    /// Post-order count of targets per subtree; the first (deepest) node
    /// covering all of them is recorded in `found`.
    fn count_targets(
        &self,
        node: GroupId,
        wanted: &BTreeSet<GroupId>,
        total: usize,
        found: &mut Option<GroupId>,
    ) -> usize {
        let mut hits = usize::from(wanted.contains(&node));
        if let Some(kids) = self.children.get(&node) {
            for &child in kids {
                hits += self.count_targets(child, wanted, total, found);
                if found.is_some() {
                    return hits;
                }
            }
        }
        if found.is_none() && hits == total {
            *found = Some(node);
        }
        hits
    }
}
