// Copyright (c) 2019-2024 The ringflow developers
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see  <http://www.gnu.org/licenses/>
//

//! Assigning vertices to workers.
//!
//! The partitioning step itself is pluggable: a [`Partitioner`] maps every
//! vertex to its owning worker, the role an external graph partitioner plays
//! in a multi-node deployment. The engine only ever consumes the resulting
//! [`OwnerMap`] (immutable, shared freely) and the per-worker vertex sets
//! produced by [`migrate`].
//!
//! [`BlockPartitioner`] is the bundled implementation: contiguous id ranges
//! of nearly equal size. It is deterministic, which the protocol tests rely
//! on; anything smarter (edge-cut minimizing, weighted) plugs in through the
//! trait without touching the engine.

use crate::graph::{GlobalId, Vertex, WorkerId};

/// Authoritative owner of every global id.
///
/// Built once by the partitioner, then broadcast to (shared with) all
/// workers; immutable afterwards.
pub struct OwnerMap {
    owners: Vec<WorkerId>,
}

impl OwnerMap {
    pub fn new(owners: Vec<WorkerId>) -> Self {
        OwnerMap { owners }
    }

    /// The worker owning a global id.
    pub fn owner(&self, id: GlobalId) -> WorkerId {
        self.owners[id as usize]
    }

    /// Number of vertices covered by the map.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// The seam to the external graph-partitioning step.
pub trait Partitioner {
    /// Assign an owning worker in `0..workers` to every vertex.
    ///
    /// Called on worker 0 with the fully loaded vertex set, before any
    /// engine thread runs.
    fn assign(&self, vertices: &[Vertex], workers: usize) -> Vec<WorkerId>;
}

/// Contiguous block partitioning: vertex ids are split into `workers`
/// nearly equal ranges.
pub struct BlockPartitioner;

impl Partitioner for BlockPartitioner {
    fn assign(&self, vertices: &[Vertex], workers: usize) -> Vec<WorkerId> {
        let n = vertices.len();
        (0..n).map(|i| i * workers / n.max(1)).collect()
    }
}

/// Split the loaded vertices into one set per worker.
///
/// This is the migration step: every vertex record travels to its owning
/// worker. Edge owner fields and co-located indices are still unresolved
/// afterwards; each worker fixes them up locally with
/// [`GraphStore::relink`](crate::graph::GraphStore::relink).
pub fn migrate(vertices: Vec<Vertex>, owner: &OwnerMap, workers: usize) -> Vec<Vec<Vertex>> {
    let mut parts: Vec<Vec<Vertex>> = (0..workers).map(|_| vec![]).collect();
    for v in vertices {
        parts[owner.owner(v.id)].push(v);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices(n: u64) -> Vec<Vertex> {
        (0..n).map(Vertex::new).collect()
    }

    #[test]
    fn block_partition_is_contiguous_and_balanced() {
        let owners = BlockPartitioner.assign(&vertices(7), 3);
        assert_eq!(owners.len(), 7);
        assert!(owners.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*owners.first().unwrap(), 0);
        assert_eq!(*owners.last().unwrap(), 2);
        for w in 0..3 {
            let share = owners.iter().filter(|&&o| o == w).count();
            assert!((2..=3).contains(&share), "worker {} owns {} vertices", w, share);
        }
    }

    #[test]
    fn more_workers_than_vertices_leaves_workers_empty() {
        let owners = BlockPartitioner.assign(&vertices(2), 4);
        assert!(owners.iter().all(|&o| o < 4));
        assert_eq!(owners.iter().collect::<std::collections::HashSet<_>>().len(), 2);
    }

    #[test]
    fn migrate_routes_every_vertex_to_its_owner() {
        let owner = OwnerMap::new(vec![1, 0, 1, 0]);
        let parts = migrate(vertices(4), &owner, 2);
        let ids: Vec<Vec<_>> = parts.iter().map(|p| p.iter().map(|v| v.id).collect()).collect();
        assert_eq!(ids, vec![vec![1, 3], vec![0, 2]]);
    }
}
