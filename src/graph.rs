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

//! The per-worker graph store.
//!
//! Every worker owns a disjoint subset of the vertices. A vertex is known
//! globally by a stable [`GlobalId`] and locally by its dense index into the
//! worker's vertex array. Each vertex carries its outgoing edges (with
//! capacity and the current flow) and, as reverse references, its incoming
//! edges. The flow on edge `(u,v)` is authoritative on `u`'s worker; the
//! in-edge stored on `v`'s worker has no flow of its own.

use crate::partition::OwnerMap;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

/// Stable vertex identifier, unique across all workers.
pub type GlobalId = u64;

/// Identifier of a worker in the ring.
pub type WorkerId = usize;

/// Sentinel for "no local index": the vertex lives on another worker.
pub const NO_INDEX: usize = usize::MAX;

/// A directed edge stored on the worker of its source vertex.
pub struct OutEdge {
    /// Global id of the destination vertex.
    pub dest: GlobalId,
    /// Worker owning the destination vertex.
    pub worker: WorkerId,
    /// Local index of the destination, or [`NO_INDEX`] if it is remote.
    pub dest_index: usize,
    /// Capacity of the edge, immutable after loading.
    pub capacity: i32,
    /// Current flow on the edge.
    ///
    /// Read concurrently during the labeling step, mutated only during
    /// back-tracking.
    pub flow: AtomicI32,
}

impl OutEdge {
    pub fn new(dest: GlobalId, capacity: i32) -> Self {
        OutEdge {
            dest,
            worker: 0,
            dest_index: NO_INDEX,
            capacity,
            flow: AtomicI32::new(0),
        }
    }

    /// Residual capacity left on this edge.
    pub fn slack(&self) -> i32 {
        self.capacity - self.flow.load(Ordering::Relaxed)
    }
}

/// Reverse reference to an edge, stored on the worker of the edge's
/// destination vertex.
pub struct InEdge {
    /// Global id of the source vertex of the referenced edge.
    pub src: GlobalId,
    /// Worker owning the source vertex (and hence the flow).
    pub worker: WorkerId,
    /// Local index of the source, or [`NO_INDEX`] if it is remote.
    pub src_index: usize,
}

impl InEdge {
    pub fn new(src: GlobalId) -> Self {
        InEdge {
            src,
            worker: 0,
            src_index: NO_INDEX,
        }
    }
}

/// A vertex together with its incident edge lists.
pub struct Vertex {
    /// The global id.
    pub id: GlobalId,
    /// Outgoing edges; the flow on them is owned here.
    pub out_edges: Vec<OutEdge>,
    /// Reverse references to edges ending here.
    pub in_edges: Vec<InEdge>,
}

impl Vertex {
    pub fn new(id: GlobalId) -> Self {
        Vertex {
            id,
            out_edges: vec![],
            in_edges: vec![],
        }
    }
}

/// The vertices owned by one worker, with an O(1) global-to-local map.
///
/// The store exclusively owns its vertex and edge arrays. After
/// [`relink`](GraphStore::relink) the edge owner fields and co-located local
/// indices are immutable; the only mutation left is the flow on out-edges.
pub struct GraphStore {
    vertices: Vec<Vertex>,
    index: HashMap<GlobalId, usize>,
}

impl GraphStore {
    /// Create a store over the given local vertices.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        let index = vertices.iter().enumerate().map(|(i, v)| (v.id, i)).collect();
        GraphStore { vertices, index }
    }

    /// Number of local vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Map a global id to the local index, if the vertex lives here.
    pub fn lookup(&self, id: GlobalId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The vertex at a local index.
    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }

    /// All local vertices in local-index order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Rewrite the owner field of every edge from the owner table and
    /// resolve the local index of co-located endpoints.
    ///
    /// Called once on every worker after migration, before any thread runs.
    pub fn relink(&mut self, rank: WorkerId, owner: &OwnerMap) {
        let index = &self.index;
        for v in &mut self.vertices {
            for e in &mut v.out_edges {
                e.worker = owner.owner(e.dest);
                e.dest_index = if e.worker == rank {
                    index[&e.dest]
                } else {
                    NO_INDEX
                };
            }
            for e in &mut v.in_edges {
                e.worker = owner.owner(e.src);
                e.src_index = if e.worker == rank { index[&e.src] } else { NO_INDEX };
            }
        }
    }

    /// The flow on the out-edge of `index` leading to `dest`, if any.
    pub fn out_flow(&self, index: usize, dest: GlobalId) -> Option<i32> {
        self.vertices[index]
            .out_edges
            .iter()
            .find(|e| e.dest == dest)
            .map(|e| e.flow.load(Ordering::Relaxed))
    }

    /// Add `delta` to the flow on the out-edge of `index` leading to `dest`.
    ///
    /// Returns `false` without touching anything if no such out-edge exists.
    /// That case is legitimate: back-track messages are addressed to the next
    /// hop, which may be either endpoint of the conceptual edge, and only the
    /// source-side worker stores the flow.
    pub fn add_flow(&self, index: usize, dest: GlobalId, delta: i32) -> bool {
        let mut found = false;
        for e in &self.vertices[index].out_edges {
            if e.dest == dest {
                e.flow.fetch_add(delta, Ordering::Relaxed);
                found = true;
            }
        }
        found
    }

    /// Sum of the flows on all out-edges of a vertex.
    pub fn out_flow_sum(&self, index: usize) -> i32 {
        self.vertices[index]
            .out_edges
            .iter()
            .map(|e| e.flow.load(Ordering::Relaxed))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::OwnerMap;

    fn two_vertex_store() -> GraphStore {
        let mut u = Vertex::new(7);
        u.out_edges.push(OutEdge::new(9, 5));
        let mut v = Vertex::new(9);
        v.in_edges.push(InEdge::new(7));
        GraphStore::new(vec![u, v])
    }

    #[test]
    fn lookup_is_local_only() {
        let g = two_vertex_store();
        assert_eq!(g.lookup(7), Some(0));
        assert_eq!(g.lookup(9), Some(1));
        assert_eq!(g.lookup(8), None);
    }

    #[test]
    fn add_flow_matches_by_destination() {
        let g = two_vertex_store();
        assert!(g.add_flow(0, 9, 3));
        assert_eq!(g.out_flow(0, 9), Some(3));
        assert!(g.add_flow(0, 9, -2));
        assert_eq!(g.out_flow(0, 9), Some(1));
        assert_eq!(g.out_flow_sum(0), 1);
    }

    #[test]
    fn add_flow_is_a_noop_on_the_destination_side() {
        let g = two_vertex_store();
        // vertex 9 has no out-edge, only the reverse reference
        assert!(!g.add_flow(1, 7, 4));
        assert_eq!(g.out_flow(1, 7), None);
    }

    #[test]
    fn relink_resolves_colocated_indices() {
        let mut g = two_vertex_store();
        let owner = OwnerMap::new(vec![0; 10]);
        g.relink(0, &owner);
        assert_eq!(g.vertex(0).out_edges[0].worker, 0);
        assert_eq!(g.vertex(0).out_edges[0].dest_index, 1);
        assert_eq!(g.vertex(1).in_edges[0].src_index, 0);

        // move vertex 7 to another worker: 9's reverse reference goes remote
        let mut owners = vec![0; 10];
        owners[7] = 1;
        let owner = OwnerMap::new(owners);
        g.relink(0, &owner);
        assert_eq!(g.vertex(1).in_edges[0].worker, 1);
        assert_eq!(g.vertex(1).in_edges[0].src_index, NO_INDEX);
    }
}
