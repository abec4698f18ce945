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

//! Running a whole worker ring inside one process.
//!
//! This is the glue between loading, partitioning and the engines: a loaded
//! instance is [partitioned](Cluster::partition) across the workers, then
//! [solved](Cluster::solve) by one OS thread per worker, each running an
//! [`Engine`] over a [`ChannelRing`] endpoint (and spawning the worker's own
//! thread group in turn). The maximum flow comes back from worker 0, the
//! final flow decomposition in the per-worker stores.
//!
//! # Example
//!
//! ```
//! use ringflow::adjacency;
//! use ringflow::cluster::Cluster;
//! use ringflow::BlockPartitioner;
//! use std::io::Cursor;
//!
//! let instance = adjacency::read(Cursor::new("4 4\n1 3 2 2\n3 2\n3 4\n")).unwrap();
//! let solution = Cluster::partition(instance, 2, &BlockPartitioner).solve(2);
//! assert_eq!(solution.value, 4);
//! ```

use crate::adjacency::Instance;
use crate::engine::Engine;
use crate::graph::{GlobalId, GraphStore, Vertex};
use crate::partition::{self, OwnerMap, Partitioner};
use crate::transport::{ChannelRing, Transport};

use std::sync::Arc;
use std::thread;

/// Result of a solve.
pub struct Solution {
    /// The maximum-flow value.
    pub value: i32,
    /// One store per worker, in ring order, with the final flow on every
    /// out-edge.
    pub stores: Vec<GraphStore>,
}

/// An instance partitioned across a ring of workers, ready to be solved.
pub struct Cluster {
    parts: Vec<Vec<Vertex>>,
    owner: Arc<OwnerMap>,
    source: GlobalId,
    sink: GlobalId,
}

impl Cluster {
    /// Partition an instance across `workers` workers.
    ///
    /// Vertex 0 is the source and vertex N−1 the sink, as fixed by the input
    /// format. Panics if the instance has fewer than two vertices.
    pub fn partition(instance: Instance, workers: usize, partitioner: &dyn Partitioner) -> Cluster {
        let source = instance.source();
        let sink = instance.sink();
        assert_ne!(source, sink, "source and sink vertex must not be equal");

        let owners = partitioner.assign(&instance.vertices, workers);
        let owner = Arc::new(OwnerMap::new(owners));
        let parts = partition::migrate(instance.vertices, &owner, workers);
        Cluster {
            parts,
            owner,
            source,
            sink,
        }
    }

    /// Number of workers in the ring.
    pub fn workers(&self) -> usize {
        self.parts.len()
    }

    /// Solve with `threads` worker threads per worker and return the maximum
    /// flow.
    pub fn solve(self, threads: usize) -> Solution {
        let source = self.source;
        let sink = self.sink;
        let workers = self.parts.len();
        let cluster_owner = self.owner;

        let handles: Vec<_> = ChannelRing::ring(workers)
            .into_iter()
            .zip(self.parts)
            .map(|(transport, part)| {
                let owner = Arc::clone(&cluster_owner);
                thread::spawn(move || {
                    let rank = transport.rank();
                    let mut store = GraphStore::new(part);
                    store.relink(rank, &owner);
                    let engine = Arc::new(Engine::new(transport, store, source, sink, threads));
                    let value = Arc::clone(&engine).run();
                    (value, engine)
                })
            })
            .collect();

        let mut value = None;
        let mut stores = Vec::with_capacity(workers);
        for (rank, handle) in handles.into_iter().enumerate() {
            let (total, engine) = handle.join().unwrap();
            value = value.or(total);
            match Arc::try_unwrap(engine) {
                Ok(engine) => stores.push(engine.into_store()),
                Err(_) => panic!("engine of worker {} still shared after join", rank),
            }
        }

        Solution {
            value: value.expect("worker 0 terminated without a flow total"),
            stores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency;
    use crate::partition::BlockPartitioner;
    use std::io::Cursor;

    #[test]
    fn single_edge_network() {
        let instance = adjacency::read(Cursor::new("2 1\n1 5\n")).unwrap();
        let solution = Cluster::partition(instance, 1, &BlockPartitioner).solve(1);
        assert_eq!(solution.value, 5);
        assert_eq!(solution.stores[0].out_flow(0, 1), Some(5));
    }

    #[test]
    fn single_edge_network_across_two_workers() {
        let instance = adjacency::read(Cursor::new("2 1\n1 5\n")).unwrap();
        let cluster = Cluster::partition(instance, 2, &BlockPartitioner);
        assert_eq!(cluster.workers(), 2);
        let solution = cluster.solve(2);
        assert_eq!(solution.value, 5);
        assert_eq!(solution.stores[0].out_flow(0, 1), Some(5));
        assert!(solution.stores[1].out_flow(0, 1).is_none());
    }
}
