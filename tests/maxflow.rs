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

use ringflow::adjacency;
use ringflow::cluster::{Cluster, Solution};
use ringflow::partition::{BlockPartitioner, OwnerMap, Partitioner};
use ringflow::{ChannelRing, Engine, GlobalId, GraphStore};

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

const INSTANCES: &[(&str, i32)] = &[
    // single edge
    ("2 1\n1 5\n", 5),
    // diamond
    ("4 4\n1 3 2 2\n3 2\n3 4\n", 4),
    // bottleneck chain
    ("4 3\n1 10\n2 1\n3 10\n", 1),
    // two disjoint paths
    ("4 4\n1 5 2 7\n3 6\n3 4\n", 9),
    // source without outgoing capacity
    ("3 1\n\n2 9\n", 0),
    // zero-capacity edge
    ("2 1\n1 0\n", 0),
    // three layers, sink-side cut of 22
    (
        "8 12\n1 10 2 8 3 5\n4 6 5 4\n4 5 5 6\n5 4 6 6\n7 9\n7 8\n7 5\n",
        22,
    ),
];

fn solve(input: &str, workers: usize, threads: usize) -> Solution {
    let instance = adjacency::read(Cursor::new(input)).unwrap();
    Cluster::partition(instance, workers, &BlockPartitioner).solve(threads)
}

/// Build a single-worker engine over `input`, exposed for tests that start
/// from a non-zero flow.
fn single_worker_engine(input: &str, threads: usize) -> Arc<Engine<ChannelRing>> {
    let instance = adjacency::read(Cursor::new(input)).unwrap();
    let source = instance.source();
    let sink = instance.sink();
    let owners = BlockPartitioner.assign(&instance.vertices, 1);
    let owner = OwnerMap::new(owners);
    let mut store = GraphStore::new(instance.vertices);
    store.relink(0, &owner);
    let transport = ChannelRing::ring(1).pop().unwrap();
    Arc::new(Engine::new(transport, store, source, sink, threads))
}

#[test]
fn instances_on_a_single_worker() {
    for &threads in &[1, 4] {
        for &(input, expected) in INSTANCES {
            let solution = solve(input, 1, threads);
            assert_eq!(solution.value, expected, "instance {:?} with {} threads", input, threads);
        }
    }
}

#[test]
fn instances_across_two_workers() {
    for &threads in &[1, 4] {
        for &(input, expected) in INSTANCES {
            let solution = solve(input, 2, threads);
            assert_eq!(solution.value, expected, "instance {:?} with {} threads", input, threads);
        }
    }
}

#[test]
fn flow_value_is_invariant_in_worker_and_thread_count() {
    let (input, expected) = INSTANCES[6];
    for &workers in &[1, 2, 4, 8] {
        for &threads in &[1, 4] {
            let solution = solve(input, workers, threads);
            assert_eq!(
                solution.value, expected,
                "{} workers with {} threads each",
                workers, threads
            );
        }
    }
}

/// Collect per-vertex inflow and outflow over all workers of a solution.
fn flow_sums(solution: &Solution) -> HashMap<GlobalId, (i32, i32)> {
    let mut sums: HashMap<GlobalId, (i32, i32)> = HashMap::new();
    for store in &solution.stores {
        for v in store.vertices() {
            for e in &v.out_edges {
                let flow = store.out_flow(store.lookup(v.id).unwrap(), e.dest).unwrap();
                sums.entry(v.id).or_default().1 += flow;
                sums.entry(e.dest).or_default().0 += flow;
            }
        }
    }
    sums
}

#[test]
fn capacity_bounds_and_conservation_hold_in_the_final_flow() {
    for &(input, _) in INSTANCES {
        let solution = solve(input, 2, 4);

        let mut vertices = 0;
        for store in &solution.stores {
            vertices += store.num_vertices();
            for v in store.vertices() {
                for e in &v.out_edges {
                    let flow = store.out_flow(store.lookup(v.id).unwrap(), e.dest).unwrap();
                    assert!(
                        flow >= 0 && flow <= e.capacity,
                        "flow {} outside [0, {}] on edge ({}, {})",
                        flow,
                        e.capacity,
                        v.id,
                        e.dest
                    );
                }
            }
        }

        let source = 0;
        let sink = vertices as GlobalId - 1;
        let sums = flow_sums(&solution);
        for (&id, &(inflow, outflow)) in &sums {
            if id != source && id != sink {
                assert_eq!(inflow, outflow, "conservation violated at vertex {}", id);
            }
        }
        let source_net = sums.get(&source).copied().unwrap_or((0, 0));
        assert_eq!(solution.value, source_net.1 - source_net.0);
    }
}

#[test]
fn saturated_instance_is_left_untouched() {
    // the single edge already carries its full capacity: one labeling pass
    // must fail to reach the sink and leave the flow alone
    let engine = single_worker_engine("2 1\n1 5\n", 1);
    engine.store().add_flow(0, 1, 5);

    let value = Arc::clone(&engine).run();
    assert_eq!(value, Some(5));
    assert_eq!(engine.pass(), 1);
    assert_eq!(engine.store().out_flow(0, 1), Some(5));
}

#[test]
fn blocked_path_is_rerouted_over_a_reverse_edge() {
    // 0->1, 0->2, 1->2, 1->3, 2->3, all unit capacity; the flow already
    // routed over 0->1->2->3 blocks both plain paths, so the augmenting
    // search has to cancel the flow on (1,2)
    let engine = single_worker_engine("4 5\n1 1 2 1\n2 1 3 1\n3 1\n", 1);
    engine.store().add_flow(0, 1, 1);
    engine.store().add_flow(1, 2, 1);
    engine.store().add_flow(2, 3, 1);

    let value = Arc::clone(&engine).run();
    assert_eq!(value, Some(2));

    let store = engine.store();
    assert_eq!(store.out_flow(0, 1), Some(1));
    assert_eq!(store.out_flow(0, 2), Some(1));
    assert_eq!(store.out_flow(1, 2), Some(0));
    assert_eq!(store.out_flow(1, 3), Some(1));
    assert_eq!(store.out_flow(2, 3), Some(1));
}

#[test]
fn repeated_solves_agree() {
    // the flow decomposition may differ between runs, the value must not
    for _ in 0..5 {
        let solution = solve(INSTANCES[3].0, 2, 4);
        assert_eq!(solution.value, INSTANCES[3].1);
    }
}
