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

//! The per-worker iteration engine.
//!
//! One [`Engine`] drives one worker of the ring. It spawns `T + 1` threads:
//! thread 0 receives and dispatches messages, threads `1..=T` drain the
//! shared edge queue. The threads repeat a three-step iteration until no
//! augmenting path is left:
//!
//! 1. **Reset** — thread 0 wipes the labels and the queue, rearms the
//!    termination token and, if the source vertex is local, labels it and
//!    queues its edges.
//! 2. **Labeling** — worker threads pop edges and propagate labels,
//!    first-writer-wins; remote endpoints are labeled by message. The step
//!    ends when some worker labels the sink, or when the token ring proves
//!    every queue in the cluster empty.
//! 3. **Back-tracking** — the thread that labeled the sink (elected through
//!    `step3_tid`) walks the label back-pointers towards the source and
//!    applies the bottleneck delta to the residual flows, handing the walk
//!    to the predecessor's worker with `UPDATE_FLOW` where it leaves the
//!    partition.
//!
//! All shared state of a worker lives in the `Engine` value itself; threads
//! share it through an [`Arc`].

use crate::graph::{GlobalId, GraphStore, WorkerId, NO_INDEX};
use crate::label::{LabelTable, PrevRef};
use crate::message::{tag, Message};
use crate::queue::{EdgeQueue, EdgeRef, Fragment};
use crate::reduce;
use crate::token::{Color, TokenRing};
use crate::transport::{Envelope, Transport};

use log::{debug, error};

use std::cmp::min;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// How one thread left the labeling step.
enum Labeling {
    /// The sink was labeled somewhere; the payload is the local index of the
    /// sink if this very thread labeled it, [`NO_INDEX`] otherwise.
    SinkFound(usize),
    /// The token ring proved all queues empty; the search is over.
    Complete,
}

/// The engine of a single worker.
///
/// Holds the graph partition and every piece of state the worker's threads
/// share during a solve.
pub struct Engine<T> {
    transport: T,
    store: GraphStore,
    labels: LabelTable,
    queue: EdgeQueue,
    token: TokenRing,

    /// Global id of the source vertex.
    source: GlobalId,
    /// Global id of the sink vertex.
    sink: GlobalId,
    /// Number of worker threads (the receiver comes on top).
    threads: usize,

    /// Intra-worker barrier between the iteration steps.
    barrier: Barrier,
    /// The current iteration number, stamped into every message.
    pass: AtomicI32,
    /// Set once the sink is labeled in the current pass.
    sink_found: AtomicBool,
    /// Set once the token ring has proven global quiescence.
    complete: AtomicBool,
    /// Thread elected to run the back-tracking step, `-1` while unclaimed.
    step3_tid: AtomicI32,
    /// Threads currently processing an edge or a message.
    working: AtomicI32,
    /// Worker threads still inside the labeling step.
    labeling_threads: AtomicI32,
    /// Set by a worker thread that found the queue empty.
    queue_is_empty: AtomicBool,
}

impl<T: Transport> Engine<T> {
    /// Create the engine for one worker.
    ///
    /// `store` holds the worker's partition with owner fields already
    /// relinked; `threads` is the number of worker threads to spawn next to
    /// the receiver thread.
    pub fn new(transport: T, store: GraphStore, source: GlobalId, sink: GlobalId, threads: usize) -> Self {
        assert!(threads >= 1, "at least one worker thread is required");
        assert_ne!(source, sink, "source and sink vertex must not be equal");
        let labels = LabelTable::new(store.num_vertices());
        Engine {
            transport,
            store,
            labels,
            queue: EdgeQueue::new(),
            token: TokenRing::new(),
            source,
            sink,
            threads,
            barrier: Barrier::new(threads + 1),
            pass: AtomicI32::new(1),
            sink_found: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            step3_tid: AtomicI32::new(-1),
            working: AtomicI32::new(0),
            labeling_threads: AtomicI32::new(0),
            queue_is_empty: AtomicBool::new(false),
        }
    }

    /// The worker's graph partition.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Give the graph partition back, with the final flows on its edges.
    pub fn into_store(self) -> GraphStore {
        self.store
    }

    /// Number of passes performed so far.
    pub fn pass(&self) -> i32 {
        self.pass.load(Ordering::Acquire)
    }

    /// Run the solve to completion.
    ///
    /// Spawns the worker's threads, joins them, and takes part in the final
    /// flow reduction. Returns the maximum flow on worker 0 and `None`
    /// everywhere else.
    pub fn run(self: Arc<Self>) -> Option<i32>
    where
        T: 'static,
    {
        let handles: Vec<_> = (0..=self.threads)
            .map(|tid| {
                let engine = Arc::clone(&self);
                thread::spawn(move || engine.thread_main(tid))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        debug!("worker {}: all threads joined after {} passes", self.transport.rank(), self.pass());
        reduce::collect(&self.transport, &self.store, self.source)
    }

    fn thread_main(&self, tid: usize) {
        loop {
            // synchronize all threads before each iteration
            self.barrier.wait();
            if tid == 0 {
                self.reset();
            }
            self.barrier.wait();

            let outcome = if tid == 0 { self.receive_loop() } else { self.work_loop(tid) };
            let bt = match outcome {
                Labeling::Complete => return,
                Labeling::SinkFound(bt) => bt,
            };

            // make sure every thread is out of the labeling step
            self.barrier.wait();

            if self.step3_tid.load(Ordering::Acquire) != tid as i32 {
                continue;
            }
            self.backtrack(bt);
            self.pass.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Step 1, run by thread 0 while all other threads wait at the barrier.
    fn reset(&self) {
        let rank = self.transport.rank();
        self.labels.reset();
        let mut head = self.queue.head_lock();
        while head.pop().is_some() {}
        drop(head);
        self.working.store(0, Ordering::Relaxed);
        self.labeling_threads.store(self.threads as i32, Ordering::Relaxed);
        self.token.reset(rank == 0);
        self.queue_is_empty.store(false, Ordering::Relaxed);
        self.sink_found.store(false, Ordering::Relaxed);
        self.complete.store(false, Ordering::Relaxed);
        self.step3_tid.store(-1, Ordering::Release);

        debug!("worker {}: pass {}", rank, self.pass());
        if let Some(index) = self.store.lookup(self.source) {
            self.set_label(
                index,
                i32::MAX,
                PrevRef {
                    node: self.source,
                    worker: rank,
                    index,
                },
            );
        }
    }

    /// Label a vertex if it is still unlabeled.
    ///
    /// A won label queues the vertex's unexplored edges, except when the
    /// vertex is the sink: then `true` is returned and the caller initiates
    /// the back-tracking step.
    fn set_label(&self, index: usize, value: i32, prev: PrevRef) -> bool {
        if self.labels.try_set(index, value, prev) {
            if self.store.vertex(index).id == self.sink {
                return true;
            }
            self.insert_edges(index);
        }
        false
    }

    /// Queue all edges of a freshly labeled vertex that can still lead
    /// somewhere.
    ///
    /// Edges to already-labeled local vertices and the edge back to the
    /// labeling predecessor are skipped. Both checks are advisory; the
    /// label CAS is what actually keeps the search consistent.
    fn insert_edges(&self, index: usize) {
        let rank = self.transport.rank();
        let vertex = self.store.vertex(index);
        let prev_node = self.labels.get(index).prev.node;
        let mut fragment = Fragment::new();
        for (i, e) in vertex.out_edges.iter().enumerate() {
            if e.worker == rank && self.labels.value(e.dest_index) != 0 {
                continue;
            }
            if e.dest == prev_node {
                continue;
            }
            fragment.push(EdgeRef {
                vertex: index,
                outgoing: true,
                edge: i,
            });
        }
        for (i, e) in vertex.in_edges.iter().enumerate() {
            if e.worker == rank && self.labels.value(e.src_index) != 0 {
                continue;
            }
            if e.src == prev_node {
                continue;
            }
            fragment.push(EdgeRef {
                vertex: index,
                outgoing: false,
                edge: i,
            });
        }
        debug!("worker {}: queueing {} edges of vertex {}", rank, fragment.len(), vertex.id);
        self.queue.merge(fragment);
    }

    /// Step 2 for thread 0: receive and dispatch messages until the sink is
    /// found or the cluster is quiescent.
    fn receive_loop(&self) -> Labeling {
        let rank = self.transport.rank();
        let mut bt = NO_INDEX;
        while !self.sink_found.load(Ordering::Acquire) {
            let envelope = self.transport.recv();
            self.working.fetch_add(1, Ordering::AcqRel);
            debug!(
                "worker {}: step 2 got {} from worker {}",
                rank,
                Message::tag_name(envelope.msg.tag()),
                envelope.source
            );
            let complete = self.dispatch(envelope, &mut bt);
            self.working.fetch_sub(1, Ordering::AcqRel);
            if complete {
                return Labeling::Complete;
            }
        }
        Labeling::SinkFound(bt)
    }

    /// Handle one step-2 message; returns `true` when the search is over.
    fn dispatch(&self, envelope: Envelope, bt: &mut usize) -> bool {
        let rank = self.transport.rank();
        match envelope.msg {
            Message::SetToLabel {
                sender,
                receiver,
                value,
                pass,
            } => {
                let index = match self.store.lookup(receiver) {
                    Some(index) => index,
                    None => {
                        error!("worker {}: SET_TO_LABEL for vertex {} sent to the wrong worker", rank, receiver);
                        return false;
                    }
                };
                if pass != self.pass() {
                    error!("worker {}: dropping SET_TO_LABEL from pass {}", rank, pass);
                    return false;
                }
                let prev = PrevRef {
                    node: sender,
                    worker: envelope.source,
                    index: NO_INDEX,
                };
                if self.set_label(index, value, prev) {
                    *bt = index;
                    if let Err(winner) = self.step3_tid.compare_exchange(-1, 0, Ordering::AcqRel, Ordering::Acquire) {
                        error!("worker {}: thread {} claimed the back-track, but the sink was labeled here", rank, winner);
                    }
                    self.sink_found.store(true, Ordering::Release);
                }
            }
            Message::ComputeFromLabel {
                sender,
                receiver,
                value,
                pass,
            } => {
                let index = match self.store.lookup(receiver) {
                    Some(index) => index,
                    None => {
                        error!(
                            "worker {}: COMPUTE_FROM_LABEL for vertex {} sent to the wrong worker",
                            rank, receiver
                        );
                        return false;
                    }
                };
                if pass != self.pass() {
                    error!("worker {}: dropping COMPUTE_FROM_LABEL from pass {}", rank, pass);
                    return false;
                }
                // the flow of the edge (receiver, sender) is stored here
                let flow = self.store.out_flow(index, sender).unwrap_or(0);
                if flow <= 0 {
                    return false;
                }
                let prev = PrevRef {
                    node: sender,
                    worker: envelope.source,
                    index: NO_INDEX,
                };
                if self.set_label(index, -min(value.abs(), flow), prev) {
                    error!("worker {}: sink labeled through one of its outgoing edges", rank);
                    *bt = index;
                    if let Err(winner) = self.step3_tid.compare_exchange(-1, 0, Ordering::AcqRel, Ordering::Acquire) {
                        error!("worker {}: thread {} claimed the back-track, but the sink was labeled here", rank, winner);
                    }
                    self.sink_found.store(true, Ordering::Release);
                }
            }
            Message::SinkFound => {
                if self.transport.size() > 1 {
                    match self.step3_tid.compare_exchange(-1, 0, Ordering::AcqRel, Ordering::Acquire) {
                        Ok(_) => debug!("worker {}: receiver thread runs the back-track", rank),
                        Err(winner) => debug!("worker {}: thread {} runs the back-track", rank, winner),
                    }
                    self.sink_found.store(true, Ordering::Release);
                } else {
                    // single worker: idle threads may still be blocked handing
                    // us the token; keep draining until all of them noticed
                    // that the labeling step is over
                    self.sink_found.store(true, Ordering::Release);
                    while self.labeling_threads.load(Ordering::Acquire) > 0 {
                        if let Some(stale) = self.transport.try_recv() {
                            match stale.msg {
                                Message::TokenWhite | Message::TokenRed => {}
                                other => error!(
                                    "worker {}: unexpected {} while flushing tokens",
                                    rank,
                                    Message::tag_name(other.tag())
                                ),
                            }
                        } else {
                            thread::yield_now();
                        }
                    }
                }
            }
            Message::TokenWhite | Message::TokenRed => {
                let mut color = if envelope.msg == Message::TokenWhite {
                    Color::White
                } else {
                    Color::Red
                };
                if rank == 0 {
                    if color == Color::White {
                        // a white round trip: run the global empty-queue check
                        debug!("worker {}: white token returned, checking termination", rank);
                        for peer in 1..self.transport.size() {
                            self.transport.send(peer, Message::CheckTermination);
                        }
                        if self.empty_check() {
                            return true;
                        }
                    } else {
                        // worker 0 washes a red token and recirculates it
                        color = Color::White;
                    }
                }
                self.token.adopt(color);
                debug!("worker {}: now holding the token", rank);
            }
            Message::CheckTermination => {
                if self.empty_check() {
                    return true;
                }
            }
            other => {
                error!("worker {}: got invalid {} in step 2", rank, Message::tag_name(other.tag()));
            }
        }
        false
    }

    /// Take part in the collective empty-queue sum; returns `true` and flags
    /// completion if no worker has queued work left.
    fn empty_check(&self) -> bool {
        let busy = if self.queue_is_empty.load(Ordering::Relaxed) { 0 } else { 1 };
        if self.transport.sum(busy) == 0 {
            debug!("worker {}: algorithm complete", self.transport.rank());
            self.complete.store(true, Ordering::Release);
            true
        } else {
            debug!("worker {}: not all queues are empty, continuing", self.transport.rank());
            false
        }
    }

    /// Step 2 for the worker threads: drain the queue and process edges.
    fn work_loop(&self, tid: usize) -> Labeling {
        let rank = self.transport.rank();
        loop {
            let mut entry;
            {
                // hold the pop side for the whole wait: exactly one idle
                // thread at a time may decide to forward the token
                let mut head = self.queue.head_lock();
                loop {
                    entry = head.pop();
                    if entry.is_some()
                        || self.sink_found.load(Ordering::Acquire)
                        || self.complete.load(Ordering::Acquire)
                    {
                        break;
                    }
                    self.queue_is_empty.store(true, Ordering::Relaxed);
                    self.try_forward_token();
                    thread::yield_now();
                }
                if self.complete.load(Ordering::Acquire) {
                    debug!("worker {}: thread {} done, algorithm complete", rank, tid);
                    self.labeling_threads.fetch_sub(1, Ordering::AcqRel);
                    return Labeling::Complete;
                }
                self.working.fetch_add(1, Ordering::AcqRel);
                self.queue_is_empty.store(false, Ordering::Relaxed);
            }

            if self.sink_found.load(Ordering::Acquire) {
                self.working.fetch_sub(1, Ordering::AcqRel);
                self.labeling_threads.fetch_sub(1, Ordering::AcqRel);
                return Labeling::SinkFound(NO_INDEX);
            }
            let entry = match entry {
                Some(entry) => entry,
                None => {
                    self.working.fetch_sub(1, Ordering::AcqRel);
                    continue;
                }
            };

            let sink_index = if entry.outgoing {
                self.handle_out_edge(entry)
            } else {
                self.handle_in_edge(entry)
            };
            if let Some(bt) = sink_index {
                debug!("worker {}: thread {} labeled the sink", rank, tid);
                if let Err(winner) = self.step3_tid.compare_exchange(-1, tid as i32, Ordering::AcqRel, Ordering::Acquire)
                {
                    error!("worker {}: thread {} claimed the back-track, but the sink was labeled here", rank, winner);
                }
                // wake the receiver so it leaves step 2 as well
                self.transport.send(rank, Message::SinkFound);
                self.sink_found.store(true, Ordering::Release);
                self.working.fetch_sub(1, Ordering::AcqRel);
                self.labeling_threads.fetch_sub(1, Ordering::AcqRel);
                return Labeling::SinkFound(bt);
            }
            self.working.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Forward the termination token if it is here and this worker is idle.
    fn try_forward_token(&self) {
        if self.working.load(Ordering::Acquire) != 0 || self.sink_found.load(Ordering::Acquire) {
            return;
        }
        if let Some(color) = self.token.take() {
            let rank = self.transport.rank();
            let next = (rank + 1) % self.transport.size();
            debug!("worker {}: queue empty, sending {} token to worker {}", rank,
                if color == Color::White { "white" } else { "red" }, next);
            self.transport.send(next, color.token_message());
        }
    }

    /// Process an out-edge `(u, v)` of the labeled vertex `u`.
    ///
    /// Returns the local index of the sink if this call labeled it.
    fn handle_out_edge(&self, entry: EdgeRef) -> Option<usize> {
        let rank = self.transport.rank();
        let from = self.store.vertex(entry.vertex);
        let edge = &from.out_edges[entry.edge];

        let slack = edge.slack();
        if slack <= 0 {
            return None;
        }
        let value = min(self.labels.value(entry.vertex).abs(), slack);
        if edge.worker == rank {
            let prev = PrevRef {
                node: from.id,
                worker: rank,
                index: entry.vertex,
            };
            if self.set_label(edge.dest_index, value, prev) {
                return Some(edge.dest_index);
            }
        } else {
            // the label of a remote endpoint is set by its own worker
            if edge.worker < rank {
                self.token.blacken();
            }
            debug!("worker {}: step 2 sending SET_TO_LABEL to worker {}", rank, edge.worker);
            self.transport.send(
                edge.worker,
                Message::SetToLabel {
                    sender: from.id,
                    receiver: edge.dest,
                    value,
                    pass: self.pass(),
                },
            );
        }
        None
    }

    /// Process an in-edge `(u, v)` found while scanning the labeled vertex
    /// `v`: try to label `u` for a reverse step canceling flow.
    ///
    /// The flow lives on `u`'s worker. If `u` is local the label is computed
    /// here; otherwise `u`'s worker looks the flow up itself.
    fn handle_in_edge(&self, entry: EdgeRef) -> Option<usize> {
        let rank = self.transport.rank();
        let to = self.store.vertex(entry.vertex);
        let rev = &to.in_edges[entry.edge];

        if rev.worker == rank {
            let flow = self.store.out_flow(rev.src_index, to.id).unwrap_or(0);
            if flow <= 0 {
                return None;
            }
            let value = -min(self.labels.value(entry.vertex).abs(), flow);
            let prev = PrevRef {
                node: to.id,
                worker: rank,
                index: entry.vertex,
            };
            if self.set_label(rev.src_index, value, prev) {
                error!("worker {}: sink labeled through one of its outgoing edges", rank);
                return Some(rev.src_index);
            }
        } else {
            if rev.worker < rank {
                self.token.blacken();
            }
            debug!("worker {}: step 2 sending COMPUTE_FROM_LABEL to worker {}", rank, rev.worker);
            self.transport.send(
                rev.worker,
                Message::ComputeFromLabel {
                    sender: to.id,
                    receiver: rev.src,
                    value: self.labels.value(entry.vertex),
                    pass: self.pass(),
                },
            );
        }
        None
    }

    /// Step 3: walk the back-pointers from the sink towards the source and
    /// apply the bottleneck delta.
    ///
    /// Run by the elected thread only; `bt` is the local index of the sink if
    /// this worker labeled it, [`NO_INDEX`] otherwise.
    fn backtrack(&self, mut bt: usize) {
        let rank = self.transport.rank();
        let size = self.transport.size();
        let next = (rank + 1) % size;
        let prev_rank = (rank + size - 1) % size;

        let mut delta = 0;
        let mut circuits = 1;
        if bt != NO_INDEX {
            // the finder needs the message around twice: once to stop the
            // other workers, once to know they all stopped
            circuits = 2;
            delta = self.labels.value(bt);
        }
        if size > 1 {
            for _ in 0..circuits {
                debug!("worker {}: step 3 sending SINK_FOUND to worker {}", rank, next);
                self.transport.send(next, Message::SinkFound);
                self.wait_and_flush(tag::SINK_FOUND, prev_rank);
            }
            // everyone but the finder passes the last message on
            if bt == NO_INDEX {
                self.transport.send(next, Message::SinkFound);
            }
        }

        // flush whatever the labeling phase still left in the inbox
        while let Some(stale) = self.transport.try_recv() {
            debug!(
                "worker {}: discarding {} from worker {}",
                rank,
                Message::tag_name(stale.msg.tag()),
                stale.source
            );
        }
        self.transport.barrier();

        let mut wait_for_source = false;
        let mut done = false;
        while !done {
            if bt != NO_INDEX {
                let label = self.labels.get(bt);
                let id = self.store.vertex(bt).id;
                debug!("worker {}: step 3 at vertex {}", rank, id);
                if label.value > 0 && label.prev.worker == rank {
                    // forward step with a local predecessor: f(prev, bt) += delta;
                    // the self-labeled source is the one vertex without an
                    // incoming path edge
                    if !self.store.add_flow(label.prev.index, id, delta) && label.prev.index != bt {
                        error!("worker {}: no out-edge ({}, {}) to update", rank, label.prev.node, id);
                    }
                } else if label.value < 0 {
                    // reverse step: the flow of (bt, prev) is owned here
                    if !self.store.add_flow(bt, label.prev.node, -delta) {
                        error!("worker {}: no out-edge ({}, {}) to cancel", rank, id, label.prev.node);
                    }
                }

                if label.prev.worker != rank {
                    debug!("worker {}: step 3 sending UPDATE_FLOW to worker {}", rank, label.prev.worker);
                    self.transport.send(
                        label.prev.worker,
                        Message::UpdateFlow {
                            sender: id,
                            receiver: label.prev.node,
                            value: delta,
                            pass: self.pass(),
                        },
                    );
                    bt = NO_INDEX;
                } else if bt == label.prev.index && label.prev.node == self.source {
                    // the source labels itself, so this is the end of the path
                    wait_for_source = size > 1;
                    done = true;
                } else {
                    bt = label.prev.index;
                }
            } else {
                let envelope = self.transport.recv();
                debug!(
                    "worker {}: step 3 got {} from worker {}",
                    rank,
                    Message::tag_name(envelope.msg.tag()),
                    envelope.source
                );
                match envelope.msg {
                    Message::SourceFound => {
                        done = true;
                    }
                    Message::UpdateFlow { sender, receiver, value, .. } => {
                        delta = value;
                        match self.store.lookup(receiver) {
                            Some(index) => {
                                // if the flow of (receiver, sender) is ours, apply the
                                // delta; if we are the edge's head there is nothing to do
                                self.store.add_flow(index, sender, delta);
                                bt = index;
                            }
                            None => {
                                error!("worker {}: UPDATE_FLOW for vertex {} sent to the wrong worker", rank, receiver)
                            }
                        }
                    }
                    Message::SetToLabel { .. }
                    | Message::ComputeFromLabel { .. }
                    | Message::TokenWhite
                    | Message::TokenRed => {
                        debug!(
                            "worker {}: stale {} during step 3",
                            rank,
                            Message::tag_name(envelope.msg.tag())
                        );
                    }
                    other => {
                        error!("worker {}: got invalid {} in step 3", rank, Message::tag_name(other.tag()));
                    }
                }
            }
        }

        // tell the ring the source was reached, and wait for the circuit to
        // close if we were the one who reached it
        if size > 1 {
            debug!("worker {}: step 3 sending SOURCE_FOUND to worker {}", rank, next);
            self.transport.send(next, Message::SourceFound);
        }
        if wait_for_source {
            self.wait_and_flush(tag::SOURCE_FOUND, prev_rank);
        }
        self.transport.barrier();
    }

    /// Receive until a message with the wanted tag arrives from the wanted
    /// worker; everything else is discarded.
    fn wait_and_flush(&self, wanted: i32, source: WorkerId) {
        loop {
            let envelope = self.transport.recv();
            if envelope.msg.tag() == wanted && envelope.source == source {
                return;
            }
            debug!(
                "worker {}: flushing {} from worker {} while waiting for {}",
                self.transport.rank(),
                Message::tag_name(envelope.msg.tag()),
                envelope.source,
                Message::tag_name(wanted)
            );
        }
    }
}
