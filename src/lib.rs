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

//! Distributed parallel maximum-flow for large directed graphs.
//!
//! The graph is partitioned across a ring of workers, each hosting several
//! cooperating threads. The engine runs repeated augmenting-path iterations:
//! every iteration floods reachability labels out from the source in parallel
//! on all workers, detects global quiescence with a Dijkstra–Feijen–Gasteren
//! token ring if the sink cannot be reached, and otherwise back-tracks from
//! the sink to the source updating residual flows. The result is a single
//! integer, the maximum s–t flow.
//!
//! Workers exchange typed, tagged messages over a [`Transport`]; the bundled
//! [`ChannelRing`] transport runs the whole ring inside one process, which is
//! also how the test suite exercises the cross-worker protocol.
//!
//! [`Transport`]: transport::Transport
//! [`ChannelRing`]: transport::ChannelRing

// # Data structures

pub mod graph;
pub use self::graph::{GlobalId, WorkerId, NO_INDEX};
pub use self::graph::{GraphStore, InEdge, OutEdge, Vertex};

pub mod label;
pub use self::label::{Label, LabelTable, PrevRef};

pub mod queue;
pub use self::queue::{EdgeQueue, EdgeRef, Fragment};

// # Protocol

pub mod message;
pub use self::message::Message;

pub mod token;
pub use self::token::{Color, TokenRing};

pub mod transport;
pub use self::transport::{ChannelRing, Envelope, Transport};

// # Engine

pub mod engine;
pub use self::engine::Engine;

pub mod reduce;

pub mod partition;
pub use self::partition::{BlockPartitioner, OwnerMap, Partitioner};

pub mod cluster;

// # Input

pub mod adjacency;
