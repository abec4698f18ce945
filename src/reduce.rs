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

//! Collecting the flow value after the solve.
//!
//! The maximum flow equals the sum of the flows out of the source vertex.
//! The worker owning the source computes that sum; if it is not worker 0 it
//! ships the scalar over as a `TOTAL_FLOW` message.

use crate::graph::{GlobalId, GraphStore};
use crate::message::Message;
use crate::transport::Transport;

use log::error;

/// Reduce the flow out of `source` to worker 0.
///
/// Must be called on every worker after its engine threads have joined.
/// Returns the maximum flow on worker 0, `None` on every other worker.
pub fn collect<T: Transport>(transport: &T, store: &GraphStore, source: GlobalId) -> Option<i32> {
    let local = store.lookup(source).map(|index| store.out_flow_sum(index));

    if transport.rank() == 0 {
        let total = match local {
            Some(total) => total,
            None => loop {
                let envelope = transport.recv();
                match envelope.msg {
                    Message::TotalFlow { value } => break value,
                    other => error!(
                        "worker 0: got {} while waiting for TOTAL_FLOW",
                        Message::tag_name(other.tag())
                    ),
                }
            },
        };
        Some(total)
    } else {
        if let Some(total) = local {
            transport.send(0, Message::TotalFlow { value: total });
        }
        None
    }
}
