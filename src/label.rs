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

//! Per-vertex search labels with first-writer-wins assignment.
//!
//! A label value of `0` means "unlabeled". A positive value means the vertex
//! was reached over a forward edge with that much residual slack, a negative
//! value that it was reached over a reverse edge with that much flow to
//! cancel; in both cases the magnitude is the bottleneck along the path from
//! the source so far. The source itself is labeled `i32::MAX`.
//!
//! Within one pass a label transitions at most once from unlabeled to
//! labeled; all later attempts lose the CAS and are dropped.

use crate::graph::{GlobalId, WorkerId};

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, Ordering};

/// Back-pointer to the predecessor in the search tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PrevRef {
    /// Global id of the predecessor.
    pub node: GlobalId,
    /// Worker owning the predecessor.
    pub worker: WorkerId,
    /// Local index of the predecessor if co-located, else [`NO_INDEX`].
    ///
    /// [`NO_INDEX`]: crate::graph::NO_INDEX
    pub index: usize,
}

/// Snapshot of one vertex label.
#[derive(Clone, Copy, Debug)]
pub struct Label {
    pub value: i32,
    pub prev: PrevRef,
}

struct Slot {
    value: AtomicI32,
    prev: UnsafeCell<PrevRef>,
}

/// The label array of one worker.
///
/// The back-pointer cell of a slot is written exactly once per pass, by the
/// thread that won the CAS on `value`, and read only by threads that have
/// already observed the vertex as labeled (through a queue entry pushed after
/// the write, or during the single-threaded back-tracking step). That
/// protocol is what makes the unsynchronized cell sound.
pub struct LabelTable {
    slots: Vec<Slot>,
}

unsafe impl Sync for LabelTable {}

impl LabelTable {
    /// Create a table of `n` unlabeled slots.
    pub fn new(n: usize) -> Self {
        LabelTable {
            slots: (0..n)
                .map(|_| Slot {
                    value: AtomicI32::new(0),
                    prev: UnsafeCell::new(PrevRef {
                        node: 0,
                        worker: 0,
                        index: 0,
                    }),
                })
                .collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mark every vertex unlabeled again.
    ///
    /// Must only be called while no other thread accesses the table; the
    /// engine does this in step 1 with all other threads parked at a barrier.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.value.store(0, Ordering::Relaxed);
        }
    }

    /// Atomically label a vertex if it is still unlabeled.
    ///
    /// On success the back-pointer is committed and `true` is returned; a
    /// lost race leaves the slot untouched and returns `false`.
    pub fn try_set(&self, index: usize, value: i32, prev: PrevRef) -> bool {
        debug_assert!(value != 0, "a label value of 0 means unlabeled");
        let slot = &self.slots[index];
        if slot
            .value
            .compare_exchange(0, value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // we won the slot for this pass, nobody else writes it
            unsafe { *slot.prev.get() = prev };
            true
        } else {
            false
        }
    }

    /// The current label value of a vertex; `0` if unlabeled.
    pub fn value(&self, index: usize) -> i32 {
        self.slots[index].value.load(Ordering::Acquire)
    }

    /// Snapshot of a label.
    ///
    /// The back-pointer part is meaningful only if the vertex is labeled.
    pub fn get(&self, index: usize) -> Label {
        let slot = &self.slots[index];
        Label {
            value: slot.value.load(Ordering::Acquire),
            prev: unsafe { *slot.prev.get() },
        }
    }
}
