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

//! The shared queue of edges waiting to be explored.
//!
//! The queue is a two-lock queue: a *tail* lock guards producers
//! ([`push`](EdgeQueue::push) and the O(1) splice
//! [`merge`](EdgeQueue::merge)), a *head* lock guards the consumer side.
//! Producers and the consumer never contend with each other except for the
//! brief moment the consumer refills the head from the tail.
//!
//! A thread that discovers several new edges at once fills a private
//! [`Fragment`] with no locking at all and splices it into the shared queue
//! with a single lock acquisition.
//!
//! Delivery order is unspecified; the labeling algorithm does not depend on
//! FIFO behavior.

use std::collections::LinkedList;
use std::sync::{Mutex, MutexGuard};

/// Names one edge of a newly labeled vertex that still has to be explored.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EdgeRef {
    /// Local index of the labeled vertex.
    pub vertex: usize,
    /// `true` for an entry in the out-edge list, `false` for the in-edge list.
    pub outgoing: bool,
    /// Index into the respective edge list of the vertex.
    pub edge: usize,
}

/// A private, unsynchronized batch of entries destined for the shared queue.
#[derive(Default)]
pub struct Fragment(LinkedList<EdgeRef>);

impl Fragment {
    pub fn new() -> Self {
        Fragment(LinkedList::new())
    }

    pub fn push(&mut self, entry: EdgeRef) {
        self.0.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The per-worker two-lock queue of [`EdgeRef`] entries.
pub struct EdgeQueue {
    head: Mutex<LinkedList<EdgeRef>>,
    tail: Mutex<LinkedList<EdgeRef>>,
}

impl EdgeQueue {
    pub fn new() -> Self {
        EdgeQueue {
            head: Mutex::new(LinkedList::new()),
            tail: Mutex::new(LinkedList::new()),
        }
    }

    /// Append a single entry.
    pub fn push(&self, entry: EdgeRef) {
        self.tail.lock().unwrap().push_back(entry);
    }

    /// Splice a fragment into the queue with one lock acquisition.
    pub fn merge(&self, mut fragment: Fragment) {
        self.tail.lock().unwrap().append(&mut fragment.0);
    }

    /// Take the consumer side of the queue.
    ///
    /// The returned guard holds the head lock until dropped, so at most one
    /// thread at a time drains the queue; the engine relies on this to keep
    /// its idle-wait section single-threaded.
    pub fn head_lock(&self) -> Head<'_> {
        Head {
            head: self.head.lock().unwrap(),
            tail: &self.tail,
        }
    }

    /// Pop a single entry, or `None` if the queue is currently empty.
    pub fn pop(&self) -> Option<EdgeRef> {
        self.head_lock().pop()
    }
}

impl Default for EdgeQueue {
    fn default() -> Self {
        EdgeQueue::new()
    }
}

/// Consumer side of an [`EdgeQueue`], holding the head lock.
pub struct Head<'a> {
    head: MutexGuard<'a, LinkedList<EdgeRef>>,
    tail: &'a Mutex<LinkedList<EdgeRef>>,
}

impl Head<'_> {
    /// Pop the next entry, refilling from the producer side if necessary.
    pub fn pop(&mut self) -> Option<EdgeRef> {
        if self.head.is_empty() {
            self.head.append(&mut self.tail.lock().unwrap());
        }
        self.head.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn entry(vertex: usize) -> EdgeRef {
        EdgeRef {
            vertex,
            outgoing: true,
            edge: 0,
        }
    }

    #[test]
    fn push_pop() {
        let q = EdgeQueue::new();
        assert_eq!(q.pop(), None);
        q.push(entry(1));
        q.push(entry(2));
        assert_eq!(q.pop(), Some(entry(1)));
        assert_eq!(q.pop(), Some(entry(2)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn merge_splices_a_fragment() {
        let q = EdgeQueue::new();
        q.push(entry(1));
        let mut frag = Fragment::new();
        frag.push(entry(2));
        frag.push(entry(3));
        assert_eq!(frag.len(), 2);
        q.merge(frag);

        let mut seen = vec![];
        while let Some(e) = q.pop() {
            seen.push(e.vertex);
        }
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let q = Arc::new(EdgeQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut frag = Fragment::new();
                    for i in 0..100 {
                        frag.push(entry(t * 100 + i));
                    }
                    q.merge(frag);
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut seen = vec![];
        let mut head = q.head_lock();
        while let Some(e) = head.pop() {
            seen.push(e.vertex);
        }
        seen.sort();
        assert_eq!(seen, (0..400).collect::<Vec<_>>());
    }
}
