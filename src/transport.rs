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

//! The message transport between workers.
//!
//! The engine is written against the [`Transport`] trait: point-to-point
//! sends and receives of [`Message`]s plus the two collective operations the
//! termination detector needs (a sum over all workers and a global barrier).
//! Sends are *synchronous* in the MPI `Ssend` sense: the sender blocks until
//! the destination has posted a matching receive, which bounds send
//! buffering and is what the token-ring termination argument relies on.
//!
//! [`ChannelRing`] implements the trait for a ring living inside a single
//! process, one worker per OS thread group, using rendezvous channels. The
//! codec is exercised on every hop: frames travel as tag plus 24-byte
//! payload record, and frames that do not decode are logged and dropped.
//!
//! All methods abort (panic) if the ring is torn, i.e. if a peer worker has
//! terminated; there is no recovery from a lost worker.

use crate::graph::WorkerId;
use crate::message::{Message, WIRE_LEN};

use log::error;

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Barrier, Condvar, Mutex};

/// A received message together with its sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Ring id of the sending worker.
    pub source: WorkerId,
    pub msg: Message,
}

/// Point-to-point and collective communication between the workers.
///
/// Implementations must support concurrent sends and receives from multiple
/// threads of the same worker.
pub trait Transport: Send + Sync {
    /// Ring id of this worker.
    fn rank(&self) -> WorkerId;

    /// Number of workers in the ring.
    fn size(&self) -> usize;

    /// Send a message to a worker, blocking until it is received.
    fn send(&self, dest: WorkerId, msg: Message);

    /// Receive the next message from any worker, blocking.
    fn recv(&self) -> Envelope;

    /// Receive a pending message, if one is already waiting.
    fn try_recv(&self) -> Option<Envelope>;

    /// Collective sum over one contribution per worker.
    ///
    /// Every worker must call this; all calls return the same total.
    fn sum(&self, value: i32) -> i32;

    /// Block until every worker has reached the barrier.
    fn barrier(&self);
}

struct Frame {
    source: WorkerId,
    tag: i32,
    record: [u8; WIRE_LEN],
}

/// State of the collective sum, advanced in rounds.
struct SumRound {
    round: u64,
    pending: usize,
    acc: i32,
    total: i32,
}

/// Shared state backing the collective operations of one ring.
struct Collective {
    size: usize,
    barrier: Barrier,
    sum: Mutex<SumRound>,
    done: Condvar,
}

impl Collective {
    fn new(size: usize) -> Self {
        Collective {
            size,
            barrier: Barrier::new(size),
            sum: Mutex::new(SumRound {
                round: 0,
                pending: 0,
                acc: 0,
                total: 0,
            }),
            done: Condvar::new(),
        }
    }

    fn sum(&self, value: i32) -> i32 {
        let mut st = self.sum.lock().unwrap();
        let round = st.round;
        st.acc += value;
        st.pending += 1;
        if st.pending == self.size {
            st.total = st.acc;
            st.acc = 0;
            st.pending = 0;
            // the next round cannot overwrite `total` before every waiter of
            // this round has read it: it completes only once all workers
            // contributed again, and the waiters have not yet returned
            st.round += 1;
            self.done.notify_all();
            st.total
        } else {
            while st.round == round {
                st = self.done.wait(st).unwrap();
            }
            st.total
        }
    }
}

/// An in-process worker ring over rendezvous channels.
///
/// Built with [`ChannelRing::ring`], which returns one endpoint per worker.
/// Each endpoint is handed to the threads of its worker; the endpoints are
/// connected all-to-all for point-to-point messages and share the collective
/// state.
pub struct ChannelRing {
    rank: WorkerId,
    peers: Vec<SyncSender<Frame>>,
    inbox: Mutex<Receiver<Frame>>,
    shared: Arc<Collective>,
}

impl ChannelRing {
    /// Create the endpoints of a ring of `size` workers.
    pub fn ring(size: usize) -> Vec<ChannelRing> {
        assert!(size > 0, "a ring needs at least one worker");
        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            // rendezvous channel: send blocks until the peer receives
            let (tx, rx) = mpsc::sync_channel(0);
            senders.push(tx);
            receivers.push(rx);
        }
        let shared = Arc::new(Collective::new(size));
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| ChannelRing {
                rank,
                peers: senders.clone(),
                inbox: Mutex::new(rx),
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn accept(&self, frame: Frame) -> Option<Envelope> {
        match Message::decode(frame.tag, &frame.record) {
            Ok(msg) => Some(Envelope {
                source: frame.source,
                msg,
            }),
            Err(err) => {
                // protocol error: log and drop, the algorithm resumes
                error!("worker {}: dropping frame from worker {}: {}", self.rank, frame.source, err);
                None
            }
        }
    }
}

impl Transport for ChannelRing {
    fn rank(&self) -> WorkerId {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, dest: WorkerId, msg: Message) {
        let (tag, record) = msg.encode();
        let frame = Frame {
            source: self.rank,
            tag,
            record,
        };
        if self.peers[dest].send(frame).is_err() {
            panic!("worker {}: worker {} terminated, tearing down the ring", self.rank, dest);
        }
    }

    fn recv(&self) -> Envelope {
        let inbox = self.inbox.lock().unwrap();
        loop {
            match inbox.recv() {
                Ok(frame) => {
                    if let Some(env) = self.accept(frame) {
                        return env;
                    }
                }
                Err(_) => panic!("worker {}: all peers terminated, tearing down the ring", self.rank),
            }
        }
    }

    fn try_recv(&self) -> Option<Envelope> {
        let inbox = self.inbox.lock().unwrap();
        loop {
            match inbox.try_recv() {
                Ok(frame) => {
                    if let Some(env) = self.accept(frame) {
                        return Some(env);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    panic!("worker {}: all peers terminated, tearing down the ring", self.rank)
                }
            }
        }
    }

    fn sum(&self, value: i32) -> i32 {
        self.shared.sum(value)
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn messages_arrive_with_their_sender() {
        let mut ring = ChannelRing::ring(2);
        let b = ring.pop().unwrap();
        let a = ring.pop().unwrap();

        let t = thread::spawn(move || {
            b.send(0, Message::SinkFound);
            b.recv()
        });
        assert_eq!(
            a.recv(),
            Envelope {
                source: 1,
                msg: Message::SinkFound
            }
        );
        a.send(1, Message::TotalFlow { value: 7 });
        assert_eq!(
            t.join().unwrap(),
            Envelope {
                source: 0,
                msg: Message::TotalFlow { value: 7 }
            }
        );
    }

    #[test]
    fn send_is_synchronous() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let mut ring = ChannelRing::ring(2);
        let b = ring.pop().unwrap();
        let a = ring.pop().unwrap();
        let received = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&received);
        let t = thread::spawn(move || {
            a.send(1, Message::TokenWhite);
            // the send may only complete once the receive was posted
            assert!(flag.load(Ordering::Relaxed));
        });

        thread::sleep(std::time::Duration::from_millis(50));
        received.store(true, Ordering::Relaxed);
        assert_eq!(b.recv().msg, Message::TokenWhite);
        t.join().unwrap();
    }

    #[test]
    fn try_recv_sees_nothing_on_an_idle_ring() {
        let ring = ChannelRing::ring(1);
        assert_eq!(ring[0].try_recv(), None);
    }

    #[test]
    fn collective_sum_agrees_on_all_workers() {
        let ring = ChannelRing::ring(4);
        let handles: Vec<_> = ring
            .into_iter()
            .map(|t| thread::spawn(move || (0..3).map(|round| t.sum(t.rank() as i32 + round)).collect::<Vec<_>>()))
            .collect();
        for h in handles {
            // per round: 0+1+2+3 plus 4 * round
            assert_eq!(h.join().unwrap(), vec![6, 10, 14]);
        }
    }

    #[test]
    fn barrier_releases_everyone() {
        let ring = ChannelRing::ring(3);
        let handles: Vec<_> = ring
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    t.barrier();
                    t.sum(1)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
    }
}
