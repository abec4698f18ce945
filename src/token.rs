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

//! Ring-token termination detection, Dijkstra–Feijen–Gasteren style.
//!
//! Each worker has a color. Sending a message to a worker with a *lower* ring
//! id blackens the sender to red, because such a message may revive work
//! behind the token. A single token circulates: a worker forwards it only
//! while idle, painting it red if the worker itself is red and resetting its
//! own color afterwards. Only a token that arrives *white* at worker 0 may
//! trigger the collective empty-queue check; a white round trip proves that
//! no in-flight message can revive the search.

use crate::message::Message;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Color of a worker or of the token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    White,
    Red,
}

impl Color {
    fn from_u8(v: u8) -> Color {
        if v == 0 {
            Color::White
        } else {
            Color::Red
        }
    }

    /// The token message carrying this color.
    pub fn token_message(self) -> Message {
        match self {
            Color::White => Message::TokenWhite,
            Color::Red => Message::TokenRed,
        }
    }
}

/// Token state of one worker.
pub struct TokenRing {
    /// This worker's color.
    color: AtomicU8,
    /// Color of the token, meaningful only while we hold it.
    token_color: AtomicU8,
    /// Whether this worker currently holds the token.
    have_token: AtomicBool,
}

impl TokenRing {
    pub fn new() -> Self {
        let ring = TokenRing {
            color: AtomicU8::new(0),
            token_color: AtomicU8::new(0),
            have_token: AtomicBool::new(false),
        };
        ring.reset(false);
        ring
    }

    /// Reset for a new pass; `holder` is `true` on worker 0, which starts
    /// every pass holding a white token.
    pub fn reset(&self, holder: bool) {
        self.color.store(Color::White as u8, Ordering::Relaxed);
        self.token_color.store(Color::White as u8, Ordering::Relaxed);
        self.have_token.store(holder, Ordering::Relaxed);
    }

    /// This worker's current color.
    pub fn color(&self) -> Color {
        Color::from_u8(self.color.load(Ordering::Relaxed))
    }

    /// Whether this worker currently holds the token.
    pub fn holds_token(&self) -> bool {
        self.have_token.load(Ordering::Relaxed)
    }

    /// Color of the held token.
    pub fn token_color(&self) -> Color {
        Color::from_u8(self.token_color.load(Ordering::Relaxed))
    }

    /// Record that a message went to a worker with a lower ring id.
    pub fn blacken(&self) {
        self.color.store(Color::Red as u8, Ordering::Relaxed);
    }

    /// Adopt an arriving token with the given color.
    pub fn adopt(&self, color: Color) {
        self.token_color.store(color as u8, Ordering::Relaxed);
        self.have_token.store(true, Ordering::Relaxed);
    }

    /// Repaint the held token; worker 0 uses this to recirculate a red token
    /// as white.
    pub fn repaint(&self, color: Color) {
        self.token_color.store(color as u8, Ordering::Relaxed);
    }

    /// Claim the token for forwarding.
    ///
    /// Returns the color the outgoing token must carry, or `None` if the
    /// token is not here. A red worker taints the token; forwarding resets
    /// the worker to white.
    pub fn take(&self) -> Option<Color> {
        if !self.have_token.swap(false, Ordering::Relaxed) {
            return None;
        }
        let outgoing = if self.color() == Color::Red {
            Color::Red
        } else {
            self.token_color()
        };
        self.color.store(Color::White as u8, Ordering::Relaxed);
        Some(outgoing)
    }
}

impl Default for TokenRing {
    fn default() -> Self {
        TokenRing::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_worker_forwards_the_token_unchanged() {
        let ring = TokenRing::new();
        ring.adopt(Color::White);
        assert_eq!(ring.take(), Some(Color::White));
        assert!(!ring.holds_token());
        // a second take must fail, the token is gone
        assert_eq!(ring.take(), None);
    }

    #[test]
    fn red_worker_taints_the_token() {
        let ring = TokenRing::new();
        ring.blacken();
        ring.adopt(Color::White);
        assert_eq!(ring.take(), Some(Color::Red));
        // forwarding washes the worker white again
        assert_eq!(ring.color(), Color::White);
        ring.adopt(Color::White);
        assert_eq!(ring.take(), Some(Color::White));
    }

    #[test]
    fn red_token_stays_red_through_a_white_worker() {
        let ring = TokenRing::new();
        ring.adopt(Color::Red);
        assert_eq!(ring.take(), Some(Color::Red));
    }

    #[test]
    fn reset_hands_worker_zero_a_white_token() {
        let ring = TokenRing::new();
        ring.blacken();
        ring.adopt(Color::Red);
        ring.reset(true);
        assert!(ring.holds_token());
        assert_eq!(ring.token_color(), Color::White);
        assert_eq!(ring.color(), Color::White);

        ring.reset(false);
        assert!(!ring.holds_token());
    }

    #[test]
    fn worker_zero_recirculates_a_red_token_as_white() {
        let ring = TokenRing::new();
        ring.adopt(Color::Red);
        ring.repaint(Color::White);
        assert_eq!(ring.take(), Some(Color::White));
    }
}
