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

//! Typed inter-worker messages and their wire encoding.
//!
//! On the wire every message is an integer tag plus one fixed 24-byte
//! payload record `{sender_gid: u64, receiver_gid: u64, value: i32,
//! pass: i32}`, little endian. The tag decides which payload fields are
//! meaningful; the token and step-transition messages carry a zeroed record.
//! The tag values are stable across workers and releases.

use crate::graph::GlobalId;

use std::error;
use std::fmt;

/// Size of the payload record in bytes.
pub const WIRE_LEN: usize = 24;

/// A message exchanged between workers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Message {
    /// Label the receiver vertex, reached over a forward edge of the sender.
    SetToLabel {
        sender: GlobalId,
        receiver: GlobalId,
        value: i32,
        pass: i32,
    },
    /// Compute and set the label of the receiver vertex, reached over a
    /// reverse edge; the receiver's worker owns the flow and finishes the
    /// computation.
    ComputeFromLabel {
        sender: GlobalId,
        receiver: GlobalId,
        value: i32,
        pass: i32,
    },
    /// The sink has been labeled; move on to back-tracking.
    SinkFound,
    /// Continue the back-track at the receiver vertex with the given delta.
    UpdateFlow {
        sender: GlobalId,
        receiver: GlobalId,
        value: i32,
        pass: i32,
    },
    /// The back-track reached the source; leave step 3.
    SourceFound,
    /// Flow total of the source's worker, sent to worker 0 after the solve.
    TotalFlow { value: i32 },
    /// Termination-detection token.
    TokenWhite,
    /// Termination-detection token after a backwards send.
    TokenRed,
    /// Worker 0 requests the collective empty-queue sum.
    CheckTermination,
}

/// Wire tags, one per message variant.
pub mod tag {
    pub const SET_TO_LABEL: i32 = 1;
    pub const COMPUTE_FROM_LABEL: i32 = 2;
    pub const SINK_FOUND: i32 = 3;
    pub const UPDATE_FLOW: i32 = 4;
    pub const SOURCE_FOUND: i32 = 5;
    pub const TOTAL_FLOW: i32 = 6;
    pub const TOKEN_WHITE: i32 = 7;
    pub const TOKEN_RED: i32 = 8;
    pub const CHECK_TERMINATION: i32 = 9;
}

/// A frame with an unknown tag arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub tag: i32,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        write!(fmt, "invalid message tag {}", self.tag)
    }
}

impl error::Error for DecodeError {}

impl Message {
    /// The wire tag of this message.
    pub fn tag(&self) -> i32 {
        use self::Message::*;
        match self {
            SetToLabel { .. } => tag::SET_TO_LABEL,
            ComputeFromLabel { .. } => tag::COMPUTE_FROM_LABEL,
            SinkFound => tag::SINK_FOUND,
            UpdateFlow { .. } => tag::UPDATE_FLOW,
            SourceFound => tag::SOURCE_FOUND,
            TotalFlow { .. } => tag::TOTAL_FLOW,
            TokenWhite => tag::TOKEN_WHITE,
            TokenRed => tag::TOKEN_RED,
            CheckTermination => tag::CHECK_TERMINATION,
        }
    }

    /// Human-readable name of a wire tag, for logging.
    pub fn tag_name(t: i32) -> &'static str {
        match t {
            tag::SET_TO_LABEL => "SET_TO_LABEL",
            tag::COMPUTE_FROM_LABEL => "COMPUTE_FROM_LABEL",
            tag::SINK_FOUND => "SINK_FOUND",
            tag::UPDATE_FLOW => "UPDATE_FLOW",
            tag::SOURCE_FOUND => "SOURCE_FOUND",
            tag::TOTAL_FLOW => "TOTAL_FLOW",
            tag::TOKEN_WHITE => "TOKEN_WHITE",
            tag::TOKEN_RED => "TOKEN_RED",
            tag::CHECK_TERMINATION => "CHECK_TERMINATION",
            _ => "INVALID_TAG",
        }
    }

    /// Encode into tag and payload record.
    pub fn encode(&self) -> (i32, [u8; WIRE_LEN]) {
        use self::Message::*;
        let record = match *self {
            SetToLabel {
                sender,
                receiver,
                value,
                pass,
            }
            | ComputeFromLabel {
                sender,
                receiver,
                value,
                pass,
            }
            | UpdateFlow {
                sender,
                receiver,
                value,
                pass,
            } => pack(sender, receiver, value, pass),
            TotalFlow { value } => pack(0, 0, value, 0),
            SinkFound | SourceFound | TokenWhite | TokenRed | CheckTermination => pack(0, 0, 0, 0),
        };
        (self.tag(), record)
    }

    /// Decode a tag and payload record received from a peer.
    pub fn decode(t: i32, record: &[u8; WIRE_LEN]) -> Result<Message, DecodeError> {
        let (sender, receiver, value, pass) = unpack(record);
        match t {
            tag::SET_TO_LABEL => Ok(Message::SetToLabel {
                sender,
                receiver,
                value,
                pass,
            }),
            tag::COMPUTE_FROM_LABEL => Ok(Message::ComputeFromLabel {
                sender,
                receiver,
                value,
                pass,
            }),
            tag::SINK_FOUND => Ok(Message::SinkFound),
            tag::UPDATE_FLOW => Ok(Message::UpdateFlow {
                sender,
                receiver,
                value,
                pass,
            }),
            tag::SOURCE_FOUND => Ok(Message::SourceFound),
            tag::TOTAL_FLOW => Ok(Message::TotalFlow { value }),
            tag::TOKEN_WHITE => Ok(Message::TokenWhite),
            tag::TOKEN_RED => Ok(Message::TokenRed),
            tag::CHECK_TERMINATION => Ok(Message::CheckTermination),
            _ => Err(DecodeError { tag: t }),
        }
    }
}

fn pack(sender: GlobalId, receiver: GlobalId, value: i32, pass: i32) -> [u8; WIRE_LEN] {
    let mut record = [0; WIRE_LEN];
    record[0..8].copy_from_slice(&sender.to_le_bytes());
    record[8..16].copy_from_slice(&receiver.to_le_bytes());
    record[16..20].copy_from_slice(&value.to_le_bytes());
    record[20..24].copy_from_slice(&pass.to_le_bytes());
    record
}

fn unpack(record: &[u8; WIRE_LEN]) -> (GlobalId, GlobalId, i32, i32) {
    let mut gid = [0; 8];
    let mut word = [0; 4];
    gid.copy_from_slice(&record[0..8]);
    let sender = GlobalId::from_le_bytes(gid);
    gid.copy_from_slice(&record[8..16]);
    let receiver = GlobalId::from_le_bytes(gid);
    word.copy_from_slice(&record[16..20]);
    let value = i32::from_le_bytes(word);
    word.copy_from_slice(&record[20..24]);
    let pass = i32::from_le_bytes(word);
    (sender, receiver, value, pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout_is_stable() {
        let msg = Message::SetToLabel {
            sender: 0x0102030405060708,
            receiver: 0x1112131415161718,
            value: -2,
            pass: 3,
        };
        let (t, record) = msg.encode();
        assert_eq!(t, 1);
        assert_eq!(
            record,
            [
                0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // sender, little endian
                0x18, 0x17, 0x16, 0x15, 0x14, 0x13, 0x12, 0x11, // receiver
                0xfe, 0xff, 0xff, 0xff, // value
                0x03, 0x00, 0x00, 0x00, // pass
            ]
        );
        assert_eq!(Message::decode(t, &record), Ok(msg));
    }

    #[test]
    fn zero_payload_tags() {
        for msg in [
            Message::SinkFound,
            Message::SourceFound,
            Message::TokenWhite,
            Message::TokenRed,
            Message::CheckTermination,
        ] {
            let (t, record) = msg.encode();
            assert_eq!(record, [0; WIRE_LEN]);
            assert_eq!(Message::decode(t, &record), Ok(msg));
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert_eq!(Message::decode(42, &[0; WIRE_LEN]), Err(DecodeError { tag: 42 }));
        assert_eq!(Message::tag_name(42), "INVALID_TAG");
    }

    #[test]
    fn total_flow_keeps_only_the_value() {
        let (t, record) = Message::TotalFlow { value: 211846 }.encode();
        assert_eq!(t, 6);
        assert_eq!(Message::decode(t, &record), Ok(Message::TotalFlow { value: 211846 }));
    }
}
