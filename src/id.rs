//! Snowflake-style ids: 41-bit milliseconds since the epoch below, 10-bit node id, 12-bit sequence.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// 2010-11-04 01:42:54.657 UTC.
pub const EPOCH_MS: u64 = 1_288_834_974_657;

const NODE_BITS: u32 = 10;
const SEQ_BITS: u32 = 12;
const MAX_NODE: u16 = (1 << NODE_BITS) - 1;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;

#[derive(Debug, Default)]
struct Clock {
    last_ms: u64,
    seq: u64,
}

/// Time-ordered unique id source for one node. Ids are rendered as decimal strings.
#[derive(Debug)]
pub struct IdGenerator {
    node: u64,
    clock: Mutex<Clock>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MS)
}

impl IdGenerator {
    /// Node ids above 1023 are masked to 10 bits.
    pub fn new(node: u16) -> Self {
        IdGenerator {
            node: u64::from(node & MAX_NODE),
            clock: Mutex::new(Clock::default()),
        }
    }

    pub fn node(&self) -> u16 {
        self.node as u16
    }

    pub fn next(&self) -> u64 {
        self.next_at(now_ms())
    }

    /// A clock that steps backwards keeps issuing from the last seen millisecond; an exhausted
    /// sequence moves on to the next millisecond instead of waiting for the wall clock.
    fn next_at(&self, now: u64) -> u64 {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        if now > clock.last_ms {
            clock.last_ms = now;
            clock.seq = 0;
        } else {
            clock.seq = (clock.seq + 1) & SEQ_MASK;
            if clock.seq == 0 {
                clock.last_ms += 1;
            }
        }
        (clock.last_ms.saturating_sub(EPOCH_MS) << (NODE_BITS + SEQ_BITS)) | (self.node << SEQ_BITS) | clock.seq
    }

    pub fn next_id(&self) -> String {
        self.next().to_string()
    }
}

/// Node id embedded in an id.
pub fn node_of(id: u64) -> u16 {
    ((id >> SEQ_BITS) & u64::from(MAX_NODE)) as u16
}

/// Milliseconds since the unix epoch at which an id was issued.
pub fn timestamp_of(id: u64) -> u64 {
    (id >> (NODE_BITS + SEQ_BITS)) + EPOCH_MS
}
