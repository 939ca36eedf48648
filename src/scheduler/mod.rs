//! LED pattern scheduling
//!
//! The scheduler turns "how many hosts are active right now" into "which of
//! them should be lit". It knows nothing about hosts, names, or the network;
//! the leader engine maps positions onto the name-sorted active host list.
//!
//! # Patterns
//!
//! | Pattern | Behaviour (4 slots, fresh state) |
//! |---------|-----------------------------------|
//! | `linear` | lit slot 1, 2, 3, 0, 1, ... |
//! | `alternating` | lit slot 0, 1, 2, 3, 2, 1, 0, 1, ... |
//! | `binary` | counter 0001, 0010, 0011, ... (MSB on the first host) |
//! | `reverse-binary` | same counter, LSB on the first host |
//! | `random` | one random slot, avoiding immediate repeats |
//!
//! # Quick Start
//!
//! ```
//! use ledfleet::scheduler::PatternKind;
//!
//! let mut schedule = PatternKind::Linear.build();
//! assert_eq!(schedule.next(3), vec![false, true, false]);
//! assert_eq!(schedule.next(3), vec![false, false, true]);
//! ```

pub mod error;
pub mod pattern;

// Re-export main types
pub use error::{SchedulerError, SchedulerResult};
pub use pattern::{
    Alternating, Binary, Linear, PatternKind, RandomSlot, ReverseBinary, Schedule,
};
