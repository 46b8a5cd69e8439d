//! Speaker-activity ledger
//!
//! Join/leave events are kept as raw intervals and merged into one
//! duration-annotated entry per stable `StatsId`, so a participant who
//! reconnects still shows up once in the report.

mod ledger;
pub mod merge;
mod report;

pub use ledger::{EntryPatch, LedgerEntry, SpeakerLedger};
pub use merge::{get_duration, get_overlap, merge};
pub use report::{format_elapsed, SpeakerStatsReport, SpeakerStatsRow};
