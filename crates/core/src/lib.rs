//! Domain types shared by every `vitals-*` crate.
//!
//! Zero internal dependencies: sensor descriptors, readings, the status
//! state machine values, the bounded history window and clock sources.

pub mod clock;
pub mod error;
pub mod history;
pub mod module;
pub mod reading;
pub mod status;
pub mod types;

pub use clock::{Clock, DisplayZone, ManualClock, SystemClock};
pub use error::CoreError;
pub use history::{History, HISTORY_CAPACITY};
pub use module::{default_fleet, validate_fleet, ModuleDescriptor};
pub use reading::{Reading, ReadingRange};
pub use status::Status;
pub use types::{epoch_secs, Timestamp};
