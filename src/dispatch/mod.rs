//! The operator-driven send loop over a campaign's recipients.

pub mod controller;
pub mod cursor;
pub mod endpoints;
pub mod progress;
pub mod session;

pub use controller::{
    DispatchController, DispatchOutcome, OverrideOutcome, SessionSnapshot, AUTO_ADVANCE_DELAY,
};
pub use cursor::resolve_cursor;
pub use endpoints::*;
pub use progress::Progress;
