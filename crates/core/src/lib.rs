//! Domain layer of the InSync notification engine.
//!
//! Everything here is free of I/O: notification kinds and channels, the
//! record status machine, per-user preference matrices, the scheduling
//! planner and its message templates. The storage and directory seams are
//! declared as traits in [`store`] and implemented by `insync-db`.

pub mod clock;
pub mod error;
pub mod notification;
pub mod phone;
pub mod planner;
pub mod preferences;
pub mod status;
pub mod store;
pub mod templates;
pub mod types;
