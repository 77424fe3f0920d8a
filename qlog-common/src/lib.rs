//! # QLog Common Library
//!
//! Shared code for the QLog confirmation tooling including:
//! - Band and mode vocabulary shared with the local contact log
//! - Callsign canonicalization
//! - ADIF date/time helpers
//! - Bootstrap configuration loading and logging setup

pub mod band;
pub mod callsign;
pub mod config;
pub mod error;
pub mod logging;
pub mod mode;
pub mod time;

pub use band::Band;
pub use error::{Error, Result};
pub use mode::{Mode, ModeGroup};
