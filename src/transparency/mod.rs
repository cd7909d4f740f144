//! Transparency module for the screening service.
//!
//! Tracks how many screenings ran and how they were resolved, so operators
//! can see at a glance when the service has been running on simulated scores.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
