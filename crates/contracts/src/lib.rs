//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every sample carries a capture timestamp in monotonic microseconds (`timestamp_us`)
//! - The epoch is the first call to [`clock::now_us`] in the process

mod blueprint;
pub mod clock;
mod error;
mod sensor;
mod sensor_source;
mod status;
mod wire;
mod writer;

pub use blueprint::*;
pub use error::*;
pub use sensor::*;
pub use sensor_source::SampleSource;
pub use status::{Status, StatusCode};
pub use wire::*;
pub use writer::{LocalStreamWriter, StreamWriter};
