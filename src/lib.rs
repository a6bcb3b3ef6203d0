//! hiddeck - drive Elgato Stream Deck panels through raw Linux hidraw nodes.
//!
//! The library backs the `hiddeck` binary and can be embedded directly.
//!
//! # Modules
//!
//! - `device`: capability table, sysfs discovery, sessions and the key scanner
//! - `error`: Error types with user-recoverable hints
//! - `image_ops`: key image fitting, BMP/JPEG encoding and pagination
//! - `pipeline`: image transfer over a session
//! - `text`: label compositing
//! - `logging`: tracing subscriber setup

#![deny(unsafe_code)]

pub mod cli;
pub mod device;
pub mod error;
pub mod image_ops;
pub mod logging;
pub mod pipeline;
pub mod text;
