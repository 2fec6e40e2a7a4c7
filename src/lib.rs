//! Receipt courier — batch pipeline for emailing donation receipts.
//!
//! Each run extracts tax identifiers from source PDFs, resolves
//! recipients from the donor roster, stages documents per identifier,
//! sends one rate-limited email per recipient, and archives what was
//! sent.

pub mod archive;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod group;
pub mod logging;
pub mod pipeline;
pub mod roster;
