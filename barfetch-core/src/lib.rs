//! barfetch core: domain types, terminal abstraction, normalization, export.
//!
//! This crate contains everything below the run loop:
//! - Domain types (raw and canonical bars, timeframes, export columns)
//! - The `Terminal` trait over the market-data terminal, with an HTTP bridge
//!   client and a deterministic synthetic terminal
//! - The raw-to-canonical bar normalizer
//! - The export engine (per-task CSV files, combined xlsx workbook)
//!
//! Orchestration (task matrix, progress, the run loop itself) lives in
//! `barfetch-runner`.

pub mod domain;
pub mod export;
pub mod normalize;
pub mod terminal;
