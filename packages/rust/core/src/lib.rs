//! Core import orchestration for rosterbook.
//!
//! This crate ties normalization, parsing, and storage together into
//! end-to-end workflows: roster booklet imports, location seed imports, and
//! the per-series stats report.

pub mod locations;
pub mod pipeline;
pub mod stats;
