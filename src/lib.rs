//! Per-subject segmentation pipeline for multi-site spinal cord MRI studies.
//!
//! The heart of the crate is deterministic resolution of "which file is the
//! right one" for a subject ([`naming`]), wrapped in a fail-fast stage
//! sequence ([`pipeline`]) that stages inputs, enforces existence of the
//! resolved image and its ground truth, and drives the external segmentation
//! script for the spinal cord and lesion targets.

pub mod annotations;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod naming;
pub mod pipeline;
pub mod segment;
pub mod staging;
