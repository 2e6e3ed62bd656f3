#![doc = "kb-upload-core: scanning, upload, association and coordination logic for kb-upload."]

//! The pipeline is split by phase: [`scan`] enumerates files, [`uploader`]
//! and [`associate`] perform the two retried network operations against a
//! [`contract::KnowledgeApi`], and [`pipeline`] runs them over a bounded pool
//! and tallies the outcome. Transport lives behind the trait; see the
//! `kb-upload` crate for the HTTP client.

pub mod associate;
pub mod config;
pub mod contract;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod uploader;
