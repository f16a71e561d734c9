//! Core dataset generation for release-notes Q&A.
//!
//! This crate ties together note bucketing, question synthesis, paraphrasing,
//! and answer selection into end-to-end workflows (e.g., `generate_dataset`),
//! plus the post-processing passes run over finished datasets.

pub mod answer;
pub mod buckets;
pub mod curate;
pub mod jsonl;
pub mod manifest;
pub mod paraphrase;
pub mod pipeline;
pub mod prune;
pub mod questions;
