//! # Engine Module
//!
//! The stateful data pipeline: reading "types" files of labeled examples, loading and
//! typing their structures, and sampling them into batches for training.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Provider settings, iteration schemes and their builder
//! - **Examples** ([`example`]) - Parsed types-file lines and loaded, typed examples
//! - **Loading** ([`extractor`]) - Structure loading, typer assignment, molcaches and caching
//! - **Sampling** ([`samplers`]) - Uniform, balanced, stratified and grouped strategies
//! - **Provider** ([`provider`]) - `ExampleProvider`, the batch-serving front end
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for long-running workflows
//! - **Error Handling** ([`error`]) - Provider error types
//!
//! ## Key Capabilities
//!
//! - **Composable sampling** where stratifiers delegate each partition to an inner sampler
//! - **Epoch accounting** for continuous, large-epoch and small-epoch iteration
//! - **Structure caching** so repeated receptors are parsed and typed once
//! - **Reproducible shuffling** from an optional seed

pub mod config;
pub mod error;
pub mod example;
pub mod extractor;
pub mod progress;
pub mod provider;
pub mod samplers;
