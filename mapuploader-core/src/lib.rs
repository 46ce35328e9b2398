#![doc = "mapuploader-core: core pipeline library for mapuploader."]

//! This crate holds the data model, the contracts for every external system
//! and the pipeline that sequences them:
//! credentials → staged upload → processing trigger.
//! It performs no network I/O itself; concrete clients live in the CLI crate.
//!
//! # Usage
//! Implement [`contract::CredentialBroker`], [`contract::StoreConnector`] and
//! [`contract::ProcessingTrigger`], then call [`publish::publish`].

pub mod contract;
pub mod error;
pub mod model;
pub mod publish;
pub mod staging;

pub use error::{BoxError, PipelineError, Stage};
pub use model::{Account, CredentialSet, StagedObject, TriggerResponse, UploadJob, UploadRequest};
pub use publish::{publish, PipelineReport, PipelineState};
