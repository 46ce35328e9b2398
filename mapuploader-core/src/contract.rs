#![allow(unused)]

//! # contract: interfaces to the three external systems
//!
//! A publish run talks to the Mapbox uploads API twice and to the staging
//! object store once. Each of those is a trait here so the pipeline can be
//! driven by real clients (see the `mapuploader` crate) or by `mockall` mocks.
//!
//! - [`CredentialBroker`]: exchanges an account for temporary staging credentials.
//! - [`StoreConnector`] / [`ObjectStore`]: builds a store client from those
//!   credentials and writes one object.
//! - [`ProcessingTrigger`]: asks the platform to ingest the staged object.
//!
//! Broker and trigger return [`PipelineError`] directly, since only the
//! implementor can tell a transport failure from a decode failure. The store
//! returns a [`BoxError`] which the staging step wraps with bucket and key.

use async_trait::async_trait;

use mockall::{automock, predicate::*};

use crate::error::{BoxError, PipelineError};
use crate::model::{Account, CredentialSet, TriggerResponse};

/// Source of per-run staging credentials.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Fetch a fresh credential set for the account. One attempt, no retry.
    async fn fetch_credentials(&self, account: &Account) -> Result<CredentialSet, PipelineError>;
}

/// A store client authorised with one credential set.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Single put of the whole body to `bucket`/`key`, creating or overwriting it.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError>;
}

/// Builds an [`ObjectStore`] whose only authorisation is the given credentials.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait StoreConnector: Send + Sync {
    fn connect(&self, credentials: &CredentialSet) -> Result<Box<dyn ObjectStore>, BoxError>;
}

/// Starts tileset processing of a staged object.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProcessingTrigger: Send + Sync {
    /// Enqueue processing of `staging_url` into `<user>.<tileset_name>`.
    ///
    /// Completion of the remote job is not awaited.
    async fn start_processing(
        &self,
        account: &Account,
        staging_url: &str,
        tileset_name: &str,
    ) -> Result<TriggerResponse, PipelineError>;
}
