//! High-level pipeline: credentials → staged upload → processing trigger.
//!
//! [`publish`] sequences the three external hand-offs for one local file:
//!   - fetch temporary staging credentials through a [`CredentialBroker`]
//!   - build a store client from exactly those credentials and put the file
//!   - ask the platform, through a [`ProcessingTrigger`], to turn the staged
//!     object into the tileset `<user>.<name>`
//!
//! # Responsibilities
//! - Fail fast: the first failing stage ends the run, nothing is retried or rolled back
//! - Validate caller input before any network call
//! - Trace every state transition (`[PUBLISH]` events)
//!
//! # States
//! `Start → CredentialsFetched → Uploaded → Triggered → Done`, or
//! `Failed(stage)` from any of them. A retry means a new run from `Start`.

use std::fmt;

use tracing::{error, info};

use crate::contract::{CredentialBroker, ProcessingTrigger, StoreConnector};
use crate::error::{PipelineError, Stage};
use crate::model::{Account, StagedObject, TriggerResponse, UploadRequest};
use crate::staging::stage_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    CredentialsFetched,
    Uploaded,
    Triggered,
    Done,
    Failed(Stage),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Start => f.write_str("start"),
            PipelineState::CredentialsFetched => f.write_str("credentials_fetched"),
            PipelineState::Uploaded => f.write_str("uploaded"),
            PipelineState::Triggered => f.write_str("triggered"),
            PipelineState::Done => f.write_str("done"),
            PipelineState::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct PipelineReport {
    pub tileset_id: String,
    pub staged: StagedObject,
    pub trigger: TriggerResponse,
    /// States passed through, in order; ends with [`PipelineState::Done`].
    pub states: Vec<PipelineState>,
}

struct Transitions {
    states: Vec<PipelineState>,
}

impl Transitions {
    fn start() -> Self {
        info!(state = %PipelineState::Start, "[PUBLISH] Starting publish pipeline");
        Self {
            states: vec![PipelineState::Start],
        }
    }

    fn advance(&mut self, state: PipelineState) {
        info!(%state, "[PUBLISH] State transition");
        self.states.push(state);
    }

    fn fail(&self, err: PipelineError) -> PipelineError {
        let state = PipelineState::Failed(err.stage());
        error!(%state, error = %err, "[PUBLISH][ERROR] Pipeline halted");
        err
    }
}

pub async fn publish<B, C, T>(
    account: &Account,
    request: &UploadRequest,
    broker: &B,
    connector: &C,
    trigger: &T,
) -> Result<PipelineReport, PipelineError>
where
    B: CredentialBroker + ?Sized,
    C: StoreConnector + ?Sized,
    T: ProcessingTrigger + ?Sized,
{
    let mut run = Transitions::start();

    if let Err(e) = account.validate().and_then(|_| request.validate()) {
        return Err(run.fail(e));
    }
    let tileset_id = account.tileset_id(&request.tileset_name);
    info!(
        user = %account.user_name,
        tileset = %tileset_id,
        file = %request.file_path.display(),
        "[PUBLISH] Request validated"
    );

    // --- Step 1: Credentials ---
    let credentials = match broker.fetch_credentials(account).await {
        Ok(creds) => creds,
        Err(e) => return Err(run.fail(e)),
    };
    if let Err(e) = credentials.ensure_complete() {
        return Err(run.fail(e));
    }
    info!(bucket = %credentials.bucket, key = %credentials.key, "[PUBLISH] Staging credentials received");
    run.advance(PipelineState::CredentialsFetched);

    // --- Step 2: Staged upload ---
    let store = match connector.connect(&credentials) {
        Ok(store) => store,
        Err(source) => {
            return Err(run.fail(PipelineError::Upload {
                bucket: credentials.bucket.clone(),
                key: credentials.key.clone(),
                source,
            }))
        }
    };
    let staged = match stage_file(store.as_ref(), &credentials, &request.file_path).await {
        Ok(staged) => staged,
        Err(e) => return Err(run.fail(e)),
    };
    run.advance(PipelineState::Uploaded);

    // --- Step 3: Trigger ---
    let response = match trigger
        .start_processing(account, &credentials.url, &request.tileset_name)
        .await
    {
        Ok(resp) => resp,
        Err(e) => return Err(run.fail(e)),
    };
    info!(
        status = response.status,
        upload_id = response.job.as_ref().and_then(|j| j.id.as_deref()).unwrap_or("-"),
        "[PUBLISH] Tileset processing requested"
    );
    run.advance(PipelineState::Triggered);
    run.advance(PipelineState::Done);

    Ok(PipelineReport {
        tileset_id,
        staged,
        trigger: response,
        states: run.states,
    })
}
