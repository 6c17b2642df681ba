//! Error type for the setup flow and its mapping onto protocol responses.

use hub_core::protocol::messages::ErrorPayload;
use hub_core::ConfigurationError;
use thiserror::Error;

use crate::application::ports::{SendError, StoreError};

/// Generic message for failures the user cannot act on beyond restarting.
const RESTART_SETUP: &str = "invalid setup step, restart setup";

/// Everything that can go wrong while handling a setup submission.
///
/// Every variant ends up as an error response on the originating request;
/// none of them escape the dispatcher.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The socket has no active setup step.
    #[error("setup step not found, restart setup")]
    StepNotFound,

    /// Neither `confirm` nor `input_values` was supplied.
    #[error("confirm or input_values required")]
    MissingInput,

    /// The submission does not fit the socket's current step.
    #[error("invalid setup step")]
    InvalidStep,

    #[error("reconfigure target not found, restart setup")]
    ReconfigureTargetMissing,

    /// The recorded reconfigure target no longer exists in the store.
    #[error("entity '{0}' not found, restart setup")]
    EntityNotFound(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("configuration store failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to send: {0}")]
    Send(#[from] SendError),

    #[error("driver handler failed: {0:#}")]
    Handler(anyhow::Error),
}

impl SetupError {
    /// Error body for the response to the originating request.
    pub fn error_payload(&self) -> ErrorPayload {
        match self {
            Self::StepNotFound | Self::ReconfigureTargetMissing | Self::EntityNotFound(_) => {
                ErrorPayload::not_found(self.to_string())
            }
            Self::MissingInput | Self::InvalidStep => ErrorPayload::bad_request(self.to_string()),
            _ => ErrorPayload::bad_request(RESTART_SETUP),
        }
    }

    /// `true` for failures caused by the client's request rather than by
    /// the driver.  Those are logged at `warn`, everything else at `error`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::StepNotFound
                | Self::MissingInput
                | Self::InvalidStep
                | Self::ReconfigureTargetMissing
                | Self::EntityNotFound(_)
                | Self::Configuration(_)
        )
    }
}
