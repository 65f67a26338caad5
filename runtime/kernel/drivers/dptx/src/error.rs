// Licensed under the Apache-2.0 license

use crate::hil::HilError;
use thiserror::Error;

/// Terminal status of a configuration pass or user option request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpTxError {
    #[error("no sink connected or sink did not answer the capability query")]
    DeviceNotFound,
    #[error("link training failed at both requested and maximum parameters")]
    TrainingFailed,
    #[error("requested video configuration exceeds the link bandwidth")]
    Oversubscribed,
    #[error("payload table update failed; the link must be retrained")]
    DataLost,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("collaborator failure: {0:?}")]
    Collaborator(HilError),
}

impl From<HilError> for DpTxError {
    fn from(err: HilError) -> Self {
        match err {
            HilError::NotConnected => DpTxError::DeviceNotFound,
            other => DpTxError::Collaborator(other),
        }
    }
}
