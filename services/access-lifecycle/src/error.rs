use std::time::Duration;

use permit_common::SubjectId;
use permit_errors::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Subject {0} not found")]
    SubjectNotFound(SubjectId),
    #[error("Subject {0} is already running")]
    AlreadyRunning(SubjectId),
    #[error("Lifecycle for subject {0} has terminated")]
    Terminated(SubjectId),
    #[error("Provisioning {operation} failed for application {application_name}: {source}")]
    ProvisioningFailed {
        operation: &'static str,
        application_name: String,
        source: AppError,
    },
    #[error("Provisioning {operation} for application {application_name} timed out after {timeout:?}")]
    ProvisioningTimedOut {
        operation: &'static str,
        application_name: String,
        timeout: Duration,
    },
}

impl From<LifecycleError> for AppError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::SubjectNotFound(_) => AppError::NotFound(error.to_string()),
            LifecycleError::AlreadyRunning(_) => AppError::Conflict(error.to_string()),
            LifecycleError::Terminated(_) => AppError::FailedPrecondition(error.to_string()),
            LifecycleError::ProvisioningFailed { .. } => {
                AppError::ExternalService(error.to_string())
            }
            LifecycleError::ProvisioningTimedOut { .. } => AppError::Timeout(error.to_string()),
        }
    }
}
