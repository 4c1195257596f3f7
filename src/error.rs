//! Error taxonomy for the model lifecycle.
//!
//! None of these are fatal: callers degrade to pass-through audio or keep the
//! license panel open.

use crate::license::LicenseError;
use crate::sdk::SdkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No license file, or an empty key
    #[error("no license key found")]
    LicenseMissing,

    /// The SDK refused the key during a probe
    #[error("license key is not valid: {0}")]
    LicenseInvalid(#[source] SdkError),

    /// The SDK refused to build a model even though the key probed fine
    #[error("model could not be created: {0}")]
    ModelCreateFailed(#[source] SdkError),

    #[error("license file error: {0}")]
    FileIo(#[from] LicenseError),

    /// An audio block arrived before the host prepared a configuration, or the
    /// active model rejected it
    #[error("audio configuration has not been prepared")]
    ConfigurationNotReady,

    // Audio-path reasons for pass-through. These carry no heap data.
    #[error("license is not active")]
    LicenseInactive,

    #[error("no model has been loaded yet")]
    ModelNotLoaded,

    #[error("model failed to process: {0}")]
    Processing(#[source] SdkError),
}

impl LifecycleError {
    /// Whether this is one of the quiet pass-through reasons reported from the
    /// audio path, as opposed to a control-side failure worth surfacing.
    pub fn is_pass_through(&self) -> bool {
        matches!(
            self,
            LifecycleError::LicenseInactive
                | LifecycleError::ModelNotLoaded
                | LifecycleError::ConfigurationNotReady
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_reasons() {
        assert!(LifecycleError::LicenseInactive.is_pass_through());
        assert!(LifecycleError::ConfigurationNotReady.is_pass_through());
        assert!(!LifecycleError::LicenseMissing.is_pass_through());
        assert!(!LifecycleError::Processing(SdkError::BufferMismatch).is_pass_through());
    }

    #[test]
    fn test_rejected_key_error_keeps_sdk_source() {
        use std::error::Error;
        let err = LifecycleError::LicenseInvalid(SdkError::LicenseRejected);
        assert_eq!(err.to_string(), "license key is not valid: license key was rejected");
        assert!(err.source().is_some());
    }
}
