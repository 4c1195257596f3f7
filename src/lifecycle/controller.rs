//! Control half of the lifecycle coordinator.
//!
//! Runs on the UI / main thread. Owns the license store and the loader
//! thread, validates keys with disposable probe models and asks the loader to
//! build the selected model once a key checks out.

use crate::error::LifecycleError;
use crate::license::LicenseStore;
use crate::loader::{LoaderCommand, LoaderThread};
use crate::models::{ModelState, MODELS};
use crate::sdk::{ModelFactory, SdkError};
use crate::status::SharedStatus;
use log::{info, warn};
use std::sync::Arc;

pub struct ModelController {
    factory: Arc<dyn ModelFactory>,
    store: LicenseStore,
    status: Arc<SharedStatus>,
    loader: LoaderThread,
}

impl ModelController {
    pub(crate) fn new(
        factory: Arc<dyn ModelFactory>,
        store: LicenseStore,
        status: Arc<SharedStatus>,
        loader: LoaderThread,
    ) -> Self {
        Self {
            factory,
            store,
            status,
            loader,
        }
    }

    pub fn status(&self) -> &Arc<SharedStatus> {
        &self.status
    }

    pub fn is_license_valid(&self) -> bool {
        self.status.is_license_valid()
    }

    /// Where the license file is expected, for the license panel.
    pub fn license_path(&self) -> String {
        self.store.display_path()
    }

    /// Startup path: pick up a previously saved key, if any.
    pub fn activate_stored_license(&self, model_index: usize) -> Result<(), LifecycleError> {
        let key = match self.store.load() {
            Some(key) => key,
            None => {
                self.mark_invalid();
                return Err(LifecycleError::LicenseMissing);
            }
        };

        if let Err(e) = self.probe(&key) {
            warn!("Stored license key was rejected: {}", e);
            self.mark_invalid();
            return Err(LifecycleError::LicenseInvalid(e));
        }

        info!("Stored license key accepted");
        self.hand_to_loader(key, model_index);
        Ok(())
    }

    /// Validate, persist and activate a key entered by the user.
    ///
    /// A rejected key leaves the file and the current model alone. A key that
    /// validates but cannot be written is reported as `FileIo` and changes
    /// nothing else.
    pub fn submit_license(&self, key: &str, model_index: usize) -> Result<(), LifecycleError> {
        let key = key.trim();
        if key.is_empty() {
            self.mark_invalid();
            return Err(LifecycleError::LicenseMissing);
        }

        if let Err(e) = self.probe(key) {
            warn!("License key was rejected: {}", e);
            self.mark_invalid();
            return Err(LifecycleError::LicenseInvalid(e));
        }

        self.store.save(key)?;

        info!("License key accepted, rebuilding model {}", model_index);
        self.hand_to_loader(key.to_string(), model_index);
        Ok(())
    }

    /// Build and immediately drop a model to see whether the SDK accepts `key`.
    fn probe(&self, key: &str) -> Result<(), SdkError> {
        self.factory.create(MODELS[0].model_type, key).map(drop)
    }

    fn mark_invalid(&self) {
        self.status.revoke_license();
        self.status.set_model_state(ModelState::LicenseInactive);
    }

    fn hand_to_loader(&self, key: String, model_index: usize) {
        let generation = self.status.accept_license();
        self.status.set_model_state(ModelState::Loading);
        self.loader.send(LoaderCommand::SetLicense { key, generation });
        self.loader.send(LoaderCommand::Build { index: model_index });
    }
}
