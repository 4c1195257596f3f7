//! Model lifecycle and license coordination
//!
//! Split in two halves that share a [`SharedStatus`]:
//! - [`ModelController`] lives on the control side (UI, main thread). It owns the
//!   license store and the loader thread.
//! - [`ModelSlot`] lives inside the plugin's audio processing. It owns the active
//!   model and never allocates or blocks outside `prepare`.

pub mod controller;
pub mod slot;

pub use controller::ModelController;
pub use slot::ModelSlot;

use crate::license::LicenseStore;
use crate::loader::LoaderThread;
use crate::sdk::ModelFactory;
use crate::status::SharedStatus;
use std::sync::Arc;

/// Spawn the loader, pick up any stored license and return both halves.
pub fn start(
    factory: Arc<dyn ModelFactory>,
    store: LicenseStore,
    model_index: usize,
) -> (Arc<ModelController>, ModelSlot) {
    let status = Arc::new(SharedStatus::new());
    let (loader, ports) = LoaderThread::spawn(factory.clone(), status.clone());
    if !loader.is_running() {
        log::error!("Model loader unavailable; audio will pass through unprocessed");
    }
    let controller = ModelController::new(factory, store, status.clone(), loader);

    if let Err(e) = controller.activate_stored_license(model_index) {
        log::info!("Starting without an active license: {}", e);
    }

    let slot = ModelSlot::new(status, ports, model_index);
    (Arc::new(controller), slot)
}
