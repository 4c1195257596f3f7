//! Audio half of the lifecycle coordinator.
//!
//! `ModelSlot` exclusively owns the active model. Every method except
//! `prepare` runs on the audio thread and must not allocate or block; models
//! arrive from the loader through a lock-free ring and leave through another.

use crate::aic_log;
use crate::error::LifecycleError;
use crate::loader::{LoadedModel, LoaderCommand, LoaderPorts};
use crate::models::{descriptor, ModelState, ModelUiInfo};
use crate::sdk::{AudioConfig, EnhancementModel};
use crate::status::SharedStatus;
use crossbeam_channel::TrySendError;
use log::{info, warn};
use std::sync::Arc;

struct ActiveModel {
    index: usize,
    model: Box<dyn EnhancementModel>,
    /// Initialized against the slot's current configuration
    ready: bool,
}

pub struct ModelSlot {
    status: Arc<SharedStatus>,
    ports: LoaderPorts,
    active: Option<ActiveModel>,
    config: Option<AudioConfig>,
    requested_index: usize,
    request_pending: bool,
    /// Set when a fresh build was discarded for a stale configuration; the
    /// replacement must be built even if an older model is still usable.
    rebuild_forced: bool,
}

impl ModelSlot {
    pub(crate) fn new(status: Arc<SharedStatus>, ports: LoaderPorts, initial_index: usize) -> Self {
        Self {
            status,
            ports,
            active: None,
            config: None,
            requested_index: initial_index,
            request_pending: false,
            rebuild_forced: false,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    pub fn has_model(&self) -> bool {
        self.active.is_some()
    }

    /// Output delay of the active model in samples, 0 when none is ready.
    pub fn latency_samples(&self) -> u32 {
        match &self.active {
            Some(a) if a.ready => a.model.output_delay() as u32,
            _ => 0,
        }
    }

    /// Host prepare step. Not real-time safe: initializes the active model
    /// against `config` and tells the loader about it. Returns the latency to
    /// report to the host.
    pub fn prepare(&mut self, config: AudioConfig, requested_index: usize) -> u32 {
        self.config = Some(config);
        if self
            .ports
            .requests
            .send(LoaderCommand::Configure(config))
            .is_err()
        {
            warn!("Model loader is gone; configuration not forwarded");
        }

        // A model built before any configuration existed is initialized here
        // rather than rebuilt.
        self.adopt_published(requested_index, true);
        self.track_selector(requested_index);

        if let Some(active) = self.active.as_mut() {
            match active.model.initialize(&config) {
                Ok(()) => {
                    active.ready = true;
                    info!("Model initialized for {:?}", config);
                }
                Err(e) => {
                    active.ready = false;
                    warn!("Model rejected {:?}: {}", config, e);
                }
            }
            self.publish_active();
        }

        if self.request_pending {
            self.send_request();
        }

        self.status.notify_prepare_called();
        self.latency_samples()
    }

    /// Once per block: adopt freshly built models and forward selector changes
    /// to the loader. Returns true when the active model was replaced.
    pub fn sync(&mut self, requested_index: usize) -> bool {
        let changed = self.adopt_published(requested_index, false);
        self.track_selector(requested_index);
        if self.request_pending {
            self.send_request();
        }
        changed
    }

    /// The active model, if it may process audio right now.
    pub fn ready_model(&mut self) -> Result<&mut dyn EnhancementModel, LifecycleError> {
        if !self.status.is_license_valid() {
            return Err(LifecycleError::LicenseInactive);
        }
        if self.config.is_none() {
            return Err(LifecycleError::ConfigurationNotReady);
        }
        match self.active.as_mut() {
            None => Err(LifecycleError::ModelNotLoaded),
            Some(a) if !a.ready => Err(LifecycleError::ConfigurationNotReady),
            Some(a) => Ok(a.model.as_mut()),
        }
    }

    /// Host reset: clear the active model's internal state.
    pub fn reset(&mut self) {
        if let Some(active) = self.active.as_mut().filter(|a| a.ready) {
            if let Err(e) = active.model.reset() {
                aic_log!("model reset failed: {}", e);
            }
        }
    }

    fn adopt_published(&mut self, requested_index: usize, preparing: bool) -> bool {
        let mut changed = false;
        while let Some(loaded) = self.ports.inbox.pop() {
            if loaded.index != requested_index {
                aic_log!("discarding stale model {}", loaded.index);
                self.retire(loaded.model);
                continue;
            }
            if !self.status.is_license_valid() {
                aic_log!("license revoked, discarding model {}", loaded.index);
                self.retire(loaded.model);
                continue;
            }
            let unconfigured = preparing && loaded.config.is_none();
            if loaded.config != self.config && !unconfigured {
                aic_log!("model {} built for a stale configuration", loaded.index);
                self.retire(loaded.model);
                self.request_pending = true;
                self.rebuild_forced = true;
                continue;
            }
            self.activate(loaded);
            changed = true;
        }
        changed
    }

    fn track_selector(&mut self, requested_index: usize) {
        if requested_index != self.requested_index {
            self.requested_index = requested_index;
            self.request_pending = true;
        }
    }

    fn send_request(&mut self) {
        if !self.status.is_license_valid() {
            // The controller requests a build itself once a key is accepted.
            self.request_pending = false;
            self.rebuild_forced = false;
            return;
        }
        let up_to_date = self
            .active
            .as_ref()
            .map_or(false, |a| a.index == self.requested_index && a.ready);
        if up_to_date && !self.rebuild_forced {
            self.request_pending = false;
            return;
        }

        match self.ports.requests.try_send(LoaderCommand::Build {
            index: self.requested_index,
        }) {
            Ok(()) => {
                self.request_pending = false;
                self.rebuild_forced = false;
                self.status.set_model_state(ModelState::Loading);
            }
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                self.request_pending = false;
                self.rebuild_forced = false;
            }
        }
    }

    fn activate(&mut self, loaded: LoadedModel) {
        let LoadedModel {
            index,
            model,
            initialized,
            ..
        } = loaded;
        let previous = self.active.replace(ActiveModel {
            index,
            model,
            ready: initialized && self.config.is_some(),
        });
        if let Some(old) = previous {
            self.retire(old.model);
        }
        aic_log!("model {} active", index);
        self.publish_active();
        self.status.notify_model_changed();
    }

    fn publish_active(&self) {
        let active = match &self.active {
            Some(a) => a,
            None => return,
        };
        self.status.set_active_index(Some(active.index));

        if !active.ready {
            self.status.set_latency_samples(0);
            // Before the first prepare there is nothing to be wrong about yet.
            let state = match self.config {
                Some(_) => ModelState::WrongAudioSettings,
                None => ModelState::Loading,
            };
            self.status.set_model_state(state);
            return;
        }

        let sample_rate = self.config.map_or(0, |c| c.sample_rate);
        let delay = active.model.output_delay();
        let info = ModelUiInfo::new(
            descriptor(active.index),
            active.model.optimal_sample_rate(),
            active.model.optimal_num_frames(),
            delay,
            sample_rate,
        );
        self.status.set_model_info(&info);
        self.status.set_latency_samples(delay as u32);
        self.status.set_model_state(ModelState::Initialized);
    }

    /// Hand a model back to the loader so it is dropped off the audio thread.
    fn retire(&mut self, model: Box<dyn EnhancementModel>) {
        if let Err(model) = self.ports.retire.push(model) {
            aic_log!("retire queue full, dropping model in place");
            assert_no_alloc::permit_alloc(move || drop(model));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadedModel;
    use crate::testing::{MockFactory, MOCK_DELAY};
    use crossbeam_channel::{bounded, Receiver};
    use ringbuf::{Consumer, Producer, RingBuffer};

    /// A slot wired to queues the test drives by hand instead of a loader thread.
    struct Harness {
        slot: ModelSlot,
        status: Arc<SharedStatus>,
        factory: MockFactory,
        requests: Receiver<LoaderCommand>,
        publish: Producer<LoadedModel>,
        retired: Consumer<Box<dyn EnhancementModel>>,
    }

    impl Harness {
        fn new(initial_index: usize) -> Self {
            let (tx, rx) = bounded(8);
            let (publish, inbox) = RingBuffer::<LoadedModel>::new(4).split();
            let (retire, retired) = RingBuffer::<Box<dyn EnhancementModel>>::new(4).split();
            let status = Arc::new(SharedStatus::new());
            status.accept_license();
            let ports = LoaderPorts {
                requests: tx,
                inbox,
                retire,
            };
            Self {
                slot: ModelSlot::new(status.clone(), ports, initial_index),
                status,
                factory: MockFactory::new(),
                requests: rx,
                publish,
                retired,
            }
        }

        fn publish(&mut self, index: usize, config: Option<AudioConfig>) {
            let mut model = self.factory.create_direct();
            let initialized = match &config {
                Some(c) => model.initialize(c).is_ok(),
                None => false,
            };
            let loaded = LoadedModel {
                index,
                model,
                config,
                initialized,
            };
            assert!(self.publish.push(loaded).is_ok());
        }

        fn builds(&self) -> Vec<usize> {
            self.requests
                .try_iter()
                .filter_map(|cmd| match cmd {
                    LoaderCommand::Build { index } => Some(index),
                    _ => None,
                })
                .collect()
        }
    }

    fn cfg() -> AudioConfig {
        AudioConfig::new(48_000, 2, 512)
    }

    #[test]
    fn test_block_before_prepare_is_not_ready() {
        let mut h = Harness::new(0);
        assert!(matches!(
            h.slot.ready_model(),
            Err(LifecycleError::ConfigurationNotReady)
        ));
    }

    #[test]
    fn test_matching_model_is_activated() {
        let mut h = Harness::new(1);
        h.slot.prepare(cfg(), 1);
        h.publish(1, Some(cfg()));

        assert!(h.slot.sync(1));
        assert_eq!(h.slot.active_index(), Some(1));
        assert!(h.slot.ready_model().is_ok());
        assert!(h.status.take_model_changed());
        assert_eq!(h.status.active_index(), Some(1));
        assert_eq!(h.status.latency_samples(), MOCK_DELAY as u32);
        assert_eq!(h.status.model_state(), ModelState::Initialized);
    }

    #[test]
    fn test_model_for_superseded_index_is_retired() {
        let mut h = Harness::new(2);
        h.slot.prepare(cfg(), 2);
        h.publish(2, Some(cfg()));

        assert!(!h.slot.sync(5));
        assert!(!h.slot.has_model());
        assert!(h.retired.pop().is_some());
        assert_eq!(h.builds(), vec![5]);
    }

    #[test]
    fn test_model_for_stale_config_is_rebuilt() {
        let mut h = Harness::new(3);
        h.slot.prepare(cfg(), 3);
        let _ = h.builds();
        h.publish(3, Some(AudioConfig::new(44_100, 2, 512)));

        assert!(!h.slot.sync(3));
        assert!(!h.slot.has_model());
        assert!(h.retired.pop().is_some());
        assert_eq!(h.builds(), vec![3]);
    }

    #[test]
    fn test_swap_hands_previous_model_back() {
        let mut h = Harness::new(0);
        h.slot.prepare(cfg(), 0);
        h.publish(0, Some(cfg()));
        h.slot.sync(0);

        h.publish(4, Some(cfg()));
        assert!(h.slot.sync(4));
        assert_eq!(h.slot.active_index(), Some(4));
        assert!(h.retired.pop().is_some());
        drop(h.retired.pop());
        assert_eq!(h.factory.live(), 1);
    }

    #[test]
    fn test_selector_change_requests_one_build() {
        let mut h = Harness::new(0);
        h.slot.prepare(cfg(), 0);
        let _ = h.builds();

        h.slot.sync(6);
        h.slot.sync(6);
        h.slot.sync(6);
        assert_eq!(h.builds(), vec![6]);
        assert_eq!(h.status.model_state(), ModelState::Loading);
    }

    #[test]
    fn test_returning_to_active_model_skips_build() {
        let mut h = Harness::new(1);
        h.slot.prepare(cfg(), 1);
        h.publish(1, Some(cfg()));
        h.slot.sync(1);
        let _ = h.builds();

        h.slot.sync(2);
        h.slot.sync(1);
        assert_eq!(h.builds(), vec![2]);
    }

    #[test]
    fn test_no_build_requests_without_license() {
        let mut h = Harness::new(0);
        h.status.revoke_license();
        h.slot.prepare(cfg(), 0);
        h.slot.sync(3);
        assert!(h.builds().is_empty());
        assert!(matches!(
            h.slot.ready_model(),
            Err(LifecycleError::LicenseInactive)
        ));
    }

    #[test]
    fn test_model_arriving_after_revocation_is_discarded() {
        let mut h = Harness::new(1);
        h.slot.prepare(cfg(), 1);
        h.publish(1, Some(cfg()));
        h.slot.sync(1);

        h.status.revoke_license();
        h.publish(3, Some(cfg()));
        assert!(!h.slot.sync(3));
        assert_eq!(h.slot.active_index(), Some(1));
        assert!(h.retired.pop().is_some());
        assert!(h.builds().is_empty());
    }

    #[test]
    fn test_prepare_reinitializes_active_model() {
        let mut h = Harness::new(0);
        h.publish(0, None);
        h.slot.sync(0);
        assert!(h.slot.has_model());
        assert_eq!(h.status.model_state(), ModelState::Loading);

        let latency = h.slot.prepare(cfg(), 0);
        assert_eq!(latency, MOCK_DELAY as u32);
        assert!(h.slot.ready_model().is_ok());
        assert!(h.status.was_prepare_called());
    }

    #[test]
    fn test_prepare_adopts_model_built_before_configuration() {
        let mut h = Harness::new(2);
        h.publish(2, None);

        let latency = h.slot.prepare(cfg(), 2);
        assert_eq!(latency, MOCK_DELAY as u32);
        assert_eq!(h.slot.active_index(), Some(2));
        assert!(h.slot.ready_model().is_ok());
        assert!(h.retired.pop().is_none());
        assert!(h.builds().is_empty());
    }

    #[test]
    fn test_unconfigured_model_after_prepare_is_rebuilt() {
        let mut h = Harness::new(2);
        h.slot.prepare(cfg(), 2);
        h.publish(2, None);

        assert!(!h.slot.sync(2));
        assert!(!h.slot.has_model());
        assert!(h.retired.pop().is_some());
        assert_eq!(h.builds(), vec![2]);
    }

    #[test]
    fn test_reset_before_prepare_is_ignored() {
        let mut h = Harness::new(0);
        h.publish(0, None);
        h.slot.sync(0);
        h.slot.reset();
        assert_eq!(h.factory.resets(), 0);
    }

    #[test]
    fn test_reset_reaches_prepared_model() {
        let mut h = Harness::new(0);
        h.slot.reset();
        h.slot.prepare(cfg(), 0);
        h.publish(0, Some(cfg()));
        h.slot.sync(0);

        h.slot.reset();
        assert_eq!(h.factory.resets(), 1);
        assert!(h.slot.ready_model().is_ok());
    }

    #[test]
    fn test_rejected_config_reports_wrong_settings() {
        let mut h = Harness::new(0);
        h.slot.prepare(cfg(), 0);
        h.publish(0, Some(cfg()));
        h.slot.sync(0);

        let latency = h.slot.prepare(AudioConfig::new(48_000, 6, 512), 0);
        assert_eq!(latency, 0);
        assert_eq!(h.status.model_state(), ModelState::WrongAudioSettings);
        assert!(matches!(
            h.slot.ready_model(),
            Err(LifecycleError::ConfigurationNotReady)
        ));
    }
}
