//! Background model loader
//!
//! Model construction talks to the SDK (allocation, weight loading, license
//! checks), so it never runs on the audio thread. The loader thread:
//! - receives commands over a bounded crossbeam channel (the audio thread only
//!   ever uses `try_send`)
//! - builds and initializes models, publishing them through an SPSC ring
//! - drops models the audio thread hands back through a second SPSC ring
//!
//! Build requests that arrive in a burst are coalesced: only the newest index
//! is built.

use crate::error::LifecycleError;
use crate::models::{descriptor, ModelState};
use crate::sdk::{AudioConfig, EnhancementModel, ModelFactory};
use crate::status::SharedStatus;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{error, info, warn};
use ringbuf::{Consumer, Producer, RingBuffer};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const COMMAND_CAPACITY: usize = 32;
const READY_CAPACITY: usize = 4;
const RETIRE_CAPACITY: usize = 16;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub enum LoaderCommand {
    /// Key accepted by the controller, tagged with its license generation
    SetLicense { key: String, generation: u64 },
    Configure(AudioConfig),
    Build { index: usize },
    Stop,
}

/// A freshly built model on its way to the audio thread.
pub struct LoadedModel {
    pub index: usize,
    pub model: Box<dyn EnhancementModel>,
    /// Configuration `initialize` was attempted with, if any
    pub config: Option<AudioConfig>,
    /// Whether that initialization succeeded
    pub initialized: bool,
}

/// Audio-side ends of the handoff rings.
pub struct LoaderPorts {
    pub requests: Sender<LoaderCommand>,
    pub inbox: Consumer<LoadedModel>,
    pub retire: Producer<Box<dyn EnhancementModel>>,
}

pub struct LoaderThread {
    tx: Option<Sender<LoaderCommand>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LoaderThread {
    pub fn spawn(
        factory: Arc<dyn ModelFactory>,
        status: Arc<SharedStatus>,
    ) -> (Self, LoaderPorts) {
        let (tx, rx) = bounded::<LoaderCommand>(COMMAND_CAPACITY);
        let (ready_prod, ready_cons) = RingBuffer::<LoadedModel>::new(READY_CAPACITY).split();
        let (retire_prod, retire_cons) =
            RingBuffer::<Box<dyn EnhancementModel>>::new(RETIRE_CAPACITY).split();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();

        let mut loader = Loader {
            factory,
            status,
            license: None,
            config: None,
            ready: ready_prod,
            retired: retire_cons,
            backlog: None,
        };

        let handle = thread::Builder::new()
            .name("aic-model-loader".into())
            .spawn(move || {
                info!("Model loader started");
                loader.run(rx, stop_thread);
                info!("Model loader stopped");
            })
            .map_err(|e| error!("Failed to spawn model loader: {}", e))
            .ok();

        let ports = LoaderPorts {
            requests: tx.clone(),
            inbox: ready_cons,
            retire: retire_prod,
        };

        (
            Self {
                tx: Some(tx),
                stop,
                handle,
            },
            ports,
        )
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Blocking send, for control-thread callers.
    pub fn send(&self, cmd: LoaderCommand) {
        if let Some(tx) = &self.tx {
            if tx.send(cmd).is_err() {
                warn!("Model loader is gone, command dropped");
            }
        }
    }
}

impl Drop for LoaderThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(tx) = self.tx.take() {
            let _ = tx.try_send(LoaderCommand::Stop);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Loader {
    factory: Arc<dyn ModelFactory>,
    status: Arc<SharedStatus>,
    /// Accepted key and the generation it belongs to
    license: Option<(String, u64)>,
    config: Option<AudioConfig>,
    ready: Producer<LoadedModel>,
    retired: Consumer<Box<dyn EnhancementModel>>,
    /// Built model waiting for room in the ready ring
    backlog: Option<LoadedModel>,
}

impl Loader {
    fn run(&mut self, rx: Receiver<LoaderCommand>, stop: Arc<AtomicBool>) {
        loop {
            if stop.load(Ordering::Acquire) {
                break;
            }

            self.reclaim();
            self.flush_backlog();

            let first = match rx.recv_timeout(POLL_INTERVAL) {
                Ok(cmd) => cmd,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let mut build = None;
            let mut pending = Some(first);
            while let Some(cmd) = pending.take() {
                match cmd {
                    LoaderCommand::SetLicense { key, generation } => {
                        self.license = Some((key, generation))
                    }
                    LoaderCommand::Configure(config) => self.config = Some(config),
                    LoaderCommand::Build { index } => build = Some(index),
                    LoaderCommand::Stop => return,
                }
                pending = match rx.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => None,
                };
            }

            if let Some(index) = build {
                if let Err(e) = self.build(index) {
                    error!("Model {}: {}", index, e);
                }
            }
        }
        self.reclaim();
    }

    /// Drop models the audio thread has let go of.
    fn reclaim(&mut self) {
        let mut freed = 0usize;
        while let Some(model) = self.retired.pop() {
            drop(model);
            freed += 1;
        }
        if freed > 0 {
            info!("Released {} retired model(s)", freed);
        }
    }

    fn flush_backlog(&mut self) {
        if let Some(loaded) = self.backlog.take() {
            if let Err(loaded) = self.ready.push(loaded) {
                self.backlog = Some(loaded);
            }
        }
    }

    fn build(&mut self, index: usize) -> Result<(), LifecycleError> {
        let (key, generation) = match &self.license {
            Some((key, generation)) => (key, *generation),
            None => {
                warn!("Model build for index {} skipped: no license key", index);
                return Ok(());
            }
        };

        let desc = descriptor(index);
        self.status.set_model_state(ModelState::Loading);

        let mut model = match self.factory.create(desc.model_type, key) {
            Ok(model) => model,
            Err(e) => {
                // A key revoked meanwhile already owns the status.
                if self.status.report_build(generation, false) {
                    self.status.set_model_state(ModelState::ProcessingNotAllowed);
                }
                return Err(LifecycleError::ModelCreateFailed(e));
            }
        };

        let initialized = match &self.config {
            Some(config) => match model.initialize(config) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Initializing {} with {:?} failed: {}", desc.name, config, e);
                    false
                }
            },
            None => false,
        };

        if !self.status.report_build(generation, true) {
            info!("{} was built with a superseded license key", desc.name);
        }
        info!("Built {} (initialized: {})", desc.name, initialized);

        let loaded = LoadedModel {
            index,
            model,
            config: self.config,
            initialized,
        };

        // A newer build supersedes anything still waiting for the audio thread.
        self.backlog = None;
        if let Err(loaded) = self.ready.push(loaded) {
            self.backlog = Some(loaded);
        }
        Ok(())
    }
}
