//! Editor data model and events
//!
//! The editor never touches the audio thread. It reads the lock-free status
//! published by the lifecycle and talks to the controller for license work.

use crate::lifecycle::ModelController;
use crate::models::ModelState;
use crate::AicParams;
use nih_plug_vizia::vizia::prelude::*;
use std::sync::Arc;

#[derive(Lens, Clone)]
pub struct EditorData {
    pub params: Arc<AicParams>,
    pub controller: Arc<ModelController>,

    pub license_active: bool,
    pub license_panel_open: bool,
    pub license_input: String,
    pub license_message: String,
    pub license_path: String,

    /// Status line for the info panel, empty once a model is initialized
    pub state_message: String,
    /// "Label: value" rows for the active model
    pub info_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Poll,
    ToggleLicensePanel,
    SetLicenseInput(String),
    SubmitLicense,
}

impl EditorData {
    pub fn new(params: Arc<AicParams>, controller: Arc<ModelController>) -> Self {
        let license_active = controller.is_license_valid();
        let license_path = controller.license_path();
        let mut data = Self {
            params,
            controller,
            license_active,
            license_panel_open: !license_active,
            license_input: String::new(),
            license_message: String::new(),
            license_path,
            state_message: String::new(),
            info_lines: Vec::new(),
        };
        data.refresh_model_info();
        data
    }

    /// Pull status published by the audio side and the loader.
    fn poll(&mut self) {
        let status = self.controller.status();
        self.license_active = status.is_license_valid();

        let changed = status.take_model_changed();
        let prepared = status.was_prepare_called();
        if prepared {
            status.acknowledge_prepare_call();
        }

        let message = status.model_state().message();
        if changed || prepared || self.state_message != message {
            self.refresh_model_info();
        }
    }

    fn refresh_model_info(&mut self) {
        let status = self.controller.status();
        let state = status.model_state();
        self.state_message = state.message().to_string();
        self.info_lines = if state == ModelState::Initialized {
            status
                .model_info()
                .rows()
                .iter()
                .map(|(label, value)| format!("{}: {}", label, value))
                .collect()
        } else {
            Vec::new()
        };
    }

    fn submit_license(&mut self) {
        let index = self.params.model_index();
        match self.controller.submit_license(&self.license_input, index) {
            Ok(()) => {
                self.license_message.clear();
                self.license_input.clear();
                self.license_panel_open = false;
            }
            Err(e) => {
                self.license_message = e.to_string();
            }
        }
        self.license_active = self.controller.is_license_valid();
        self.refresh_model_info();
    }
}

impl Model for EditorData {
    fn event(&mut self, cx: &mut EventContext, event: &mut Event) {
        event.map(|editor_event, _| match editor_event {
            EditorEvent::Poll => self.poll(),
            EditorEvent::ToggleLicensePanel => {
                self.license_panel_open = !self.license_panel_open;
                self.license_message.clear();
            }
            EditorEvent::SetLicenseInput(text) => self.license_input = text.clone(),
            EditorEvent::SubmitLicense => {
                self.submit_license();
                cx.needs_redraw();
            }
        });
    }
}
