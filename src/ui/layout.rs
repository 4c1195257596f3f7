//! Layout builders for the editor
//!
//! - Header with title and license indicator
//! - Body with model selection, model info and controls
//! - License panel with the expected file location and key entry

use crate::lifecycle::ModelController;
use crate::ui::components::{
    create_button, create_info_box, create_model_dropdown, create_slider, create_toggle,
};
use crate::ui::state::{EditorData, EditorEvent};
use crate::AicParams;
use nih_plug::prelude::GuiContext;
use nih_plug_vizia::vizia::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const STYLE: &str = include_str!("../ui.css");
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn build_header(cx: &mut Context) -> Handle<'_, HStack> {
    HStack::new(cx, |cx| {
        Label::new(cx, "aic Enhance").class("header-title");

        Element::new(cx).class("fill-width");

        Binding::new(cx, EditorData::license_active, |cx, lens| {
            let active = lens.get(cx);
            let (text, class) = if active {
                ("License Active", "license-active")
            } else {
                ("License Inactive", "license-inactive")
            };
            create_button(cx, text, class, |cx| {
                cx.emit(EditorEvent::ToggleLicensePanel)
            });
        });
    })
    .class("header")
}

pub fn build_body(
    cx: &mut Context,
    params: Arc<AicParams>,
    gui: Arc<dyn GuiContext>,
) -> Handle<'_, VStack> {
    VStack::new(cx, move |cx| {
        create_model_dropdown(cx, params.clone(), gui.clone());
        create_info_box(cx);
        create_slider(cx, "Enhancement", |p| &p.enhancement);
        create_slider(cx, "Voice Gain", |p| &p.voice_gain);
        create_toggle(cx, "Noise Gate");
    })
    .class("body")
}

pub fn build_license_panel(cx: &mut Context) -> Handle<'_, VStack> {
    VStack::new(cx, |cx| {
        Label::new(cx, "Enter your license key").class("panel-title");
        Label::new(cx, "Expected license file:").class("panel-hint");
        Label::new(cx, EditorData::license_path).class("panel-path");

        Textbox::new(cx, EditorData::license_input)
            .on_edit(|cx, text| cx.emit(EditorEvent::SetLicenseInput(text)))
            .class("license-input");

        Label::new(cx, EditorData::license_message).class("panel-error");

        HStack::new(cx, |cx| {
            create_button(cx, "Submit", "panel-button", |cx| {
                cx.emit(EditorEvent::SubmitLicense)
            });
            create_button(cx, "Cancel", "panel-button", |cx| {
                cx.emit(EditorEvent::ToggleLicensePanel)
            });
        })
        .class("panel-buttons");
    })
    .class("license-panel")
}

// ============================================================================
// MAIN UI ENTRY POINT
// ============================================================================

pub fn build_ui(
    cx: &mut Context,
    params: Arc<AicParams>,
    controller: Arc<ModelController>,
    gui_context: Arc<dyn GuiContext>,
) {
    if let Err(e) = cx.add_stylesheet(STYLE) {
        log::error!("Failed to load editor stylesheet: {:?}", e);
    }

    EditorData::new(params.clone(), controller).build(cx);

    let timer = cx.add_timer(POLL_INTERVAL, None, |cx, action| {
        if let TimerAction::Tick(_) = action {
            cx.emit(EditorEvent::Poll);
            crate::debug::drain();
        }
    });
    cx.start_timer(timer);

    VStack::new(cx, move |cx| {
        build_header(cx);

        Binding::new(cx, EditorData::license_panel_open, move |cx, lens| {
            if lens.get(cx) {
                build_license_panel(cx);
            } else {
                build_body(cx, params.clone(), gui_context.clone());
            }
        });
    })
    .class("app-root");
}
