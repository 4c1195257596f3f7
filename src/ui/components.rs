//! Reusable UI component builders
//!
//! Parameter widgets bind through `EditorData::params` with nih_plug's
//! `ParamSlider` / `ParamButton`. Styling lives in ui.css.

use crate::models::MODELS;
use crate::ui::state::EditorData;
use crate::AicParams;
use nih_plug::params::Param;
use nih_plug::prelude::{GuiContext, ParamSetter};
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::widgets::param_base::ParamWidgetBase;
use nih_plug_vizia::widgets::*;
use std::sync::Arc;

pub fn create_button<'a>(
    cx: &'a mut Context,
    label: &'static str,
    class: &'static str,
    callback: impl Fn(&mut EventContext) + 'static,
) -> Handle<'a, Button> {
    Button::new(cx, callback, |cx| Label::new(cx, label)).class(class)
}

pub fn create_slider<'a, P>(
    cx: &'a mut Context,
    label: &'static str,
    map: impl Fn(&Arc<AicParams>) -> &P + Copy + 'static,
) -> Handle<'a, HStack>
where
    P: Param + 'static,
{
    HStack::new(cx, move |cx| {
        Label::new(cx, label).class("slider-label").text_wrap(false);
        ParamSlider::new(cx, EditorData::params, move |p| map(p))
            .class("slider")
            .class("fill-width");
    })
    .class("slider-row")
}

pub fn create_toggle<'a>(cx: &'a mut Context, label: &'static str) -> Handle<'a, HStack> {
    HStack::new(cx, move |cx| {
        Label::new(cx, label).class("slider-label");
        ParamButton::new(cx, EditorData::params, |p| &p.noise_gate).class("toggle");
    })
    .class("slider-row")
}

pub fn create_model_dropdown<'a>(
    cx: &'a mut Context,
    params: Arc<AicParams>,
    gui: Arc<dyn GuiContext>,
) -> Handle<'a, HStack> {
    HStack::new(cx, move |cx| {
        Label::new(cx, "Model").class("dropdown-label");

        let lens = ParamWidgetBase::make_lens(
            EditorData::params,
            |p| &p.model,
            |p| p.normalized_value_to_string(p.unmodulated_normalized_value(), true),
        );

        Dropdown::new(
            cx,
            move |cx| Label::new(cx, lens).class("dropdown-selected"),
            move |cx| {
                let params_list = params.clone();
                let gui_list = gui.clone();

                VStack::new(cx, move |cx| {
                    for desc in MODELS.iter() {
                        let model_type = desc.model_type;
                        let params_item = params_list.clone();
                        let gui_item = gui_list.clone();

                        Label::new(cx, desc.name)
                            .class("dropdown-option")
                            .on_press(move |cx| {
                                let setter = ParamSetter::new(gui_item.as_ref());
                                setter.begin_set_parameter(&params_item.model);
                                setter.set_parameter(&params_item.model, model_type);
                                setter.end_set_parameter(&params_item.model);
                                cx.emit(PopupEvent::Close);
                            });
                    }
                })
                .class("dropdown-options");
            },
        )
        .class("dropdown-box");
    })
    .class("dropdown-row")
}

/// Status line plus metadata rows for the active model.
pub fn create_info_box(cx: &mut Context) -> Handle<'_, VStack> {
    VStack::new(cx, |cx| {
        Binding::new(cx, EditorData::state_message, |cx, lens| {
            let message = lens.get(cx);
            if !message.is_empty() {
                Label::new(cx, message.as_str()).class("state-message");
            }
        });
        Binding::new(cx, EditorData::info_lines, |cx, lens| {
            for line in lens.get(cx) {
                Label::new(cx, line.as_str()).class("info-row");
            }
        });
    })
    .class("info-box")
}
