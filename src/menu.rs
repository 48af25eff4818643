//! Simple Menu Funlet: prompt for an option (stage 1), then redirect to the
//! URL of the option matching the digits pressed (stage 2).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::emit::{menu_stage1, menu_stage2, MenuAnswer};
use crate::input::{Environment, Params};
use crate::resolve::{resolve_text, OptionMap};
use crate::stage::{CallSnapshot, Stage, StageMarker};
use crate::twiml::VoiceResponse;

const MESSAGE: &str = "FUNLET_MENU_MESSAGE";
const ERROR_MESSAGE: &str = "FUNLET_MENU_ERROR_MESSAGE";
const LANGUAGE: &str = "FUNLET_MENU_LANGUAGE";
const VOICE: &str = "FUNLET_MENU_VOICE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuDefaults {
    /// Recording URL or text inviting the caller to pick an option
    pub message: String,
    /// Recording URL or text for digits matching no option
    pub error_message: String,
    pub language: String,
    pub voice: String,
    /// Digits -> destination URL
    pub options: BTreeMap<String, String>,
}

impl Default for MenuDefaults {
    fn default() -> Self {
        Self {
            message: String::new(),
            error_message: "I'm sorry, that wasn't a valid option.".to_string(),
            language: "en".to_string(),
            voice: "alice".to_string(),
            options: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuInputs {
    pub message: String,
    pub error_message: String,
    pub language: String,
    pub voice: String,
    pub options: OptionMap,
}

impl MenuInputs {
    pub fn resolve(params: &Params, env: &Environment, defaults: &MenuDefaults) -> Self {
        Self {
            message: resolve_text(params, "Message", env, MESSAGE, &defaults.message),
            error_message: resolve_text(params, "ErrorMessage", env, ERROR_MESSAGE, &defaults.error_message),
            language: resolve_text(params, "Language", env, LANGUAGE, &defaults.language),
            voice: resolve_text(params, "Voice", env, VOICE, &defaults.voice),
            options: OptionMap::resolve(params, env, &defaults.options),
        }
    }
}

pub fn handle(params: &Params, env: &Environment, defaults: &MenuDefaults) -> VoiceResponse {
    let inputs = MenuInputs::resolve(params, env, defaults);
    let stage = CallSnapshot::from_params(params, StageMarker::Digits).stage();
    debug!(funlet = "menu", ?stage, options = inputs.options.len(), "handling invocation");
    if inputs.options.is_empty() {
        debug!(funlet = "menu", "no menu options configured");
    }

    let mut response = VoiceResponse::new();
    let concluded = match &stage {
        Stage::ProcessingResult(digits) => menu_stage2(
            &mut response,
            &MenuAnswer {
                digits,
                options: &inputs.options,
                error_message: &inputs.error_message,
                language: &inputs.language,
                voice: &inputs.voice,
            },
        ),
        Stage::AwaitingAction => false,
    };
    if !concluded {
        menu_stage1(&mut response, &inputs.message, &inputs.language, &inputs.voice, &inputs.options);
    }
    response
}
