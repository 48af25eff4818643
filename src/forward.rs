//! Forward Funlet: forward the call, optionally only for allowed callers (stage 1),
//! then hang up or fall back once the forwarded call ends (stage 2).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::emit::{forward_stage1, forward_stage2, ForwardPrompt};
use crate::gate::is_forwarding_allowed;
use crate::input::{Environment, Params};
use crate::resolve::{resolve_number, resolve_text, AllowedCallers};
use crate::stage::{CallSnapshot, StageMarker};
use crate::twiml::VoiceResponse;

const PHONE_NUMBER: &str = "FUNLET_FORWARD_PHONE_NUMBER";
const CALLER_ID: &str = "FUNLET_FORWARD_CALLER_ID";
const FALLBACK_URL: &str = "FUNLET_FORWARD_FALLBACK_URL";
const TIMEOUT: &str = "FUNLET_FORWARD_TIMEOUT";
const ACCESS_RESTRICTED: &str = "FUNLET_FORWARD_ACCESS_RESTRICTED";
const LANGUAGE: &str = "FUNLET_FORWARD_LANGUAGE";
const VOICE: &str = "FUNLET_FORWARD_VOICE";
const ALLOWED_CALLERS: [&str; 5] = [
    "FUNLET_FORWARD_ALLOWED_CALLER1",
    "FUNLET_FORWARD_ALLOWED_CALLER2",
    "FUNLET_FORWARD_ALLOWED_CALLER3",
    "FUNLET_FORWARD_ALLOWED_CALLER4",
    "FUNLET_FORWARD_ALLOWED_CALLER5",
];

/// Compiled defaults, used when neither the request nor the environment says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardDefaults {
    /// The forwarding number
    pub phone_number: String,
    /// Verified number shown as caller ID on the forwarded call
    pub caller_id: String,
    /// Where to ask for instructions when the forwarded call fails
    pub fallback_url: String,
    /// Seconds to ring before giving up
    pub timeout: u32,
    /// Only these callers are forwarded; empty allows everyone
    pub allowed_callers: Vec<String>,
    /// Recording URL or text for callers who are not allowed
    pub access_restricted: String,
    pub language: String,
    pub voice: String,
}

impl Default for ForwardDefaults {
    fn default() -> Self {
        Self {
            phone_number: String::new(),
            caller_id: String::new(),
            fallback_url: String::new(),
            timeout: 20,
            allowed_callers: Vec::new(),
            access_restricted: "Sorry, you are calling from a restricted number. Good bye.".to_string(),
            language: "en".to_string(),
            voice: "alice".to_string(),
        }
    }
}

/// Effective configuration of one Forward invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardInputs {
    pub forwarding_number: String,
    pub caller_id: String,
    pub fallback_url: String,
    pub timeout: u32,
    pub allowed_callers: AllowedCallers,
    pub access_restricted: String,
    pub language: String,
    pub voice: String,
}

impl ForwardInputs {
    pub fn resolve(params: &Params, env: &Environment, defaults: &ForwardDefaults) -> Self {
        Self {
            forwarding_number: resolve_text(params, "PhoneNumber", env, PHONE_NUMBER, &defaults.phone_number),
            caller_id: resolve_text(params, "CallerId", env, CALLER_ID, &defaults.caller_id),
            fallback_url: resolve_text(params, "FailUrl", env, FALLBACK_URL, &defaults.fallback_url),
            timeout: resolve_number(params, "Timeout", env, TIMEOUT, defaults.timeout),
            allowed_callers: AllowedCallers::resolve(params, env, &ALLOWED_CALLERS, &defaults.allowed_callers),
            access_restricted: resolve_text(
                params,
                "AccessRestricted",
                env,
                ACCESS_RESTRICTED,
                &defaults.access_restricted,
            ),
            language: resolve_text(params, "Language", env, LANGUAGE, &defaults.language),
            voice: resolve_text(params, "Voice", env, VOICE, &defaults.voice),
        }
    }
}

pub fn handle(params: &Params, env: &Environment, defaults: &ForwardDefaults) -> VoiceResponse {
    let inputs = ForwardInputs::resolve(params, env, defaults);
    let snapshot = CallSnapshot::from_params(params, StageMarker::Dial);
    let stage = snapshot.stage();
    debug!(funlet = "forward", ?stage, "handling invocation");

    let mut response = VoiceResponse::new();
    if !forward_stage2(&mut response, &stage, &inputs.fallback_url) {
        let allowed = is_forwarding_allowed(&snapshot.caller, &snapshot.called, &inputs.allowed_callers);
        forward_stage1(
            &mut response,
            &ForwardPrompt {
                allowed,
                access_restricted: &inputs.access_restricted,
                language: &inputs.language,
                voice: &inputs.voice,
                caller_id: &inputs.caller_id,
                forwarding_number: &inputs.forwarding_number,
                timeout: inputs.timeout,
                fallback_url: &inputs.fallback_url,
            },
        );
    }
    response
}
