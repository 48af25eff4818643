//! Turns a classified stage and a gate decision into call-control instructions.

use phf::phf_set;
use tracing::{debug, info};

use crate::gate::{match_option, OptionMatch};
use crate::resolve::OptionMap;
use crate::stage::Stage;
use crate::twiml::{DialOptions, GatherOptions, MessageSink, SayOptions, VoiceResponse};

/// Relative URL of the Funlet currently executing.
pub const BASE_URL: &str = ".";
/// Query marking the callback after the forwarded call ends.
pub const DIAL_DONE_QUERY: &str = "?Dial=true";
pub const FALLBACK_URL_PARAM: &str = "FailUrl";
/// Redirect target meaning "this same document, query included".
const SELF_REDIRECT: &str = "";

static SUCCESSFUL_DIAL_STATUSES: phf::Set<&'static str> = phf_set! {
    "answered",
    "completed",
};

/// Plays `message` when it is a URL, says it otherwise; nothing when empty.
pub fn simple_message(sink: &mut impl MessageSink, message: &str, language: &str, voice: &str) {
    if message.is_empty() {
        return;
    }
    if message.starts_with("http") {
        sink.play(message);
    } else {
        sink.say(
            SayOptions {
                language: language.to_string(),
                voice: voice.to_string(),
            },
            message,
        );
    }
}

/// Action URL bringing the platform back here once the forwarded call ends.
/// The fallback URL rides along so stage two can still find it.
pub fn forward_action_url(fallback_url: &str) -> String {
    let mut url = format!("{BASE_URL}{DIAL_DONE_QUERY}");
    if !fallback_url.is_empty() {
        url.push('&');
        url.push_str(FALLBACK_URL_PARAM);
        url.push('=');
        url.push_str(&urlencoding::encode(fallback_url));
    }
    url
}

pub struct ForwardPrompt<'a> {
    pub allowed: bool,
    pub access_restricted: &'a str,
    pub language: &'a str,
    pub voice: &'a str,
    pub caller_id: &'a str,
    pub forwarding_number: &'a str,
    pub timeout: u32,
    pub fallback_url: &'a str,
}

pub fn forward_stage1(response: &mut VoiceResponse, prompt: &ForwardPrompt<'_>) {
    if !prompt.allowed {
        info!("forwarding refused: caller not in allowed list");
        simple_message(response, prompt.access_restricted, prompt.language, prompt.voice);
        return;
    }
    let caller_id = (!prompt.caller_id.is_empty()).then(|| prompt.caller_id.to_string());
    response.dial(
        DialOptions {
            action: forward_action_url(prompt.fallback_url),
            caller_id,
            timeout: prompt.timeout,
        },
        prompt.forwarding_number,
    );
    debug!(number = prompt.forwarding_number, timeout = prompt.timeout, "dialing");
}

/// Returns true whenever the forwarded call has ended, whichever verb was emitted.
pub fn forward_stage2(response: &mut VoiceResponse, stage: &Stage, fallback_url: &str) -> bool {
    let Stage::ProcessingResult(status) = stage else {
        return false;
    };
    if !SUCCESSFUL_DIAL_STATUSES.contains(status.as_str()) && !fallback_url.is_empty() {
        debug!(status = status.as_str(), fallback_url, "forwarded call failed, redirecting");
        response.redirect(fallback_url);
    } else {
        debug!(status = status.as_str(), "forwarded call ended, hanging up");
        response.hangup();
    }
    true
}

/// Prompts for as many digits as the longest option, then redirects to
/// itself so silence also comes back here.
pub fn menu_stage1(response: &mut VoiceResponse, message: &str, language: &str, voice: &str, options: &OptionMap) {
    let num_digits = options.max_digits();
    response.gather(GatherOptions { num_digits }, |gather| {
        simple_message(gather, message, language, voice)
    });
    response.redirect(SELF_REDIRECT);
}

pub struct MenuAnswer<'a> {
    pub digits: &'a str,
    pub options: &'a OptionMap,
    pub error_message: &'a str,
    pub language: &'a str,
    pub voice: &'a str,
}

/// Returns true only when the digits matched an option.
pub fn menu_stage2(response: &mut VoiceResponse, answer: &MenuAnswer<'_>) -> bool {
    match match_option(answer.digits, answer.options) {
        OptionMatch::Destination(url) => {
            debug!(digits = answer.digits, url, "menu option selected");
            response.redirect(url);
            true
        }
        OptionMatch::NoMatch => {
            info!(digits = answer.digits, "no menu option for digits");
            simple_message(response, answer.error_message, answer.language, answer.voice);
            false
        }
        OptionMatch::NothingGathered => false,
    }
}
