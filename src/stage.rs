//! Which half of a two-stage flow this invocation belongs to.
//!
//! Nothing is stored between invocations: the platform calls back with an
//! extra field (`Dial` after a forwarded call, `Digits` after a gather), and
//! that field's presence is the whole state machine.

use crate::input::Params;
use crate::resolve::{is_legacy_api, normalize_number};

/// The request field only the platform sets on the follow-up invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMarker {
    /// Completion of a `<Dial>`; the result is the dialed call's status.
    Dial,
    /// Completion of a `<Gather>`; the result is the digits pressed.
    Digits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    AwaitingAction,
    ProcessingResult(String),
}

/// The current telephony event, read once from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    /// Caller number, digits only.
    pub caller: String,
    /// Number called, digits only.
    pub called: String,
    /// Set when the marker field was present, even empty.
    pub result: Option<String>,
}

impl CallSnapshot {
    pub fn from_params(params: &Params, marker: StageMarker) -> Self {
        let legacy_api = is_legacy_api(params);
        let caller = params.non_empty("From").or_else(|| params.non_empty("Caller")).unwrap_or("");
        let called = params.non_empty("To").or_else(|| params.non_empty("Called")).unwrap_or("");

        let result = match marker {
            StageMarker::Dial => params.contains("Dial").then(|| {
                params
                    .non_empty("DialStatus")
                    .or_else(|| params.non_empty("DialCallStatus"))
                    .unwrap_or("")
                    .to_string()
            }),
            StageMarker::Digits => params.contains("Digits").then(|| params.text("Digits").unwrap_or("").to_string()),
        };

        Self {
            caller: normalize_number(caller, legacy_api),
            called: normalize_number(called, legacy_api),
            result,
        }
    }

    pub fn stage(&self) -> Stage {
        classify(self)
    }
}

pub fn classify(snapshot: &CallSnapshot) -> Stage {
    match &snapshot.result {
        Some(result) => Stage::ProcessingResult(result.clone()),
        None => Stage::AwaitingAction,
    }
}
