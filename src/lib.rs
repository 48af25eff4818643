//! Funlets: stateless webhook handlers driving two-stage IVR call flows.
//!
//! Each invocation rebuilds its position in the flow from the request alone:
//! inputs are resolved (request, environment, compiled default), the stage is
//! inferred from the fields the platform sent back, and the next call-control
//! instructions are emitted as TwiML.

pub mod config;
pub mod emit;
pub mod error;
pub mod forward;
pub mod gate;
pub mod input;
pub mod menu;
pub mod resolve;
pub mod server;
pub mod stage;
pub mod twiml;

pub use crate::config::Settings;
pub use crate::error::{ParamsError, ServerError};
pub use crate::input::{Environment, ParamValue, Params};
pub use crate::twiml::VoiceResponse;
