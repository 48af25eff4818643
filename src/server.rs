//! HTTP transport: every Funlet answers GET or POST with a TwiML document.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Settings;
use crate::input::{Environment, Params};
use crate::twiml::VoiceResponse;
use crate::{forward, menu};

const TWIML_CONTENT_TYPE: &str = "text/xml";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub env: Arc<Environment>,
}

impl AppState {
    pub fn new(settings: Settings, env: Environment) -> Self {
        Self {
            settings: Arc::new(settings),
            env: Arc::new(env),
        }
    }
}

/// The trailing-slash routes let the relative action URL `.` resolve back
/// to the Funlet that issued it.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/forward", get(forward_funlet).post(forward_funlet))
        .route("/forward/", get(forward_funlet).post(forward_funlet))
        .route("/menu", get(menu_funlet).post(menu_funlet))
        .route("/menu/", get(menu_funlet).post(menu_funlet))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn forward_funlet(State(state): State<AppState>, params: Params) -> VoiceResponse {
    forward::handle(&params, &state.env, &state.settings.forward)
}

async fn menu_funlet(State(state): State<AppState>, params: Params) -> VoiceResponse {
    menu::handle(&params, &state.env, &state.settings.menu)
}

impl IntoResponse for VoiceResponse {
    fn into_response(self) -> Response {
        ([(CONTENT_TYPE, TWIML_CONTENT_TYPE)], self.to_string()).into_response()
    }
}

/// Query string merged with the body, the body winning. A body that cannot
/// be read or decoded is ignored: the caller still gets instructions.
#[async_trait]
impl<S> FromRequest<S> for Params
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut params = Params::from_urlencoded(req.uri().query().unwrap_or_default().as_bytes());
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let body = match Bytes::from_request(req, state).await {
            Ok(body) => body,
            Err(e) => {
                warn!("ignoring unreadable request body: {}", e);
                return Ok(params);
            }
        };
        if body.is_empty() {
            return Ok(params);
        }
        if is_json {
            match Params::from_json(&body) {
                Ok(body_params) => params.merge(body_params),
                Err(e) => warn!("ignoring request body: {}", e),
            }
        } else {
            params.merge(Params::from_urlencoded(&body));
        }
        Ok(params)
    }
}
