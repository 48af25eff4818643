use thiserror::Error;

/// Failures of the process around the engine. The engine itself never fails.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server stopped: {0}")]
    Serve(#[source] std::io::Error),
}

/// A request body that could not be turned into parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON body is not an object")]
    NotAnObject,
}
