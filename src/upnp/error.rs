use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpnpError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{what} timed out after {after:?}")]
    Timeout {
        what: String,
        after: std::time::Duration,
    },

    #[error("No devices of type {0} answered the search")]
    NoDevices(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing <{0}> element")]
    MissingElement(String),

    #[error("Router {0} offers no WANCommonInterfaceConfig service")]
    NoService(String),

    #[error("SOAP action {action} failed with status {status}")]
    Soap { action: String, status: u16 },

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },
}

pub type UpnpResult<T> = Result<T, UpnpError>;
