use thiserror::Error;

#[derive(Error, Debug)]
pub enum BvbError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response from {url}: HTTP status {status} with empty body")]
    Transport { url: String, status: u16 },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    Date(#[from] chrono::ParseError),

    #[error("expected column '{0}' not found among listing header columns")]
    MissingColumn(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("invalid {field}: '{value}'")]
    Validation { field: &'static str, value: String },

    #[error("{field} '{value}' is not a valid number")]
    NotNumeric { field: &'static str, value: String },

    #[error("history endpoint returned status '{status}'")]
    History { status: String, raw: String },

    #[error("error in listing row beginning with '{leading}': {source}")]
    Row {
        leading: String,
        #[source]
        source: Box<BvbError>,
    },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, BvbError>;

impl From<String> for BvbError {
    fn from(s: String) -> Self {
        BvbError::Unknown(s)
    }
}

impl From<&str> for BvbError {
    fn from(s: &str) -> Self {
        BvbError::Unknown(s.to_string())
    }
}
