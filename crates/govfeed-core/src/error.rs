use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("Source malformed: {url}: {reason}")]
    SourceMalformed { url: String, reason: String },

    #[error("Term expansion unavailable: {0}")]
    ExpansionUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn unavailable(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceMalformed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
