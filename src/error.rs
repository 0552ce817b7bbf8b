use thiserror::Error;

#[derive(Error, Debug)]
pub enum OctopusError {
    #[error("http request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("api request failed with status code {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("no Agile products found for region: {0}")]
    NotFound(String),
    #[error("api responded with an unsupported response: {0}")]
    UnsupportedResponse(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OctopusError>;
