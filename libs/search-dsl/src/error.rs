use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid {param} value: {value}")]
    InvalidParameter { param: String, value: String },

    #[error("Search parameter '{0}' must not appear more than once")]
    DuplicateParameter(String),

    #[error("{param}={value} is out of range ({min}..={max})")]
    OutOfRange {
        param: String,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("Malformed index response: {0}")]
    MalformedResponse(String),
}

impl Error {
    pub(crate) fn invalid(param: &str, value: &str) -> Self {
        Error::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
        }
    }
}
