use std::{error::Error, fmt};

use model::ModelError;

pub mod backend;
pub mod client;
pub mod confirm;
pub mod drawing;
pub mod filter;
pub mod format;
pub mod map;
pub mod render;
pub mod request;

#[derive(Debug)]
pub enum RequestError {
    NotFound,
    /// A newer request superseded this one before it finished.
    Cancelled,
    /// The user did not confirm a destructive action.
    Declined,
    Invalid(String),
    Backend(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn backend<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Backend(Box::new(why))
    }
}

impl Error for RequestError {}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Cancelled => write!(f, "request was superseded"),
            Self::Declined => write!(f, "action was not confirmed"),
            Self::Invalid(why) => write!(f, "invalid request: {}", why),
            Self::Backend(why) => write!(f, "backend error: {}", why),
        }
    }
}

impl From<backend::BackendError> for RequestError {
    fn from(value: backend::BackendError) -> Self {
        match value {
            backend::BackendError::NotFound => Self::NotFound,
            backend::BackendError::Invalid(why) => Self::Invalid(why),
            backend::BackendError::Other(why) => Self::Backend(why),
        }
    }
}

impl From<ModelError> for RequestError {
    fn from(value: ModelError) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<drawing::DrawingError> for RequestError {
    fn from(value: drawing::DrawingError) -> Self {
        Self::Invalid(value.to_string())
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    if let Err(RequestError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}
