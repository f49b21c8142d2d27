use axum::{
    extract::{OriginalUri, Query, Request},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use clustering::ClusterError;
use coverage::RequestError;
use model::{wire::ResultsEnvelope, ExampleData};
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;
/// Lists answer in the backend wire format, `{ "data": { "results": [...] } }`.
pub type ListResult<O> = RouteResult<Json<ResultsEnvelope<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

/// Query parameter guarding destructive routes, `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

// - Commonly used responeses -

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_information: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            detailed_information: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_message(message)
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("unknown error");
        self.with_message(message)
    }

    pub fn with_detailed_information(mut self, message: impl Into<String>) -> Self {
        self.detailed_information = Some(message.into());
        self
    }
}

impl From<RequestError> for RouteErrorResponse {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::NotFound => Self::new(StatusCode::NOT_FOUND)
                .with_message("The requested item does not exist."),
            RequestError::Declined => Self::new(StatusCode::CONFLICT)
                .with_message("Deleting requires confirmation, pass confirm=true."),
            RequestError::Cancelled => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE).with_default_message()
            }
            RequestError::Invalid(why) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY).with_message(why)
            }
            RequestError::Backend(why) => {
                log::error!("backend request failed: {}", why);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR)
                    .with_default_message()
                    .with_detailed_information(why.to_string())
            }
        }
    }
}

impl From<ClusterError> for RouteErrorResponse {
    fn from(value: ClusterError) -> Self {
        let status_code = match &value {
            ClusterError::NoSuchCluster(_) => StatusCode::NOT_FOUND,
            ClusterError::InvalidBoundingBox(_) => StatusCode::BAD_REQUEST,
            ClusterError::InvalidOptions(_) | ClusterError::InvalidCoordinate { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status_code).with_message(value.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_map_to_status_codes() {
        let cases = [
            (RequestError::NotFound, StatusCode::NOT_FOUND),
            (RequestError::Declined, StatusCode::CONFLICT),
            (RequestError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                RequestError::Invalid("bad".to_owned()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, status_code) in cases {
            assert_eq!(RouteErrorResponse::from(error).status_code, status_code);
        }
    }

    #[test]
    fn error_body_carries_request_details() {
        let response = RouteErrorResponse::not_found(&Method::DELETE, "/api/v1/nothing");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["httpMethod"], "DELETE");
        assert_eq!(value["requestedUri"], "/api/v1/nothing");
        assert_eq!(value["message"], "Not Found");
        assert!(value.get("statusCode").is_none());
    }

    #[test]
    fn unknown_clusters_are_not_found() {
        let response = RouteErrorResponse::from(ClusterError::NoSuchCluster(3));
        assert_eq!(response.status_code, StatusCode::NOT_FOUND);
    }
}
