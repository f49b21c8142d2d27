use std::sync::Arc;

use axum::{extract, http::HeaderMap, middleware::Next, response::IntoResponse};

/// Scheme, host and path prefix the client reached the service under, so
/// links work behind a reverse proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseUrl {
    proto: String,
    host: String,
    prefix: String,
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self {
            proto: "http".to_owned(),
            host: "localhost".to_owned(),
            prefix: String::new(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let defaults = Self::default();
        Self {
            proto: header(headers, "x-forwarded-proto")
                .map(str::to_owned)
                .unwrap_or(defaults.proto),
            host: header(headers, "x-forwarded-host")
                .or_else(|| header(headers, "host"))
                .map(str::to_owned)
                .unwrap_or(defaults.host),
            prefix: header(headers, "x-forwarded-prefix")
                .map(|prefix| prefix.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.prefix),
        }
    }

    pub fn full_url<S: Into<String>>(&self, path: S) -> String {
        format!("{}://{}{}{}", self.proto, self.host, self.prefix, path.into())
    }
}

pub async fn base_url_middleware(mut req: extract::Request, next: Next) -> impl IntoResponse {
    let base_url = BaseUrl::from_headers(req.headers());
    req.extensions_mut().insert(Arc::new(base_url));
    next.run(req).await
}
