//! Single resources are answered with their content flattened next to a
//! `links` list and a free form `debugInfo` map.

use std::{collections::HashMap, sync::Arc};

use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,

    #[serde(rename = "href")]
    pub hypertext_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    pub debug_info: HashMap<String, Value>,
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            debug_info: HashMap::new(),
            links: vec![],
        }
    }

    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder::new(content, base_url)
    }

    pub fn link(&self, relation: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.relation == relation)
            .map(|link| link.hypertext_reference.as_str())
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

pub struct ResponseBuilder<T> {
    pub response: Response<T>,
    pub base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    pub fn new(content: T, base_url: Arc<BaseUrl>) -> Self {
        Self {
            response: Response::new(content),
            base_url,
        }
    }

    /// Values that fail to serialize are left out.
    pub fn debug_info<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.response.debug_info.insert(key.into(), value);
            }
            Err(why) => log::warn!("dropping debug info: {}", why),
        }
        self
    }

    pub fn link<R, H>(mut self, relation: R, hypertext_reference: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        self.response.links.push(Link {
            relation: relation.into(),
            hypertext_reference: self.base_url.full_url(hypertext_reference),
        });
        self
    }

    pub fn link_option<R, H>(self, relation: R, hypertext_reference: Option<H>) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        match hypertext_reference {
            Some(href) => self.link(relation, href),
            None => self,
        }
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn content_is_flattened_next_to_links() {
        let response = Response::builder(json!({ "name": "Depot" }), Arc::new(BaseUrl::default()))
            .link("self", "/api/v1/shapes/1")
            .link_option("technician", None::<String>)
            .debug_info("point_count", 3)
            .build();
        assert_eq!(
            response.link("self"),
            Some("http://localhost/api/v1/shapes/1")
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["name"], "Depot");
        assert_eq!(value["debugInfo"]["point_count"], 3);
        assert_eq!(value["links"].as_array().unwrap().len(), 1);
    }
}
