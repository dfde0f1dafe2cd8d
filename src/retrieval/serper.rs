//! Serper.dev retrieval backends.
//!
//! One HTTP client against two endpoints: `/search` organic snippets serve
//! the text and table modalities, `/images` serves the visual modality.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ImageHit, ImageRetriever, SnippetRetriever};

const SEARCH_ENDPOINT: &str = "https://google.serper.dev/search";
const IMAGES_ENDPOINT: &str = "https://google.serper.dev/images";

/// How many results to request and keep per query.
const RESULT_LIMIT: usize = 5;

/// Shared Serper.dev API client.
pub struct SerperClient {
    http: reqwest::Client,
    api_key: String,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn query(&self, endpoint: &str, query: &str) -> anyhow::Result<Value> {
        let response = self
            .http
            .post(endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": RESULT_LIMIT }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

/// Text (and table) retrieval over `/search` organic snippets.
pub struct SerperTextSearch(pub Arc<SerperClient>);

#[async_trait]
impl SnippetRetriever for SerperTextSearch {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let body = self.0.query(SEARCH_ENDPOINT, query).await?;
        Ok(organic_snippets(&body))
    }
}

/// Visual retrieval over `/images`.
pub struct SerperImageSearch(pub Arc<SerperClient>);

#[async_trait]
impl ImageRetriever for SerperImageSearch {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<ImageHit>> {
        let body = self.0.query(IMAGES_ENDPOINT, query).await?;
        Ok(image_hits(&body))
    }
}

fn organic_snippets(body: &Value) -> Vec<String> {
    body["organic"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|result| result["snippet"].as_str())
                .take(RESULT_LIMIT)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn image_hits(body: &Value) -> Vec<ImageHit> {
    body["images"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|result| result["imageUrl"].as_str())
                .take(RESULT_LIMIT)
                .map(ImageHit::url)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_snippets_extracts_in_order() {
        let body = json!({
            "organic": [
                { "title": "t1", "snippet": "apples are red" },
                { "title": "t2", "snippet": "apples are green" },
                { "title": "no snippet here" },
            ]
        });
        assert_eq!(
            organic_snippets(&body),
            vec!["apples are red", "apples are green"]
        );
    }

    #[test]
    fn organic_snippets_caps_at_result_limit() {
        let results: Vec<Value> = (0..10).map(|i| json!({ "snippet": i.to_string() })).collect();
        let body = json!({ "organic": results });
        assert_eq!(organic_snippets(&body).len(), RESULT_LIMIT);
    }

    #[test]
    fn malformed_body_yields_empty_list() {
        assert!(organic_snippets(&json!({ "error": "quota" })).is_empty());
        assert!(image_hits(&json!("not an object")).is_empty());
    }

    #[test]
    fn image_hits_carry_url_references() {
        let body = json!({
            "images": [
                { "imageUrl": "https://example.com/a.jpg" },
                { "imageUrl": "https://example.com/b.jpg" },
            ]
        });
        let hits = image_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].reference, "https://example.com/a.jpg");
    }
}
