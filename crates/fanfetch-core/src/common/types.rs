//! # Wire Types and Limits
//!
//! This module defines the JSON shapes exchanged on the collect endpoint and
//! the fixed limits every component agrees on.
//!
//! ## Overview
//!
//! - [`CollectRequest`] - the inbound batch (`{"urls": [...]}`)
//! - [`Resource`] - one successfully fetched URL and its body
//! - [`ErrorBody`] - the `{"error": "..."}` envelope used for failures
//! - [`FetchResult`] - what a single fetch worker hands back
//!
//! ## Constants
//!
//! - [`MAX_BATCH_SIZE`] - largest batch accepted by the validator
//! - [`COLLECT_DATA_PATH`] - route the server mounts the collector on

use crate::Error;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of URLs accepted in a single batch.
///
/// Larger batches are rejected with [`Error::InvalidBatchSize`] before any
/// network activity takes place.
pub const MAX_BATCH_SIZE: usize = 20;

/// HTTP path of the batch collection endpoint.
pub const COLLECT_DATA_PATH: &str = "/v1/collect-data";

/// Separator placed between the per-URL lines of an
/// [`Error::InvalidUrl`] message.
pub const URL_ERROR_DELIMITER: &str = "; ";

/// Inbound batch of URLs to collect.
///
/// A missing or `null` `urls` field decodes as an empty batch. The list is
/// never mutated after receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urls: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A fetched URL paired with its response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// The URL exactly as the client submitted it.
    pub resource: String,
    /// The response body, decoded as text.
    pub data: String,
}

/// JSON envelope for every non-capacity error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Outcome of a single fetch worker.
pub type FetchResult = Result<Resource, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> serde_json::Result<CollectRequest> {
        serde_json::from_str(raw)
    }

    #[test]
    fn absent_or_null_urls_decode_as_empty_batch() {
        assert!(decode("{}").unwrap().urls.is_empty());
        assert!(decode(r#"{"urls": null}"#).unwrap().urls.is_empty());
    }

    #[test]
    fn urls_keep_submission_order() {
        let request = decode(r#"{"urls": ["http://b.test", "http://a.test"]}"#).unwrap();
        assert_eq!(request.urls, ["http://b.test", "http://a.test"]);
    }

    #[test]
    fn non_list_urls_are_rejected() {
        assert!(decode(r#"{"urls": "http://a.test"}"#).is_err());
        assert!(decode(r#"{"urls": [1, 2]}"#).is_err());
    }
}
