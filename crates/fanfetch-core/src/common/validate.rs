//! Batch validation performed before any network activity.
//!
//! Validation is a collected pass: every malformed URL in the batch is
//! reported in a single [`Error::InvalidUrl`], one line per offender joined by
//! [`URL_ERROR_DELIMITER`]. The batch size check runs first and short-circuits.

use crate::{
    Error, Result,
    types::{MAX_BATCH_SIZE, URL_ERROR_DELIMITER},
};
use url::Url;

/// Why a single URL was rejected.
#[derive(Debug, thiserror::Error)]
pub enum UrlProblem {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("missing host")]
    MissingHost,
}

/// Checks that `raw` is an absolute URL with both a scheme and a host.
pub fn validate_url(raw: &str) -> core::result::Result<Url, UrlProblem> {
    let url = Url::parse(raw)?;
    if !url.has_host() || url.host_str().is_some_and(str::is_empty) {
        return Err(UrlProblem::MissingHost);
    }
    Ok(url)
}

/// Validates a whole batch.
///
/// # Errors
///
/// - [`Error::InvalidBatchSize`] if the batch holds more than
///   [`MAX_BATCH_SIZE`] URLs.
/// - [`Error::InvalidUrl`] if any URL fails [`validate_url`]; the message names
///   every failing URL.
pub fn validate_batch(urls: &[String]) -> Result<()> {
    if urls.len() > MAX_BATCH_SIZE {
        return Err(Error::InvalidBatchSize {
            len: urls.len(),
            max: MAX_BATCH_SIZE,
        });
    }

    let problems: Vec<String> = urls
        .iter()
        .filter_map(|raw| {
            validate_url(raw)
                .err()
                .map(|problem| format!("url {raw} not valid: {problem}"))
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidUrl {
            reason: problems.join(URL_ERROR_DELIMITER),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(urls: &[&str]) -> Vec<String> {
        urls.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn accepts_absolute_urls() {
        let urls = batch(&["http://a.test/x", "https://example.com:8443/path?q=1"]);
        assert_eq!(validate_batch(&urls), Ok(()));
    }

    #[test]
    fn accepts_empty_batch() {
        assert_eq!(validate_batch(&[]), Ok(()));
    }

    #[test]
    fn accepts_exactly_max_batch_size() {
        let urls: Vec<String> = (0..MAX_BATCH_SIZE)
            .map(|i| format!("http://a.test/{i}"))
            .collect();
        assert_eq!(validate_batch(&urls), Ok(()));
    }

    #[test]
    fn rejects_oversized_batch() {
        let urls: Vec<String> = (0..=MAX_BATCH_SIZE)
            .map(|i| format!("http://a.test/{i}"))
            .collect();
        assert_eq!(
            validate_batch(&urls),
            Err(Error::InvalidBatchSize {
                len: MAX_BATCH_SIZE + 1,
                max: MAX_BATCH_SIZE,
            })
        );
    }

    #[test]
    fn oversized_batch_wins_over_bad_urls() {
        let urls = vec!["not a url".to_string(); MAX_BATCH_SIZE + 1];
        assert!(matches!(
            validate_batch(&urls),
            Err(Error::InvalidBatchSize { .. })
        ));
    }

    #[test]
    fn rejects_relative_string() {
        let Err(Error::InvalidUrl { reason }) = validate_batch(&batch(&["not a url"])) else {
            panic!("expected InvalidUrl");
        };
        assert!(reason.starts_with("url not a url not valid: "), "{reason}");
    }

    #[test]
    fn rejects_urls_without_host() {
        assert!(matches!(
            validate_url("mailto:someone@a.test"),
            Err(UrlProblem::MissingHost)
        ));
        assert!(matches!(
            validate_url("file:///etc/hosts"),
            Err(UrlProblem::MissingHost)
        ));
        assert!(validate_url("http://").is_err());
    }

    #[test]
    fn reports_every_malformed_url() {
        let urls = batch(&[
            "http://a.test/ok",
            "not a url",
            "http://b.test/ok",
            "/relative/path",
            "mailto:x@a.test",
        ]);
        let Err(Error::InvalidUrl { reason }) = validate_batch(&urls) else {
            panic!("expected InvalidUrl");
        };

        let lines: Vec<&str> = reason.split(URL_ERROR_DELIMITER).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("url not a url not valid"));
        assert!(lines[1].starts_with("url /relative/path not valid"));
        assert!(lines[2].starts_with("url mailto:x@a.test not valid"));
        assert!(!reason.contains("a.test/ok"));
    }
}
