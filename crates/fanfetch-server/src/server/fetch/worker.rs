use core::{future::Future, time::Duration};
use fanfetch_core::{Error, types::FetchResult, types::Resource};
use reqwest::Client;
use std::error::Error as _;
use tokio_util::sync::CancellationToken;

/// A single-URL fetch, as seen by the batch coordinator.
///
/// Implementations must resolve promptly once `cancel` fires. Each call is
/// independent; the coordinator spawns one call per URL of a chunk.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        url: String,
        cancel: CancellationToken,
    ) -> impl Future<Output = FetchResult> + Send;
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`].
///
/// The client's timeout applies to every fetch as a whole: connect, request,
/// and reading the full body. Response status codes are not inspected, so a
/// 404 or 500 page is a successful fetch as long as the transport completed.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose client times out each fetch after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: String, cancel: CancellationToken) -> FetchResult {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            res = get_text(&self.client, &url) => Some(res),
        };

        match outcome {
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%url, "Fetch cancelled");
                Err(Error::RequestCancelled)
            }
            Some(Ok(data)) => Ok(Resource {
                resource: url,
                data,
            }),
            Some(Err(err)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%url, timeout = err.is_timeout(), "Fetch failed: {err}");
                Err(Error::Transport {
                    reason: describe(err),
                    resource: url,
                })
            }
        }
    }
}

async fn get_text(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    let response = client.get(url).send().await?;
    // Invalid UTF-8 is replaced rather than rejected.
    response.text().await
}

/// Flattens a reqwest error and its source chain into one line, without the
/// URL (the caller reports it separately).
fn describe(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn returns_body_for_successful_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/x", server.uri());
        let resource = fetcher()
            .fetch(url.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resource.resource, url);
        assert_eq!(resource.data, "hello");
    }

    #[tokio::test]
    async fn error_statuses_are_still_successes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let missing = fetcher()
            .fetch(format!("{}/missing", server.uri()), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(missing.data, "not found");

        let broken = fetcher()
            .fetch(format!("{}/broken", server.uri()), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(broken.data, "");
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(50)).unwrap();
        let url = format!("{}/slow", server.uri());
        let err = fetcher
            .fetch(url.clone(), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Transport { resource, reason } => {
                assert_eq!(resource, url);
                assert!(!reason.is_empty());
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .fetch(format!("http://{addr}/"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn truncated_body_is_a_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises 100 bytes, sends 5, then hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello")
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });

        let url = format!("http://{addr}/short");
        let err = fetcher()
            .fetch(url.clone(), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Transport { resource, .. } => assert_eq!(resource, url),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_stops_in_flight_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(30)).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = fetcher
            .fetch(format!("{}/slow", server.uri()), cancel)
            .await
            .unwrap_err();

        assert_eq!(err, Error::RequestCancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
