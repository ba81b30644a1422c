//! HTTP service implementation for batched URL collection.
//!
//! This module defines [`CollectService`], which owns the shared fetcher, the
//! admission gate, and the root cancellation token, and exposes them through
//! an axum [`Router`] mounted at [`COLLECT_DATA_PATH`].
//!
//! ## Responsibilities
//!
//! - Admit or reject each batch through the [`AdmissionGate`] before reading
//!   its body.
//! - Decode and validate the batch.
//! - Dispatch the batch through [`collect_chunks`] under a batch-scoped
//!   cancellation token.
//! - Drain in-flight batches and cancel stragglers on shutdown.

use crate::server::{
    config::ServerConfig,
    fetch::{
        coordinator::collect_chunks,
        worker::{Fetcher, HttpFetcher},
    },
    gate::AdmissionGate,
    telemetry::{
        increment_batch_errors, increment_batches_rejected, increment_requests,
        record_batch_duration, record_urls_per_batch,
    },
};
use axum::{Json, Router, extract::State, routing::post};
use bytes::Bytes;
use core::time::Duration;
use fanfetch_core::{
    Error, Result,
    types::{COLLECT_DATA_PATH, CollectRequest, Resource},
    validate::validate_batch,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Batched URL collection service.
///
/// Cloning is cheap: every clone shares the same fetcher, gate, and shutdown
/// token.
pub struct CollectService<F = HttpFetcher> {
    fetcher: Arc<F>,
    gate: Arc<AdmissionGate>,
    shutdown_token: CancellationToken,
    num_workers: usize,
    shutdown_timeout: Duration,
}

impl<F> Clone for CollectService<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            gate: Arc::clone(&self.gate),
            shutdown_token: self.shutdown_token.clone(),
            num_workers: self.num_workers,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl CollectService<HttpFetcher> {
    /// Creates a service backed by a real HTTP client using the configured
    /// per-fetch timeout.
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: Fetcher> CollectService<F> {
    /// Creates a service around an arbitrary [`Fetcher`].
    pub fn with_fetcher(config: &ServerConfig, fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            gate: Arc::new(AdmissionGate::new(config.max_concurrent_batches)),
            shutdown_token: CancellationToken::new(),
            num_workers: config.num_workers,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Builds the router serving this service.
    ///
    /// Only `POST` is routed on [`COLLECT_DATA_PATH`]; every other method on
    /// that path answers with [`Error::MethodNotAllowed`].
    pub fn router(self) -> Router {
        Router::new()
            .route(
                COLLECT_DATA_PATH,
                post(collect_data::<F>).fallback(method_not_supported),
            )
            .with_state(self)
    }

    /// Processes one raw batch request end to end.
    ///
    /// Admission happens first, so a rejected batch costs neither decoding
    /// nor validation. The admission slot is held until this future completes
    /// or is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityExceeded`] / [`Error::ServiceShutdown`] from the gate.
    /// - [`Error::InvalidRequest`] if `body` is not a batch document.
    /// - [`Error::InvalidBatchSize`] / [`Error::InvalidUrl`] from validation.
    /// - The first fetch failure of the batch.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn collect(&self, body: &[u8]) -> Result<Vec<Resource>> {
        let start = std::time::Instant::now();
        increment_requests();

        let _permit = self.gate.try_admit().inspect_err(|_e| {
            increment_batches_rejected();
            #[cfg(feature = "tracing")]
            tracing::warn!(
                in_flight = self.gate.in_flight(),
                max_in_flight = self.gate.max_in_flight(),
                "Batch rejected: {_e}"
            );
        })?;

        let result = self.run_batch(body).await;

        match &result {
            Ok(_resources) => {
                record_batch_duration(start.elapsed().as_millis() as f64);
                #[cfg(feature = "tracing")]
                tracing::debug!("Collected {} resources", _resources.len());
            }
            Err(_e) => {
                increment_batch_errors();
                #[cfg(feature = "tracing")]
                tracing::warn!("Batch failed: {_e}");
            }
        }

        result
    }

    async fn run_batch(&self, body: &[u8]) -> Result<Vec<Resource>> {
        let request: CollectRequest =
            serde_json::from_slice(body).map_err(|e| Error::InvalidRequest {
                reason: e.to_string(),
            })?;

        validate_batch(&request.urls)?;
        record_urls_per_batch(request.urls.len() as f64);

        let batch_token = self.shutdown_token.child_token();
        collect_chunks(
            request.urls,
            Arc::clone(&self.fetcher),
            self.num_workers,
            &batch_token,
        )
        .await
        .map_err(|e| match e {
            Error::RequestCancelled if self.shutdown_token.is_cancelled() => {
                Error::ServiceShutdown
            }
            e => e,
        })
    }

    /// Gracefully shuts the service down.
    ///
    /// - Closes the admission gate so new batches get
    ///   [`Error::ServiceShutdown`].
    /// - Waits up to the configured shutdown timeout for admitted batches.
    /// - Cancels the root token, stopping any fetches still running.
    pub async fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new batches");
        self.gate.close();

        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight batches ({} active)", self.gate.in_flight());

        if self.gate.drain(self.shutdown_timeout).await {
            #[cfg(feature = "tracing")]
            tracing::debug!("All in-flight batches drained");
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Graceful drain timed out ({} batches still active)",
                self.gate.in_flight()
            );
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining fetches via shutdown token");
        self.shutdown_token.cancel();
    }
}

async fn collect_data<F: Fetcher>(
    State(service): State<CollectService<F>>,
    body: Bytes,
) -> Result<Json<Vec<Resource>>> {
    service.collect(&body).await.map(Json)
}

async fn method_not_supported() -> Error {
    Error::MethodNotAllowed
}
