// HTTP implementation of the catalog and booking collaborators on top of
// reqwest, with bounded retries for catalog reads

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::booking::{
    BookingApi, BookingApiError, BookingConfirmation, BookingRequest, DEFAULT_BOOKING_ERROR,
};
use crate::catalog::{rooms_from_records, CatalogError, RoomCatalog};
use crate::config::{RetryConfig, StorefrontConfig};
use crate::filters::CatalogQuery;
use crate::models::{Room, RoomRecord};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Why a single GET attempt did not produce a body
#[derive(Debug)]
enum FetchFailure {
    NotFound,
    Failed { message: String, retryable: bool },
}

#[derive(Debug, Clone)]
pub struct StorefrontClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryConfig,
}

impl StorefrontClient {
    pub fn new(config: &StorefrontConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            ClientError::ConfigError(format!("invalid base_url {:?}: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "base_url {:?} cannot carry a path",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ClientError::InitError(err.to_string()))?;

        info!(base_url = %base_url, timeout = ?config.request_timeout, "storefront client ready");
        Ok(Self {
            http,
            base_url,
            retry: config.retry.clone(),
        })
    }

    // `segments` are percent-encoded individually, so ids cannot escape the path
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn rooms_request(&self, query: &CatalogQuery) -> Result<reqwest::Request, CatalogError> {
        self.http
            .get(self.endpoint(&["api", "rooms"]))
            .query(&query.to_query_pairs())
            .build()
            .map_err(|err| CatalogError::CatalogUnavailable(err.to_string()))
    }

    pub fn booking_request(
        &self,
        request: &BookingRequest,
        token: &str,
    ) -> Result<reqwest::Request, BookingApiError> {
        self.http
            .post(self.endpoint(&["api", "bookings"]))
            .bearer_auth(token)
            .json(request)
            .build()
            .map_err(|err| BookingApiError::Transport(err.to_string()))
    }

    // Helper to calculate exponential backoff with jitter
    pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
        let base_backoff_ms = (config.initial_backoff_ms as f64
            * config.backoff_multiplier.powf(retry_attempt as f64))
        .min(config.max_backoff_ms as f64);

        let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }

    /// GETs `request` and decodes the JSON body, retrying timeouts, connection
    /// errors, 5xx and 429 up to `retry.max_retries` times.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T, FetchFailure> {
        let mut attempt = 0;
        loop {
            let Some(this_try) = request.try_clone() else {
                return Err(FetchFailure::Failed {
                    message: "request body cannot be replayed".to_string(),
                    retryable: false,
                });
            };

            match self.fetch_once(this_try).await {
                Ok(body) => return Ok(body),
                Err(FetchFailure::Failed {
                    message,
                    retryable: true,
                }) if attempt < self.retry.max_retries => {
                    let backoff = Self::calculate_backoff(attempt, &self.retry);
                    warn!(
                        url = %request.url(),
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %message,
                        "catalog request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T, FetchFailure> {
        let url = request.url().clone();
        debug!(%url, "GET");

        let response = self.http.execute(request).await.map_err(|err| {
            let message = if err.is_timeout() {
                format!("request to {url} timed out")
            } else {
                err.to_string()
            };
            FetchFailure::Failed {
                message,
                retryable: err.is_timeout() || err.is_connect(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchFailure::NotFound);
        }
        if !status.is_success() {
            return Err(FetchFailure::Failed {
                message: format!("{status} from {url}"),
                retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
            });
        }

        response.json::<T>().await.map_err(|err| FetchFailure::Failed {
            message: format!("unreadable payload from {url}: {err}"),
            retryable: err.is_timeout(),
        })
    }
}

/// Interprets the answer to `POST /api/bookings`.
///
/// On failure the message is the `error` field of a JSON body, the raw text
/// of a non-JSON body, or [`DEFAULT_BOOKING_ERROR`] when neither says
/// anything.
pub fn parse_booking_response(
    status: u16,
    body: &str,
) -> Result<BookingConfirmation, BookingApiError> {
    let parsed = serde_json::from_str::<serde_json::Value>(body);

    if (200..300).contains(&status) {
        let payload =
            parsed.unwrap_or_else(|_| serde_json::Value::String(body.to_string()));
        return Ok(BookingConfirmation::from_payload(payload));
    }

    let message = match parsed {
        Ok(json) => json
            .get("error")
            .and_then(|error| error.as_str())
            .map(str::to_string),
        Err(_) => Some(body.to_string()),
    }
    .filter(|message| !message.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_BOOKING_ERROR.to_string());

    Err(BookingApiError::Rejected { status, message })
}

#[async_trait]
impl RoomCatalog for StorefrontClient {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Room>, CatalogError> {
        let request = self.rooms_request(query)?;
        let records: Vec<RoomRecord> = self.fetch_json(request).await.map_err(|failure| {
            match failure {
                FetchFailure::NotFound => {
                    CatalogError::CatalogUnavailable("rooms endpoint not found".to_string())
                }
                FetchFailure::Failed { message, .. } => CatalogError::CatalogUnavailable(message),
            }
        })?;

        let rooms = rooms_from_records(records);
        info!(rooms = rooms.len(), "catalog search completed");
        Ok(rooms)
    }

    async fn get_by_id(&self, room_id: &str) -> Result<Room, CatalogError> {
        let request = self
            .http
            .get(self.endpoint(&["api", "rooms", room_id]))
            .build()
            .map_err(|err| CatalogError::CatalogUnavailable(err.to_string()))?;

        let record: RoomRecord = self.fetch_json(request).await.map_err(|failure| {
            match failure {
                FetchFailure::NotFound => CatalogError::RoomNotFound(room_id.to_string()),
                FetchFailure::Failed { message, .. } => CatalogError::CatalogUnavailable(message),
            }
        })?;

        Ok(Room::try_from(record)?)
    }
}

#[async_trait]
impl BookingApi for StorefrontClient {
    async fn create_booking(
        &self,
        request: &BookingRequest,
        token: &str,
    ) -> Result<BookingConfirmation, BookingApiError> {
        let http_request = self.booking_request(request, token)?;

        // Single attempt: a retried POST could create a second booking
        let response = self.http.execute(http_request).await.map_err(|err| {
            if err.is_timeout() {
                BookingApiError::Transport("booking request timed out".to_string())
            } else {
                BookingApiError::Transport(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| BookingApiError::Transport(err.to_string()))?;
        debug!(status, "booking response received");

        parse_booking_response(status, &body)
    }
}
