use async_trait::async_trait;
use coursesync_core::catalog::CatalogCourse;
use coursesync_core::config::{CatalogApiConfig, HttpConfig};
use coursesync_core::error::AppError;
use coursesync_core::models::{Building, Instructor, Room, School, Subject, Term};
use coursesync_core::traits::CatalogGateway;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

/// HTTP client for the university course data API.
///
/// Every endpoint answers a GET with a bare JSON array. The API key travels as a
/// query parameter whose name is configurable.
///
/// # Examples
///
/// ```no_run
/// use coursesync_client::CatalogClient;
/// use coursesync_core::config::{CatalogApiConfig, HttpConfig};
/// use coursesync_core::traits::CatalogGateway;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = CatalogApiConfig {
///     base_url: "https://api.asg.northwestern.edu/".to_string(),
///     api_key: "secret".to_string(),
///     api_key_parameter: "key".to_string(),
/// };
/// let client = CatalogClient::new(&api, &HttpConfig::default())?;
/// let terms = client.terms().await?;
/// println!("Found {} terms", terms.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    api_key: String,
    api_key_parameter: String,
    http: HttpConfig,
}

impl CatalogClient {
    /// Creates a client for the API rooted at `api.base_url`.
    ///
    /// A trailing slash is added to the base URL when missing so endpoints join
    /// beneath it rather than replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the base URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(api: &CatalogApiConfig, http: &HttpConfig) -> Result<Self, AppError> {
        let base_url = normalize_base_url(&api.base_url)?;

        let client = Client::builder()
            .user_agent("coursesync/0.1 (catalog-mirror)")
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api.api_key.clone(),
            api_key_parameter: api.api_key_parameter.clone(),
            http: http.clone(),
        })
    }

    /// Builds `{base_url}{endpoint}?{params}&{api_key_parameter}={api_key}`.
    fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            query.append_pair(&self.api_key_parameter, &self.api_key);
        }

        Ok(url)
    }

    /// Fetches `endpoint` and decodes the body as a JSON collection.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!(endpoint, ?params, "Requesting course data");

        let resp = self.request_with_retry(&url).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        decode_collection(&body)
    }

    /// Makes an HTTP GET request with automatic retry on transient failures.
    ///
    /// Implements backoff for retries on:
    /// - Network errors
    /// - Timeouts
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    async fn request_with_retry(&self, url: &Url) -> Result<reqwest::Response, AppError> {
        let max_retries = self.http.max_retries.max(1);
        let base_delay = self.http.retry_base_delay;
        let mut last_error = AppError::Generic("No attempts made".to_string());

        for attempt in 1..=max_retries {
            match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        if attempt < max_retries {
                            sleep(base_delay * 2_u32.pow(attempt)).await;
                            continue;
                        }
                        return Err(last_error);
                    }

                    if status.is_server_error() {
                        last_error =
                            AppError::ClientError(format!("Server error: HTTP {}", status.as_u16()));
                        if attempt < max_retries {
                            sleep(base_delay * attempt).await;
                            continue;
                        }
                        return Err(last_error);
                    }

                    // Client error (4xx except 429) - don't retry
                    return Err(AppError::ClientError(format!(
                        "HTTP {} from {}",
                        status.as_u16(),
                        redact(url, &self.api_key_parameter)
                    )));
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = AppError::Timeout(self.http.timeout.as_secs());
                    } else if e.is_connect() {
                        last_error = AppError::NetworkError(format!("Connection failed: {}", e));
                    } else {
                        last_error = AppError::ClientError(e.to_string());
                    }

                    if attempt < max_retries && last_error.is_retryable() {
                        sleep(base_delay * attempt).await;
                        continue;
                    }
                    return Err(last_error);
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl CatalogGateway for CatalogClient {
    async fn terms(&self) -> Result<Vec<Term>, AppError> {
        self.fetch("terms", &[]).await
    }

    async fn schools(&self) -> Result<Vec<School>, AppError> {
        self.fetch("schools", &[]).await
    }

    async fn subjects(&self, term: i32, school: &str) -> Result<Vec<Subject>, AppError> {
        self.fetch(
            "subjects",
            &[("term", term.to_string()), ("school", school.to_string())],
        )
        .await
    }

    async fn instructors(&self, subject: &str) -> Result<Vec<Instructor>, AppError> {
        self.fetch("instructors", &[("subject", subject.to_string())])
            .await
    }

    async fn buildings(&self) -> Result<Vec<Building>, AppError> {
        self.fetch("buildings", &[]).await
    }

    async fn rooms(&self, building: i32) -> Result<Vec<Room>, AppError> {
        self.fetch("rooms", &[("building", building.to_string())])
            .await
    }

    async fn course_details(
        &self,
        term: i32,
        subject: &str,
    ) -> Result<Vec<CatalogCourse>, AppError> {
        self.fetch(
            "courses/details",
            &[("term", term.to_string()), ("subject", subject.to_string())],
        )
        .await
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, AppError> {
    let mut url =
        Url::parse(raw).map_err(|_| AppError::InvalidUrl(format!("Invalid API URL: {}", raw)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::InvalidUrl(format!("Invalid API URL: {}", raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Decodes a JSON array body. A `null` body is treated as an empty collection.
fn decode_collection<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, AppError> {
    let items: Option<Vec<T>> = serde_json::from_slice(body)?;
    Ok(items.unwrap_or_default())
}

/// Renders `url` with the API key value masked, for error messages.
fn redact(url: &Url, api_key_parameter: &str) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == api_key_parameter {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
