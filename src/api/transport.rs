use std::{fmt::Display, thread, time::Duration};

use bon::Builder;
use reqwest::Url;
use serde::{Serialize, de::DeserializeOwned};
use ureq::{Agent, Body, RequestBuilder};

use crate::{api::Error, prelude::*};

/// Retries of failed transport, with exponential backoff.
///
/// HTTP statuses are never retried: a response is a response.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    #[builder(default = 5)]
    pub total: u32,

    #[builder(default = Duration::from_secs(3))]
    pub backoff_factor: Duration,

    #[builder(default = Duration::from_secs(120))]
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Sleep duration after the specified number of consecutive errors.
    ///
    /// The first retry is immediate, then the delay doubles.
    #[must_use]
    pub fn backoff(&self, n_errors: u32) -> Duration {
        if n_errors <= 1 {
            return Duration::ZERO;
        }
        2_u32
            .checked_pow(n_errors - 1)
            .and_then(|multiplier| self.backoff_factor.checked_mul(multiplier))
            .map_or(self.backoff_max, |backoff| backoff.min(self.backoff_max))
    }

    /// Call the blocking function until it succeeds or the retries are exhausted.
    pub fn call<T, E: Display>(&self, mut f: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        let mut n_errors = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(error) if n_errors >= self.total => return Err(error),
                Err(error) => {
                    n_errors += 1;
                    let backoff = self.backoff(n_errors);
                    warn!(n_errors, ?backoff, "request failed, retrying: {error:#}");
                    thread::sleep(backoff);
                }
            }
        }
    }
}

/// Blocking HTTP client with a bounded connection pool.
pub struct Transport {
    agent: Agent,
    base_url: Url,
    authorization: Option<String>,
    retry: RetryPolicy,
}

impl Transport {
    const MAX_CONNECTIONS: usize = 25;

    pub fn new(base_url: Url, retry: RetryPolicy) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .max_idle_connections(Self::MAX_CONNECTIONS)
            .max_idle_connections_per_host(Self::MAX_CONNECTIONS)
            .build()
            .into();
        Self { agent, base_url, authorization: None, retry }
    }

    pub fn with_bearer_token(mut self, access_token: &str) -> Self {
        self.authorization = Some(format!("Bearer {access_token}"));
        self
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    pub fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let url = self.url(path)?;
        let response = self.retry.call(|| self.authorize(self.agent.get(url.as_str())).call());
        Self::read_json(&url, response)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    pub fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, Error> {
        let url = self.url(path)?;
        let response =
            self.retry.call(|| self.authorize(self.agent.post(url.as_str())).send_json(body));
        Self::read_json(&url, response)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    pub fn post_form<R: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<R, Error> {
        let url = self.url(path)?;
        let response = self.retry.call(|| {
            self.authorize(self.agent.post(url.as_str())).send_form(form.iter().copied())
        });
        Self::read_json(&url, response)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        match &self.authorization {
            Some(authorization) => request.header("Authorization", authorization.as_str()),
            None => request,
        }
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(|error| Error::Transport {
            url: format!("{}{path}", self.base_url),
            source: ureq::Error::BadUri(error.to_string()),
        })
    }

    fn read_json<R: DeserializeOwned>(
        url: &Url,
        response: Result<http::Response<Body>, ureq::Error>,
    ) -> Result<R, Error> {
        let mut response =
            response.map_err(|source| Error::Transport { url: url.to_string(), source })?;
        let status = response.status();
        debug!(%url, %status, "received");
        if !status.is_success() {
            return Err(Error::Status { url: url.to_string(), status });
        }
        response
            .body_mut()
            .read_json()
            .map_err(|source| Error::Decode { url: url.to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_secs(6));
        assert_eq!(policy.backoff(3), Duration::from_secs(12));
        assert_eq!(policy.backoff(5), Duration::from_secs(48));
        assert_eq!(policy.backoff(6), Duration::from_secs(96));
        assert_eq!(policy.backoff(7), Duration::from_secs(120));
        assert_eq!(policy.backoff(100), Duration::from_secs(120));
    }

    #[test]
    fn test_call_gives_up() {
        let policy = RetryPolicy::builder().total(2).backoff_factor(Duration::ZERO).build();
        let n_attempts = Cell::new(0);
        let result: Result<(), &str> = policy.call(|| {
            n_attempts.set(n_attempts.get() + 1);
            Err("nope")
        });
        assert_eq!(result, Err("nope"));
        assert_eq!(n_attempts.get(), 3);
    }

    #[test]
    fn test_call_recovers() {
        let policy = RetryPolicy::builder().backoff_factor(Duration::ZERO).build();
        let n_attempts = Cell::new(0);
        let result = policy.call(|| {
            n_attempts.set(n_attempts.get() + 1);
            if n_attempts.get() < 3 { Err("nope") } else { Ok(42) }
        });
        assert_eq!(result, Ok(42));
        assert_eq!(n_attempts.get(), 3);
    }

    #[test]
    fn test_status_is_not_retried() -> Result {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/flaky").with_status(503).expect(1).create();
        let transport = Transport::new(server.url().parse()?, RetryPolicy::default());
        let error = transport.get::<serde_json::Value>("/flaky").unwrap_err();
        assert_eq!(error.status(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        mock.assert();
        Ok(())
    }

    #[test]
    fn test_post_form_ok() -> Result {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/token")
            .match_header("authorization", mockito::Matcher::Missing)
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("scope".into(), "openid email".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create();
        let transport = Transport::new(server.url().parse()?, RetryPolicy::default());
        let response = transport.post_form::<serde_json::Value>(
            "/token",
            &[("grant_type", "refresh_token"), ("scope", "openid email")],
        )?;
        mock.assert();
        assert_eq!(response["ok"], true);
        Ok(())
    }

    #[test]
    fn test_decode_error() -> Result {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/garbage").with_status(200).with_body("garbage").create();
        let transport = Transport::new(server.url().parse()?, RetryPolicy::default());
        let error = transport.get::<serde_json::Value>("/garbage").unwrap_err();
        assert!(matches!(error, Error::Decode { .. }));
        Ok(())
    }
}
