//! Budget Thuis `OpenID` Connect endpoints, as used by the mobile app.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::{self, RetryPolicy, Transport},
    auth::{credentials::Token, pkce::Pkce},
    prelude::*,
};

pub const CLIENT_ID: &str = "mobile";
pub const REDIRECT_URI: &str = "budgetthuis://login_success";
pub const SCOPE: &str = "mobileApi offline_access openid email idsServiceExternal";

const AUTHORIZE_PATH: &str = "/connect/authorize";
const TOKEN_PATH: &str = "/connect/token";

/// Public client: no secret, PKCE only.
pub struct Client {
    base_url: Url,
    transport: Transport,
}

impl Client {
    pub fn new(base_url: Url, retry: RetryPolicy) -> Self {
        Self { transport: Transport::new(base_url.clone(), retry), base_url }
    }

    /// Build the URL to open in a browser.
    pub fn authorize_url(&self, pkce: &Pkce, state: &str) -> Result<Url> {
        let mut url = self.base_url.join(AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", CLIENT_ID)
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("state", state)
            .append_pair("scope", SCOPE)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", Pkce::METHOD);
        Ok(url)
    }

    #[instrument(skip_all)]
    pub fn exchange_code(&self, code: &str, pkce: &Pkce) -> Result<Token, api::Error> {
        info!("exchanging the authorization code…");
        let response = self.transport.post_form::<TokenResponse>(
            TOKEN_PATH,
            &[
                ("grant_type", "authorization_code"),
                ("client_id", CLIENT_ID),
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
                ("code_verifier", pkce.verifier.as_str()),
            ],
        )?;
        Ok(response.into_token(Utc::now(), None))
    }

    /// Refresh the access token, keeping the refresh token when the provider does not rotate it.
    #[instrument(skip_all)]
    pub fn refresh(&self, refresh_token: &str) -> Result<Token, api::Error> {
        info!("refreshing the access token…");
        let response = self.transport.post_form::<TokenResponse>(
            TOKEN_PATH,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", CLIENT_ID),
                ("refresh_token", refresh_token),
            ],
        )?;
        Ok(response.into_token(Utc::now(), Some(refresh_token.to_string())))
    }
}

/// Parse the `code` out of the redirect URL, checking the `state`.
pub fn parse_redirect(redirect_url: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(redirect_url.trim()).context("the redirect URL is invalid")?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => bail!("the authorization failed: {value}"),
            _ => {}
        }
    }
    ensure!(state.as_deref() == Some(expected_state), "the state does not match");
    code.context("the redirect URL contains no code")
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,

    refresh_token: Option<String>,

    /// Seconds.
    expires_in: i64,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>, previous_refresh_token: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: now + TimeDelta::seconds(self.expires_in),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() -> Result {
        let client = Client::new("https://accounts.budgetthuis.nl".parse()?, RetryPolicy::default());
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        let url = client.authorize_url(&pkce, "xyz")?;
        assert_eq!(url.path(), "/connect/authorize");
        let query = url.query_pairs().into_owned().collect::<Vec<_>>();
        assert!(query.contains(&("client_id".to_string(), "mobile".to_string())));
        assert!(query.contains(&("redirect_uri".to_string(), REDIRECT_URI.to_string())));
        assert!(query.contains(&("scope".to_string(), SCOPE.to_string())));
        assert!(query.contains(&("state".to_string(), "xyz".to_string())));
        assert!(query.contains(&(
            "code_challenge".to_string(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string()
        )));
        assert!(query.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        Ok(())
    }

    #[test]
    fn test_parse_redirect_ok() -> Result {
        let code = parse_redirect("budgetthuis://login_success?code=abc&state=xyz&scope=openid", "xyz")?;
        assert_eq!(code, "abc");
        Ok(())
    }

    #[test]
    fn test_parse_redirect_state_mismatch() {
        assert!(parse_redirect("budgetthuis://login_success?code=abc&state=evil", "xyz").is_err());
    }

    #[test]
    fn test_parse_redirect_error() {
        let error =
            parse_redirect("budgetthuis://login_success?error=access_denied&state=xyz", "xyz")
                .unwrap_err();
        assert!(error.to_string().contains("access_denied"));
    }

    #[test]
    fn test_exchange_code_ok() -> Result {
        let mut server = mockito::Server::new();
        let pkce = Pkce::generate();
        let mock = server
            .mock("POST", "/connect/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "mobile".into()),
                mockito::Matcher::UrlEncoded("code".into(), "abc".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), pkce.verifier.clone()),
            ]))
            .with_status(200)
            .with_body(
                // language=JSON
                r#"{"access_token": "access", "refresh_token": "refresh", "expires_in": 3600, "token_type": "Bearer"}"#,
            )
            .create();
        let before = Utc::now();
        let token = Client::new(server.url().parse()?, RetryPolicy::default()).exchange_code("abc", &pkce)?;
        mock.assert();
        assert_eq!(token.access_token, "access");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert!(token.expires_at >= before + TimeDelta::seconds(3600));
        assert!(token.expires_at <= Utc::now() + TimeDelta::seconds(3600));
        Ok(())
    }

    #[test]
    fn test_refresh_keeps_refresh_token() -> Result {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/connect/token")
            .match_body(mockito::Matcher::UrlEncoded("refresh_token".into(), "refresh".into()))
            .with_status(200)
            // language=JSON
            .with_body(r#"{"access_token": "new", "expires_in": 3600}"#)
            .create();
        let token = Client::new(server.url().parse()?, RetryPolicy::default()).refresh("refresh")?;
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        Ok(())
    }

    #[test]
    fn test_refresh_invalid_grant() -> Result {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/connect/token")
            .with_status(400)
            // language=JSON
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create();
        let error =
            Client::new(server.url().parse()?, RetryPolicy::default()).refresh("revoked").unwrap_err();
        assert!(error.is_rejection());
        Ok(())
    }
}
