//! Bearer token lifecycle.
//!
//! The token endpoint does not report an expiry, so a token is considered
//! valid for [`TOKEN_LIFETIME_SECS`] after it was issued. Validity is checked
//! lazily, right before an authenticated request is made.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::HttpClient;

pub const TOKEN_PATH: &str = "/token/v1/autentica/cartaopostagem";

/// Assumed lifetime of an issued token.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const CONTEXT: &str = "token request";

#[derive(Serialize)]
struct TokenRequest<'a> {
    numero: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// A bearer token and the instant it stops being used.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Bearer token sent in the `Authorization` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Instant from which the token is no longer used.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token is expired at `now`. The expiry instant itself counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &mask(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Obtains, caches and refreshes the bearer token.
pub struct TokenManager<C: Clock> {
    http: HttpClient,
    url: String,
    credentials: Credentials,
    clock: C,
    session: Option<Session>,
}

impl<C: Clock> TokenManager<C> {
    /// Creates a manager with no session; nothing is requested until first use.
    pub fn new(http: HttpClient, base_url: &str, credentials: Credentials, clock: C) -> Self {
        Self {
            http,
            url: format!("{}{}", base_url, TOKEN_PATH),
            credentials,
            clock,
            session: None,
        }
    }

    /// Current session, expired or not.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Current bearer token, expired or not.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(Session::token)
    }

    /// Expiry of the current session, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(Session::expires_at)
    }

    /// Whether a token exists and has not reached its expiry instant.
    pub fn is_valid(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.is_expired_at(self.clock.now()))
    }

    /// Drops the current session so the next call re-authenticates.
    pub fn invalidate(&mut self) {
        self.session = None;
    }

    /// Exchanges the credentials for a new token, replacing the current one.
    ///
    /// Success is HTTP 201 with a `token` field in the JSON body.
    #[tracing::instrument(skip(self))]
    pub async fn authenticate(&mut self) -> Result<&Session> {
        debug!(
            "Requesting token for postage card {} as {}",
            self.credentials.postage_card, self.credentials.username
        );

        let request = self
            .http
            .inner()
            .post(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&TokenRequest {
                numero: &self.credentials.postage_card,
            });

        let response = self.http.execute(request, CONTEXT).await?;

        if response.status != StatusCode::CREATED {
            warn!(
                "Authentication rejected with HTTP {}",
                response.status.as_u16()
            );
            return Err(Error::AuthenticationRejected {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let decoded: TokenResponse = response.decode(CONTEXT)?;
        let expires_at = self.clock.now() + Duration::seconds(TOKEN_LIFETIME_SECS);

        info!("Authenticated, token {} valid until {}", mask(&decoded.token), expires_at);

        Ok(&*self.session.insert(Session {
            token: decoded.token,
            expires_at,
        }))
    }

    /// Returns a usable token, authenticating first when there is none or it expired.
    pub async fn ensure_valid(&mut self) -> Result<String> {
        if let Some(session) = &self.session {
            if !session.is_expired_at(self.clock.now()) {
                return Ok(session.token.clone());
            }
            debug!("Token expired at {}, refreshing", session.expires_at);
        }

        let session = self.authenticate().await?;
        Ok(session.token.clone())
    }
}

fn mask(token: &str) -> String {
    if token.len() <= 8 {
        return "********".to_string();
    }
    let head: String = token.chars().take(4).collect();
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}********{}", head, tail)
}
