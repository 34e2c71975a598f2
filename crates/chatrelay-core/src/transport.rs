//! HTTP calls against the chat web API

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONNECTION, CONTENT_TYPE, COOKIE, HOST, HeaderMap,
    HeaderValue, REFERER, SET_COOKIE, USER_AGENT,
};

use crate::codec;
use crate::error::{Error, Result};
use crate::provider::{CALLBACK_COOKIE, ProviderSettings, SESSION_COOKIE};

/// Raw answer of the session endpoint
#[derive(Debug, Clone, Default)]
pub struct SessionResponse {
    /// Rotated session secret, if the backend sent one
    pub renewed_secret: Option<String>,
    /// JSON body carrying the bearer token
    pub body: String,
}

/// The two backend calls the bridge makes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Trade the session secret for a fresh session body
    async fn fetch_session(&self, secret: &str) -> Result<SessionResponse>;

    /// Post a conversation request and read the whole event stream
    async fn post_conversation(&self, bearer: &str, body: Vec<u8>) -> Result<String>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    settings: ProviderSettings,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `settings.request_timeout`
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    fn conversation_headers(&self, bearer: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, header_value(self.settings.host())?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        headers.insert(USER_AGENT, header_value(&self.settings.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-openai-assistant-app-id", HeaderValue::from_static(""));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, header_value(&self.settings.referer())?);
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_session(&self, secret: &str) -> Result<SessionResponse> {
        let cookie = format!(
            "{}={}; {}={}",
            SESSION_COOKIE,
            secret,
            CALLBACK_COOKIE,
            self.settings.callback_url()
        );

        let response = self
            .client
            .get(self.settings.session_url())
            .header(COOKIE, header_value(&cookie)?)
            .header(USER_AGENT, header_value(&self.settings.user_agent)?)
            .send()
            .await?;

        let status = response.status();
        let renewed_secret = codec::session_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), body));
        }

        Ok(SessionResponse {
            renewed_secret,
            body,
        })
    }

    async fn post_conversation(&self, bearer: &str, body: Vec<u8>) -> Result<String> {
        tracing::debug!("Conversation URL: {}", self.settings.conversation_url());

        let response = self
            .client
            .post(self.settings.conversation_url())
            .headers(self.conversation_headers(bearer)?)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::api(status.as_u16(), text));
        }
        Ok(text)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidHeader(e.to_string()))
}
