//! Twilio HTTP client.

use super::errors::{Result, TwilioError};
use super::response::TwilioResponse;
use super::settings::TwilioSettings;
use super::types::{MessageResource, VerificationCheckResource, VerificationResource};
use crate::types::{Channel, Destination, OtpCode, SessionId};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::Span;
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Twilio Verify API base URL.
pub const DEFAULT_VERIFY_URL: &str = "https://verify.twilio.com";

/// Default Twilio core (Messaging) API base URL.
pub const DEFAULT_API_URL: &str = "https://api.twilio.com";

/// Twilio HTTP client.
///
/// Speaks the Verify v2 API for OTP sessions and the 2010-04-01 Messages API
/// for plain texts. Requests use HTTP basic auth with the account SID and
/// auth token and form-encoded bodies.
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::twilio::{TwilioClient, TwilioSettings};
/// use sms_otp::{Channel, Destination};
///
/// let client = TwilioClient::new(TwilioSettings::from_env()?)?;
/// let to = Destination::new("+15551230000")?;
/// let verification = client.create_verification(&to, Channel::Sms).await?;
/// println!("session: {}", verification.sid);
/// ```
#[derive(Clone)]
pub struct TwilioClient {
    http_client: ClientWithMiddleware,
    account_sid: String,
    auth_token: SecretString,
    verify_service_sid: String,
    from_number: Destination,
    verify_url: Url,
    api_url: Url,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("verify_service_sid", &self.verify_service_sid)
            .field("verify_url", &self.verify_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Builder for configuring a [`TwilioClient`].
pub struct TwilioClientBuilder {
    settings: TwilioSettings,
    verify_url: Option<Url>,
    api_url: Option<Url>,
    http_client: Option<ClientWithMiddleware>,
}

impl TwilioClientBuilder {
    /// Create a new builder with the given settings.
    pub fn new(settings: TwilioSettings) -> Self {
        Self {
            settings,
            verify_url: None,
            api_url: None,
            http_client: None,
        }
    }

    /// Set a custom Verify API base URL.
    pub fn verify_url(mut self, url: Url) -> Self {
        self.verify_url = Some(url);
        self
    }

    /// Set a custom Messaging API base URL.
    pub fn api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    /// Point both APIs at one base URL (useful for mock servers).
    pub fn base_url(self, url: Url) -> Self {
        self.verify_url(url.clone()).api_url(url)
    }

    /// Set a custom HTTP client with middleware.
    pub fn http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the settings and build the [`TwilioClient`].
    pub fn build(self) -> Result<TwilioClient> {
        self.settings.validate()?;
        let from_number = self.settings.sender()?;

        let verify_url = match self.verify_url {
            Some(url) => url,
            None => parse_url(DEFAULT_VERIFY_URL)?,
        };
        let api_url = match self.api_url {
            Some(url) => url,
            None => parse_url(DEFAULT_API_URL)?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(TwilioError::BuildHttpClient)?;
                ClientBuilder::new(client).build()
            }
        };

        Ok(TwilioClient {
            http_client,
            account_sid: self.settings.account_sid,
            auth_token: self.settings.auth_token,
            verify_service_sid: self.settings.verify_service_sid,
            from_number,
            verify_url,
            api_url,
        })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| TwilioError::InvalidEndpoint {
        url: url.to_string(),
        source,
    })
}

/// Append path segments to `base`. Each segment is percent-encoded on its
/// own, so a `/` or `?` inside one cannot change the route.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TwilioError::InvalidEndpoint {
            url: base.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Twilio resource SIDs are two letters followed by hex digits.
fn check_session_id(session: &SessionId) -> Result<()> {
    let id = session.as_str();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(TwilioError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

impl TwilioClient {
    /// Create a client with the default API URLs.
    pub fn new(settings: TwilioSettings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Create a client with both APIs served from `base_url`.
    pub fn with_base_url(settings: TwilioSettings, base_url: impl AsRef<str>) -> Result<Self> {
        let url = parse_url(base_url.as_ref())?;
        Self::builder(settings).base_url(url).build()
    }

    /// Create a builder for configuring the client.
    pub fn builder(settings: TwilioSettings) -> TwilioClientBuilder {
        TwilioClientBuilder::new(settings)
    }

    /// Sender number used for plain messages.
    pub fn from_number(&self) -> &Destination {
        &self.from_number
    }

    fn verifications_url(&self) -> Result<Url> {
        endpoint(
            &self.verify_url,
            &["v2", "Services", self.verify_service_sid.as_str(), "Verifications"],
        )
    }

    /// Send an authenticated request and decode the JSON resource.
    async fn send_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T> {
        let mut request = self
            .http_client
            .request(method, url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()));

        if let Some(form) = form {
            let body = serde_urlencoded::to_string(form).map_err(TwilioError::EncodeForm)?;
            request = request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = request.send().await.map_err(TwilioError::HttpRequest)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(TwilioError::ReadResponse)?;

        TwilioResponse::<T>::from_parts(status, &text)
            .map_err(TwilioError::DeserializeJson)?
            .into_result()
            .map_err(TwilioError::Api)
    }

    /// Start a verification (`POST /v2/Services/{VA}/Verifications`).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::create_verification",
            skip_all,
            fields(to = %to.masked(), channel = %channel, session_id = tracing::field::Empty)
        )
    )]
    pub async fn create_verification(
        &self,
        to: &Destination,
        channel: Channel,
    ) -> Result<VerificationResource> {
        let url = self.verifications_url()?;
        let form = [("To", to.as_str()), ("Channel", channel.wire_name())];

        let data: VerificationResource = self.send_request(Method::POST, url, Some(&form)).await?;

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("session_id", data.sid.as_str())
                .set_status(Status::Ok);
        }

        Ok(data)
    }

    /// Check a code (`POST /v2/Services/{VA}/VerificationCheck`).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::create_verification_check",
            skip_all,
            fields(to = %to.masked(), status = tracing::field::Empty)
        )
    )]
    pub async fn create_verification_check(
        &self,
        to: &Destination,
        code: &OtpCode,
    ) -> Result<VerificationCheckResource> {
        let url = endpoint(
            &self.verify_url,
            &["v2", "Services", self.verify_service_sid.as_str(), "VerificationCheck"],
        )?;
        let form = [("To", to.as_str()), ("Code", code.as_str())];

        let data: VerificationCheckResource =
            self.send_request(Method::POST, url, Some(&form)).await?;

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("status", data.status.as_str())
                .set_status(Status::Ok);
        }

        Ok(data)
    }

    /// Fetch a verification (`GET /v2/Services/{VA}/Verifications/{sid}`).
    ///
    /// Ids that are empty or not plain alphanumeric SIDs are rejected with
    /// [`TwilioError::InvalidSessionId`] without a request.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::fetch_verification",
            skip_all,
            fields(session_id = %session, status = tracing::field::Empty)
        )
    )]
    pub async fn fetch_verification(&self, session: &SessionId) -> Result<VerificationResource> {
        check_session_id(session)?;
        let url = endpoint(
            &self.verify_url,
            &[
                "v2",
                "Services",
                self.verify_service_sid.as_str(),
                "Verifications",
                session.as_str(),
            ],
        )?;

        let data: VerificationResource = self.send_request(Method::GET, url, None).await?;

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("status", data.status.as_str())
                .set_status(Status::Ok);
        }

        Ok(data)
    }

    /// Send a text (`POST /2010-04-01/Accounts/{AC}/Messages.json`).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::create_message",
            skip_all,
            fields(to = %to.masked(), body_len = body.chars().count(), message_id = tracing::field::Empty)
        )
    )]
    pub async fn create_message(&self, to: &Destination, body: &str) -> Result<MessageResource> {
        let url = endpoint(
            &self.api_url,
            &["2010-04-01", "Accounts", self.account_sid.as_str(), "Messages.json"],
        )?;
        let form = [
            ("To", to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", body),
        ];

        let data: MessageResource = self.send_request(Method::POST, url, Some(&form)).await?;

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("message_id", data.sid.as_str())
                .set_status(Status::Ok);
        }

        Ok(data)
    }
}
