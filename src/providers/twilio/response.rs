//! Response parsing for the Twilio REST API.

use super::errors::TwilioApiError;
use serde::de::DeserializeOwned;

/// Unified response type for Twilio API calls.
#[derive(Debug)]
pub enum TwilioResponse<T> {
    Success(T),
    Error(TwilioApiError),
}

impl<T> TwilioResponse<T> {
    /// Convert response into a Result for ergonomic error handling.
    pub fn into_result(self) -> Result<T, TwilioApiError> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Error(e) => Err(e),
        }
    }
}

impl<T: DeserializeOwned> TwilioResponse<T> {
    /// Parse a response from its HTTP status and body.
    ///
    /// Success bodies are JSON resources. Error bodies are usually Twilio's
    /// JSON error document; anything else (proxy pages, empty bodies) is
    /// wrapped with the HTTP status so the fault is still reported.
    pub fn from_parts(status: u16, text: &str) -> Result<Self, serde_json::Error> {
        if (200..300).contains(&status) {
            return serde_json::from_str::<T>(text).map(Self::Success);
        }

        let error = serde_json::from_str::<TwilioApiError>(text).unwrap_or_else(|_| {
            let message = text.trim();
            TwilioApiError {
                code: None,
                message: if message.is_empty() {
                    "empty response body".to_string()
                } else {
                    message.to_string()
                },
                more_info: None,
                status,
            }
        });
        Ok(Self::Error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::twilio::types::VerificationResource;

    #[test]
    fn test_success_response() {
        let json = r#"{"sid": "VA001", "status": "pending", "to": "+15551230000", "channel": "sms"}"#;
        let response = TwilioResponse::<VerificationResource>::from_parts(201, json).unwrap();
        let data = response.into_result().unwrap();
        assert_eq!(data.sid.as_str(), "VA001");
        assert_eq!(data.status, "pending");
    }

    #[test]
    fn test_json_error_response() {
        let json = r#"{"code": 20404, "message": "Not found", "more_info": "https://www.twilio.com/docs/errors/20404", "status": 404}"#;
        let response = TwilioResponse::<VerificationResource>::from_parts(404, json).unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, Some(20404));
        assert_eq!(error.status, 404);
    }

    #[test]
    fn test_non_json_error_response() {
        let response =
            TwilioResponse::<VerificationResource>::from_parts(502, "Bad Gateway").unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, None);
        assert_eq!(error.status, 502);
        assert_eq!(error.message, "Bad Gateway");
    }

    #[test]
    fn test_malformed_success_body() {
        assert!(TwilioResponse::<VerificationResource>::from_parts(200, "not json").is_err());
    }
}
