//! Wrapping the gateway with retry logic.
//!
//! Only session lookups are retried. Issuance, checks and messages are
//! sent once, since repeating them would send another SMS or burn a check
//! attempt.
//!
//! # Running
//!
//! ```bash
//! cargo run --example with_retry -- VE0123456789abcdef0123456789abcdef
//! ```

use sms_otp::twilio::{TwilioGateway, TwilioSettings};
use sms_otp::{
    OtpService, OtpServiceTrait, RetryConfig, RetryableError, RetryableGateway, SessionId,
};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let session = env::args()
        .nth(1)
        .map(SessionId::from)
        .expect("usage: with_retry <verification SID>");

    let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;

    // Configure retry behavior using the builder pattern
    let retry_config = RetryConfig::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(5))
        .with_factor(2.0)
        .with_max_retries(3);

    let gateway = RetryableGateway::with_config(gateway, retry_config).with_on_retry(
        |error, delay| {
            println!("Lookup failed ({error}), retrying in {:.1}s", delay.as_secs_f64());
        },
    );

    let service = OtpService::builder(gateway)
        .gateway_timeout(Duration::from_secs(30))
        .build()?;

    println!("Looking up session {session} (with retry enabled)...");
    match service.get_verification_status(&session).await {
        Ok(outcome) => println!("Session status: {outcome}"),
        Err(error) => println!(
            "Lookup failed: {error} (retryable: {})",
            error.is_retryable()
        ),
    }

    Ok(())
}
