//! Cancelling service calls from another task.
//!
//! A cancelled issuance records nothing, so the destination can be issued
//! a code again right away.
//!
//! # Running
//!
//! ```bash
//! cargo run --example with_cancellation
//! ```

use sms_otp::twilio::{TwilioGateway, TwilioSettings};
use sms_otp::{CancellationToken, Channel, Destination, OtpService, OtpServiceError};
use std::env;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;
    let service = OtpService::builder(gateway)
        .gateway_timeout(Duration::from_secs(15))
        .build()?;

    let destination = Destination::new(
        env::var("TWILIO_TEST_DESTINATION")
            .expect("TWILIO_TEST_DESTINATION environment variable must be set"),
    )?;

    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();

    // Give up on the provider after 2 seconds
    let cancel_handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        println!("Cancelling operation...");
        token_clone.cancel();
    });

    println!("Issuing a code to {} (cancellable)...", destination.masked());
    match service
        .issue_otp_cancellable(&destination, Channel::Sms, &cancel_token)
        .await
    {
        Ok(session) => {
            cancel_handle.abort();
            println!("Started session {session}");
        }
        Err(OtpServiceError::Cancelled) => {
            let throttled = service
                .limiter()
                .should_throttle(&destination, Instant::now());
            println!("Cancelled, destination throttled: {throttled}");
        }
        Err(OtpServiceError::Timeout { timeout }) => {
            println!("Timed out after {:.1}s", timeout.as_secs_f64());
        }
        Err(error) => println!("Error: {error}"),
    }

    // Reads and sends take a token the same way.
    let send_token = CancellationToken::new();
    match service
        .send_message_cancellable(&destination, "sms-otp cancellation demo", &send_token)
        .await
    {
        Ok(delivery) => println!("Message accepted: {}", delivery.message_id),
        Err(error) => println!("Send failed: {error}"),
    }

    Ok(())
}
