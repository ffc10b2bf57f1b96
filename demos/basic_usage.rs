//! Basic usage: issue a code, read it from stdin and verify it.
//!
//! # Running
//!
//! ```bash
//! cp tests/.env.example .env   # fill in credentials and TWILIO_TEST_DESTINATION
//! cargo run --example basic_usage
//! ```

use sms_otp::twilio::{TwilioGateway, TwilioSettings};
use sms_otp::{Channel, CheckOutcome, Destination, OtpCode, OtpService, OtpServiceTrait};
use std::env;
use std::io::{self, BufRead, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_NUMBER, TWILIO_VERIFY_SERVICE_SID
    let settings = TwilioSettings::from_env()?;
    let service = OtpService::with_gateway(TwilioGateway::from_settings(settings)?);

    let destination = Destination::new(
        env::var("TWILIO_TEST_DESTINATION")
            .expect("TWILIO_TEST_DESTINATION environment variable must be set"),
    )?;

    println!("Sending a code to {}...", destination.masked());
    let session = service.issue_otp(&destination, Channel::Sms).await?;
    println!("Started session {session}");

    // A second request inside the window never reaches Twilio.
    if let Err(error) = service.issue_otp(&destination, Channel::Sms).await {
        println!("Re-issue refused: {error}");
    }

    print!("Enter the code you received: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    match service
        .verify_otp(&destination, &OtpCode::new(line)?)
        .await?
    {
        CheckOutcome::Approved => println!("Code approved"),
        CheckOutcome::Rejected { status } => println!("Code rejected (status: {status})"),
    }

    let status = service.get_verification_status(&session).await?;
    println!("Session {session} is now {status}");

    Ok(())
}
