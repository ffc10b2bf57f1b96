//! OpenTelemetry counters for OTP traffic.
//!
//! Instruments are created on the global meter provider the first time they
//! are used. Install a provider with `opentelemetry::global::set_meter_provider`
//! before building the service to export them.

use once_cell::sync::Lazy;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;

const METER_NAME: &str = "sms-otp";

struct Instruments {
    issued: Counter<u64>,
    throttled: Counter<u64>,
    verify: Counter<u64>,
    messages: Counter<u64>,
}

static INSTRUMENTS: Lazy<Instruments> = Lazy::new(|| {
    let meter = global::meter(METER_NAME);
    Instruments {
        issued: meter
            .u64_counter("otp.issued")
            .with_description("OTP issuance attempts that reached the gateway")
            .build(),
        throttled: meter
            .u64_counter("otp.throttled")
            .with_description("OTP issuance attempts refused by the rate limiter")
            .build(),
        verify: meter
            .u64_counter("otp.verify")
            .with_description("OTP verification checks")
            .build(),
        messages: meter
            .u64_counter("otp.messages")
            .with_description("Plain messages sent")
            .build(),
    }
});

pub(crate) fn record_issued(gateway: &'static str, outcome: &'static str) {
    INSTRUMENTS.issued.add(
        1,
        &[
            KeyValue::new("gateway", gateway),
            KeyValue::new("outcome", outcome),
        ],
    );
}

pub(crate) fn record_throttled(in_flight: bool) {
    INSTRUMENTS
        .throttled
        .add(1, &[KeyValue::new("in_flight", in_flight)]);
}

pub(crate) fn record_verify(gateway: &'static str, outcome: &'static str) {
    INSTRUMENTS.verify.add(
        1,
        &[
            KeyValue::new("gateway", gateway),
            KeyValue::new("outcome", outcome),
        ],
    );
}

pub(crate) fn record_message(gateway: &'static str, outcome: &'static str) {
    INSTRUMENTS.messages.add(
        1,
        &[
            KeyValue::new("gateway", gateway),
            KeyValue::new("outcome", outcome),
        ],
    );
}
