//! Structured results log and address anonymization.
//!
//! Every significant transition emits one structured event under the
//! `telemetry` target. A dedicated JSON layer appends those events to the
//! results log through a non-blocking appender, which also serializes
//! concurrent writes so records are never interleaved. Diagnostics go to
//! stderr under the usual `RUST_LOG` filter.
//!
//! Raw client addresses never reach a log record: `anonymize_addr` runs on
//! every address first.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, intake::IntakeAnswers, verify::AnswerForm};

pub const TARGET: &str = "telemetry";

/// Installs the two-layer subscriber: stderr diagnostics plus the JSON
/// results sink. The returned guard flushes buffered records on drop and
/// must live for the life of the process.
pub fn init(config: &Config) -> WorkerGuard {
    let file = tracing_appender::rolling::never(&config.results_log_dir, &config.results_log_file);
    let (writer, guard) = tracing_appender::non_blocking(file);

    let results = fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(Targets::new().with_target(TARGET, Level::INFO));

    let diagnostics = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry()
        .with(results)
        .with(diagnostics)
        .init();

    guard
}

/// Strips the host part of a client address: IPv4 keeps its /24, IPv6 its
/// /32. Idempotent. Unparsable input maps to `"invalid"`.
pub fn anonymize_addr(raw: &str) -> String {
    match raw.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let [a, b, c, _] = v4.octets();
            Ipv4Addr::new(a, b, c, 0).to_string()
        }
        Ok(IpAddr::V6(v6)) => {
            let [a, b, ..] = v6.segments();
            Ipv6Addr::new(a, b, 0, 0, 0, 0, 0, 0).to_string()
        }
        Err(_) => "invalid".to_string(),
    }
}

pub fn session_started(id: &str, ip: &str, ua: &str, answers: &IntakeAnswers) {
    info!(
        target: TARGET,
        id,
        ip,
        ua,
        consent = %answers.consent,
        cbq = %answers.colorblind_q,
        cbtq = %answers.colorblind_type_q,
        ww = answers.window_width,
        wo = %answers.window_orientation,
        "session"
    );
}

pub fn bad_answer(ip: &str, ua: &str, field: &str) {
    info!(target: TARGET, ip, ua, n = field, "badanswer");
}

pub fn bad_match(id: &str, ip: &str) {
    info!(target: TARGET, id, ip, "badmatch");
}

pub fn bad_pick(id: &str, ip: &str) {
    info!(target: TARGET, id, ip, "badpick");
}

pub fn pick(id: &str, ip: &str, answer: &AnswerForm, set_pick: i8, order_pick: i8, picks: u32) {
    info!(
        target: TARGET,
        id,
        ip,
        c1 = %answer.set1,
        c2 = %answer.set2,
        o = %answer.orders,
        dm = answer.draw_mode,
        sp = set_pick,
        cp = order_pick,
        np = picks,
        "pick"
    );
}
