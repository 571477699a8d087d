//! HTTP handlers for the survey flow.
//!
//! Every handler decodes the session token, does its work, and re-encodes
//! the token as the final side effect. A handler that fails leaves the
//! client's cookie untouched, so the pending fingerprint is still there to
//! verify on the retry.
use axum::{
    Json,
    extract::{RawForm, State},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Serialize;
use tracing::warn;

use crate::{
    error::AppError,
    intake::{self, IntakeForm, IntakeRejection},
    session::{self, Session, SessionState},
    state::AppState,
    stimulus::Stimulus,
    telemetry,
    verify::{self, AnswerForm, Verdict},
};

/// Question payload, key casing matched to the frontend.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColorSetQuestion {
    pub set1: Vec<String>,
    pub set2: Vec<String>,
    pub orders: Vec<String>,
    pub draw_mode: u8,
    pub picks: u32,
}

impl ColorSetQuestion {
    fn new(stimulus: Stimulus, picks: u32) -> Self {
        Self {
            set1: stimulus.set1,
            set2: stimulus.set2,
            orders: stimulus.orders,
            draw_mode: stimulus.draw_mode,
            picks,
        }
    }
}

/// Sent when no session exists yet, prompting the intake questionnaire.
#[derive(Serialize)]
struct QuestionPrompt {
    #[serde(rename = "Question")]
    question: bool,
}

pub async fn question_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let session = match session::decode(&jar) {
        SessionState::Absent => {
            return Ok(Json(QuestionPrompt { question: true }).into_response());
        }
        SessionState::Corrupt => {
            warn!("Unreadable session token, prompting intake again");
            return Ok(Json(QuestionPrompt { question: true }).into_response());
        }
        SessionState::Active(session) => session,
    };

    // Page reload: re-serve the pending question instead of minting a new
    // one, leaving the stored fingerprint in place.
    if let Some(fingerprint) = session.flash() {
        if let Some(stimulus) = Stimulus::from_fingerprint(fingerprint) {
            let question = ColorSetQuestion::new(stimulus, session.picks);
            return Ok(Json(question).into_response());
        }
        warn!(id = %session.id, "Pending fingerprint no longer decodable, issuing a fresh stimulus");
    }

    issue_next(&state, jar, session)
}

pub async fn submit_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let (ip, ua) = client_meta(&headers);

    let mut session = match session::decode(&jar) {
        SessionState::Absent | SessionState::Corrupt => {
            return submit_intake(&state, jar, &body, &ip, ua);
        }
        SessionState::Active(session) => session,
    };

    let answer: AnswerForm = serde_urlencoded::from_bytes(&body).map_err(|e| {
        warn!("Error parsing answer form: {e}");
        AppError::MalformedPayload
    })?;

    // Consume the pending fingerprint; a session that has just completed
    // intake has nothing to verify yet.
    if let Some(pending) = session.take_flash() {
        match verify::verify(&answer, &pending) {
            Verdict::Accepted {
                set_pick,
                order_pick,
            } => {
                session.picks += 1;
                telemetry::pick(&session.id, &ip, &answer, set_pick, order_pick, session.picks);
            }
            Verdict::FingerprintMismatch => {
                warn!(expected = %pending, "Bad answer match");
                telemetry::bad_match(&session.id, &ip);
            }
            Verdict::PickOutOfRange => telemetry::bad_pick(&session.id, &ip),
        }
    }

    issue_next(&state, jar, session)
}

pub async fn reset_handler(jar: PrivateCookieJar) -> impl IntoResponse {
    (session::clear(jar), StatusCode::OK)
}

fn submit_intake(
    state: &AppState,
    jar: PrivateCookieJar,
    body: &[u8],
    ip: &str,
    ua: &str,
) -> Result<Response, AppError> {
    let form: IntakeForm = serde_urlencoded::from_bytes(body).map_err(|e| {
        warn!("Error parsing intake form: {e}");
        AppError::MalformedPayload
    })?;

    let answers = form.validate().map_err(|rejection| {
        telemetry::bad_answer(ip, ua, rejection.field());
        match rejection {
            IntakeRejection::Consent => AppError::NoConsent,
            _ => AppError::InvalidAnswer,
        }
    })?;

    let session = Session::begin();
    telemetry::session_started(&session.id, ip, ua, &answers);

    issue_next(state, jar, session)
}

/// Generates the next stimulus, swaps its fingerprint into the single flash
/// slot, and re-encodes the token. Any previous unanswered fingerprint is
/// discarded here.
fn issue_next(
    state: &AppState,
    jar: PrivateCookieJar,
    mut session: Session,
) -> Result<Response, AppError> {
    let stimulus = {
        let mut rng = state.rng.lock().expect("stimulus rng poisoned");
        Stimulus::generate(&state.palettes, &mut *rng)
    };

    session.store_flash(stimulus.fingerprint());
    let jar = session::encode(jar, &session)?;

    let question = ColorSetQuestion::new(stimulus, session.picks);
    Ok((jar, Json(question)).into_response())
}

fn client_meta(headers: &HeaderMap) -> (String, &str) {
    let ip = telemetry::anonymize_addr(
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .unwrap_or(""),
    );

    let ua = intake::truncate_user_agent(
        headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(""),
    );

    (ip, ua)
}
