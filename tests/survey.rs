//! End-to-end survey flow against the real router, with the palette store
//! built in memory and a throwaway cookie key.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use axum_extra::extract::cookie::Key;
use http_body_util::BodyExt;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::Value;
use tower::ServiceExt;

use color_survey::{
    app,
    config::Config,
    palette::{PaletteStore, SUPPORTED_LENGTHS},
    state::AppState,
};

fn test_state() -> AppState {
    let mut tables = HashMap::new();
    for length in SUPPORTED_LENGTHS {
        let cycles = (0..4)
            .map(|tag| (0..length).map(|i| format!("{tag:02x}{i:04x}")).collect())
            .collect();
        tables.insert(length, cycles);
    }

    let config = Config {
        port: 0,
        color_sets_dir: String::new(),
        static_dir: "static".to_string(),
        results_log_dir: ".".to_string(),
        results_log_file: "results.log".to_string(),
        session_key: vec![0; 32],
    };

    AppState {
        config: Arc::new(config),
        palettes: Arc::new(PaletteStore::from_tables(tables)),
        rng: Arc::new(Mutex::new(StdRng::seed_from_u64(7))),
        key: Key::generate(),
    }
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

async fn send(router: &Router, request: Request<Body>) -> Reply {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        // Strip the attributes: "survey=...; Path=/colors; ..." -> "survey=..."
        .map(|v| v.split(';').next().unwrap().to_string());

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Reply {
        status,
        cookie,
        body,
    }
}

fn get_question(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/colors");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, fields: &[(&str, &str)], cookie: Option<&str>) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-real-ip", "203.0.113.77");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn valid_intake() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Consent", "yes"),
        ("ColorblindQ", "n"),
        ("ColorblindTypeQ", "na"),
        ("WindowWidth", "12"),
        ("WindowOrientation", "l"),
    ]
}

/// Builds the echo form a well-behaved client would send back.
fn echo_fields(question: &Value, set_pick: &str, order_pick: &str) -> Vec<(String, String)> {
    let join = |key: &str| {
        question[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect::<Vec<_>>()
            .join(",")
    };

    vec![
        ("Set1".to_string(), join("Set1")),
        ("Set2".to_string(), join("Set2")),
        ("Orders".to_string(), join("Orders")),
        ("DrawMode".to_string(), question["DrawMode"].to_string()),
        ("SetPick".to_string(), set_pick.to_string()),
        ("OrderPick".to_string(), order_pick.to_string()),
    ]
}

fn as_pairs(fields: &[(String, String)]) -> Vec<(&str, &str)> {
    fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn assert_question_shape(question: &Value) {
    let set1 = question["Set1"].as_array().unwrap();
    let set2 = question["Set2"].as_array().unwrap();
    let orders = question["Orders"].as_array().unwrap();

    assert!(SUPPORTED_LENGTHS.contains(&set1.len()));
    assert_eq!(set2.len(), set1.len());
    assert_eq!(orders.len(), 4);
    assert!(question["DrawMode"].as_u64().unwrap() < 4);
}

#[tokio::test]
async fn no_session_prompts_intake() {
    let router = app(test_state());

    let reply = send(&router, get_question(None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["Question"], Value::Bool(true));
    assert!(reply.cookie.is_none());
}

#[tokio::test]
async fn invalid_intake_creates_no_session() {
    let router = app(test_state());

    let mut fields = valid_intake();
    fields[2] = ("ColorblindTypeQ", "xyz");
    let reply = send(&router, post_form("/colors", &fields, None)).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.cookie.is_none());

    let mut fields = valid_intake();
    fields[0] = ("Consent", "no");
    let reply = send(&router, post_form("/colors", &fields, None)).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.cookie.is_none());
}

#[tokio::test]
async fn full_survey_round_trip() {
    let router = app(test_state());

    // Intake creates the session and issues the first stimulus.
    let first = send(&router, post_form("/colors", &valid_intake(), None)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_question_shape(&first.body);
    assert_eq!(first.body["Picks"], 0);
    let cookie = first.cookie.expect("intake must set the session cookie");

    // Honest echo with in-range picks is accepted.
    let echo = echo_fields(&first.body, "1", "2");
    let second = send(
        &router,
        post_form("/colors", &as_pairs(&echo), Some(&cookie)),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_question_shape(&second.body);
    assert_eq!(second.body["Picks"], 1);
    let cookie = second.cookie.expect("every submission rewrites the cookie");

    // Tampered echo: counter must not move, flow continues.
    let mut tampered = echo_fields(&second.body, "1", "1");
    tampered[0].1 = "ffffff".to_string();
    let third = send(
        &router,
        post_form("/colors", &as_pairs(&tampered), Some(&cookie)),
    )
    .await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(third.body["Picks"], 1);
    let cookie = third.cookie.unwrap();

    // Exact echo but out-of-range pick: also not counted.
    let out_of_range = echo_fields(&third.body, "1", "9");
    let fourth = send(
        &router,
        post_form("/colors", &as_pairs(&out_of_range), Some(&cookie)),
    )
    .await;
    assert_eq!(fourth.status, StatusCode::OK);
    assert_eq!(fourth.body["Picks"], 1);
}

#[tokio::test]
async fn reload_reserves_the_pending_stimulus() {
    let router = app(test_state());

    let first = send(&router, post_form("/colors", &valid_intake(), None)).await;
    let cookie = first.cookie.unwrap();

    let reload = send(&router, get_question(Some(&cookie))).await;

    assert_eq!(reload.status, StatusCode::OK);
    assert_eq!(reload.body["Set1"], first.body["Set1"]);
    assert_eq!(reload.body["Set2"], first.body["Set2"]);
    assert_eq!(reload.body["Orders"], first.body["Orders"]);
    assert_eq!(reload.body["DrawMode"], first.body["DrawMode"]);
    assert_eq!(reload.body["Picks"], 0);
    // The pending question survives the reload and can still be answered.
    assert!(reload.cookie.is_none());

    let echo = echo_fields(&reload.body, "2", "4");
    let answered = send(
        &router,
        post_form("/colors", &as_pairs(&echo), Some(&cookie)),
    )
    .await;
    assert_eq!(answered.body["Picks"], 1);
}

#[tokio::test]
async fn replayed_answer_is_rejected() {
    let router = app(test_state());

    let first = send(&router, post_form("/colors", &valid_intake(), None)).await;
    let cookie = first.cookie.unwrap();

    let echo = echo_fields(&first.body, "1", "1");
    let second = send(
        &router,
        post_form("/colors", &as_pairs(&echo), Some(&cookie)),
    )
    .await;
    assert_eq!(second.body["Picks"], 1);
    let cookie = second.cookie.unwrap();

    // Replaying the first answer against the new pending stimulus fails the
    // fingerprint comparison.
    let replayed = send(
        &router,
        post_form("/colors", &as_pairs(&echo), Some(&cookie)),
    )
    .await;
    assert_eq!(replayed.status, StatusCode::OK);
    assert_eq!(replayed.body["Picks"], 1);
}

#[tokio::test]
async fn forged_cookie_reads_as_no_session() {
    let router = app(test_state());

    // A value never encrypted under the server's key fails authentication,
    // so the client is simply treated as new.
    let reply = send(
        &router,
        get_question(Some("survey=Zm9yZ2VkLXNlc3Npb24tdG9rZW4")),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["Question"], Value::Bool(true));
}

#[tokio::test]
async fn reset_expires_the_session() {
    let router = app(test_state());

    let first = send(&router, post_form("/colors", &valid_intake(), None)).await;
    let cookie = first.cookie.unwrap();

    let reset = send(&router, post_form("/colors/new", &[], Some(&cookie))).await;
    assert_eq!(reset.status, StatusCode::OK);

    let removal = reset.cookie.expect("reset must send a removal cookie");
    assert!(removal.starts_with("survey="));

    // The emptied cookie no longer authenticates.
    let after = send(&router, get_question(Some(&removal))).await;
    assert_eq!(after.body["Question"], Value::Bool(true));
}

#[tokio::test]
async fn malformed_bodies_are_client_errors() {
    let router = app(test_state());

    // Intake missing every field.
    let reply = send(&router, post_form("/colors", &[("x", "y")], None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // Answer body that is not an answer form.
    let first = send(&router, post_form("/colors", &valid_intake(), None)).await;
    let cookie = first.cookie.unwrap();
    let reply = send(
        &router,
        post_form("/colors", &[("x", "y")], Some(&cookie)),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // A parse failure leaves the cookie untouched, so the pending question
    // is still answerable afterwards.
    let echo = echo_fields(&first.body, "1", "1");
    let answered = send(
        &router,
        post_form("/colors", &as_pairs(&echo), Some(&cookie)),
    )
    .await;
    assert_eq!(answered.body["Picks"], 1);
}
