//! Client-held session state.
//!
//! There is no session table: the encrypted cookie *is* the durable record.
//! The private jar authenticates and decrypts it, so `picks` and the pending
//! fingerprint cannot be forged without the master key. The payload carries
//! a schema version so that field changes invalidate old tokens instead of
//! misreading them.
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::AppError;

pub const COOKIE_NAME: &str = "survey";
pub const COOKIE_PATH: &str = "/colors";

const TOKEN_VERSION: u8 = 1;
const SESSION_ID_BYTES: usize = 32;

#[derive(Serialize, Deserialize)]
struct TokenData {
    v: u8,
    id: String,
    picks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub picks: u32,
    flash: Option<String>,
}

/// Outcome of decoding the client token. A forged or re-keyed cookie fails
/// authentication inside the jar and reads as `Absent`; a token that
/// decrypts but no longer parses (or carries an old schema version) reads
/// as `Corrupt`. Both route the client back to intake.
pub enum SessionState {
    Absent,
    Corrupt,
    Active(Session),
}

pub fn decode(jar: &PrivateCookieJar) -> SessionState {
    let Some(cookie) = jar.get(COOKIE_NAME) else {
        return SessionState::Absent;
    };

    match serde_json::from_str::<TokenData>(cookie.value()) {
        Ok(token) if token.v == TOKEN_VERSION => SessionState::Active(Session {
            id: token.id,
            picks: token.picks,
            flash: token.flash,
        }),
        _ => SessionState::Corrupt,
    }
}

impl Session {
    /// Starts a fresh session with an unguessable identity: 32 bytes from
    /// the OS entropy source, base64url-encoded for cookie safety.
    pub fn begin() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self {
            id: URL_SAFE_NO_PAD.encode(bytes),
            picks: 0,
            flash: None,
        }
    }

    /// Replaces the pending fingerprint. Single slot: an unanswered
    /// question's fingerprint is discarded, never accumulated.
    pub fn store_flash(&mut self, fingerprint: String) {
        self.flash = Some(fingerprint);
    }

    /// Consumes the pending fingerprint, if any.
    pub fn take_flash(&mut self) -> Option<String> {
        self.flash.take()
    }

    /// Reads the pending fingerprint without consuming it (page reload).
    pub fn flash(&self) -> Option<&str> {
        self.flash.as_deref()
    }
}

/// Serializes the session back into the cookie. This is the final side
/// effect of every successful request; a serialization failure aborts the
/// request instead of committing partial state.
pub fn encode(jar: PrivateCookieJar, session: &Session) -> Result<PrivateCookieJar, AppError> {
    let token = TokenData {
        v: TOKEN_VERSION,
        id: session.id.clone(),
        picks: session.picks,
        flash: session.flash.clone(),
    };

    let payload = serde_json::to_string(&token).map_err(|e| {
        error!("Failed to encode session token: {e}");
        AppError::SessionEncode
    })?;

    let cookie = Cookie::build((COOKIE_NAME, payload))
        .path(COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok(jar.add(cookie))
}

/// Issues a removal cookie that immediately expires the session.
pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build((COOKIE_NAME, "")).path(COOKIE_PATH).build())
}
