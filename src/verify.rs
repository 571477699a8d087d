//! Answer verification against the pending fingerprint.
//!
//! The submitted echo is canonicalized into the exact serialization that
//! produced the stored fingerprint and compared byte-for-byte. The policy
//! is forgiving: a mismatch or an out-of-range pick is classified and
//! logged, not surfaced to the participant.
use serde::Deserialize;

use crate::stimulus::ORDER_COUNT;

/// Client-submitted echo of a stimulus plus the participant's choices,
/// field names matching the frontend form.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct AnswerForm {
    pub set1: String,
    pub set2: String,
    pub orders: String,
    pub draw_mode: i32,
    pub set_pick: i8,
    pub order_pick: i8,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted { set_pick: i8, order_pick: i8 },
    /// The echoed fields differ from what was issued: a replay, a tampered
    /// submission, or a client-side race.
    FingerprintMismatch,
    /// Echo matched but a pick value is outside its declared range.
    PickOutOfRange,
}

pub fn verify(answer: &AnswerForm, pending_fingerprint: &str) -> Verdict {
    let echoed = format!(
        "{};{};{};{}",
        answer.set1, answer.set2, answer.orders, answer.draw_mode
    );

    if echoed != pending_fingerprint {
        return Verdict::FingerprintMismatch;
    }

    let set_pick = answer.set_pick;
    let order_pick = answer.order_pick;

    if (1..=2).contains(&set_pick) && (1..=ORDER_COUNT as i8).contains(&order_pick) {
        Verdict::Accepted {
            set_pick,
            order_pick,
        }
    } else {
        Verdict::PickOutOfRange
    }
}
