//! One-time onboarding questionnaire.
//!
//! Every multiple-choice answer must belong to its fixed vocabulary; unknown
//! values are rejected, never defaulted. Nothing here creates a session —
//! the caller only begins one after validation succeeds.
use serde::Deserialize;

/// Free-form header text is bounded before logging so a hostile client
/// cannot inflate or pollute the results log.
pub const MAX_USER_AGENT: usize = 100;

const COLORBLIND_VOCAB: [&str; 5] = ["y", "n", "dk", "dta", "dna"];
const COLORBLIND_TYPE_VOCAB: [&str; 12] = [
    "na", "dta", "dk", "dy", "py", "da", "pa", "ty", "ta", "m", "o", "dna",
];
const ORIENTATION_VOCAB: [&str; 2] = ["l", "p"];

/// Raw questionnaire submission, field names matching the frontend form.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct IntakeForm {
    pub consent: String,
    pub colorblind_q: String,
    pub colorblind_type_q: String,
    pub window_width: i32,
    pub window_orientation: String,
}

/// Validated questionnaire answers, safe to log and act on.
#[derive(Debug)]
pub struct IntakeAnswers {
    pub consent: String,
    pub colorblind_q: String,
    pub colorblind_type_q: String,
    pub window_width: i32,
    pub window_orientation: String,
}

/// Which field failed validation, tagged for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeRejection {
    Consent,
    Colorblind,
    ColorblindType,
    Orientation,
}

impl IntakeRejection {
    pub fn field(self) -> &'static str {
        match self {
            IntakeRejection::Consent => "consent",
            IntakeRejection::Colorblind => "cbq",
            IntakeRejection::ColorblindType => "cbtq",
            IntakeRejection::Orientation => "wo",
        }
    }
}

impl IntakeForm {
    pub fn validate(self) -> Result<IntakeAnswers, IntakeRejection> {
        if self.consent != "yes" {
            return Err(IntakeRejection::Consent);
        }
        if !COLORBLIND_VOCAB.contains(&self.colorblind_q.as_str()) {
            return Err(IntakeRejection::Colorblind);
        }
        if !COLORBLIND_TYPE_VOCAB.contains(&self.colorblind_type_q.as_str()) {
            return Err(IntakeRejection::ColorblindType);
        }
        if !ORIENTATION_VOCAB.contains(&self.window_orientation.as_str()) {
            return Err(IntakeRejection::Orientation);
        }

        Ok(IntakeAnswers {
            consent: self.consent,
            colorblind_q: self.colorblind_q,
            colorblind_type_q: self.colorblind_type_q,
            window_width: self.window_width,
            window_orientation: self.window_orientation,
        })
    }
}

/// Truncates a user-agent string to [`MAX_USER_AGENT`] bytes without
/// splitting a UTF-8 character.
pub fn truncate_user_agent(ua: &str) -> &str {
    if ua.len() <= MAX_USER_AGENT {
        return ua;
    }

    let mut end = MAX_USER_AGENT;
    while !ua.is_char_boundary(end) {
        end -= 1;
    }
    &ua[..end]
}
