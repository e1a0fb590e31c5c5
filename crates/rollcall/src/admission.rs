//! Turning a raw `/here <code>` into an admission decision.

use chrono::{Local, NaiveDateTime, SubsecRound};
use rollcall_session::{SessionError, SessionState};
use rollcall_types::ParticipantId;
use serde::Serialize;

/// Outcome of a submission, ready for user-facing translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Admission {
    /// Recorded. `submitted` is the number of distinct participants so far;
    /// `replaced` is true if this overwrote the participant's earlier entry.
    Accepted { submitted: usize, replaced: bool },
    /// No session is open.
    NoSession,
    /// The code is wrong or has already rotated out.
    CodeRejected,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Source of submission timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Local wall-clock time, whole seconds.
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

/// Codes are shown upper-case; accept any case and stray whitespace.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Runs one submission against `state`.
///
/// The timestamp, and with it the attendance date, is taken when the
/// submission is evaluated, not when the session opened.
pub(crate) async fn admit(
    state: &SessionState,
    clock: &dyn Clock,
    participant: ParticipantId,
    display_name: &str,
    raw_code: &str,
) -> Result<Admission, SessionError> {
    let code = normalize_code(raw_code);
    match state.submit(participant, display_name, &code, clock.now()).await {
        Ok(accepted) => {
            tracing::debug!(
                %participant,
                submitted = accepted.submitted,
                replaced = accepted.replaced,
                "submission accepted"
            );
            Ok(Admission::Accepted {
                submitted: accepted.submitted,
                replaced: accepted.replaced,
            })
        }
        Err(SessionError::NotActive) => {
            tracing::debug!(%participant, "submission rejected: no session");
            Ok(Admission::NoSession)
        }
        Err(SessionError::CodeMismatch) => {
            tracing::debug!(%participant, "submission rejected: code mismatch");
            Ok(Admission::CodeRejected)
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rollcall_session::SessionConfig;
    use rollcall_types::SessionId;

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_normalize_code_trims_and_uppercases() {
        assert_eq!(normalize_code("  ab3d \n"), "AB3D");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn test_system_clock_has_no_subseconds() {
        use chrono::Timelike;
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }

    #[tokio::test]
    async fn test_admit_lowercase_code_accepted() {
        let state = SessionState::new(SessionConfig::default());
        let code = state.open(SessionId::new("S")).await.unwrap().code;

        let admission = admit(&state, &clock(), ParticipantId(1), "ada", &code.to_lowercase())
            .await
            .unwrap();

        assert_eq!(
            admission,
            Admission::Accepted {
                submitted: 1,
                replaced: false
            }
        );
    }

    #[tokio::test]
    async fn test_admit_without_session_returns_no_session() {
        let state = SessionState::new(SessionConfig::default());

        let admission = admit(&state, &clock(), ParticipantId(1), "ada", "ABCD")
            .await
            .unwrap();

        assert_eq!(admission, Admission::NoSession);
    }

    #[tokio::test]
    async fn test_admit_empty_code_rejected() {
        let state = SessionState::new(SessionConfig::default());
        state.open(SessionId::new("S")).await.unwrap();

        let admission = admit(&state, &clock(), ParticipantId(1), "ada", "   ")
            .await
            .unwrap();

        assert_eq!(admission, Admission::CodeRejected);
        assert_eq!(state.status().await.submitted, 0);
    }

    #[test]
    fn test_admission_serializes_with_outcome_tag() {
        let json = serde_json::to_value(Admission::Accepted {
            submitted: 3,
            replaced: true,
        })
        .unwrap();
        assert_eq!(json["outcome"], "accepted");
        assert_eq!(json["submitted"], 3);
    }
}
