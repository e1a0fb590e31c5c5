//! Identity types: participants and sessions.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::TypesError;

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// A unique identifier for a participant, as issued by the transport
/// (for a chat platform, the user's numeric account id).
///
/// Newtype over `u64` so it can't be confused with a channel or message
/// id. Serializes as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Accepts the bare number, the `U-` display form, or a chat mention
/// (`<@42>`, `<@!42>`).
impl FromStr for ParticipantId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("U-")
            .or_else(|| {
                trimmed
                    .strip_prefix("<@")
                    .and_then(|rest| rest.strip_suffix('>'))
                    .map(|rest| rest.trim_start_matches('!'))
            })
            .unwrap_or(trimmed);
        digits
            .parse()
            .map(ParticipantId)
            .map_err(|_| TypesError::InvalidParticipant(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// An opaque identifier for one attendance session.
///
/// Sessions opened live get a time-derived id from [`SessionIdGenerator`]
/// (`20261016-141503-042Z`). Records an administrator creates by hand for a
/// day with no live session use [`SessionId::manual`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wraps an existing id (e.g. one read back from storage).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The session id used for manual records on `date`.
    pub fn manual(date: NaiveDate) -> Self {
        Self(format!("manual-{}", date.format("%Y-%m-%d")))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for ids produced by [`SessionId::manual`].
    pub fn is_manual(&self) -> bool {
        self.0.starts_with("manual-")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionIdGenerator
// ---------------------------------------------------------------------------

/// Issues time-derived session ids that strictly increase within a process.
///
/// The id is the UTC time to the millisecond, so it never depends on the
/// host's time zone or daylight-saving changes. If the clock hasn't moved
/// since the last id (two opens within one millisecond, or a small
/// backwards step), the previous instant is bumped by 1 ms instead, so two
/// calls never return the same id.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    /// Unix milliseconds of the last issued id (0 = none yet).
    last_ms: AtomicI64,
}

impl SessionIdGenerator {
    /// Creates a generator that hasn't issued anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next id based on the current time.
    pub fn next(&self) -> SessionId {
        self.next_at(Utc::now())
    }

    /// Issues the next id as if the clock read `now`.
    pub fn next_at(&self, now: DateTime<Utc>) -> SessionId {
        let now_ms = now.timestamp_millis();
        // The closure always returns `Some`, so this is always `Ok(prev)`.
        let prev = self
            .last_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let issued = now_ms.max(prev + 1);

        let stamp = DateTime::from_timestamp_millis(issued).unwrap_or(now);
        SessionId(stamp.format("%Y%m%d-%H%M%S-%3fZ").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_participant_id_parses_plain_display_and_mention_forms() {
        for input in ["42", "U-42", "<@42>", "<@!42>", " 42 "] {
            assert_eq!(input.parse::<ParticipantId>().unwrap(), ParticipantId(42));
        }
    }

    #[test]
    fn test_participant_id_parse_rejects_names() {
        assert_eq!(
            "ada".parse::<ParticipantId>(),
            Err(TypesError::InvalidParticipant("ada".into()))
        );
    }

    #[test]
    fn test_participant_id_display() {
        assert_eq!(ParticipantId(7).to_string(), "U-7");
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_manual_session_id_format() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let id = SessionId::manual(date);
        assert_eq!(id.as_str(), "manual-2025-12-01");
        assert!(id.is_manual());
    }

    #[test]
    fn test_generator_formats_utc_time() {
        let generator = SessionIdGenerator::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 5, 7).unwrap();

        let id = generator.next_at(now);

        assert_eq!(id.as_str(), "20260304-090507-000Z");
        assert!(!id.is_manual());
    }

    #[test]
    fn test_generator_same_instant_yields_distinct_increasing_ids() {
        let generator = SessionIdGenerator::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 5, 7).unwrap();

        let a = generator.next_at(now);
        let b = generator.next_at(now);
        let c = generator.next_at(now);

        assert_ne!(a, b);
        assert!(a < b && b < c, "ids should sort in issue order");
        assert_eq!(b.as_str(), "20260304-090507-001Z");
    }

    #[test]
    fn test_generator_ids_one_hour_apart_stay_distinct_and_ordered() {
        // Across a daylight-saving fall-back these two instants share a
        // local wall-clock reading; the ids must not.
        let generator = SessionIdGenerator::new();
        let first = Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap();
        let second = first + chrono::Duration::hours(1);

        let a = generator.next_at(first);
        let b = generator.next_at(second);

        assert_eq!(a.as_str(), "20261101-053000-000Z");
        assert_eq!(b.as_str(), "20261101-063000-000Z");
        assert!(a < b);
    }

    #[test]
    fn test_generator_clock_step_back_still_increases() {
        let generator = SessionIdGenerator::new();
        let later = Utc.with_ymd_and_hms(2026, 3, 4, 9, 5, 7).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();

        let a = generator.next_at(later);
        let b = generator.next_at(earlier);

        assert!(b > a);
    }
}
