use chrono::{DateTime, Duration, Utc};

use crate::host::HealthClock;

/// Errors logged later than this many minutes before the last event count as recent.
pub const RECENT_ERROR_WINDOW_MINUTES: i64 = 2;

/// What the host knows about the agent's recent history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error_log_at: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    /// A quiet period reaching past the earliest representable time has no
    /// lower bound: any event counts.
    pub fn event_created_within(&self, days: u32, now: DateTime<Utc>) -> bool {
        let Some(at) = self.last_event_at else {
            return false;
        };
        match now.checked_sub_signed(Duration::days(i64::from(days))) {
            Some(cutoff) => at > cutoff,
            None => true,
        }
    }

    pub fn recent_error_logs(&self) -> bool {
        match (self.last_event_at, self.last_error_log_at) {
            (Some(event_at), Some(error_at)) => {
                error_at > event_at - Duration::minutes(RECENT_ERROR_WINDOW_MINUTES)
            }
            _ => false,
        }
    }
}

/// Working means an event went out within the quiet period and nothing has
/// failed since.
pub fn is_working(
    snapshot: &HealthSnapshot,
    max_quiet_period_days: u32,
    clock: &dyn HealthClock,
) -> bool {
    snapshot.event_created_within(max_quiet_period_days, clock.now())
        && !snapshot.recent_error_logs()
}
