use time::OffsetDateTime;

/// Source of the current time for anything that ages, decays, or expires.
pub trait Clock
where
	Self: Send + Sync,
{
	fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

pub fn days_between(earlier: OffsetDateTime, later: OffsetDateTime) -> f32 {
	(later - earlier).as_seconds_f32() / 86_400.0
}
