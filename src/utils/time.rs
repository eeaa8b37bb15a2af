use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    now() + Duration::hours(hours)
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}
