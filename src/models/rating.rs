use serde::{Deserialize, Serialize};

/// Aggregate of the `hotel_ratings` rows for one hotel name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub avg: f64,
    pub count: i64,
    pub my_rating: Option<i32>,
}
