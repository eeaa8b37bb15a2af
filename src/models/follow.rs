use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowInfo {
    pub followers: i64,
    pub following: i64,
    pub i_follow: bool,
}
