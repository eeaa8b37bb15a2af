use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::submission::Submission;
use crate::error::{Error, Result};
use crate::models::post::{Comment, Post, PostSummary};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

/// Text of a new comment, or of an edited post or comment.
#[derive(Debug, Clone, Validate)]
pub struct ContentPayload {
    #[validate(length(max = 2000))]
    pub content: Option<String>,
}

impl ContentPayload {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            content: submission.text("content"),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct RatingPayload {
    #[validate(length(min = 1, max = 200))]
    pub hotel: String,
    pub rating: i32,
}

impl RatingPayload {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let rating = submission
            .integer("rating")?
            .ok_or_else(|| Error::BadRequest("rating is required".into()))?;
        Ok(Self {
            hotel: submission.text("hotel").unwrap_or_default(),
            rating: i32::try_from(rating)
                .map_err(|_| Error::BadRequest("rating must be between 1 and 5".into()))?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingQuery {
    pub hotel: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostList {
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostEnvelope {
    pub post: Post,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentEnvelope {
    pub comment: Comment,
}
