use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::models::{offer::Offer, post::PostSummary};

/// Free-text search input. Words must appear in order, case-insensitively;
/// `%`, `_` and `\` typed by the user are matched literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    words: Vec<String>,
}

impl SearchTerm {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();
        (!words.is_empty()).then_some(Self { words })
    }

    pub fn as_text(&self) -> String {
        self.words.join(" ")
    }

    /// `%word1%word2%` for `ILIKE`, with the default `\` escape.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::from("%");
        for word in &self.words {
            for c in word.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
        }
        pattern
    }

    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        let mut rest = haystack.as_str();
        for word in &self.words {
            match rest.find(word.as_str()) {
                Some(at) => rest = &rest[at + word.len()..],
                None => return false,
            }
        }
        true
    }

    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
        fields.into_iter().flatten().any(|f| self.matches(f))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    All,
    Posts,
    Offers,
    Users,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::All => "all",
            SearchScope::Posts => "posts",
            SearchScope::Offers => "offers",
            SearchScope::Users => "users",
        }
    }

    pub fn includes(&self, other: SearchScope) -> bool {
        *self == SearchScope::All || *self == other
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SearchScope::All),
            "posts" => Ok(SearchScope::Posts),
            "offers" => Ok(SearchScope::Offers),
            "users" => Ok(SearchScope::Users),
            other => Err(format!("unknown search type '{}'", other)),
        }
    }
}

/// A matching post, with whether the viewer liked it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostHit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: PostSummary,
    pub liked_by_me: bool,
}

/// Public profile fields returned by user search.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserHit {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

/// Only the sections the scope asked for are present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<Vec<Offer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserHit>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_typed_by_users_are_escaped() {
        let term = SearchTerm::parse("50% off_site").unwrap();
        assert_eq!(term.like_pattern(), r"%50\%%off\_site%");
        assert_eq!(SearchTerm::parse("a\\b").unwrap().like_pattern(), r"%a\\b%");
    }

    #[test]
    fn words_match_in_order_ignoring_case() {
        let term = SearchTerm::parse("  Front   DESK ").unwrap();
        assert_eq!(term.as_text(), "front desk");
        assert!(term.matches("Front office and desk duty"));
        assert!(!term.matches("Desk at the front"));
        assert!(!SearchTerm::parse("%").unwrap().matches("Hyatt Agadir"));
        assert!(SearchTerm::parse("   ").is_none());
    }

    #[test]
    fn scope_all_covers_every_section() {
        assert!(SearchScope::All.includes(SearchScope::Users));
        assert!(!SearchScope::Posts.includes(SearchScope::Offers));
        assert!("hotels".parse::<SearchScope>().is_err());
    }
}
