use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown feed type '{0}' (expected one of: top, new, best, ask, show, job)")]
pub struct UnknownFeedType(String);

/// Feed category. Switching category invalidates the loaded stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl FeedType {
    pub const ALL: [FeedType; 6] = [
        FeedType::Top,
        FeedType::New,
        FeedType::Best,
        FeedType::Ask,
        FeedType::Show,
        FeedType::Job,
    ];

    /// Wire name, also used in request paths.
    pub fn as_str(self) -> &'static str {
        match self {
            FeedType::Top => "top",
            FeedType::New => "new",
            FeedType::Best => "best",
            FeedType::Ask => "ask",
            FeedType::Show => "show",
            FeedType::Job => "job",
        }
    }

    /// Screen title for the feed.
    pub fn pretty_name(self) -> &'static str {
        match self {
            FeedType::Top => "Top Stories",
            FeedType::New => "New Stories",
            FeedType::Best => "Best Stories",
            FeedType::Ask => "Ask HN",
            FeedType::Show => "Show HN",
            FeedType::Job => "Jobs",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = UnknownFeedType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        FeedType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| UnknownFeedType(s.to_string()))
    }
}
