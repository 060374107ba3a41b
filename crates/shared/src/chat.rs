//! Chat command catalog payloads.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::{Command, CommandError, KnownCommand};

pub const DEFAULT_MATCH_MIN_AGE: i32 = 18;
pub const DEFAULT_MATCH_MAX_AGE: i32 = 35;

/// Payload of `randomtalk.chat.create_chat_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChatSessionPayload {
    pub user_id: Uuid,
    pub user_nickname: String,
    /// Interests as typed by the user (comma separated)
    pub user_interests: String,
    pub user_age: i32,
    pub user_gender: String,
    pub user_match_preference_min_age: i32,
    pub user_match_preference_max_age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_match_preference_gender: Option<String>,
    #[serde(default)]
    pub user_match_preference_interests: Vec<String>,
}

impl CreateChatSessionPayload {
    /// Build a payload for a fresh anonymous user.
    ///
    /// Match preferences default to the 18..=35 age range and the user's own
    /// interests.
    pub fn new(
        nickname: impl Into<String>,
        interests: impl Into<String>,
        age: i32,
        gender: impl Into<String>,
    ) -> Self {
        let interests = interests.into();
        Self {
            user_id: Uuid::new_v4(),
            user_nickname: nickname.into(),
            user_match_preference_interests: split_interests(&interests),
            user_interests: interests,
            user_age: age,
            user_gender: gender.into(),
            user_match_preference_min_age: DEFAULT_MATCH_MIN_AGE,
            user_match_preference_max_age: DEFAULT_MATCH_MAX_AGE,
            user_match_preference_gender: None,
        }
    }

    pub fn with_age_range(mut self, min_age: i32, max_age: i32) -> Self {
        self.user_match_preference_min_age = min_age;
        self.user_match_preference_max_age = max_age;
        self
    }

    pub fn with_preferred_gender(mut self, gender: impl Into<String>) -> Self {
        self.user_match_preference_gender = Some(gender.into());
        self
    }

    pub fn into_command(self) -> Result<Command, CommandError> {
        Command::from_payload(KnownCommand::CreateChatSession, &self)
    }
}

/// Age in whole years on `today` for someone born on `birthdate`.
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

/// Split free-text interests on commas, dropping blanks.
pub fn split_interests(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
