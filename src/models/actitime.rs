use serde::{Deserialize, Serialize};

/// Response of `GET /users/me`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

/// Body of `PATCH /timetrack/{user}/{date}/{task}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimeTrackWrite {
    /// Time spent, in minutes
    pub time: i64,
    pub comment: String,
}
