use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One row as it travels over the wire: column name to JSON value.
pub type Row = Map<String, Value>;

/// Tables the gateway knows about.
///
/// Routing is by this enum rather than by raw strings; anything outside the
/// catalogue is rejected when parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Posts,
    Comments,
    Rooms,
    RoomMessages,
    Stories,
    Polls,
    PollVotes,
    Likes,
    Follows,
    Reports,
    Notifications,
    Profiles,
}

impl Entity {
    pub const ALL: [Entity; 12] = [
        Entity::Posts,
        Entity::Comments,
        Entity::Rooms,
        Entity::RoomMessages,
        Entity::Stories,
        Entity::Polls,
        Entity::PollVotes,
        Entity::Likes,
        Entity::Follows,
        Entity::Reports,
        Entity::Notifications,
        Entity::Profiles,
    ];

    /// Table name as the gateway expects it.
    pub fn table_name(self) -> &'static str {
        match self {
            Entity::Posts => "posts",
            Entity::Comments => "comments",
            Entity::Rooms => "rooms",
            Entity::RoomMessages => "room_messages",
            Entity::Stories => "stories",
            Entity::Polls => "polls",
            Entity::PollVotes => "poll_votes",
            Entity::Likes => "likes",
            Entity::Follows => "follows",
            Entity::Reports => "reports",
            Entity::Notifications => "notifications",
            Entity::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown entity: {name}")]
pub struct UnknownEntity {
    pub name: String,
}

impl FromStr for Entity {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|e| e.table_name() == s)
            .ok_or_else(|| UnknownEntity { name: s.to_string() })
    }
}

/// Kind of operation a request performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Select => "select",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Write payload: a single row or a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    One(Row),
    Many(Vec<Row>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("payload must be an object or an array of objects")]
pub struct InvalidPayload;

impl Payload {
    /// Convert an arbitrary JSON value into a payload.
    pub fn from_value(value: Value) -> Result<Self, InvalidPayload> {
        match value {
            Value::Object(row) => Ok(Payload::One(row)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(InvalidPayload),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Many),
            _ => Err(InvalidPayload),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::One(_) => 1,
            Payload::Many(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Row> for Payload {
    fn from(row: Row) -> Self {
        Payload::One(row)
    }
}

impl From<Vec<Row>> for Payload {
    fn from(rows: Vec<Row>) -> Self {
        Payload::Many(rows)
    }
}
