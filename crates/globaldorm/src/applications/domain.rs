use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rooms::Room;

/// Identifier assigned by the lifecycle manager; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a room application. Only `Pending` admits a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and accepted applications block a second application for the same room.
    pub const fn is_active(self) -> bool {
        matches!(self, ApplicationStatus::Pending | ApplicationStatus::Accepted)
    }
}

/// Persisted application record with an embedded snapshot of the room at apply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub room_id: u64,
    pub user_id: String,
    pub user_email: String,
    pub status: ApplicationStatus,
    #[serde(with = "timestamp")]
    pub application_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_timestamp"
    )]
    pub cancelled_date: Option<DateTime<Utc>>,
    pub room_details: Room,
}

impl Application {
    pub fn pending(
        id: ApplicationId,
        request: NewApplication,
        room_details: Room,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            room_id: request.room_id,
            user_id: request.user_id,
            user_email: request.user_email,
            status: ApplicationStatus::Pending,
            application_date: applied_at,
            cancelled_date: None,
            room_details,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub(crate) fn mark_cancelled(&mut self, cancelled_at: DateTime<Utc>) {
        self.status = ApplicationStatus::Cancelled;
        self.cancelled_date = Some(cancelled_at);
    }

    /// `cancelled_date` is present exactly when the record is cancelled.
    pub fn is_consistent(&self) -> bool {
        (self.status == ApplicationStatus::Cancelled) == self.cancelled_date.is_some()
    }
}

/// Validated input for a new application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub room_id: u64,
    pub user_id: String,
    pub user_email: String,
}

/// Timestamps are written as RFC 3339 UTC. Zone-less ISO-8601 values from older
/// artifacts are read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        // Legacy writers drop the seconds field entirely when it is zero.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map(|naive| naive.and_utc())
            .map_err(|err| format!("failed to parse '{raw}' as an ISO-8601 timestamp ({err})"))
    }

    pub(crate) fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod optional_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&super::timestamp::format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        opt.map(|value| super::timestamp::parse(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}
