use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Payment state of an attendee row. Only `Completed` confirms a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
    Other(String),
}

impl PaymentStatus {
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "completed" => PaymentStatus::Completed,
            "pending" => PaymentStatus::Pending,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            other => PaymentStatus::Other(other.to_string()),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Attending,
    NotAttending,
}

impl AttendanceStatus {
    /// Reads a stored status. A NULL column predates the field and counts as
    /// attending; unrecognised values never count as attending.
    pub fn from_db(raw: Option<&str>) -> Self {
        match raw {
            None | Some("attending") => AttendanceStatus::Attending,
            Some(_) => AttendanceStatus::NotAttending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "attending",
            AttendanceStatus::NotAttending => "not_attending",
        }
    }

    pub fn is_attending(&self) -> bool {
        matches!(self, AttendanceStatus::Attending)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attending" => Ok(AttendanceStatus::Attending),
            "not_attending" => Ok(AttendanceStatus::NotAttending),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// Cadence between consecutive games of a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    Weekly,
    Biweekly,
    Monthly,
}

impl RepeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatType::Weekly => "weekly",
            RepeatType::Biweekly => "biweekly",
            RepeatType::Monthly => "monthly",
        }
    }
}

impl FromStr for RepeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(RepeatType::Weekly),
            "biweekly" => Ok(RepeatType::Biweekly),
            "monthly" => Ok(RepeatType::Monthly),
            other => Err(format!("unknown repeat type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_is_confirmed() {
        assert!(PaymentStatus::from_db("completed").is_confirmed());
        for raw in ["pending", "failed", "refunded", "Completed", ""] {
            assert!(!PaymentStatus::from_db(raw).is_confirmed(), "{raw}");
        }
        assert_eq!(PaymentStatus::from_db("disputed").as_str(), "disputed");
    }

    #[test]
    fn missing_attendance_reads_as_attending() {
        assert_eq!(AttendanceStatus::from_db(None), AttendanceStatus::Attending);
        assert_eq!(AttendanceStatus::from_db(Some("attending")), AttendanceStatus::Attending);
        assert_eq!(AttendanceStatus::from_db(Some("not_attending")), AttendanceStatus::NotAttending);
        assert_eq!(AttendanceStatus::from_db(Some("maybe")), AttendanceStatus::NotAttending);
    }

    #[test]
    fn attendance_status_serde_is_snake_case() {
        let json = serde_json::to_string(&AttendanceStatus::NotAttending).unwrap();
        assert_eq!(json, "\"not_attending\"");
        let parsed: AttendanceStatus = serde_json::from_str("\"attending\"").unwrap();
        assert_eq!(parsed, AttendanceStatus::Attending);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!("yes".parse::<AttendanceStatus>().is_err());
        assert!("daily".parse::<RepeatType>().is_err());
        assert_eq!("biweekly".parse::<RepeatType>(), Ok(RepeatType::Biweekly));
        assert_eq!("fixed".parse::<DiscountType>(), Ok(DiscountType::Fixed));
    }
}
