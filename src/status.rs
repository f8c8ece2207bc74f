use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Review state of a submission as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "approved",
            HomeworkStatus::Reviewing => "reviewing",
            HomeworkStatus::Rejected => "rejected",
        }
    }

    /// Reviewer verdict shown to the user.
    pub fn verdict(&self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            HomeworkStatus::Reviewing => "Работа взята на проверку ревьюером.",
            HomeworkStatus::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HomeworkStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(HomeworkStatus::Approved),
            "reviewing" => Ok(HomeworkStatus::Reviewing),
            "rejected" => Ok(HomeworkStatus::Rejected),
            other => Err(StatusError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("homework name is missing")]
    MissingName,
    #[error("homework status is missing")]
    MissingStatus,
    #[error("undocumented homework status: {0}")]
    Unknown(String),
    #[error("malformed homework entry: {0}")]
    Malformed(String),
}

/// Submission record; fields stay optional so absence is reported precisely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Homework {
    #[serde(default)]
    pub homework_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Homework {
    /// A non-object entry carries no name at all.
    pub fn from_value(value: &Value) -> Result<Self, StatusError> {
        if !value.is_object() {
            return Err(StatusError::MissingName);
        }
        Homework::deserialize(value).map_err(|e| StatusError::Malformed(e.to_string()))
    }
}

/// Message sent when the API returns no submissions.
pub const NO_HOMEWORK_MESSAGE: &str = "Домашняя работа не найдена";

pub fn status_message(name: &str, status: HomeworkStatus) -> String {
    format!(
        "Изменился статус проверки работы \"{}\". {}",
        name,
        status.verdict()
    )
}

fn interpret(homework: &Homework) -> Result<String, StatusError> {
    let name = homework
        .homework_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(StatusError::MissingName)?;
    let status: HomeworkStatus = homework
        .status
        .as_deref()
        .ok_or(StatusError::MissingStatus)?
        .parse()?;
    Ok(status_message(name, status))
}

/// Turn one submission entry into the notification text.
pub fn parse_status(entry: &Value) -> Result<String, StatusError> {
    Homework::from_value(entry)
        .and_then(|homework| interpret(&homework))
        .map_err(|err| {
            debug!("{}", err);
            err
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_statuses_map_to_phrases() {
        for (raw, status) in [
            ("approved", HomeworkStatus::Approved),
            ("reviewing", HomeworkStatus::Reviewing),
            ("rejected", HomeworkStatus::Rejected),
        ] {
            let msg = parse_status(&json!({"homework_name": "hw05_final", "status": raw})).unwrap();
            assert!(msg.contains("hw05_final"));
            assert!(msg.ends_with(status.verdict()));
            assert_eq!(raw.parse::<HomeworkStatus>().unwrap(), status);
            assert_eq!(status.to_string(), raw);
        }
    }

    #[test]
    fn approved_message_is_exact() {
        let msg = parse_status(&json!({"homework_name": "hw1", "status": "approved"})).unwrap();
        assert_eq!(
            msg,
            "Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!"
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = parse_status(&json!({"homework_name": "hw1", "status": "lost"})).unwrap_err();
        assert_eq!(err, StatusError::Unknown("lost".into()));
        assert!(matches!(
            parse_status(&json!({"homework_name": "hw1", "status": "APPROVED"})),
            Err(StatusError::Unknown(_))
        ));
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert_eq!(
            parse_status(&json!({"homework_name": "hw1"})).unwrap_err(),
            StatusError::MissingStatus
        );
        assert_eq!(
            parse_status(&json!({"status": "approved"})).unwrap_err(),
            StatusError::MissingName
        );
        assert_eq!(
            parse_status(&json!({"homework_name": "", "status": "approved"})).unwrap_err(),
            StatusError::MissingName
        );
        assert_eq!(parse_status(&json!(7)).unwrap_err(), StatusError::MissingName);
    }

    #[test]
    fn homework_deserializes_with_absent_fields() {
        let hw = Homework::from_value(&json!({"id": 1, "reviewer_comment": "ok"})).unwrap();
        assert!(hw.homework_name.is_none());
        assert!(hw.status.is_none());
    }

    #[test]
    fn mistyped_fields_are_malformed() {
        assert!(matches!(
            parse_status(&json!({"homework_name": "hw1", "status": 5})),
            Err(StatusError::Malformed(_))
        ));
        assert!(matches!(
            parse_status(&json!({"homework_name": ["hw1"], "status": "approved"})),
            Err(StatusError::Malformed(_))
        ));
        assert_eq!(Homework::from_value(&json!("hw1")).unwrap_err(), StatusError::MissingName);
    }
}
