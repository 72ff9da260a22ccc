use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of input a question expects. The wire spelling keeps the spaces
/// ("short answer"); snake_case spellings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceType {
    #[serde(rename = "short answer", alias = "short_answer")]
    ShortAnswer,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "multiple choice", alias = "multiple_choice")]
    MultipleChoice,
    #[serde(rename = "dropdown")]
    Dropdown,
    #[serde(rename = "checkboxes")]
    Checkboxes,
}

impl ChoiceType {
    pub const ALL: [ChoiceType; 7] = [
        Self::ShortAnswer,
        Self::Paragraph,
        Self::Date,
        Self::Time,
        Self::MultipleChoice,
        Self::Dropdown,
        Self::Checkboxes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortAnswer => "short answer",
            Self::Paragraph => "paragraph",
            Self::Date => "date",
            Self::Time => "time",
            Self::MultipleChoice => "multiple choice",
            Self::Dropdown => "dropdown",
            Self::Checkboxes => "checkboxes",
        }
    }

    /// Selection-style questions carry an enumerated list of choices.
    pub fn requires_choices(&self) -> bool {
        matches!(
            self,
            Self::MultipleChoice | Self::Dropdown | Self::Checkboxes
        )
    }
}

impl fmt::Display for ChoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoiceType(pub String);

impl fmt::Display for UnknownChoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown choice type '{}'", self.0)
    }
}

impl std::error::Error for UnknownChoiceType {}

impl FromStr for ChoiceType {
    type Err = UnknownChoiceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownChoiceType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("short answer".parse(), Ok(ChoiceType::ShortAnswer));
        assert_eq!("multiple_choice".parse(), Ok(ChoiceType::MultipleChoice));
        assert!("essay".parse::<ChoiceType>().is_err());
    }

    #[test]
    fn serializes_with_spaces() {
        let json = serde_json::to_string(&ChoiceType::MultipleChoice).unwrap();
        assert_eq!(json, "\"multiple choice\"");

        let parsed: ChoiceType = serde_json::from_str("\"short_answer\"").unwrap();
        assert_eq!(parsed, ChoiceType::ShortAnswer);
    }

    #[test]
    fn only_selection_types_need_choices() {
        let needing: Vec<_> = ChoiceType::ALL
            .into_iter()
            .filter(|t| t.requires_choices())
            .collect();
        assert_eq!(
            needing,
            vec![
                ChoiceType::MultipleChoice,
                ChoiceType::Dropdown,
                ChoiceType::Checkboxes
            ]
        );
    }
}
