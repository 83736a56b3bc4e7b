use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mail::EmailRecord;

/// Category assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Category {
    Academic,
    Career,
    Notification,
    Ads,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Academic => "Academic",
            Category::Career => "Career",
            Category::Notification => "Notification",
            Category::Ads => "Ads",
            Category::Other => "Other",
        }
    }
}

/// Labels are matched case-insensitively; anything unknown is `Other`.
impl From<String> for Category {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "academic" => Category::Academic,
            "career" => Category::Career,
            "notification" => Category::Notification,
            "ads" => Category::Ads,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance rating, 1 (low) to 3 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawImportance")]
pub struct Importance(u8);

impl Importance {
    #[allow(dead_code)]
    pub const LOW: Importance = Importance(1);
    pub const MEDIUM: Importance = Importance(2);
    #[allow(dead_code)]
    pub const HIGH: Importance = Importance(3);

    pub fn new(value: u8) -> Option<Self> {
        (1..=3).contains(&value).then_some(Importance(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Models return the rating either as a number or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawImportance {
    Number(i64),
    Text(String),
}

impl TryFrom<RawImportance> for Importance {
    type Error = String;

    fn try_from(raw: RawImportance) -> Result<Self, Self::Error> {
        let value = match raw {
            RawImportance::Number(n) => n,
            RawImportance::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("importance is not a number: {:?}", s))?,
        };
        u8::try_from(value)
            .ok()
            .and_then(Importance::new)
            .ok_or_else(|| format!("importance out of range 1-3: {}", value))
    }
}

/// Structured answer parsed from the model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationOutput {
    pub summary: String,
    pub category: Category,
    pub importance: Importance,
    pub reason: String,
}

/// One successfully classified email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub output: ClassificationOutput,
}

impl ClassificationResult {
    pub fn new(email: &EmailRecord, output: ClassificationOutput) -> Self {
        Self {
            id: email.id.clone(),
            subject: email.subject.clone(),
            sender: email.sender.clone(),
            output,
        }
    }
}
