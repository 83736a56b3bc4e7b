//! Prompts for email classification

use crate::mail::EmailRecord;

/// System prompt for the classification request
pub const CLASSIFY_SYSTEM: &str = "You are a helpful email assistant.";

/// User prompt asking for summary, category and importance as a JSON object.
pub fn classification_prompt(email: &EmailRecord) -> String {
    format!(
        r#"
Given the following email content, perform 3 tasks:
1. Summarize the email in 1-2 sentences.
2. Classify it into one of: Academic, Career, Notification, Ads, Other.
3. Rate its importance from 1 (low) to 3 (high), with reason.

- If it's related to a verification code, just give it a low score since I've probably already entered it.

Respond in this JSON format:
{{
  "summary": "...",
  "category": "...",
  "importance": 1,
  "reason": "..."
}}

Email content:
---
Subject: {}
From: {}
Body:
{}
---
"#,
        email.subject, email.sender, email.body
    )
}
