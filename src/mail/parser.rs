use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders, PartType};

use super::clean::clean_email_text;
use super::types::EmailRecord;

/// Width used when rendering HTML-only bodies to text.
const HTML_TEXT_WIDTH: usize = 100;

/// A parsed message together with its `Date` header.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub record: EmailRecord,
    pub date: Option<DateTime<Utc>>,
}

/// Parse a raw RFC 5322 message.
///
/// `fallback_id` is used when the message carries no Message-ID.
pub fn parse_message(fallback_id: &str, raw: &[u8]) -> Option<ParsedEmail> {
    let message = MessageParser::default().parse(raw)?;

    let sender = message
        .from()
        .and_then(|addrs| addrs.first())
        .map(|from| match (from.name(), from.address()) {
            (Some(name), Some(addr)) => format!("{} <{}>", name, addr),
            (None, Some(addr)) => addr.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        })
        .unwrap_or_default();

    let subject = message.subject().map(|s| s.to_string()).unwrap_or_default();

    let id = message
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback_id.to_string());

    let date = message
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

    let body = extract_text_body(&message)
        .or_else(|| extract_html_body(&message).map(|html| html_to_text(&html)))
        .unwrap_or_default();

    Some(ParsedEmail {
        record: EmailRecord {
            id,
            subject,
            sender,
            body: clean_email_text(&body),
        },
        date,
    })
}

fn extract_text_body(message: &mail_parser::Message) -> Option<String> {
    for part in message.text_bodies() {
        if let PartType::Text(text) = &part.body {
            return Some(text.to_string());
        }
    }

    // Fallback: any part explicitly typed text/plain
    for part in message.parts.iter() {
        if let PartType::Text(text) = &part.body {
            let is_plain = part
                .content_type()
                .map(|ct| ct.subtype() == Some("plain"))
                .unwrap_or(true);
            if is_plain {
                return Some(text.to_string());
            }
        }
    }

    None
}

fn extract_html_body(message: &mail_parser::Message) -> Option<String> {
    for part in message.html_bodies() {
        if let PartType::Html(html) = &part.body {
            return Some(html.to_string());
        }
    }

    None
}

/// Convert HTML to readable plain text. Images and markup are dropped.
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_TEXT_WIDTH).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_email() {
        let raw = "From: Registrar <registrar@example.edu>\r\n\
                    To: student@example.edu\r\n\
                    Subject: Course Schedule Update\r\n\
                    Date: Mon, 1 Jan 2024 12:00:00 +0000\r\n\
                    Message-ID: <sched@example.edu>\r\n\
                    \r\n\
                    Your schedule\u{200b} is now available.\r\n\r\n\r\n\r\nSee you.";

        let parsed = parse_message("7", raw.as_bytes()).unwrap();
        assert_eq!(parsed.record.id, "sched@example.edu");
        assert_eq!(parsed.record.subject, "Course Schedule Update");
        assert_eq!(parsed.record.sender, "Registrar <registrar@example.edu>");
        assert!(parsed.record.body.starts_with("Your schedule is now available."));
        assert!(!parsed.record.body.contains("\n\n\n"));
        assert_eq!(parsed.date.unwrap().timestamp(), 1_704_110_400);
    }

    #[test]
    fn test_missing_message_id_uses_fallback() {
        let raw = b"From: shop@example.com\r\n\
                    Subject: Sale\r\n\
                    \r\n\
                    50% off";

        let parsed = parse_message("42", raw).unwrap();
        assert_eq!(parsed.record.id, "42");
        assert_eq!(parsed.record.sender, "shop@example.com");
        assert!(parsed.date.is_none());
    }

    #[test]
    fn test_html_only_body_is_converted() {
        let raw = b"From: news@example.com\r\n\
                    Subject: Newsletter\r\n\
                    Content-Type: text/html; charset=utf-8\r\n\
                    \r\n\
                    <html><body><p>Big <b>news</b> today</p><img src=\"x.png\"></body></html>";

        let parsed = parse_message("1", raw).unwrap();
        assert!(parsed.record.body.contains("news"));
        assert!(!parsed.record.body.contains("<p>"));
    }
}
