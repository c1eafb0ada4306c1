//! File layout of a mirrored message.

use bookchat_core::messages::Message;

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Repository path of the file holding `message`, e.g.
/// `messages/message_20240501_103000_7.txt`.
pub fn file_path(prefix: &str, message: &Message) -> String {
    let name = format!(
        "message_{}_{}.txt",
        message.timestamp.format(FILE_STAMP_FORMAT),
        message.id
    );
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

pub fn file_body(message: &Message) -> String {
    format!(
        "Message created at {}:\n\n{}",
        message.timestamp.format(FILE_STAMP_FORMAT),
        message.content
    )
}

pub fn commit_message(message: &Message) -> String {
    format!("Add chat message #{}", message.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message() -> Message {
        Message {
            id: 7,
            content: "hello\nworld".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            github_url: None,
            mirrors: Vec::new(),
        }
    }

    #[test]
    fn path_includes_stamp_and_id() {
        assert_eq!(
            file_path("messages", &message()),
            "messages/message_20240501_103000_7.txt"
        );
        assert_eq!(
            file_path("/archive/chat/", &message()),
            "archive/chat/message_20240501_103000_7.txt"
        );
        assert_eq!(file_path("", &message()), "message_20240501_103000_7.txt");
    }

    #[test]
    fn body_and_commit_message() {
        assert_eq!(
            file_body(&message()),
            "Message created at 20240501_103000:\n\nhello\nworld"
        );
        assert_eq!(commit_message(&message()), "Add chat message #7");
    }
}
