//! Content rules and markup composition.
//!
//! Posts carry a constrained HTML subset produced by the caller's editor;
//! this module owns the server-side rules: field validation, the merged-post
//! divider, reply quoting, and the body of a moderation report.

use crate::error::{ForumError, Result};
use regex::Regex;

/// Separator inserted between an existing post and a same-author follow-up
/// that was merged into it.
pub const MERGE_DIVIDER: &str = "<hr>";

pub const CONTENT_MIN_CHARS: usize = 10;
pub const CONTENT_MAX_CHARS: usize = 65_535;

/// Topic and name rule: letters, digits, underscores and whitespace,
/// 255 characters at most.
pub fn validate_topic(field: &'static str, value: &str) -> Result<()> {
    let pattern = Regex::new(r"^[\w\s\p{L}]{1,255}$").unwrap();
    if pattern.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ForumError::validation(
            field,
            "must contain only letters, digits, underscores and spaces (255 characters max)",
        ))
    }
}

pub fn validate_content(content: &str) -> Result<()> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ForumError::validation("content", "cannot be blank"));
    }
    let chars = trimmed.chars().count();
    if chars < CONTENT_MIN_CHARS {
        return Err(ForumError::validation(
            "content",
            format!("must be at least {CONTENT_MIN_CHARS} characters"),
        ));
    }
    if chars > CONTENT_MAX_CHARS {
        return Err(ForumError::validation(
            "content",
            format!("must be at most {CONTENT_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Renders a submission for preview without persisting anything. The stored
/// form and the previewed form are the same markup, so this is validation
/// plus trimming.
pub fn preview(raw: &str) -> Result<String> {
    validate_content(raw)?;
    Ok(raw.trim().to_string())
}

/// Seeds a reply with a quote of an earlier post. When the caller selected
/// an excerpt only that part is quoted, otherwise the whole post.
pub fn prepare_quote(quoted_content: &str, excerpt: Option<&str>) -> String {
    let quoted = match excerpt {
        Some(part) if !part.trim().is_empty() => part.trim(),
        _ => quoted_content,
    };
    format!("<blockquote>{quoted}</blockquote><br>")
}

pub fn report_topic(post_id: i64) -> String {
    format!("Complaint about the post #{post_id}")
}

/// Body of one moderation message: the reporter's text, a link to the post
/// and a quoted copy of the offending content, so the report stays readable
/// even if the post is edited afterwards.
pub fn compose_report(report: &str, post_id: i64, post_content: &str) -> String {
    format!(
        "{report}<hr><a href=\"/post/{post_id}\">Direct link to the post</a><hr>\
         <strong>Post contents</strong><br><blockquote>{post_content}</blockquote>"
    )
}
