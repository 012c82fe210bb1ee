//! Keyword retrieval over the saved set.

use kpoint_core::{ChatMessage, KnowledgePoint};

/// Reply used when no saved point matches the query.
pub const NO_MATCH_REPLY: &str =
    "I'm searching through the knowledge base to find relevant information...";

/// First saved point, in store order, whose title or content contains `query`
/// case-insensitively.
pub fn find_match<'a>(query: &str, saved: &'a [KnowledgePoint]) -> Option<&'a KnowledgePoint> {
    let needle = query.to_lowercase();
    saved.iter().find(|point| point.matches(&needle))
}

pub fn reply_text(query: &str, saved: &[KnowledgePoint]) -> String {
    match find_match(query, saved) {
        Some(point) => format!(
            "Based on your knowledge base, I found this information about \"{}\":\n\n{}",
            point.title, point.content
        ),
        None => NO_MATCH_REPLY.to_string(),
    }
}

/// Build the assistant reply to `query`.
pub fn respond(query: &str, saved: &[KnowledgePoint]) -> ChatMessage {
    ChatMessage::assistant(reply_text(query, saved))
}
