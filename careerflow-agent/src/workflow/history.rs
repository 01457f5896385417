//! Pure helpers over conversation history.

use careerflow_core::prelude::{Message, Role};

use super::{assessment::is_question_card, info_collection::INFO_COLLECTION_COMPLETE};

/// Number of trailing messages used when nothing looks relevant.
pub const FALLBACK_WINDOW: usize = 6;

/// Terms that mark background-information or assessment content.
const RELEVANT_KEYWORDS: &[&str] = &[
    "学历",
    "专业",
    "毕业",
    "学校",
    "工作经验",
    "工作经历",
    "实习",
    "项目",
    "技能",
    "擅长",
    "兴趣",
    "爱好",
    "性格",
    "职业",
    "岗位",
    "行业",
    "期望",
    "目标",
    "测评",
    INFO_COLLECTION_COMPLETE,
];

/// A single option letter A–D, any case, surrounding whitespace ignored.
pub fn is_choice(query: &str) -> bool {
    let mut chars = query.trim().chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('A'..='D' | 'a'..='d'), None)
    )
}

/// True when the latest assistant message is an unanswered question card.
pub fn question_pending(history: &[Message]) -> bool {
    history
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
        .is_some_and(|message| is_question_card(&message.content))
}

fn is_relevant(message: &Message) -> bool {
    is_question_card(&message.content)
        || (message.role == Role::User && is_choice(&message.content))
        || RELEVANT_KEYWORDS
            .iter()
            .any(|keyword| message.content.contains(keyword))
}

/// Turns that look like information-collection or assessment content.
///
/// Falls back to the last [`FALLBACK_WINDOW`] messages when none match.
/// System messages are never included.
pub fn relevant_history(history: &[Message]) -> Vec<Message> {
    let conversational: Vec<&Message> = history
        .iter()
        .filter(|message| message.role != Role::System)
        .collect();

    let relevant: Vec<Message> = conversational
        .iter()
        .filter(|message| is_relevant(message))
        .map(|message| (*message).clone())
        .collect();

    if !relevant.is_empty() {
        return relevant;
    }

    let skip = conversational.len().saturating_sub(FALLBACK_WINDOW);
    conversational
        .into_iter()
        .skip(skip)
        .cloned()
        .collect()
}
