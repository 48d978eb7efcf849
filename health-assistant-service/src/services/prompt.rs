//! Prompt assembly.
//!
//! Every prompt starts with the system instruction, followed by the
//! conversation context and a task-specific directive. These functions are
//! pure and never fail.

use crate::models::{ConversationTurn, SummaryTurn};

const HISTORY_HEADER: &str = "Previous conversation:";
const SUMMARY_DIRECTIVE: &str = "Summarize the following conversation:";
const TIP_DIRECTIVE: &str =
    "Give one short, positive and practical health tip for today, in a single sentence.";
const ASSISTANT_CUE: &str = "Assistant:";

/// Render the chat prompt: instruction, history, the new user message and the answer cue.
pub fn build_chat_prompt(
    system_instruction: &str,
    history: &[ConversationTurn],
    user_message: &str,
) -> String {
    let history = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n{}\n{}\nUser: {}\n{}",
        system_instruction.trim(),
        HISTORY_HEADER,
        history,
        user_message,
        ASSISTANT_CUE
    )
}

/// Render the summarization prompt over the full conversation.
pub fn build_summary_prompt(system_instruction: &str, conversation: &[SummaryTurn]) -> String {
    let turns = conversation
        .iter()
        .map(|turn| format!("{}: {}", turn.sender.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n{}\n{}\n{}",
        system_instruction.trim(),
        SUMMARY_DIRECTIVE,
        turns,
        ASSISTANT_CUE
    )
}

pub fn build_tip_prompt(system_instruction: &str) -> String {
    format!(
        "{}\n{}\n{}",
        system_instruction.trim(),
        TIP_DIRECTIVE,
        ASSISTANT_CUE
    )
}

/// The most recent `limit` turns, or all of them when no limit is set.
pub fn recent_history(history: &[ConversationTurn], limit: Option<usize>) -> &[ConversationTurn] {
    match limit {
        Some(limit) if history.len() > limit => &history[history.len() - limit..],
        _ => history,
    }
}
