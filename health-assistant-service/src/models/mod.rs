//! Domain models for the health assistant service.

pub mod conversation;
pub mod requests;

pub use conversation::{ConversationTurn, Role, Sender, SummaryTurn};
pub use requests::{ChatRequest, ChatResponse, SummarizeRequest, SummaryResponse, TipResponse};
