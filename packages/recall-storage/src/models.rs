use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
	pub conversation_id: String,
	pub turn_index: u32,
	pub prompt: String,
	pub response: String,
	#[serde(default)]
	pub model: String,
	#[serde(default)]
	pub tools: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
	pub conversation_id: String,
	pub title: String,
	pub models: Vec<String>,
	pub tools: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub first_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub last_at: OffsetDateTime,
	pub turn_count: u32,
	/// Prompt and response text of the conversation, truncated by the backend.
	pub preview: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	#[default]
	Timestamp,
	ConversationId,
	Model,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	Ascending,
	#[default]
	Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFilter {
	pub conversation_id: Option<String>,
	/// Free text; backends decide how loosely it matches.
	pub text: Option<String>,
	pub model: Option<String>,
	#[serde(default, with = "crate::time_serde::option")]
	pub from: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub to: Option<OffsetDateTime>,
	#[serde(default)]
	pub tools: Vec<String>,
	pub skip: u32,
	pub take: u32,
	#[serde(default)]
	pub sort: SortKey,
	#[serde(default)]
	pub direction: SortDirection,
}
impl Default for ArchiveFilter {
	fn default() -> Self {
		Self {
			conversation_id: None,
			text: None,
			model: None,
			from: None,
			to: None,
			tools: Vec::new(),
			skip: 0,
			take: 50,
			sort: SortKey::default(),
			direction: SortDirection::default(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
	pub results: Vec<ConversationTurn>,
	pub total_count: u64,
	pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPage {
	pub summaries: Vec<ConversationSummary>,
}
