use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{clock, text};
use recall_config::Related;

/// What a conversation looks like for similarity purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationProfile {
	pub tools: BTreeSet<String>,
	pub models: BTreeSet<String>,
	pub last_activity: OffsetDateTime,
	pub keywords: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
	pub score: f32,
	pub tool: f32,
	pub model: f32,
	pub time: f32,
	pub keyword: f32,
}

pub fn conversation_similarity(
	target: &ConversationProfile,
	candidate: &ConversationProfile,
	cfg: &Related,
) -> SimilarityBreakdown {
	let tool = text::jaccard(&target.tools, &candidate.tools);
	let model = text::jaccard(&target.models, &candidate.models);
	let days_apart =
		clock::days_between(target.last_activity, candidate.last_activity).abs();
	let time = (1.0 - days_apart / cfg.time_window_days).max(0.0);
	let keyword = text::jaccard(&target.keywords, &candidate.keywords);
	let score = (tool * cfg.tool_weight
		+ model * cfg.model_weight
		+ time * cfg.time_weight
		+ keyword * cfg.keyword_weight)
		.clamp(0.0, 1.0);

	SimilarityBreakdown { score, tool, model, time, keyword }
}

pub fn normalized_set<'a, I>(values: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = &'a String>,
{
	values
		.into_iter()
		.map(|value| value.trim().to_lowercase())
		.filter(|value| !value.is_empty())
		.collect()
}
