use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
	Error, Result,
	context::{ConversationContextManager, UserContext},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatternAnalysis {
	pub user_id: String,
	pub window_days: i64,
	pub searches_per_day: f32,
	pub conversations_per_day: f32,
	pub average_search_success: f32,
	pub average_satisfaction: f32,
	/// Share of searches in the window that were followed by a refinement.
	pub refinement_rate: f32,
	pub top_topics: Vec<String>,
	pub top_models: Vec<String>,
	pub top_tools: Vec<String>,
	pub intent_histogram: BTreeMap<String, u32>,
}

impl ConversationContextManager {
	/// Usage statistics over the trailing analysis window. Users without a context get an
	/// all-zero analysis; no context is created.
	pub fn analyze_user_patterns(
		&self,
		user_id: &str,
		cancel: &CancellationToken,
	) -> Result<UserPatternAnalysis> {
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		if user_id.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "user_id must be non-empty.".to_string() });
		}

		let window_days = self.cfg.analysis_window_days;
		let mut analysis =
			UserPatternAnalysis { user_id: user_id.to_string(), window_days, ..Default::default() };
		let Some(ctx) = self.current(user_id) else {
			return Ok(analysis);
		};
		let cutoff = self.clock.now() - Duration::days(window_days);
		let days = window_days.max(1) as f32;
		let searches: Vec<_> =
			ctx.search_patterns.iter().filter(|pattern| pattern.timestamp >= cutoff).collect();
		let conversations: Vec<_> = ctx
			.conversation_patterns
			.iter()
			.filter(|pattern| pattern.accessed_at >= cutoff)
			.collect();

		analysis.searches_per_day = searches.len() as f32 / days;
		analysis.conversations_per_day = conversations.len() as f32 / days;
		analysis.average_search_success =
			mean(searches.iter().map(|pattern| pattern.success_score));
		analysis.average_satisfaction =
			mean(conversations.iter().map(|pattern| pattern.satisfaction));
		analysis.refinement_rate = if searches.is_empty() {
			0.0
		} else {
			searches.iter().filter(|pattern| pattern.refinement.is_some()).count() as f32
				/ searches.len() as f32
		};

		for pattern in &searches {
			*analysis.intent_histogram.entry(pattern.intent.as_str().to_string()).or_default() += 1;
		}

		let top_n = self.cfg.analysis_top_n;

		analysis.top_topics = top_topics(&ctx, top_n);
		analysis.top_models = top_by(ctx.model_preferences.iter().map(|(k, v)| (k, *v)), top_n);
		analysis.top_tools = top_by(ctx.tool_usage.iter().map(|(k, v)| (k, *v as f32)), top_n);

		Ok(analysis)
	}
}

fn mean<I>(values: I) -> f32
where
	I: Iterator<Item = f32>,
{
	let (sum, count) =
		values.fold((0.0_f32, 0_usize), |(sum, count), value| (sum + value, count + 1));

	if count == 0 { 0.0 } else { sum / count as f32 }
}

fn top_topics(ctx: &UserContext, top_n: usize) -> Vec<String> {
	let weighted =
		ctx.topic_interests.iter().map(|interest| (&interest.topic, interest.interest_score));

	top_by(weighted, top_n)
}

/// Names ordered by descending weight, ties alphabetical.
fn top_by<'a, I>(weighted: I, top_n: usize) -> Vec<String>
where
	I: Iterator<Item = (&'a String, f32)>,
{
	let mut ranked: Vec<(&String, f32)> = weighted.collect();

	ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

	ranked.into_iter().take(top_n).map(|(name, _)| name.clone()).collect()
}
