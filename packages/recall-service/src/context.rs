mod analysis;
mod personalize;

pub use analysis::UserPatternAnalysis;

use std::{
	collections::{BTreeMap, HashSet},
	sync::Arc,
};

use dashmap::{DashMap, mapref::entry::Entry};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use recall_config::Context;
use recall_domain::{
	clock::{self, Clock},
	query::{QueryIntent, QueryParser},
};
use recall_storage::{Interaction, InteractionKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPattern {
	pub query: String,
	pub intent: QueryIntent,
	#[serde(with = "recall_storage::time_serde")]
	pub timestamp: OffsetDateTime,
	pub clicked_results: Vec<String>,
	pub success_score: f32,
	pub duration_ms: u64,
	/// The follow-up query when the user refined this search.
	pub refinement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPattern {
	pub conversation_id: String,
	#[serde(with = "recall_storage::time_serde")]
	pub accessed_at: OffsetDateTime,
	pub view_duration_ms: u64,
	pub topics: Vec<String>,
	pub tools: Vec<String>,
	pub model: Option<String>,
	pub interaction: InteractionKind,
	pub satisfaction: f32,
}
impl ConversationPattern {
	pub fn from_interaction(interaction: &Interaction, accessed_at: OffsetDateTime) -> Self {
		Self {
			conversation_id: interaction.conversation_id.clone(),
			accessed_at,
			view_duration_ms: interaction.view_duration_ms,
			topics: interaction.topics.clone(),
			tools: interaction.tools.clone(),
			model: interaction.model.clone(),
			interaction: interaction.kind,
			satisfaction: interaction.satisfaction,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInterest {
	pub topic: String,
	pub interest_score: f32,
	pub interaction_count: u32,
	#[serde(with = "recall_storage::time_serde")]
	pub last_interaction: OffsetDateTime,
	pub related_terms: Vec<String>,
	pub trending_score: f32,
}

/// Learned state for one user. Instances are immutable snapshots; every mutation produces a new
/// snapshot with a higher `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
	pub user_id: String,
	pub search_patterns: Vec<SearchPattern>,
	pub conversation_patterns: Vec<ConversationPattern>,
	pub topic_interests: Vec<TopicInterest>,
	pub model_preferences: BTreeMap<String, f32>,
	pub tool_usage: BTreeMap<String, u64>,
	#[serde(with = "recall_storage::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "recall_storage::time_serde")]
	pub last_activity: OffsetDateTime,
	pub version: u64,
}
impl UserContext {
	fn new(user_id: &str, now: OffsetDateTime) -> Self {
		Self {
			user_id: user_id.to_string(),
			search_patterns: Vec::new(),
			conversation_patterns: Vec::new(),
			topic_interests: Vec::new(),
			model_preferences: BTreeMap::new(),
			tool_usage: BTreeMap::new(),
			created_at: now,
			last_activity: now,
			version: 0,
		}
	}
}

/// Per-user personalization state behind a sharded concurrent map.
///
/// Writers read the current snapshot, build an updated copy and swap it in only if the slot still
/// holds the snapshot they read; otherwise they rebuild from the fresh one.
pub struct ConversationContextManager {
	cfg: Context,
	parser: Arc<QueryParser>,
	clock: Arc<dyn Clock>,
	contexts: DashMap<String, Arc<UserContext>>,
}
impl ConversationContextManager {
	pub fn new(cfg: Context, parser: Arc<QueryParser>, clock: Arc<dyn Clock>) -> Self {
		Self { cfg, parser, clock, contexts: DashMap::new() }
	}

	pub fn len(&self) -> usize {
		self.contexts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.contexts.is_empty()
	}

	/// The user's current context, created on first access.
	pub fn context_snapshot(&self, user_id: &str) -> Arc<UserContext> {
		self.current_or_create(user_id, self.clock.now())
	}

	pub fn update_search_pattern(&self, user_id: &str, pattern: SearchPattern) -> Arc<UserContext> {
		let terms = self.parser.extract_terms(&pattern.query);
		let cfg = &self.cfg;

		let pattern =
			SearchPattern { success_score: pattern.success_score.clamp(0.0, 1.0), ..pattern };

		self.mutate(user_id, |ctx, now| {
			ctx.search_patterns.push(pattern.clone());
			trim_oldest(&mut ctx.search_patterns, cfg.max_patterns, |item| item.timestamp);
			refresh_topics(ctx, &terms, pattern.success_score, now, cfg);
		})
	}

	pub fn record_interaction(
		&self,
		user_id: &str,
		pattern: ConversationPattern,
	) -> Arc<UserContext> {
		let cfg = &self.cfg;

		self.mutate(user_id, |ctx, _| {
			let satisfaction = pattern.satisfaction.clamp(0.0, 1.0);

			if let Some(model) = pattern.model.as_deref().filter(|model| !model.is_empty()) {
				let preference = ctx.model_preferences.entry(model.to_string()).or_default();

				*preference = (*preference + satisfaction * cfg.model_learning_rate).clamp(0.0, 1.0);
			}
			for tool in &pattern.tools {
				*ctx.tool_usage.entry(tool.clone()).or_default() += 1;
			}

			ctx.conversation_patterns.push(ConversationPattern { satisfaction, ..pattern.clone() });
			trim_oldest(&mut ctx.conversation_patterns, cfg.max_patterns, |item| item.accessed_at);
		})
	}

	/// Removes contexts idle for longer than the retention window and returns how many went.
	pub fn cleanup_old_contexts(&self) -> usize {
		let cutoff = self.clock.now() - Duration::days(self.cfg.retention_days);
		let before = self.contexts.len();

		self.contexts.retain(|_, ctx| ctx.last_activity >= cutoff);

		let purged = before.saturating_sub(self.contexts.len());

		tracing::info!(purged, remaining = self.contexts.len(), "Cleaned up idle user contexts.");

		purged
	}

	fn current(&self, user_id: &str) -> Option<Arc<UserContext>> {
		self.contexts.get(user_id).map(|slot| slot.value().clone())
	}

	fn current_or_create(&self, user_id: &str, now: OffsetDateTime) -> Arc<UserContext> {
		self.contexts
			.entry(user_id.to_string())
			.or_insert_with(|| Arc::new(UserContext::new(user_id, now)))
			.value()
			.clone()
	}

	fn mutate<F>(&self, user_id: &str, apply: F) -> Arc<UserContext>
	where
		F: Fn(&mut UserContext, OffsetDateTime),
	{
		loop {
			let now = self.clock.now();
			let current = self.current_or_create(user_id, now);
			let mut next = UserContext::clone(&current);

			apply(&mut next, now);

			next.last_activity = now;
			next.version = current.version + 1;

			let next = Arc::new(next);

			match self.contexts.entry(user_id.to_string()) {
				Entry::Occupied(mut slot) if Arc::ptr_eq(slot.get(), &current) => {
					slot.insert(next.clone());

					return next;
				},
				Entry::Occupied(_) => {
					tracing::debug!(user_id, "User context changed concurrently. Retrying update.");
				},
				Entry::Vacant(_) => {
					tracing::debug!(user_id, "User context purged concurrently. Recreating.");
				},
			}
		}
	}
}

/// Keeps the `cap` most recent items by `key`, preserving relative order.
fn trim_oldest<T, K>(items: &mut Vec<T>, cap: usize, key: K)
where
	K: Fn(&T) -> OffsetDateTime,
{
	if items.len() <= cap {
		return;
	}

	items.sort_by_key(|item| key(item));

	let excess = items.len() - cap;

	items.drain(..excess);
}

fn refresh_topics(
	ctx: &mut UserContext,
	terms: &[String],
	success: f32,
	now: OffsetDateTime,
	cfg: &Context,
) {
	let success = success.clamp(0.0, 1.0);
	let gain = success * cfg.topic_learning_rate;

	for term in terms {
		let related: Vec<&String> = terms.iter().filter(|other| *other != term).collect();

		match ctx.topic_interests.iter_mut().find(|interest| &interest.topic == term) {
			Some(interest) => {
				let idle_days = clock::days_between(interest.last_interaction, now);

				interest.interest_score = (interest.interest_score + gain).clamp(0.0, 1.0);
				interest.interaction_count += 1;
				interest.trending_score =
					(1.0 - idle_days / cfg.trending_window_days).max(cfg.trending_floor).min(1.0);
				interest.last_interaction = now;

				merge_terms(&mut interest.related_terms, &related, cfg.max_related_terms);
			},
			None => {
				let mut related_terms = Vec::new();

				merge_terms(&mut related_terms, &related, cfg.max_related_terms);

				ctx.topic_interests.push(TopicInterest {
					topic: term.clone(),
					interest_score: gain.clamp(0.0, 1.0),
					interaction_count: 1,
					last_interaction: now,
					related_terms,
					trending_score: 1.0,
				});
			},
		}
	}
}

fn merge_terms(into: &mut Vec<String>, extra: &[&String], cap: usize) {
	let mut seen: HashSet<String> = into.iter().cloned().collect();

	for term in extra {
		if into.len() >= cap {
			break;
		}
		if seen.insert((*term).clone()) {
			into.push((*term).clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn trim_keeps_most_recent() {
		let base = datetime!(2025-01-01 0:00 UTC);
		let mut items: Vec<OffsetDateTime> =
			(0..5).rev().map(|offset| base + Duration::hours(offset)).collect();

		trim_oldest(&mut items, 3, |item| *item);

		assert_eq!(items, vec![
			base + Duration::hours(2),
			base + Duration::hours(3),
			base + Duration::hours(4),
		]);
	}

	#[test]
	fn merge_terms_respects_cap_and_dedupes() {
		let mut into = vec!["tokio".to_string()];
		let extra = ["tokio".to_string(), "serde".to_string(), "axum".to_string()];
		let refs: Vec<&String> = extra.iter().collect();

		merge_terms(&mut into, &refs, 2);

		assert_eq!(into, vec!["tokio", "serde"]);
	}
}
