use std::collections::HashSet;

use recall_domain::text;

use crate::{
	context::{ConversationContextManager, TopicInterest, UserContext},
	search::suggest::{self, Suggestion, SuggestionKind},
};

const TOP_TOOLS: usize = 3;
const TOP_TOPICS: usize = 3;

impl ConversationContextManager {
	/// Suggestions drawn from the user's own history: successful searches overlapping the query,
	/// co-occurring topic interests, most-used tools and the preferred model.
	pub fn personalized_suggestions(&self, user_id: &str, query: &str) -> Vec<Suggestion> {
		let Some(ctx) = self.current(user_id) else {
			return Vec::new();
		};
		let query = query.trim();
		let query_tokens = text::token_set(query);
		let mut out = self.recent_searches(&ctx, &query_tokens);

		out.extend(co_occurring_topics(&ctx, query, &query_tokens));
		out.extend(top_tools(&ctx, query));
		out.extend(preferred_model(&ctx, query));

		suggest::rank(out, query, self.cfg.max_personalized_suggestions)
	}

	fn recent_searches(
		&self,
		ctx: &UserContext,
		query_tokens: &HashSet<String>,
	) -> Vec<Suggestion> {
		if query_tokens.is_empty() {
			return Vec::new();
		}

		ctx.search_patterns
			.iter()
			.rev()
			.filter(|pattern| pattern.success_score >= self.cfg.successful_search_threshold)
			.filter_map(|pattern| {
				let overlap = text::token_set(&pattern.query).intersection(query_tokens).count()
					as f32 / query_tokens.len() as f32;

				(overlap > self.cfg.query_overlap_threshold).then(|| Suggestion {
					text: pattern.query.clone(),
					kind: SuggestionKind::RecentSearch,
					confidence: pattern.success_score.clamp(0.0, 1.0),
				})
			})
			.collect()
	}
}

/// Strongest topic interests tied to the query. A topic named in the query is suggested with its
/// earliest companion term; a topic whose companions appear in the query is suggested by name.
fn co_occurring_topics(
	ctx: &UserContext,
	query: &str,
	query_tokens: &HashSet<String>,
) -> Vec<Suggestion> {
	let mut matched: Vec<(&TopicInterest, String)> = ctx
		.topic_interests
		.iter()
		.filter_map(|interest| {
			if query_tokens.contains(&interest.topic) {
				let companion =
					interest.related_terms.iter().find(|term| !query_tokens.contains(*term))?;

				Some((interest, with_query(query, companion)))
			} else if interest.related_terms.iter().any(|term| query_tokens.contains(term)) {
				Some((interest, interest.topic.clone()))
			} else {
				None
			}
		})
		.collect();

	matched.sort_by(|a, b| {
		weight(b.0).total_cmp(&weight(a.0)).then_with(|| a.0.topic.cmp(&b.0.topic))
	});

	matched
		.into_iter()
		.take(TOP_TOPICS)
		.map(|(interest, text)| Suggestion {
			text,
			kind: SuggestionKind::TopicInterest,
			confidence: weight(interest),
		})
		.collect()
}

fn weight(interest: &TopicInterest) -> f32 {
	(interest.interest_score * interest.trending_score).clamp(0.0, 1.0)
}

fn top_tools(ctx: &UserContext, query: &str) -> Vec<Suggestion> {
	let total: u64 = ctx.tool_usage.values().sum();

	if total == 0 {
		return Vec::new();
	}

	let mut tools: Vec<(&String, &u64)> = ctx.tool_usage.iter().collect();

	tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

	tools
		.into_iter()
		.take(TOP_TOOLS)
		.map(|(tool, count)| Suggestion {
			text: with_query(query, tool),
			kind: SuggestionKind::Tool,
			confidence: *count as f32 / total as f32,
		})
		.collect()
}

fn preferred_model(ctx: &UserContext, query: &str) -> Option<Suggestion> {
	let (model, preference) = ctx
		.model_preferences
		.iter()
		.filter(|(_, preference)| **preference > 0.0)
		.max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))?;

	Some(Suggestion {
		text: with_query(query, model),
		kind: SuggestionKind::Model,
		confidence: *preference,
	})
}

fn with_query(query: &str, suffix: &str) -> String {
	if query.is_empty() { suffix.to_string() } else { format!("{query} {suffix}") }
}
