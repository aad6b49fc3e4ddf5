use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use recall_domain::{
	similarity::{self, ConversationProfile, SimilarityBreakdown},
	text,
};
use recall_storage::models::{
	ArchiveFilter, ConversationSummary, ConversationTurn, SortDirection, SortKey,
};

use crate::{Error, RecallService, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedConversation {
	pub conversation_id: String,
	pub title: String,
	pub similarity: f32,
	pub breakdown: SimilarityBreakdown,
	pub shared_tools: Vec<String>,
	pub shared_models: Vec<String>,
	#[serde(with = "recall_storage::time_serde")]
	pub last_activity: OffsetDateTime,
}

impl RecallService {
	/// Conversations resembling `conversation_id` by tools, models, recency and keywords.
	///
	/// Archive failures, including an unknown conversation id, propagate to the caller.
	pub async fn related_conversations(
		&self,
		conversation_id: &str,
		cancel: &CancellationToken,
	) -> Result<Vec<RelatedConversation>> {
		if conversation_id.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "conversation_id must be non-empty.".to_string(),
			});
		}

		let cfg = &self.cfg.related;
		let turns = self.archive.get(conversation_id, cancel).await?;
		let Some(target) = self.profile_from_turns(&turns) else {
			return Err(Error::NotFound { message: format!("conversation {conversation_id}") });
		};
		let filter = ArchiveFilter {
			take: cfg.max_candidates,
			sort: SortKey::Timestamp,
			direction: SortDirection::Descending,
			..Default::default()
		};
		let page = self.archive.list(&filter, cancel).await?;
		let candidate_count = page.summaries.len();
		let mut related: Vec<RelatedConversation> = page
			.summaries
			.into_iter()
			.filter(|summary| summary.conversation_id != conversation_id)
			.filter_map(|summary| {
				let candidate = self.profile_from_summary(&summary);
				let breakdown = similarity::conversation_similarity(&target, &candidate, cfg);

				(breakdown.score >= cfg.min_similarity).then(|| RelatedConversation {
					shared_tools: shared(&target.tools, &candidate.tools),
					shared_models: shared(&target.models, &candidate.models),
					similarity: breakdown.score,
					breakdown,
					conversation_id: summary.conversation_id,
					title: summary.title,
					last_activity: summary.last_at,
				})
			})
			.collect();

		related.sort_by(|a, b| {
			b.similarity
				.total_cmp(&a.similarity)
				.then_with(|| a.conversation_id.cmp(&b.conversation_id))
		});
		related.truncate(cfg.max_results);

		tracing::debug!(
			conversation_id,
			candidate_count,
			related = related.len(),
			"Computed related conversations."
		);

		Ok(related)
	}

	fn profile_from_turns(&self, turns: &[ConversationTurn]) -> Option<ConversationProfile> {
		let last_activity = turns.iter().map(|turn| turn.timestamp).max()?;
		let mut corpus = String::new();

		for turn in turns {
			corpus.push_str(&turn.prompt);
			corpus.push('\n');
			corpus.push_str(&turn.response);
			corpus.push('\n');
		}

		Some(ConversationProfile {
			tools: similarity::normalized_set(turns.iter().flat_map(|turn| turn.tools.iter())),
			models: similarity::normalized_set(turns.iter().map(|turn| &turn.model)),
			last_activity,
			keywords: self.keywords(&corpus),
		})
	}

	fn profile_from_summary(&self, summary: &ConversationSummary) -> ConversationProfile {
		ConversationProfile {
			tools: similarity::normalized_set(&summary.tools),
			models: similarity::normalized_set(&summary.models),
			last_activity: summary.last_at,
			keywords: self.keywords(&format!("{}\n{}", summary.title, summary.preview)),
		}
	}

	fn keywords(&self, corpus: &str) -> BTreeSet<String> {
		text::top_keywords(
			corpus,
			self.parser.stopwords(),
			self.parser.min_term_chars(),
			self.cfg.related.max_keywords,
		)
	}
}

fn shared(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
	a.intersection(b).cloned().collect()
}
