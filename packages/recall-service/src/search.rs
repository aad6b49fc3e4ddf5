pub mod suggest;

mod filter;

use std::{collections::HashMap, time::Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use recall_domain::{
	highlight::{Highlight, TermPatterns},
	query::{ParsedQuery, QueryIntent},
	scoring::{RelevanceScore, ScoreSignals, TurnFields},
};
use recall_storage::models::ConversationTurn;

use crate::{RecallService, Result, search::suggest::Suggestion};

const FALLBACK_INTERPRETATION: &str = "fallback";
const UNAVAILABLE_INTERPRETATION: &str = "unavailable";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	/// Descending relevance score.
	#[default]
	Ranked,
	/// Newest first; scores are still computed and returned.
	Chronological,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
	Prompt,
	Response,
	Tools,
}
impl SearchField {
	pub const ALL: [Self; 3] = [Self::Prompt, Self::Response, Self::Tools];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Prompt => "prompt",
			Self::Response => "response",
			Self::Tools => "tools",
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
	pub conversation_id: Option<String>,
	pub model: Option<String>,
	#[serde(default, with = "recall_storage::time_serde::option")]
	pub from: Option<OffsetDateTime>,
	#[serde(default, with = "recall_storage::time_serde::option")]
	pub to: Option<OffsetDateTime>,
	#[serde(default)]
	pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	pub query: String,
	pub filters: Option<SearchFilters>,
	pub mode: SearchMode,
	/// Fields to highlight; empty means all of them.
	pub fields: Vec<SearchField>,
	pub skip: u32,
	pub take: u32,
	pub include_score: bool,
	pub include_suggestions: bool,
	pub user_id: Option<String>,
	/// Caller hints; `intent` names an intent label used when no rule matches.
	pub context: HashMap<String, String>,
}
impl Default for SearchRequest {
	fn default() -> Self {
		Self {
			query: String::new(),
			filters: None,
			mode: SearchMode::default(),
			fields: Vec::new(),
			skip: 0,
			take: 20,
			include_score: false,
			include_suggestions: false,
			user_id: None,
			context: HashMap::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTurn {
	pub turn: ConversationTurn,
	pub relevance: RelevanceScore,
	pub highlights: Vec<Highlight>,
	/// Present only when the request asked for scores.
	pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
	pub intent: Option<QueryIntent>,
	pub intent_confidence: f32,
	pub complexity: f32,
	pub terms: Vec<String>,
	pub candidate_count: usize,
	pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub scored_results: Vec<ScoredTurn>,
	pub total_count: u64,
	pub has_more: bool,
	pub skip: u32,
	pub take: u32,
	pub elapsed_ms: u64,
	pub suggestions: Vec<Suggestion>,
	pub interpretation: String,
	pub metadata: SearchMetadata,
}
impl SearchResponse {
	fn unavailable(req: &SearchRequest) -> Self {
		Self {
			scored_results: Vec::new(),
			total_count: 0,
			has_more: false,
			skip: req.skip,
			take: req.take,
			elapsed_ms: 0,
			suggestions: Vec::new(),
			interpretation: UNAVAILABLE_INTERPRETATION.to_string(),
			metadata: SearchMetadata { fallback: true, ..Default::default() },
		}
	}
}

impl RecallService {
	/// Ranked search over the archive. Never fails: a failed ranked search degrades to an unscored
	/// archive query, and a failed fallback yields an empty response.
	pub async fn search(&self, req: SearchRequest, cancel: &CancellationToken) -> SearchResponse {
		let started = Instant::now();
		let err = match self.ranked_search(&req, cancel, started).await {
			Ok(response) => return response,
			Err(err) => err,
		};

		warn!(
			error = %err,
			query = %req.query,
			"Ranked search failed. Falling back to unscored archive query."
		);

		match self.fallback_search(&req, cancel, started).await {
			Ok(response) => response,
			Err(err) => {
				warn!(
					error = %err,
					query = %req.query,
					"Fallback search failed. Returning no results."
				);

				SearchResponse::unavailable(&req)
			},
		}
	}

	async fn ranked_search(
		&self,
		req: &SearchRequest,
		cancel: &CancellationToken,
		started: Instant,
	) -> Result<SearchResponse> {
		let parsed = self.parser.parse(&req.query, &req.context);
		let filter = filter::candidate_filter(req, &parsed, self.cfg.search.candidate_floor);
		let page = self.archive.search(&filter, cancel).await?;
		let candidate_count = page.results.len();
		let now = self.clock.now();
		let fields: &[SearchField] =
			if req.fields.is_empty() { &SearchField::ALL } else { &req.fields };
		let patterns = TermPatterns::compile(&parsed.terms);
		let mut scored: Vec<ScoredTurn> = page
			.results
			.into_iter()
			.map(|turn| self.score_turn(turn, &parsed, &patterns, fields, req.include_score, now))
			.collect();

		match req.mode {
			SearchMode::Ranked => scored.sort_by(|a, b| {
				b.relevance
					.score
					.total_cmp(&a.relevance.score)
					.then_with(|| b.turn.timestamp.cmp(&a.turn.timestamp))
			}),
			SearchMode::Chronological =>
				scored.sort_by(|a, b| b.turn.timestamp.cmp(&a.turn.timestamp)),
		}

		tracing::debug!(
			candidate_count,
			top_score = scored.first().map(|hit| hit.relevance.score).unwrap_or_default(),
			intent = parsed.intent.as_str(),
			"Scored search candidates."
		);

		let total_count = page.total_count;
		let scored_results: Vec<ScoredTurn> =
			scored.into_iter().skip(req.skip as usize).take(req.take as usize).collect();
		let suggestions = if req.include_suggestions {
			self.inline_suggestions(&req.query, req.user_id.as_deref())
		} else {
			Vec::new()
		};

		Ok(SearchResponse {
			scored_results,
			total_count,
			has_more: u64::from(req.skip) + u64::from(req.take) < total_count,
			skip: req.skip,
			take: req.take,
			elapsed_ms: elapsed_ms(started),
			suggestions,
			interpretation: parsed.interpretation.clone(),
			metadata: metadata(&parsed, candidate_count),
		})
	}

	async fn fallback_search(
		&self,
		req: &SearchRequest,
		cancel: &CancellationToken,
		started: Instant,
	) -> Result<SearchResponse> {
		let filter = filter::fallback_filter(req);
		let page = self.archive.search(&filter, cancel).await?;
		let step = self.cfg.search.fallback_score_step;
		let candidate_count = page.results.len();
		let scored_results = page
			.results
			.into_iter()
			.enumerate()
			.map(|(rank, turn)| {
				let score = (1.0 - step * rank as f32).clamp(0.0, 1.0);

				ScoredTurn {
					turn,
					relevance: RelevanceScore {
						score,
						explanation: FALLBACK_INTERPRETATION.to_string(),
						signals: ScoreSignals::default(),
					},
					highlights: Vec::new(),
					explanation: req.include_score.then(|| FALLBACK_INTERPRETATION.to_string()),
				}
			})
			.collect();

		Ok(SearchResponse {
			scored_results,
			total_count: page.total_count,
			has_more: page.has_more,
			skip: req.skip,
			take: req.take,
			elapsed_ms: elapsed_ms(started),
			suggestions: Vec::new(),
			interpretation: FALLBACK_INTERPRETATION.to_string(),
			metadata: SearchMetadata { candidate_count, fallback: true, ..Default::default() },
		})
	}

	fn score_turn(
		&self,
		turn: ConversationTurn,
		parsed: &ParsedQuery,
		patterns: &TermPatterns,
		fields: &[SearchField],
		include_score: bool,
		now: OffsetDateTime,
	) -> ScoredTurn {
		let relevance = self.scorer.score(
			&TurnFields {
				prompt: &turn.prompt,
				response: &turn.response,
				model: &turn.model,
				tools: &turn.tools,
				timestamp: turn.timestamp,
			},
			parsed,
			now,
		);
		let mut highlights = Vec::new();

		for field in fields {
			let text = match field {
				SearchField::Prompt => turn.prompt.clone(),
				SearchField::Response => turn.response.clone(),
				SearchField::Tools => turn.tools.join(", "),
			};

			highlights.extend(self.highlighter.highlight(field.as_str(), &text, patterns));
		}

		let explanation = include_score.then(|| relevance.explanation.clone());

		ScoredTurn { turn, relevance, highlights, explanation }
	}
}

fn metadata(parsed: &ParsedQuery, candidate_count: usize) -> SearchMetadata {
	SearchMetadata {
		intent: Some(parsed.intent),
		intent_confidence: parsed.intent_confidence,
		complexity: parsed.complexity,
		terms: parsed.terms.clone(),
		candidate_count,
		fallback: false,
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
