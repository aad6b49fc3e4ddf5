use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
	Result, clock,
	query::{ParsedQuery, QueryIntent},
	text,
};
use recall_config::Scoring;

/// The parts of an archived turn that take part in relevance scoring.
#[derive(Debug, Clone, Copy)]
pub struct TurnFields<'a> {
	pub prompt: &'a str,
	pub response: &'a str,
	pub model: &'a str,
	pub tools: &'a [String],
	pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSignals {
	pub prompt: f32,
	pub response: f32,
	pub model: f32,
	pub tool: f32,
	pub temporal: f32,
	pub intent_multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
	pub score: f32,
	pub explanation: String,
	pub signals: ScoreSignals,
}

#[derive(Debug, Clone)]
struct IntentBoost {
	multiplier: f32,
	keywords: Vec<String>,
}

/// Multi-signal relevance of one archived turn against one parsed query.
///
/// Document frequencies come from a fixed table with a constant default; they are not corpus
/// statistics and the resulting IDF is a placeholder weight.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
	cfg: Scoring,
	boosts: HashMap<QueryIntent, IntentBoost>,
}
impl RelevanceScorer {
	pub fn new(cfg: &Scoring) -> Result<Self> {
		let mut boosts = HashMap::new();

		for rule in &cfg.intent_boosts.rules {
			boosts.insert(
				QueryIntent::from_label(&rule.intent)?,
				IntentBoost {
					multiplier: rule.multiplier,
					keywords: rule.keywords.iter().map(|keyword| keyword.to_lowercase()).collect(),
				},
			);
		}

		Ok(Self { cfg: cfg.clone(), boosts })
	}

	/// Weighted blend of the per-field signals, boosted by intent and clamped to [0, 1].
	///
	/// A full-query substring match dominates a turn with no overlap only when both have similar
	/// length and age: length normalization can shrink a match buried in a very long response
	/// below the temporal signal of a fresh turn.
	pub fn score(
		&self,
		turn: &TurnFields<'_>,
		query: &ParsedQuery,
		now: OffsetDateTime,
	) -> RelevanceScore {
		let weights = &self.cfg.weights;
		let mut signals = ScoreSignals {
			prompt: self.text_relevance(turn.prompt, query),
			response: self.text_relevance(turn.response, query),
			model: self.model_relevance(turn.model, &query.terms),
			tool: tool_relevance(turn.tools, &query.terms),
			temporal: self.temporal_relevance(turn.timestamp, now),
			intent_multiplier: 1.0,
		};
		let weighted = signals.prompt * weights.prompt
			+ signals.response * weights.response
			+ signals.model * weights.model
			+ signals.tool * weights.tool
			+ signals.temporal * weights.temporal;

		signals.intent_multiplier = self.intent_multiplier(turn, query.intent);

		let score = (weighted * signals.intent_multiplier).clamp(0.0, 1.0);
		let explanation = self.explain(&signals);

		RelevanceScore { score, explanation, signals }
	}

	pub fn text_relevance(&self, text: &str, query: &ParsedQuery) -> f32 {
		let cfg = &self.cfg.text;
		let lowered = text.to_lowercase();
		let processed = query.processed.trim().to_lowercase();
		let mut score = 0.0_f32;

		if !processed.is_empty() && lowered.contains(&processed) {
			score += cfg.exact_match;
		}

		let words = text::words(text);

		if !words.is_empty() {
			let word_count = words.len() as f32;

			for term in &query.terms {
				let frequency = term_frequency(term, &words, &lowered);

				if frequency == 0 {
					continue;
				}

				let document_frequency = cfg
					.document_frequencies
					.get(term)
					.copied()
					.unwrap_or(cfg.default_document_frequency)
					.max(1.0);
				let idf = (cfg.idf_corpus_size / document_frequency).ln();

				score += (frequency as f32 / word_count * idf * cfg.term_weight).min(cfg.term_cap);
			}

			score += self.proximity_bonus(&query.terms, &words);
		}

		let length = text.chars().count() as f32;
		let normalization = (cfg.length_norm_chars / length.max(cfg.length_norm_floor)).min(1.0);

		(score * normalization).clamp(0.0, 1.0)
	}

	pub fn model_relevance(&self, model: &str, terms: &[String]) -> f32 {
		let model = model.trim().to_lowercase();

		if model.is_empty() || terms.is_empty() {
			return 0.0;
		}
		if terms.iter().any(|term| model.contains(term.as_str())) {
			return self.cfg.model.exact;
		}

		for (family, aliases) in &self.cfg.model.families {
			let term_names_family = terms.iter().any(|term| {
				term == family || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(term))
			});

			if !term_names_family {
				continue;
			}

			let model_in_family = model.contains(family.as_str())
				|| aliases.iter().any(|alias| model.contains(alias.to_lowercase().as_str()));

			if model_in_family {
				return self.cfg.model.family;
			}
		}

		0.0
	}

	pub fn temporal_relevance(&self, timestamp: OffsetDateTime, now: OffsetDateTime) -> f32 {
		let age_days = clock::days_between(timestamp, now);

		if age_days <= 0.0 {
			return 1.0;
		}

		(1.0 - age_days / self.cfg.temporal.horizon_days).max(0.0)
	}

	fn proximity_bonus(&self, terms: &[String], words: &[String]) -> f32 {
		let cfg = &self.cfg.text;
		let positions: Vec<Vec<usize>> = terms
			.iter()
			.map(|term| {
				words
					.iter()
					.enumerate()
					.filter(|(_, word)| *word == term)
					.map(|(idx, _)| idx)
					.collect()
			})
			.collect();
		let mut bonus = 0.0_f32;

		for (i, left) in positions.iter().enumerate() {
			for right in positions.iter().skip(i + 1) {
				let Some(distance) = min_distance(left, right) else { continue };

				if distance == 0 || distance > cfg.proximity_window {
					continue;
				}

				bonus += cfg.proximity_step / distance as f32;
			}
		}

		bonus.min(cfg.proximity_cap)
	}

	fn intent_multiplier(&self, turn: &TurnFields<'_>, intent: QueryIntent) -> f32 {
		let Some(boost) = self.boosts.get(&intent) else { return 1.0 };
		let combined = format!("{}\n{}", turn.prompt, turn.response).to_lowercase();

		if boost.keywords.iter().any(|keyword| combined.contains(keyword.as_str())) {
			boost.multiplier
		} else {
			1.0
		}
	}

	fn explain(&self, signals: &ScoreSignals) -> String {
		let weights = &self.cfg.weights;
		let mut contributions = vec![
			("prompt", signals.prompt * weights.prompt),
			("response", signals.response * weights.response),
			("model", signals.model * weights.model),
			("tools", signals.tool * weights.tool),
			("recency", signals.temporal * weights.temporal),
		];

		contributions.retain(|(_, value)| *value > 0.0);
		contributions.sort_by(|a, b| b.1.total_cmp(&a.1));

		let parts: Vec<String> = contributions
			.iter()
			.take(self.cfg.explanation.top_signals.max(1))
			.map(|(name, value)| format!("{name} {value:.2}"))
			.collect();
		let mut explanation =
			if parts.is_empty() { "no matching signals".to_string() } else { parts.join(", ") };

		if signals.intent_multiplier > 1.0 {
			explanation.push_str(&format!("; intent boost x{:.2}", signals.intent_multiplier));
		}

		text::truncate_chars(&explanation, self.cfg.explanation.max_chars)
	}
}

fn term_frequency(term: &str, words: &[String], lowered: &str) -> usize {
	if term.contains(char::is_whitespace) {
		return lowered.matches(term).count();
	}

	words.iter().filter(|word| word.as_str() == term).count()
}

fn tool_relevance(tools: &[String], terms: &[String]) -> f32 {
	if tools.is_empty() || terms.is_empty() {
		return 0.0;
	}

	let tools: Vec<String> = tools.iter().map(|tool| tool.to_lowercase()).collect();
	let matched =
		terms.iter().filter(|term| tools.iter().any(|tool| tool.contains(term.as_str()))).count();

	(matched as f32 / terms.len() as f32).clamp(0.0, 1.0)
}

fn min_distance(left: &[usize], right: &[usize]) -> Option<usize> {
	left.iter().flat_map(|a| right.iter().map(move |b| a.abs_diff(*b))).min()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn min_distance_picks_closest_pair() {
		assert_eq!(min_distance(&[1, 10], &[4, 12]), Some(2));
		assert_eq!(min_distance(&[], &[4]), None);
	}

	#[test]
	fn tool_relevance_is_fraction_of_terms() {
		let tools = vec!["WebSearch".to_string(), "bash".to_string()];
		let terms = vec!["websearch".to_string(), "python".to_string()];

		assert_eq!(tool_relevance(&tools, &terms), 0.5);
	}

	#[test]
	fn phrase_terms_count_substring_occurrences() {
		let words = text::words("borrow checker and the borrow checker");

		assert_eq!(
			term_frequency("borrow checker", &words, "borrow checker and the borrow checker"),
			2
		);
	}
}
