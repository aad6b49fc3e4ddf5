use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use recall_config::Suggestions;
use recall_domain::text;

use crate::RecallService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
	Expansion,
	Correction,
	RelatedTopic,
	RecentSearch,
	TopicInterest,
	Tool,
	Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
	pub text: String,
	pub kind: SuggestionKind,
	pub confidence: f32,
}

impl RecallService {
	/// Expansion, typo-correction and related-topic suggestions for `query`, best first.
	pub fn suggestions(&self, query: &str) -> Vec<Suggestion> {
		let generated = generate(&self.cfg.suggestions, query);

		rank(generated, query, self.cfg.search.max_suggestions)
	}

	/// Generic suggestions merged with the user's personalized ones, capped for inline display.
	pub(crate) fn inline_suggestions(&self, query: &str, user_id: Option<&str>) -> Vec<Suggestion> {
		let mut merged = generate(&self.cfg.suggestions, query);

		if let Some(user_id) = user_id.filter(|user_id| !user_id.trim().is_empty()) {
			merged.extend(self.contexts.personalized_suggestions(user_id, query));
		}

		rank(merged, query, self.cfg.search.max_inline_suggestions)
	}
}

fn generate(cfg: &Suggestions, query: &str) -> Vec<Suggestion> {
	let query = query.trim();

	if query.is_empty() {
		return Vec::new();
	}

	let mut out = expansions(cfg, query);

	out.extend(correction(cfg, query));
	out.extend(related_topics(cfg, query));

	out
}

fn expansions(cfg: &Suggestions, query: &str) -> Vec<Suggestion> {
	if query.split_whitespace().count() != 1 {
		return Vec::new();
	}

	cfg.expansion_templates
		.iter()
		.map(|template| Suggestion {
			text: template.template.replace("{query}", query),
			kind: SuggestionKind::Expansion,
			confidence: template.confidence,
		})
		.collect()
}

fn correction(cfg: &Suggestions, query: &str) -> Option<Suggestion> {
	let mut changed = false;
	let corrected: Vec<String> = query
		.split_whitespace()
		.map(|word| match cfg.misspellings.get(&word.to_lowercase()) {
			Some(fixed) => {
				changed = true;

				fixed.clone()
			},
			None => word.to_string(),
		})
		.collect();

	changed.then(|| Suggestion {
		text: corrected.join(" "),
		kind: SuggestionKind::Correction,
		confidence: cfg.correction_confidence,
	})
}

fn related_topics(cfg: &Suggestions, query: &str) -> Vec<Suggestion> {
	let words = text::token_set(query);
	let mut out = Vec::new();

	for (topic, associations) in &cfg.topic_associations {
		if !words.contains(topic) {
			continue;
		}

		for (rank, association) in
			associations.iter().filter(|term| !words.contains(*term)).enumerate()
		{
			out.push(Suggestion {
				text: format!("{topic} {association}"),
				kind: SuggestionKind::RelatedTopic,
				confidence: (cfg.topic_confidence - rank as f32 * cfg.topic_confidence_step)
					.clamp(0.0, 1.0),
			});
		}
	}

	out
}

/// Dedupes case-insensitively (dropping echoes of the query), then keeps the `limit` most
/// confident. Ties keep generation order.
pub(crate) fn rank(mut suggestions: Vec<Suggestion>, query: &str, limit: usize) -> Vec<Suggestion> {
	let echo = query.trim().to_lowercase();
	let mut seen = HashSet::new();

	suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
	suggestions.retain(|suggestion| {
		let key = suggestion.text.trim().to_lowercase();

		!key.is_empty() && key != echo && seen.insert(key)
	});
	suggestions.truncate(limit);

	suggestions
}

#[cfg(test)]
mod tests {
	use recall_config::Config;

	use super::*;

	fn cfg() -> Suggestions {
		Config::default().suggestions
	}

	#[test]
	fn single_word_gets_expansions() {
		let out = expansions(&cfg(), "serde");

		assert_eq!(out.len(), 4);
		assert_eq!(out[0].text, "serde tutorial");
	}

	#[test]
	fn multi_word_gets_no_expansions() {
		assert!(expansions(&cfg(), "serde derive").is_empty());
	}

	#[test]
	fn misspelled_words_are_corrected() {
		let mut cfg = cfg();

		cfg.misspellings.insert("pyhton".to_string(), "python".to_string());

		let fixed = correction(&cfg, "Pyhton lists").expect("Correction must be produced.");

		assert_eq!(fixed.text, "python lists");
		assert_eq!(fixed.kind, SuggestionKind::Correction);
	}

	#[test]
	fn rank_dedupes_and_caps() {
		let suggestions = vec![
			Suggestion { text: "a".to_string(), kind: SuggestionKind::Expansion, confidence: 0.2 },
			Suggestion { text: "A".to_string(), kind: SuggestionKind::Tool, confidence: 0.9 },
			Suggestion { text: "q".to_string(), kind: SuggestionKind::Tool, confidence: 1.0 },
			Suggestion { text: "b".to_string(), kind: SuggestionKind::Model, confidence: 0.5 },
		];
		let ranked = rank(suggestions, "Q", 1);

		assert_eq!(ranked.len(), 1);
		assert_eq!(ranked[0].text, "A");
	}
}
