mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Context, Explanation, ExpansionTemplate, IntentBoost, IntentBoosts, IntentRule,
	ModelRelevance, Query, QueryComplexity, Related, Scoring, ScoringWeights, Search, Service,
	Suggestions, TemporalRelevance, TextRelevance,
};

use std::{fs, path::Path};

pub const INTENT_LABELS: [&str; 5] =
	["how_to", "troubleshooting", "definition", "comparison", "example"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.search.candidate_floor == 0 {
		return Err(Error::Validation {
			message: "search.candidate_floor must be greater than zero.".to_string(),
		});
	}
	if cfg.search.highlight_open.is_empty() || cfg.search.highlight_close.is_empty() {
		return Err(Error::Validation {
			message: "search.highlight_open and search.highlight_close must be non-empty."
				.to_string(),
		});
	}
	if cfg.search.max_suggestions == 0 {
		return Err(Error::Validation {
			message: "search.max_suggestions must be greater than zero.".to_string(),
		});
	}

	check_unit("search.fallback_score_step", cfg.search.fallback_score_step)?;

	for rule in &cfg.query.intent_rules {
		if rule.pattern.trim().is_empty() {
			return Err(Error::Validation {
				message: "query.intent_rules.pattern must be non-empty.".to_string(),
			});
		}
		if !INTENT_LABELS.contains(&rule.intent.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"query.intent_rules.intent must be one of {}; got {}.",
					INTENT_LABELS.join(", "),
					rule.intent
				),
			});
		}

		check_unit("query.intent_rules.confidence", rule.confidence)?;
	}

	if cfg.query.min_term_chars == 0 {
		return Err(Error::Validation {
			message: "query.min_term_chars must be greater than zero.".to_string(),
		});
	}
	if !(cfg.query.complexity.chars_per_point.is_finite()
		&& cfg.query.complexity.chars_per_point > 0.0)
	{
		return Err(Error::Validation {
			message: "query.complexity.chars_per_point must be a positive finite number."
				.to_string(),
		});
	}

	let weights = &cfg.scoring.weights;

	for (label, value) in [
		("scoring.weights.prompt", weights.prompt),
		("scoring.weights.response", weights.response),
		("scoring.weights.model", weights.model),
		("scoring.weights.tool", weights.tool),
		("scoring.weights.temporal", weights.temporal),
		("scoring.text.exact_match", cfg.scoring.text.exact_match),
		("scoring.text.term_cap", cfg.scoring.text.term_cap),
		("scoring.text.proximity_cap", cfg.scoring.text.proximity_cap),
		("scoring.model.exact", cfg.scoring.model.exact),
		("scoring.model.family", cfg.scoring.model.family),
	] {
		check_unit(label, value)?;
	}

	if cfg.scoring.text.idf_corpus_size <= 0.0 || !cfg.scoring.text.idf_corpus_size.is_finite() {
		return Err(Error::Validation {
			message: "scoring.text.idf_corpus_size must be a positive finite number.".to_string(),
		});
	}
	if cfg.scoring.text.default_document_frequency <= 0.0 {
		return Err(Error::Validation {
			message: "scoring.text.default_document_frequency must be greater than zero."
				.to_string(),
		});
	}
	if cfg.scoring.text.length_norm_floor <= 0.0 {
		return Err(Error::Validation {
			message: "scoring.text.length_norm_floor must be greater than zero.".to_string(),
		});
	}
	if cfg.scoring.temporal.horizon_days <= 0.0 {
		return Err(Error::Validation {
			message: "scoring.temporal.horizon_days must be greater than zero.".to_string(),
		});
	}

	for boost in &cfg.scoring.intent_boosts.rules {
		if !INTENT_LABELS.contains(&boost.intent.as_str()) {
			return Err(Error::Validation {
				message: format!("scoring.intent_boosts.intent {} is not a known intent.", boost.intent),
			});
		}
		if !boost.multiplier.is_finite() || boost.multiplier < 1.0 {
			return Err(Error::Validation {
				message: "scoring.intent_boosts.multiplier must be 1.0 or greater.".to_string(),
			});
		}
	}

	if cfg.scoring.explanation.max_chars == 0 {
		return Err(Error::Validation {
			message: "scoring.explanation.max_chars must be greater than zero.".to_string(),
		});
	}

	for template in &cfg.suggestions.expansion_templates {
		if !template.template.contains("{query}") {
			return Err(Error::Validation {
				message: "suggestions.expansion_templates.template must contain {query}."
					.to_string(),
			});
		}

		check_unit("suggestions.expansion_templates.confidence", template.confidence)?;
	}

	check_unit("suggestions.correction_confidence", cfg.suggestions.correction_confidence)?;
	check_unit("suggestions.topic_confidence", cfg.suggestions.topic_confidence)?;

	if cfg.context.max_patterns == 0 {
		return Err(Error::Validation {
			message: "context.max_patterns must be greater than zero.".to_string(),
		});
	}
	if cfg.context.retention_days <= 0 {
		return Err(Error::Validation {
			message: "context.retention_days must be greater than zero.".to_string(),
		});
	}
	if cfg.context.analysis_window_days <= 0 {
		return Err(Error::Validation {
			message: "context.analysis_window_days must be greater than zero.".to_string(),
		});
	}
	if cfg.context.trending_window_days <= 0.0 {
		return Err(Error::Validation {
			message: "context.trending_window_days must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("context.topic_learning_rate", cfg.context.topic_learning_rate),
		("context.trending_floor", cfg.context.trending_floor),
		("context.model_learning_rate", cfg.context.model_learning_rate),
		("context.successful_search_threshold", cfg.context.successful_search_threshold),
		("context.query_overlap_threshold", cfg.context.query_overlap_threshold),
		("related.min_similarity", cfg.related.min_similarity),
		("related.tool_weight", cfg.related.tool_weight),
		("related.model_weight", cfg.related.model_weight),
		("related.time_weight", cfg.related.time_weight),
		("related.keyword_weight", cfg.related.keyword_weight),
	] {
		check_unit(label, value)?;
	}

	if cfg.related.max_candidates == 0 || cfg.related.max_results == 0 {
		return Err(Error::Validation {
			message: "related.max_candidates and related.max_results must be greater than zero."
				.to_string(),
		});
	}
	if cfg.related.time_window_days <= 0.0 {
		return Err(Error::Validation {
			message: "related.time_window_days must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn check_unit(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	for word in &mut cfg.query.stopwords {
		*word = word.trim().to_lowercase();
	}

	cfg.query.stopwords.retain(|word| !word.is_empty());
	cfg.suggestions.misspellings = std::mem::take(&mut cfg.suggestions.misspellings)
		.into_iter()
		.map(|(wrong, right)| (wrong.trim().to_lowercase(), right.trim().to_string()))
		.collect();
	cfg.suggestions.topic_associations = std::mem::take(&mut cfg.suggestions.topic_associations)
		.into_iter()
		.map(|(topic, related)| (topic.trim().to_lowercase(), related))
		.collect();
}
