use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub query: Query,
	pub scoring: Scoring,
	pub suggestions: Suggestions,
	pub context: Context,
	pub related: Related,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Minimum number of candidates fetched from the archive before re-ranking.
	pub candidate_floor: u32,
	/// Characters of context kept on each side of a highlighted match.
	pub highlight_window: usize,
	pub highlight_open: String,
	pub highlight_close: String,
	/// Cap for suggestions attached to a search response.
	pub max_inline_suggestions: usize,
	/// Cap for the standalone suggestions operation.
	pub max_suggestions: usize,
	/// Pseudo-score decrement per rank on the unscored fallback path.
	pub fallback_score_step: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			candidate_floor: 100,
			highlight_window: 50,
			highlight_open: "<mark>".to_string(),
			highlight_close: "</mark>".to_string(),
			max_inline_suggestions: 5,
			max_suggestions: 10,
			fallback_score_step: 0.01,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Query {
	/// Tested in order; the first matching rule decides the intent.
	pub intent_rules: Vec<IntentRule>,
	pub stopwords: Vec<String>,
	pub min_term_chars: usize,
	pub complexity: QueryComplexity,
}
impl Default for Query {
	fn default() -> Self {
		Self {
			intent_rules: default_intent_rules(),
			stopwords: default_stopwords(),
			min_term_chars: 3,
			complexity: QueryComplexity::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentRule {
	pub pattern: String,
	/// One of how_to, troubleshooting, definition, comparison, example.
	pub intent: String,
	pub confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryComplexity {
	pub per_term: f32,
	pub term_cap: f32,
	pub quotes: f32,
	pub boolean_operators: f32,
	pub wildcards: f32,
	pub chars_per_point: f32,
	pub length_cap: f32,
}
impl Default for QueryComplexity {
	fn default() -> Self {
		Self {
			per_term: 0.1,
			term_cap: 0.5,
			quotes: 0.2,
			boolean_operators: 0.2,
			wildcards: 0.1,
			chars_per_point: 200.0,
			length_cap: 0.3,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub weights: ScoringWeights,
	pub text: TextRelevance,
	pub model: ModelRelevance,
	pub temporal: TemporalRelevance,
	pub intent_boosts: IntentBoosts,
	pub explanation: Explanation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
	pub prompt: f32,
	pub response: f32,
	pub model: f32,
	pub tool: f32,
	pub temporal: f32,
}
impl Default for ScoringWeights {
	fn default() -> Self {
		Self { prompt: 0.40, response: 0.30, model: 0.10, tool: 0.15, temporal: 0.05 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextRelevance {
	pub exact_match: f32,
	pub term_weight: f32,
	pub term_cap: f32,
	/// Nominal corpus size used by the placeholder IDF.
	pub idf_corpus_size: f32,
	/// Document frequency assumed for any term missing from `document_frequencies`.
	pub default_document_frequency: f32,
	pub document_frequencies: BTreeMap<String, f32>,
	pub proximity_window: usize,
	pub proximity_step: f32,
	pub proximity_cap: f32,
	pub length_norm_chars: f32,
	pub length_norm_floor: f32,
}
impl Default for TextRelevance {
	fn default() -> Self {
		Self {
			exact_match: 0.8,
			term_weight: 0.1,
			term_cap: 0.3,
			idf_corpus_size: 1_000.0,
			default_document_frequency: 100.0,
			document_frequencies: BTreeMap::new(),
			proximity_window: 5,
			proximity_step: 0.1,
			proximity_cap: 0.2,
			length_norm_chars: 1_000.0,
			length_norm_floor: 100.0,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelRelevance {
	pub exact: f32,
	pub family: f32,
	/// Family name to aliases. A term naming a family or alias matches models carrying any of them.
	pub families: BTreeMap<String, Vec<String>>,
}
impl Default for ModelRelevance {
	fn default() -> Self {
		Self { exact: 0.8, family: 0.6, families: default_model_families() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemporalRelevance {
	pub horizon_days: f32,
}
impl Default for TemporalRelevance {
	fn default() -> Self {
		Self { horizon_days: 365.0 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntentBoosts {
	pub rules: Vec<IntentBoost>,
}
impl Default for IntentBoosts {
	fn default() -> Self {
		Self { rules: default_intent_boosts() }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentBoost {
	pub intent: String,
	pub multiplier: f32,
	pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Explanation {
	pub max_chars: usize,
	pub top_signals: usize,
}
impl Default for Explanation {
	fn default() -> Self {
		Self { max_chars: 200, top_signals: 3 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Suggestions {
	pub misspellings: BTreeMap<String, String>,
	pub topic_associations: BTreeMap<String, Vec<String>>,
	/// Applied to single-word queries; `{query}` is replaced with the word.
	pub expansion_templates: Vec<ExpansionTemplate>,
	pub correction_confidence: f32,
	pub topic_confidence: f32,
	pub topic_confidence_step: f32,
}
impl Default for Suggestions {
	fn default() -> Self {
		Self {
			misspellings: default_misspellings(),
			topic_associations: default_topic_associations(),
			expansion_templates: default_expansion_templates(),
			correction_confidence: 0.9,
			topic_confidence: 0.7,
			topic_confidence_step: 0.05,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionTemplate {
	pub template: String,
	pub confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Context {
	pub max_patterns: usize,
	pub retention_days: i64,
	pub topic_learning_rate: f32,
	pub trending_floor: f32,
	pub trending_window_days: f32,
	pub model_learning_rate: f32,
	pub max_related_terms: usize,
	pub successful_search_threshold: f32,
	pub query_overlap_threshold: f32,
	pub max_personalized_suggestions: usize,
	pub analysis_window_days: i64,
	pub analysis_top_n: usize,
}
impl Default for Context {
	fn default() -> Self {
		Self {
			max_patterns: 1_000,
			retention_days: 30,
			topic_learning_rate: 0.1,
			trending_floor: 0.1,
			trending_window_days: 30.0,
			model_learning_rate: 0.1,
			max_related_terms: 10,
			successful_search_threshold: 0.7,
			query_overlap_threshold: 0.3,
			max_personalized_suggestions: 10,
			analysis_window_days: 30,
			analysis_top_n: 5,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Related {
	pub max_candidates: u32,
	pub max_results: usize,
	pub min_similarity: f32,
	pub tool_weight: f32,
	pub model_weight: f32,
	pub time_weight: f32,
	pub keyword_weight: f32,
	pub time_window_days: f32,
	pub max_keywords: usize,
}
impl Default for Related {
	fn default() -> Self {
		Self {
			max_candidates: 1_000,
			max_results: 10,
			min_similarity: 0.3,
			tool_weight: 0.4,
			model_weight: 0.2,
			time_weight: 0.1,
			keyword_weight: 0.3,
			time_window_days: 30.0,
			max_keywords: 20,
		}
	}
}

fn default_intent_rules() -> Vec<IntentRule> {
	[
		(r"^\s*how\s+(to|do|does|can|should|would)\b", "how_to", 0.9),
		(
			r"\b(error|exception|fail(s|ed|ing|ure)?|crash(es|ed|ing)?|bug|broken|not working|doesn't work|won't)\b",
			"troubleshooting",
			0.85,
		),
		(r"^\s*(what\s+(is|are)|define|meaning\s+of)\b", "definition", 0.9),
		(r"\b(vs\.?|versus|compare|comparison|difference\s+between)\b", "comparison", 0.85),
		(r"\b(example|examples|sample|show\s+me)\b", "example", 0.8),
	]
	.into_iter()
	.map(|(pattern, intent, confidence)| IntentRule {
		pattern: pattern.to_string(),
		intent: intent.to_string(),
		confidence,
	})
	.collect()
}

fn default_stopwords() -> Vec<String> {
	[
		"the", "and", "but", "for", "with", "are", "was", "were", "been", "have", "has", "had",
		"does", "did", "will", "would", "could", "should", "may", "might", "can", "this", "that",
		"these", "those", "you", "she", "they", "what", "how", "when", "where", "why", "who", "from",
		"into", "about", "not", "its", "our", "your", "their", "them", "then", "than", "there",
	]
	.into_iter()
	.map(str::to_string)
	.collect()
}

fn default_model_families() -> BTreeMap<String, Vec<String>> {
	[
		("gpt", &["gpt", "openai", "chatgpt", "o1", "o3"][..]),
		("claude", &["claude", "anthropic", "sonnet", "opus", "haiku"][..]),
		("gemini", &["gemini", "bard", "google"][..]),
		("llama", &["llama", "meta"][..]),
		("mistral", &["mistral", "mixtral"][..]),
	]
	.into_iter()
	.map(|(family, aliases)| {
		(family.to_string(), aliases.iter().map(|alias| alias.to_string()).collect())
	})
	.collect()
}

fn default_intent_boosts() -> Vec<IntentBoost> {
	[
		(
			"troubleshooting",
			1.20,
			&["error", "fix", "fixed", "solution", "resolved", "exception", "issue"][..],
		),
		("how_to", 1.15, &["step", "first", "then", "next", "finally"][..]),
		("definition", 1.10, &["is defined as", "means", "refers to", "definition"][..]),
		("example", 1.15, &["example", "for instance", "e.g.", "```"][..]),
	]
	.into_iter()
	.map(|(intent, multiplier, keywords)| IntentBoost {
		intent: intent.to_string(),
		multiplier,
		keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
	})
	.collect()
}

fn default_misspellings() -> BTreeMap<String, String> {
	[
		("pyhton", "python"),
		("pythn", "python"),
		("javscript", "javascript"),
		("javascirpt", "javascript"),
		("fucntion", "function"),
		("funtion", "function"),
		("databse", "database"),
		("recieve", "receive"),
		("seperate", "separate"),
		("occured", "occurred"),
		("lenght", "length"),
		("reponse", "response"),
	]
	.into_iter()
	.map(|(wrong, right)| (wrong.to_string(), right.to_string()))
	.collect()
}

fn default_topic_associations() -> BTreeMap<String, Vec<String>> {
	[
		("python", &["django", "flask", "pandas", "numpy"][..]),
		("javascript", &["react", "node", "typescript", "vue"][..]),
		("rust", &["cargo", "tokio", "ownership", "lifetimes"][..]),
		("database", &["sql", "postgres", "index", "migration"][..]),
		("api", &["rest", "graphql", "endpoint", "authentication"][..]),
		("docker", &["container", "kubernetes", "compose", "image"][..]),
	]
	.into_iter()
	.map(|(topic, related)| {
		(topic.to_string(), related.iter().map(|term| term.to_string()).collect())
	})
	.collect()
}

fn default_expansion_templates() -> Vec<ExpansionTemplate> {
	[
		("{query} tutorial", 0.6),
		("{query} example", 0.55),
		("{query} error", 0.5),
		("how to use {query}", 0.45),
	]
	.into_iter()
	.map(|(template, confidence)| ExpansionTemplate { template: template.to_string(), confidence })
	.collect()
}
