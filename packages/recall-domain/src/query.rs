use std::{
	collections::{HashMap, HashSet},
	fmt,
};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, text};
use recall_config::{Query, QueryComplexity};

const FALLBACK_CONFIDENCE: f32 = 0.6;
const HINT_CONFIDENCE: f32 = 0.7;
const GENERAL_CONFIDENCE: f32 = 0.5;
const INTENT_HINT_KEY: &str = "intent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
	HowTo,
	Troubleshooting,
	Definition,
	Comparison,
	Example,
	General,
}
impl QueryIntent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::HowTo => "how_to",
			Self::Troubleshooting => "troubleshooting",
			Self::Definition => "definition",
			Self::Comparison => "comparison",
			Self::Example => "example",
			Self::General => "general",
		}
	}

	pub fn from_label(label: &str) -> Result<Self> {
		match label.trim().to_ascii_lowercase().as_str() {
			"how_to" => Ok(Self::HowTo),
			"troubleshooting" => Ok(Self::Troubleshooting),
			"definition" => Ok(Self::Definition),
			"comparison" => Ok(Self::Comparison),
			"example" => Ok(Self::Example),
			"general" => Ok(Self::General),
			_ => Err(Error::UnknownIntent { label: label.to_string() }),
		}
	}
}
impl fmt::Display for QueryIntent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::HowTo => "How-To",
			Self::Troubleshooting => "Troubleshooting",
			Self::Definition => "Definition",
			Self::Comparison => "Comparison",
			Self::Example => "Example",
			Self::General => "General",
		};

		f.write_str(label)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
	pub original: String,
	/// The intent-rewritten query used for exact matching and archive text filtering.
	pub processed: String,
	pub terms: Vec<String>,
	pub intent: QueryIntent,
	pub intent_confidence: f32,
	pub interpretation: String,
	pub complexity: f32,
}

#[derive(Debug)]
struct IntentRule {
	pattern: Regex,
	intent: QueryIntent,
	confidence: f32,
}

#[derive(Debug)]
struct Rewriters {
	how_to_prefix: Regex,
	definition_prefix: Regex,
	comparison: Vec<Regex>,
	example: Vec<Regex>,
	quoted: Regex,
	boolean_operator: Regex,
	inner_wildcard: Regex,
}
impl Rewriters {
	fn new() -> Result<Self> {
		Ok(Self {
			how_to_prefix: build_regex(
				r"^\s*how\s+(to|(do|can|should|would)\s+(i|you|we|one)|does\s+one)\s+",
			)?,
			definition_prefix: build_regex(
				r"^\s*(what\s+(is|are)(\s+(a|an|the))?|define|meaning\s+of)\s+",
			)?,
			comparison: vec![
				build_regex(r"difference\s+between\s+(.+?)\s+and\s+(.+)")?,
				build_regex(r"compare\s+(.+?)\s+(?:and|with|to|vs\.?|versus)\s+(.+)")?,
				build_regex(r"(.+?)\s+(?:vs\.?|versus)\s+(.+)")?,
			],
			example: vec![
				build_regex(r"examples?\s+(?:of|for)\s+(.+)")?,
				build_regex(r"^\s*show\s+me\s+(?:an?\s+|some\s+)?(.+)")?,
				build_regex(r"(.+?)\s+(?:examples?|samples?)\s*$")?,
			],
			quoted: build_regex(r#""([^"]+)""#)?,
			boolean_operator: Regex::new(r"\b(AND|OR|NOT)\b|&&|\|\|").map_err(|err| {
				Error::InvalidPattern { pattern: "boolean operator".to_string(), source: err }
			})?,
			inner_wildcard: build_regex(r"\w\?\w")?,
		})
	}
}

/// Turns free text into a [`ParsedQuery`]. Parsing is a pure function of the query text, the
/// caller context and the rule table the parser was built from.
#[derive(Debug)]
pub struct QueryParser {
	rules: Vec<IntentRule>,
	stopwords: HashSet<String>,
	min_term_chars: usize,
	complexity: QueryComplexity,
	rewriters: Rewriters,
}
impl QueryParser {
	pub fn new(cfg: &Query) -> Result<Self> {
		let mut rules = Vec::with_capacity(cfg.intent_rules.len());

		for rule in &cfg.intent_rules {
			rules.push(IntentRule {
				pattern: build_regex(&rule.pattern)?,
				intent: QueryIntent::from_label(&rule.intent)?,
				confidence: rule.confidence,
			});
		}

		Ok(Self {
			rules,
			stopwords: cfg.stopwords.iter().map(|word| word.to_lowercase()).collect(),
			min_term_chars: cfg.min_term_chars,
			complexity: cfg.complexity.clone(),
			rewriters: Rewriters::new()?,
		})
	}

	pub fn stopwords(&self) -> &HashSet<String> {
		&self.stopwords
	}

	pub fn min_term_chars(&self) -> usize {
		self.min_term_chars
	}

	pub fn parse(&self, query: &str, context: &HashMap<String, String>) -> ParsedQuery {
		let trimmed = query.trim();

		if trimmed.is_empty() {
			return ParsedQuery {
				original: query.to_string(),
				processed: String::new(),
				terms: Vec::new(),
				intent: QueryIntent::General,
				intent_confidence: 0.0,
				interpretation: "Empty query".to_string(),
				complexity: 0.0,
			};
		}

		let (intent, intent_confidence) = self.detect_intent(trimmed, context);
		let terms = self.extract_terms(trimmed);
		let processed = self.rewrite(trimmed, intent);
		let complexity = self.complexity(trimmed, terms.len());
		let interpretation = interpret(intent, &processed, &terms);

		ParsedQuery {
			original: query.to_string(),
			processed,
			terms,
			intent,
			intent_confidence,
			interpretation,
			complexity,
		}
	}

	pub fn detect_intent(
		&self,
		query: &str,
		context: &HashMap<String, String>,
	) -> (QueryIntent, f32) {
		for rule in &self.rules {
			if rule.pattern.is_match(query) {
				return (rule.intent, rule.confidence);
			}
		}

		if let Some(hint) = context.get(INTENT_HINT_KEY)
			&& let Ok(intent) = QueryIntent::from_label(hint)
		{
			return (intent, HINT_CONFIDENCE);
		}

		let tokens = text::token_set(query);
		let has = |word: &str| tokens.contains(word);

		if has("error") || has("problem") || has("issue") {
			return (QueryIntent::Troubleshooting, FALLBACK_CONFIDENCE);
		}
		if has("how") && (has("to") || has("do")) {
			return (QueryIntent::HowTo, FALLBACK_CONFIDENCE);
		}
		if has("what") && has("is") {
			return (QueryIntent::Definition, FALLBACK_CONFIDENCE);
		}

		(QueryIntent::General, GENERAL_CONFIDENCE)
	}

	pub fn extract_terms(&self, query: &str) -> Vec<String> {
		let mut terms = text::extract_terms(query, &self.stopwords, self.min_term_chars);

		for capture in self.rewriters.quoted.captures_iter(query) {
			let phrase = capture[1].trim().to_lowercase();

			if !phrase.is_empty() && !terms.contains(&phrase) {
				terms.push(phrase);
			}
		}

		terms
	}

	pub fn rewrite(&self, query: &str, intent: QueryIntent) -> String {
		let rewritten = match intent {
			QueryIntent::HowTo => self.rewriters.how_to_prefix.replace(query, "").into_owned(),
			QueryIntent::Definition =>
				self.rewriters.definition_prefix.replace(query, "").into_owned(),
			QueryIntent::Comparison => first_capture(&self.rewriters.comparison, query)
				.unwrap_or_else(|| query.to_string()),
			QueryIntent::Example => first_capture(&self.rewriters.example, query)
				.unwrap_or_else(|| query.to_string()),
			QueryIntent::Troubleshooting | QueryIntent::General => query.to_string(),
		};
		let cleaned = trim_query_punctuation(&rewritten);

		if cleaned.is_empty() { trim_query_punctuation(query) } else { cleaned }
	}

	pub fn complexity(&self, query: &str, term_count: usize) -> f32 {
		let cfg = &self.complexity;
		let mut score = (term_count as f32 * cfg.per_term).min(cfg.term_cap);

		if query.contains('"') {
			score += cfg.quotes;
		}
		if self.rewriters.boolean_operator.is_match(query) {
			score += cfg.boolean_operators;
		}
		if query.contains('*') || self.rewriters.inner_wildcard.is_match(query) {
			score += cfg.wildcards;
		}

		score += (query.chars().count() as f32 / cfg.chars_per_point).min(cfg.length_cap);

		score.clamp(0.0, 1.0)
	}
}

fn build_regex(pattern: &str) -> Result<Regex> {
	RegexBuilder::new(pattern)
		.case_insensitive(true)
		.build()
		.map_err(|err| Error::InvalidPattern { pattern: pattern.to_string(), source: err })
}

fn first_capture(patterns: &[Regex], query: &str) -> Option<String> {
	for pattern in patterns {
		let Some(captures) = pattern.captures(query) else { continue };
		let parts: Vec<&str> = captures
			.iter()
			.skip(1)
			.flatten()
			.map(|part| trim_subject(part.as_str()))
			.filter(|part| !part.is_empty())
			.collect();

		if !parts.is_empty() {
			return Some(parts.join(" "));
		}
	}

	None
}

fn trim_subject(part: &str) -> &str {
	part.trim().trim_matches(|ch: char| matches!(ch, '?' | '!' | '.' | ',' | ';' | ':')).trim()
}

fn trim_query_punctuation(query: &str) -> String {
	query.trim().trim_end_matches(['?', '!', '.']).trim().to_string()
}

fn interpret(intent: QueryIntent, processed: &str, terms: &[String]) -> String {
	let subject = match intent {
		QueryIntent::HowTo => format!("How-To question about \"{processed}\""),
		QueryIntent::Troubleshooting => format!("Troubleshooting \"{processed}\""),
		QueryIntent::Definition => format!("Definition of \"{processed}\""),
		QueryIntent::Comparison => format!("Comparison of \"{processed}\""),
		QueryIntent::Example => format!("Examples of \"{processed}\""),
		QueryIntent::General => format!("Searching for \"{processed}\""),
	};

	if terms.is_empty() {
		return subject;
	}

	format!("{subject}; key terms: {}", terms.join(", "))
}
