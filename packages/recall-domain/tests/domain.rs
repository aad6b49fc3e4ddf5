use std::collections::{BTreeSet, HashMap};

use time::{Duration, OffsetDateTime, macros::datetime};

use recall_config::{Config, Related};
use recall_domain::{
	highlight::{Highlighter, TermPatterns},
	query::{QueryIntent, QueryParser},
	scoring::{RelevanceScorer, TurnFields},
	similarity::{self, ConversationProfile},
};

const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

fn parser() -> QueryParser {
	QueryParser::new(&Config::default().query).expect("Default parser must build.")
}

fn scorer() -> RelevanceScorer {
	RelevanceScorer::new(&Config::default().scoring).expect("Default scorer must build.")
}

fn no_context() -> HashMap<String, String> {
	HashMap::new()
}

fn turn<'a>(
	prompt: &'a str,
	response: &'a str,
	model: &'a str,
	tools: &'a [String],
) -> TurnFields<'a> {
	TurnFields { prompt, response, model, tools, timestamp: NOW - Duration::days(1) }
}

fn set(values: &[&str]) -> BTreeSet<String> {
	values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn parsing_is_pure() {
	let parser = parser();
	let first = parser.parse("How do I fix the \"borrow checker\" error in tokio?", &no_context());
	let second = parser.parse("How do I fix the \"borrow checker\" error in tokio?", &no_context());

	assert_eq!(first, second);
}

#[test]
fn how_to_query_is_rewritten() {
	let parsed = parser().parse("how to create a list", &no_context());

	assert_eq!(parsed.intent, QueryIntent::HowTo);
	assert_eq!(parsed.processed, "create a list");
	assert_eq!(parsed.terms, vec!["create", "list"]);
}

#[test]
fn definition_prefix_is_stripped() {
	let parsed = parser().parse("What is a closure?", &no_context());

	assert_eq!(parsed.intent, QueryIntent::Definition);
	assert_eq!(parsed.processed, "closure");
}

#[test]
fn structural_rules_follow_priority_order() {
	let parsed = parser().parse("how to handle this error", &no_context());

	assert_eq!(parsed.intent, QueryIntent::HowTo);
}

#[test]
fn keyword_fallback_detects_troubleshooting() {
	let parsed = parser().parse("weird problem with cargo", &no_context());

	assert_eq!(parsed.intent, QueryIntent::Troubleshooting);
	assert!(parsed.intent_confidence < 0.85);
}

#[test]
fn context_hint_applies_when_no_rule_matches() {
	let context = HashMap::from([("intent".to_string(), "example".to_string())]);
	let parsed = parser().parse("tokio select", &context);

	assert_eq!(parsed.intent, QueryIntent::Example);
}

#[test]
fn unmatched_query_is_general() {
	let parsed = parser().parse("tokio select macro", &no_context());

	assert_eq!(parsed.intent, QueryIntent::General);
	assert_eq!(parsed.processed, "tokio select macro");
}

#[test]
fn empty_query_parses_to_general_with_no_terms() {
	let parsed = parser().parse("   ", &no_context());

	assert_eq!(parsed.intent, QueryIntent::General);
	assert!(parsed.terms.is_empty());
	assert_eq!(parsed.complexity, 0.0);
}

#[test]
fn quoted_phrases_become_terms() {
	let parsed = parser().parse("tokio \"select macro\"", &no_context());

	assert_eq!(parsed.terms, vec!["tokio", "select", "macro", "select macro"]);
	assert!(parsed.complexity > 0.4);
}

#[test]
fn complexity_is_capped() {
	let query = format!("\"{}\" AND foo* OR bar", "word ".repeat(120));
	let parsed = parser().parse(&query, &no_context());

	assert!(parsed.complexity <= 1.0);
	assert!(parsed.complexity > 0.9);
}

#[test]
fn scores_stay_in_unit_range() {
	let parser = parser();
	let scorer = scorer();
	let tools = vec!["python".to_string(), "bash".to_string()];
	let long_text = "python python python ".repeat(400);

	for query in ["python", "how to run python", "", "\"python python\" python error"] {
		let parsed = parser.parse(query, &no_context());

		for fields in [
			turn("python", "python", "python-gpt", &tools),
			turn(&long_text, &long_text, "", &tools),
			turn("", "", "", &[]),
		] {
			let score = scorer.score(&fields, &parsed, NOW);

			assert!((0.0..=1.0).contains(&score.score), "{query}: {}", score.score);
			assert!(score.explanation.chars().count() <= 200);
		}
	}
}

#[test]
fn python_mention_outranks_unrelated_turn() {
	let parsed = parser().parse("Python", &no_context());
	let scorer = scorer();
	let mention = scorer.score(
		&turn("Which language?", "Python is a good fit for scripting.", "gpt-4", &[]),
		&parsed,
		NOW,
	);
	let unrelated = scorer.score(
		&turn("Which language?", "Go is a good fit for services.", "gpt-4", &[]),
		&parsed,
		NOW,
	);

	assert!(mention.score > unrelated.score);
}

#[test]
fn exact_substring_never_scores_below_no_overlap() {
	let parsed = parser().parse("async runtime shutdown", &no_context());
	let scorer = scorer();
	let exact = scorer.score(
		&turn("question", "The async runtime shutdown waits for tasks.", "model", &[]),
		&parsed,
		NOW,
	);
	let none =
		scorer.score(&turn("question", "Nothing relevant here.", "model", &[]), &parsed, NOW);

	assert!(exact.score >= none.score);
}

#[test]
fn substring_dominance_does_not_survive_length_and_age() {
	let parsed = parser().parse("async runtime shutdown", &no_context());
	let scorer = scorer();
	let response = format!("The async runtime shutdown waits for tasks. {}", "x".repeat(20_000));
	let buried = scorer.score(
		&TurnFields {
			prompt: "question",
			response: &response,
			model: "model",
			tools: &[],
			timestamp: NOW - Duration::days(400),
		},
		&parsed,
		NOW,
	);
	let fresh =
		scorer.score(&turn("question", "Nothing relevant here.", "model", &[]), &parsed, NOW);

	assert_eq!(buried.signals.temporal, 0.0);
	assert!(fresh.signals.temporal > 0.99);
	assert!(buried.score < fresh.score);
}

#[test]
fn placeholder_idf_uses_constant_document_frequency() {
	let parsed = parser().parse("tokio", &no_context());
	let relevance = scorer().text_relevance("tokio is great", &parsed);
	let expected = 0.8 + (1.0_f32 / 3.0 * (1000.0_f32 / 100.0).ln() * 0.1).min(0.3);

	assert!((relevance - expected).abs() < 1e-5);
}

#[test]
fn long_text_is_length_normalized() {
	let parsed = parser().parse("tokio", &no_context());
	let scorer = scorer();
	let short = scorer.text_relevance("tokio runtime", &parsed);
	let long = scorer.text_relevance(&format!("tokio runtime {}", "x".repeat(4_000)), &parsed);

	assert!(long < short);
}

#[test]
fn proximity_bonus_rewards_nearby_terms() {
	let parsed = parser().parse("tokio runtime", &no_context());
	let scorer = scorer();
	let near = scorer.text_relevance("tokio runtime builder with many other words here", &parsed);
	let far = scorer.text_relevance("tokio builder with many other words here runtime", &parsed);

	assert!(near > far);
}

#[test]
fn model_relevance_prefers_direct_match_over_family() {
	let scorer = scorer();

	assert_eq!(scorer.model_relevance("gpt-4o", &["gpt".to_string()]), 0.8);
	assert_eq!(scorer.model_relevance("claude-3-opus", &["anthropic".to_string()]), 0.6);
	assert_eq!(scorer.model_relevance("claude-3-opus", &["llama".to_string()]), 0.0);
}

#[test]
fn temporal_relevance_decays_over_a_year() {
	let scorer = scorer();

	assert_eq!(scorer.temporal_relevance(NOW, NOW), 1.0);
	assert!((scorer.temporal_relevance(NOW - Duration::days(73), NOW) - 0.8).abs() < 1e-3);
	assert_eq!(scorer.temporal_relevance(NOW - Duration::days(400), NOW), 0.0);
}

#[test]
fn troubleshooting_intent_boosts_fix_answers() {
	let parsed = parser().parse("cargo build error", &no_context());
	let scorer = scorer();
	let tools: Vec<String> = Vec::new();
	let fixed = scorer.score(
		&turn("my build broke", "The fix is to update the lockfile.", "", &tools),
		&parsed,
		NOW,
	);
	let plain = scorer.score(
		&turn("my build broke", "Try updating the lockfile.", "", &tools),
		&parsed,
		NOW,
	);

	assert!((fixed.signals.intent_multiplier - 1.2).abs() < 1e-6);
	assert_eq!(plain.signals.intent_multiplier, 1.0);
	assert!(fixed.explanation.contains("intent boost"));
}

#[test]
fn highlight_count_matches_case_insensitive_occurrences() {
	let highlighter = Highlighter::new(50, "<mark>", "</mark>");
	let text = "Tokio spawns tasks. tokio::spawn returns a JoinHandle. TOKIO!";
	let patterns = TermPatterns::compile(&["tokio".to_string()]);
	let highlights = highlighter.highlight("response", text, &patterns);

	assert_eq!(highlights.len(), text.to_lowercase().matches("tokio").count());
	assert!(highlights.iter().all(|highlight| highlight.field == "response"));
	assert!(highlights[0].highlighted.contains("<mark>Tokio</mark>"));
}

#[test]
fn related_candidate_with_shared_tool_and_model_is_similar() {
	let cfg = Related::default();
	let target = ConversationProfile {
		tools: set(&["bash"]),
		models: set(&["gpt-4"]),
		last_activity: NOW,
		keywords: set(&["deploy", "kubernetes"]),
	};
	let close = ConversationProfile {
		tools: set(&["bash"]),
		models: set(&["gpt-4"]),
		last_activity: NOW - Duration::hours(20),
		keywords: set(&["recipes"]),
	};
	let distant = ConversationProfile {
		tools: set(&["browser"]),
		models: set(&["claude"]),
		last_activity: NOW - Duration::days(61),
		keywords: set(&["poetry"]),
	};

	assert!(similarity::conversation_similarity(&target, &close, &cfg).score >= 0.6);
	assert!(similarity::conversation_similarity(&target, &distant, &cfg).score < 0.3);
}
