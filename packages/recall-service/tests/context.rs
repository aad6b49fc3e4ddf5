use std::{sync::Arc, thread};

use time::{Duration, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use recall_config::Config;
use recall_domain::query::{QueryIntent, QueryParser};
use recall_service::{
	ConversationContextManager, ConversationPattern, Error, SearchPattern, SuggestionKind,
};
use recall_storage::InteractionKind;
use recall_testkit::{EPOCH, ManualClock};

fn manager(clock: Arc<ManualClock>) -> ConversationContextManager {
	let cfg = Config::default();
	let parser = QueryParser::new(&cfg.query).expect("Default parser must build.");

	ConversationContextManager::new(cfg.context, Arc::new(parser), clock)
}

fn search(query: &str, timestamp: OffsetDateTime, success: f32) -> SearchPattern {
	SearchPattern {
		query: query.to_string(),
		intent: QueryIntent::General,
		timestamp,
		clicked_results: Vec::new(),
		success_score: success,
		duration_ms: 250,
		refinement: None,
	}
}

fn visit(model: &str, tools: &[&str], satisfaction: f32) -> ConversationPattern {
	ConversationPattern {
		conversation_id: "c1".to_string(),
		accessed_at: EPOCH,
		view_duration_ms: 3_000,
		topics: Vec::new(),
		tools: tools.iter().map(|tool| tool.to_string()).collect(),
		model: Some(model.to_string()),
		interaction: InteractionKind::View,
		satisfaction,
	}
}

#[test]
fn snapshot_creates_context_lazily() {
	let contexts = manager(Arc::new(ManualClock::default()));

	assert!(contexts.is_empty());

	let ctx = contexts.context_snapshot("u1");

	assert_eq!(contexts.len(), 1);
	assert_eq!(ctx.version, 0);
	assert_eq!(ctx.created_at, EPOCH);
}

#[test]
fn search_patterns_keep_the_most_recent_thousand() {
	let contexts = manager(Arc::new(ManualClock::default()));
	let start = EPOCH - Duration::days(2);

	for idx in 0..1_001 {
		contexts.update_search_pattern(
			"u1",
			search(&format!("query {idx}"), start + Duration::seconds(idx), 0.5),
		);
	}

	let ctx = contexts.context_snapshot("u1");

	assert_eq!(ctx.search_patterns.len(), 1_000);
	assert_eq!(ctx.search_patterns[0].query, "query 1");
	assert_eq!(ctx.search_patterns[999].query, "query 1000");
	assert_eq!(ctx.version, 1_001);
}

#[test]
fn topic_interest_accumulates_and_trends() {
	let clock = Arc::new(ManualClock::default());
	let contexts = manager(clock.clone());

	contexts.update_search_pattern("u1", search("tokio runtime", EPOCH, 1.0));
	clock.advance(Duration::days(15));
	contexts.update_search_pattern("u1", search("tokio", EPOCH + Duration::days(15), 1.0));

	let ctx = contexts.context_snapshot("u1");
	let tokio = ctx
		.topic_interests
		.iter()
		.find(|interest| interest.topic == "tokio")
		.expect("Topic must be tracked.");

	assert!((tokio.interest_score - 0.2).abs() < 1e-6);
	assert_eq!(tokio.interaction_count, 2);
	assert!((tokio.trending_score - 0.5).abs() < 1e-4);
	assert_eq!(tokio.related_terms, vec!["runtime"]);
}

#[test]
fn interactions_update_preferences_within_bounds() {
	let contexts = manager(Arc::new(ManualClock::default()));

	for _ in 0..15 {
		contexts.record_interaction("u1", visit("gpt-4", &["bash", "python"], 1.0));
	}

	let ctx = contexts.context_snapshot("u1");

	assert_eq!(ctx.model_preferences["gpt-4"], 1.0);
	assert_eq!(ctx.tool_usage["bash"], 15);
	assert_eq!(ctx.conversation_patterns.len(), 15);
}

#[test]
fn cleanup_purges_only_idle_contexts() {
	let clock = Arc::new(ManualClock::default());
	let contexts = manager(clock.clone());

	clock.set(EPOCH - Duration::days(31));
	contexts.context_snapshot("idle");
	clock.set(EPOCH - Duration::days(1));
	contexts.context_snapshot("active");
	clock.set(EPOCH);

	assert_eq!(contexts.cleanup_old_contexts(), 1);
	assert_eq!(contexts.len(), 1);
	assert_eq!(contexts.context_snapshot("active").created_at, EPOCH - Duration::days(1));
}

#[test]
fn concurrent_updates_are_not_lost() {
	let contexts = manager(Arc::new(ManualClock::default()));

	thread::scope(|scope| {
		for worker in 0..8 {
			let contexts = &contexts;

			scope.spawn(move || {
				for idx in 0..50 {
					contexts.update_search_pattern(
						"shared",
						search(&format!("worker {worker} query {idx}"), EPOCH, 0.5),
					);
				}
			});
		}
	});

	let ctx = contexts.context_snapshot("shared");

	assert_eq!(ctx.search_patterns.len(), 400);
	assert_eq!(ctx.version, 400);
}

#[test]
fn personalized_suggestions_draw_on_history() {
	let contexts = manager(Arc::new(ManualClock::default()));

	contexts.update_search_pattern("u1", search("tokio select macro", EPOCH, 0.9));
	contexts.update_search_pattern("u1", search("tokio join handle", EPOCH, 0.2));
	contexts.record_interaction("u1", visit("claude-3", &["cargo"], 0.5));

	let suggestions = contexts.personalized_suggestions("u1", "tokio select");

	assert!(suggestions.len() <= 10);
	assert!(suggestions.iter().any(|s| {
		s.kind == SuggestionKind::RecentSearch && s.text == "tokio select macro"
	}));
	assert!(!suggestions.iter().any(|s| s.text == "tokio join handle"));
	assert!(suggestions.iter().any(|s| s.kind == SuggestionKind::Tool));
	assert!(suggestions.iter().any(|s| s.kind == SuggestionKind::Model));
	assert!(contexts.personalized_suggestions("nobody", "tokio").is_empty());
}

#[test]
fn topic_interests_named_in_the_query_rank_first() {
	let contexts = manager(Arc::new(ManualClock::default()));

	contexts.update_search_pattern("u1", search("tokio runtime", EPOCH, 0.5));
	contexts.update_search_pattern("u1", search("tokio select", EPOCH, 0.5));
	contexts.update_search_pattern("u1", search("serde derive", EPOCH, 0.5));

	let suggestions = contexts.personalized_suggestions("u1", "tokio");
	let topics: Vec<_> =
		suggestions.iter().filter(|s| s.kind == SuggestionKind::TopicInterest).collect();

	assert_eq!(suggestions[0].kind, SuggestionKind::TopicInterest);
	assert_eq!(suggestions[0].text, "tokio runtime");
	assert!((suggestions[0].confidence - 0.1).abs() < 1e-6);
	assert_eq!(topics.len(), 3);
	assert!(topics.iter().any(|s| s.text == "runtime"));
	assert!(!topics.iter().any(|s| s.text.contains("serde")));
}

#[test]
fn search_success_is_clamped_to_unit_range() {
	let contexts = manager(Arc::new(ManualClock::default()));
	let cancel = CancellationToken::new();

	contexts.update_search_pattern("u1", search("tokio", EPOCH, 3.5));
	contexts.update_search_pattern("u1", search("serde", EPOCH, -1.0));

	let ctx = contexts.context_snapshot("u1");

	assert_eq!(ctx.search_patterns[0].success_score, 1.0);
	assert_eq!(ctx.search_patterns[1].success_score, 0.0);
	assert!(ctx.topic_interests.iter().all(|interest| interest.interest_score <= 1.0));

	let analysis = contexts.analyze_user_patterns("u1", &cancel).expect("Analysis must succeed.");

	assert!((analysis.average_search_success - 0.5).abs() < 1e-6);
}

#[test]
fn analysis_summarizes_the_trailing_window() {
	let contexts = manager(Arc::new(ManualClock::default()));
	let cancel = CancellationToken::new();

	contexts.update_search_pattern("u1", search("tokio", EPOCH - Duration::days(40), 1.0));
	contexts.update_search_pattern("u1", SearchPattern {
		intent: QueryIntent::HowTo,
		refinement: Some("how to spawn tokio tasks".to_string()),
		..search("how to spawn", EPOCH - Duration::days(2), 0.6)
	});
	contexts.update_search_pattern("u1", search("serde derive", EPOCH - Duration::days(1), 0.8));
	contexts.record_interaction("u1", visit("gpt-4", &["bash"], 0.4));

	let analysis = contexts.analyze_user_patterns("u1", &cancel).expect("Analysis must succeed.");

	assert_eq!(analysis.window_days, 30);
	assert!((analysis.searches_per_day - 2.0 / 30.0).abs() < 1e-6);
	assert!((analysis.average_search_success - 0.7).abs() < 1e-6);
	assert!((analysis.refinement_rate - 0.5).abs() < 1e-6);
	assert!((analysis.average_satisfaction - 0.4).abs() < 1e-6);
	assert_eq!(analysis.intent_histogram["how_to"], 1);
	assert_eq!(analysis.intent_histogram["general"], 1);
	assert_eq!(analysis.top_models, vec!["gpt-4"]);
	assert_eq!(analysis.top_tools, vec!["bash"]);
	assert!(analysis.top_topics.len() <= 5);
}

#[test]
fn analysis_rejects_cancellation_and_empty_user() {
	let contexts = manager(Arc::new(ManualClock::default()));
	let cancel = CancellationToken::new();

	assert!(matches!(
		contexts.analyze_user_patterns("  ", &cancel),
		Err(Error::InvalidRequest { .. })
	));

	cancel.cancel();

	assert!(matches!(contexts.analyze_user_patterns("u1", &cancel), Err(Error::Cancelled)));
}
