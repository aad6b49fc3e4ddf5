use time::{Duration, OffsetDateTime, macros::datetime};
use tokio_util::sync::CancellationToken;

use recall_storage::{
	Archive, Error, MemoryArchive,
	models::{ArchiveFilter, ConversationTurn, SortDirection, SortKey},
};

const BASE: OffsetDateTime = datetime!(2025-05-01 09:00 UTC);

fn turn(conversation_id: &str, turn_index: u32, prompt: &str, hours: i64) -> ConversationTurn {
	ConversationTurn {
		conversation_id: conversation_id.to_string(),
		turn_index,
		prompt: prompt.to_string(),
		response: format!("answer to {prompt}"),
		model: "gpt-4o".to_string(),
		tools: vec!["bash".to_string()],
		timestamp: BASE + Duration::hours(hours),
	}
}

fn archive() -> MemoryArchive {
	MemoryArchive::from_turns(vec![
		turn("c1", 0, "install tokio", 0),
		turn("c1", 1, "spawn a task", 1),
		turn("c2", 0, "python virtualenv", 2),
		turn("c3", 0, "docker compose volumes", 3),
	])
}

#[tokio::test]
async fn search_pages_newest_first_by_default() {
	let archive = archive();
	let cancel = CancellationToken::new();
	let filter = ArchiveFilter { take: 2, ..Default::default() };
	let page = archive.search(&filter, &cancel).await.expect("Search must succeed.");

	assert_eq!(page.total_count, 4);
	assert!(page.has_more);
	assert_eq!(page.results[0].conversation_id, "c3");
	assert_eq!(page.results[1].conversation_id, "c2");

	let filter = ArchiveFilter { skip: 2, take: 2, ..Default::default() };
	let page = archive.search(&filter, &cancel).await.expect("Search must succeed.");

	assert!(!page.has_more);
	assert_eq!(page.results.len(), 2);
}

#[tokio::test]
async fn text_filter_matches_any_long_word() {
	let archive = archive();
	let cancel = CancellationToken::new();
	let filter = ArchiveFilter {
		text: Some("how do I use tokio or docker".to_string()),
		sort: SortKey::ConversationId,
		direction: SortDirection::Ascending,
		..Default::default()
	};
	let page = archive.search(&filter, &cancel).await.expect("Search must succeed.");
	let ids: Vec<&str> = page.results.iter().map(|turn| turn.conversation_id.as_str()).collect();

	assert_eq!(ids, vec!["c1", "c1", "c3"]);
}

#[tokio::test]
async fn date_range_is_inclusive() {
	let archive = archive();
	let cancel = CancellationToken::new();
	let filter = ArchiveFilter {
		from: Some(BASE + Duration::hours(1)),
		to: Some(BASE + Duration::hours(2)),
		..Default::default()
	};
	let page = archive.search(&filter, &cancel).await.expect("Search must succeed.");

	assert_eq!(page.total_count, 2);
}

#[tokio::test]
async fn list_summarizes_each_conversation() {
	let archive = archive();
	let cancel = CancellationToken::new();
	let filter = ArchiveFilter {
		sort: SortKey::ConversationId,
		direction: SortDirection::Ascending,
		..Default::default()
	};
	let page = archive.list(&filter, &cancel).await.expect("List must succeed.");
	let first = &page.summaries[0];

	assert_eq!(page.summaries.len(), 3);
	assert_eq!(first.conversation_id, "c1");
	assert_eq!(first.turn_count, 2);
	assert_eq!(first.title, "install tokio");
	assert_eq!(first.models, vec!["gpt-4o"]);
	assert!(first.preview.contains("spawn a task"));
	assert_eq!(first.last_at, BASE + Duration::hours(1));
}

#[tokio::test]
async fn get_orders_turns_and_reports_missing() {
	let archive = MemoryArchive::new();

	archive.insert(turn("c9", 2, "third", 5));
	archive.insert(turn("c9", 0, "first", 3));
	archive.insert(turn("c9", 1, "second", 4));

	let cancel = CancellationToken::new();
	let turns = archive.get("c9", &cancel).await.expect("Get must succeed.");
	let indexes: Vec<u32> = turns.iter().map(|turn| turn.turn_index).collect();

	assert_eq!(indexes, vec![0, 1, 2]);
	assert!(matches!(archive.get("missing", &cancel).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn cancelled_token_short_circuits() {
	let archive = archive();
	let cancel = CancellationToken::new();

	cancel.cancel();

	let result = archive.search(&ArchiveFilter::default(), &cancel).await;

	assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn turns_accept_unix_and_rfc3339_timestamps() {
	let from_unix: ConversationTurn = serde_json::from_value(serde_json::json!({
		"conversation_id": "c1",
		"turn_index": 0,
		"prompt": "p",
		"response": "r",
		"timestamp": 1_746_090_000,
	}))
	.expect("Unix timestamps must parse.");
	let from_text: ConversationTurn = serde_json::from_value(serde_json::json!({
		"conversation_id": "c1",
		"turn_index": 0,
		"prompt": "p",
		"response": "r",
		"timestamp": "2025-05-01T09:00:00Z",
	}))
	.expect("RFC 3339 timestamps must parse.");

	assert_eq!(from_unix.timestamp, from_text.timestamp);
	assert!(from_unix.tools.is_empty());
}
