use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet},
	sync::RwLock,
};

use tokio_util::sync::CancellationToken;

use crate::{
	Archive, BoxFuture, Error, Result,
	models::{
		ArchiveFilter, ConversationSummary, ConversationTurn, SearchPage, SortDirection, SortKey,
		SummaryPage,
	},
};

const PREVIEW_MAX_CHARS: usize = 4_000;
const TITLE_MAX_CHARS: usize = 80;
const MIN_TEXT_TOKEN_CHARS: usize = 3;

/// Process-local archive used by tests and offline evaluation.
///
/// Free text matches when any of its words (three characters or longer) occurs in the prompt,
/// response, or tool names; text without such words must occur verbatim.
#[derive(Debug, Default)]
pub struct MemoryArchive {
	turns: RwLock<Vec<ConversationTurn>>,
}
impl MemoryArchive {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_turns(turns: Vec<ConversationTurn>) -> Self {
		Self { turns: RwLock::new(turns) }
	}

	pub fn insert(&self, turn: ConversationTurn) {
		let mut turns = self.turns.write().unwrap_or_else(|err| err.into_inner());

		turns.push(turn);
	}

	pub fn len(&self) -> usize {
		self.turns.read().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn search_now(&self, filter: &ArchiveFilter) -> SearchPage {
		let turns = self.turns.read().unwrap_or_else(|err| err.into_inner());
		let mut matched: Vec<ConversationTurn> =
			turns.iter().filter(|turn| turn_matches(turn, filter)).cloned().collect();

		matched.sort_by(|a, b| compare_turns(a, b, filter.sort, filter.direction));

		let total = matched.len();
		let skip = filter.skip as usize;
		let take = filter.take as usize;
		let results: Vec<ConversationTurn> = matched.into_iter().skip(skip).take(take).collect();

		tracing::debug!(total, returned = results.len(), "Memory archive search.");

		SearchPage { results, total_count: total as u64, has_more: skip + take < total }
	}

	fn list_now(&self, filter: &ArchiveFilter) -> SummaryPage {
		let turns = self.turns.read().unwrap_or_else(|err| err.into_inner());
		let mut grouped: BTreeMap<&str, Vec<&ConversationTurn>> = BTreeMap::new();

		for turn in turns.iter() {
			grouped.entry(turn.conversation_id.as_str()).or_default().push(turn);
		}

		let mut summaries: Vec<ConversationSummary> = grouped
			.into_values()
			.filter(|group| group.iter().any(|turn| turn_matches(turn, filter)))
			.filter_map(summarize)
			.collect();

		summaries.sort_by(|a, b| {
			let ordering = match filter.sort {
				SortKey::ConversationId => a.conversation_id.cmp(&b.conversation_id),
				SortKey::Model => a.models.cmp(&b.models),
				SortKey::Timestamp => a.last_at.cmp(&b.last_at),
			};

			directed(ordering, filter.direction)
		});

		let summaries = summaries
			.into_iter()
			.skip(filter.skip as usize)
			.take(filter.take as usize)
			.collect();

		SummaryPage { summaries }
	}

	fn get_now(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>> {
		let turns = self.turns.read().unwrap_or_else(|err| err.into_inner());
		let mut found: Vec<ConversationTurn> =
			turns.iter().filter(|turn| turn.conversation_id == conversation_id).cloned().collect();

		if found.is_empty() {
			return Err(Error::NotFound(format!("conversation {conversation_id}")));
		}

		found.sort_by_key(|turn| turn.turn_index);

		Ok(found)
	}
}
impl Archive for MemoryArchive {
	fn search<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SearchPage>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			Ok(self.search_now(filter))
		})
	}

	fn list<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SummaryPage>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			Ok(self.list_now(filter))
		})
	}

	fn get<'a>(
		&'a self,
		conversation_id: &'a str,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ConversationTurn>>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			self.get_now(conversation_id)
		})
	}
}

fn turn_matches(turn: &ConversationTurn, filter: &ArchiveFilter) -> bool {
	if let Some(conversation_id) = filter.conversation_id.as_deref()
		&& turn.conversation_id != conversation_id
	{
		return false;
	}
	if let Some(model) = filter.model.as_deref()
		&& !turn.model.to_lowercase().contains(&model.to_lowercase())
	{
		return false;
	}
	if let Some(from) = filter.from
		&& turn.timestamp < from
	{
		return false;
	}
	if let Some(to) = filter.to
		&& turn.timestamp > to
	{
		return false;
	}
	if !filter.tools.is_empty()
		&& !filter
			.tools
			.iter()
			.any(|wanted| turn.tools.iter().any(|tool| tool.eq_ignore_ascii_case(wanted)))
	{
		return false;
	}
	if let Some(text) = filter.text.as_deref() {
		return text_matches(turn, text);
	}

	true
}

fn text_matches(turn: &ConversationTurn, text: &str) -> bool {
	let needle = text.trim().to_lowercase();

	if needle.is_empty() {
		return true;
	}

	let haystack =
		format!("{}\n{}\n{}", turn.prompt, turn.response, turn.tools.join(" ")).to_lowercase();
	let words: Vec<&str> = needle
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|word| word.chars().count() >= MIN_TEXT_TOKEN_CHARS)
		.collect();

	if words.is_empty() {
		return haystack.contains(&needle);
	}

	words.iter().any(|word| haystack.contains(word))
}

fn compare_turns(
	a: &ConversationTurn,
	b: &ConversationTurn,
	sort: SortKey,
	direction: SortDirection,
) -> Ordering {
	let ordering = match sort {
		SortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
		SortKey::ConversationId => a.conversation_id.cmp(&b.conversation_id),
		SortKey::Model => a.model.cmp(&b.model),
	}
	.then_with(|| a.conversation_id.cmp(&b.conversation_id))
	.then_with(|| a.turn_index.cmp(&b.turn_index));

	directed(ordering, direction)
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
	match direction {
		SortDirection::Ascending => ordering,
		SortDirection::Descending => ordering.reverse(),
	}
}

fn summarize(mut group: Vec<&ConversationTurn>) -> Option<ConversationSummary> {
	group.sort_by_key(|turn| turn.turn_index);

	let first = *group.first()?;
	let first_at = group.iter().map(|turn| turn.timestamp).min()?;
	let last_at = group.iter().map(|turn| turn.timestamp).max()?;
	let models: BTreeSet<String> = group
		.iter()
		.map(|turn| turn.model.clone())
		.filter(|model| !model.is_empty())
		.collect();
	let tools: BTreeSet<String> =
		group.iter().flat_map(|turn| turn.tools.iter().cloned()).collect();
	let mut preview = String::new();

	for turn in &group {
		if preview.chars().count() >= PREVIEW_MAX_CHARS {
			break;
		}

		preview.push_str(&turn.prompt);
		preview.push('\n');
		preview.push_str(&turn.response);
		preview.push('\n');
	}

	Some(ConversationSummary {
		conversation_id: first.conversation_id.clone(),
		title: first.prompt.chars().take(TITLE_MAX_CHARS).collect(),
		models: models.into_iter().collect(),
		tools: tools.into_iter().collect(),
		first_at,
		last_at,
		turn_count: group.len() as u32,
		preview: preview.chars().take(PREVIEW_MAX_CHARS).collect(),
	})
}
