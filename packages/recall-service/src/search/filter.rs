use recall_domain::query::ParsedQuery;
use recall_storage::models::{ArchiveFilter, SortDirection, SortKey};

use crate::search::SearchRequest;

/// Candidate fetch for ranked search: processed text, every structured filter, and a window wide
/// enough to rank before paginating.
pub(crate) fn candidate_filter(
	req: &SearchRequest,
	parsed: &ParsedQuery,
	candidate_floor: u32,
) -> ArchiveFilter {
	let wanted = req.skip.saturating_add(req.take);

	ArchiveFilter {
		text: non_empty(&parsed.processed),
		skip: 0,
		take: wanted.max(candidate_floor),
		..structured(req)
	}
}

/// Unscored fetch used when ranked search fails: the raw query and the caller's own page.
pub(crate) fn fallback_filter(req: &SearchRequest) -> ArchiveFilter {
	ArchiveFilter { text: non_empty(&req.query), skip: req.skip, take: req.take, ..structured(req) }
}

fn structured(req: &SearchRequest) -> ArchiveFilter {
	let filters = req.filters.clone().unwrap_or_default();

	ArchiveFilter {
		conversation_id: filters.conversation_id,
		text: None,
		model: filters.model,
		from: filters.from,
		to: filters.to,
		tools: filters.tools,
		skip: 0,
		take: req.take,
		sort: SortKey::Timestamp,
		direction: SortDirection::Descending,
	}
}

fn non_empty(text: &str) -> Option<String> {
	let trimmed = text.trim();

	if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
