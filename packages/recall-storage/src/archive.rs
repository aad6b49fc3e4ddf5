use std::{future::Future, pin::Pin};

use tokio_util::sync::CancellationToken;

use crate::{
	Result,
	models::{ArchiveFilter, ConversationTurn, SearchPage, SummaryPage},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The durable store of conversation turns, as seen by search and personalization.
///
/// Implementations own their I/O; callers never retry and pass the same cancellation token to
/// every call made on behalf of one operation.
pub trait Archive
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SearchPage>>;

	fn list<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SummaryPage>>;

	/// All turns of one conversation ordered by turn index.
	fn get<'a>(
		&'a self,
		conversation_id: &'a str,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ConversationTurn>>>;
}
