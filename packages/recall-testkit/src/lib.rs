use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};

use time::{Duration, OffsetDateTime, macros::datetime};
use tokio_util::sync::CancellationToken;

use recall_domain::clock::Clock;
use recall_storage::{
	AnalyticsSink, Archive, BoxFuture, Error, Interaction, MemoryArchive, Result,
	models::{ArchiveFilter, ConversationTurn, SearchPage, SummaryPage},
};

/// Fixed instant shared by fixtures so tests never depend on the wall clock.
pub const EPOCH: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

pub struct TurnBuilder {
	turn: ConversationTurn,
}
impl TurnBuilder {
	pub fn new(conversation_id: &str, turn_index: u32) -> Self {
		Self {
			turn: ConversationTurn {
				conversation_id: conversation_id.to_string(),
				turn_index,
				prompt: String::new(),
				response: String::new(),
				model: String::new(),
				tools: Vec::new(),
				timestamp: EPOCH,
			},
		}
	}

	pub fn prompt(mut self, prompt: &str) -> Self {
		self.turn.prompt = prompt.to_string();

		self
	}

	pub fn response(mut self, response: &str) -> Self {
		self.turn.response = response.to_string();

		self
	}

	pub fn model(mut self, model: &str) -> Self {
		self.turn.model = model.to_string();

		self
	}

	pub fn tools(mut self, tools: &[&str]) -> Self {
		self.turn.tools = tools.iter().map(|tool| tool.to_string()).collect();

		self
	}

	pub fn days_ago(mut self, days: i64) -> Self {
		self.turn.timestamp = EPOCH - Duration::days(days);

		self
	}

	pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
		self.turn.timestamp = timestamp;

		self
	}

	pub fn build(self) -> ConversationTurn {
		self.turn
	}
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<OffsetDateTime>,
}
impl ManualClock {
	pub fn new(now: OffsetDateTime) -> Self {
		Self { now: Mutex::new(now) }
	}

	pub fn set(&self, now: OffsetDateTime) {
		*self.now.lock().unwrap_or_else(|err| err.into_inner()) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now += by;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(EPOCH)
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Wraps a [`MemoryArchive`] and fails the first `failures` search calls.
///
/// `usize::MAX` fails every search. `list` and `get` fail only when `fail_reads` is set.
pub struct FailingArchive {
	inner: MemoryArchive,
	remaining: AtomicUsize,
	fail_reads: bool,
	search_calls: AtomicUsize,
}
impl FailingArchive {
	pub fn new(inner: MemoryArchive, failures: usize) -> Self {
		Self {
			inner,
			remaining: AtomicUsize::new(failures),
			fail_reads: false,
			search_calls: AtomicUsize::new(0),
		}
	}

	pub fn always(inner: MemoryArchive) -> Self {
		Self { fail_reads: true, ..Self::new(inner, usize::MAX) }
	}

	pub fn search_calls(&self) -> usize {
		self.search_calls.load(Ordering::SeqCst)
	}

	fn should_fail(&self) -> bool {
		self.remaining
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
				0 => None,
				usize::MAX => Some(usize::MAX),
				left => Some(left - 1),
			})
			.is_ok()
	}
}
impl Archive for FailingArchive {
	fn search<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SearchPage>> {
		self.search_calls.fetch_add(1, Ordering::SeqCst);

		if self.should_fail() {
			return Box::pin(async { Err(Error::Backend("injected search failure".to_string())) });
		}

		self.inner.search(filter, cancel)
	}

	fn list<'a>(
		&'a self,
		filter: &'a ArchiveFilter,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<SummaryPage>> {
		if self.fail_reads {
			return Box::pin(async { Err(Error::Backend("injected list failure".to_string())) });
		}

		self.inner.list(filter, cancel)
	}

	fn get<'a>(
		&'a self,
		conversation_id: &'a str,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Vec<ConversationTurn>>> {
		if self.fail_reads {
			return Box::pin(async { Err(Error::Backend("injected get failure".to_string())) });
		}

		self.inner.get(conversation_id, cancel)
	}
}

/// Collects every recorded interaction; optionally fails each call after storing it.
#[derive(Default)]
pub struct RecordingSink {
	recorded: Mutex<Vec<Interaction>>,
	fail: bool,
}
impl RecordingSink {
	pub fn failing() -> Self {
		Self { fail: true, ..Self::default() }
	}

	pub fn recorded(&self) -> Vec<Interaction> {
		self.recorded.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl AnalyticsSink for RecordingSink {
	fn record<'a>(
		&'a self,
		interaction: &'a Interaction,
		_cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<()>> {
		self.recorded.lock().unwrap_or_else(|err| err.into_inner()).push(interaction.clone());

		let fail = self.fail;

		Box::pin(async move {
			if fail {
				return Err(Error::Backend("injected sink failure".to_string()));
			}

			Ok(())
		})
	}
}
