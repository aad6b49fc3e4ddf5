pub mod context;
pub mod interaction;
pub mod related;
pub mod search;

mod error;

pub use context::{
	ConversationContextManager, ConversationPattern, SearchPattern, TopicInterest, UserContext,
	UserPatternAnalysis,
};
pub use error::{Error, Result};
pub use related::RelatedConversation;
pub use search::{
	ScoredTurn, SearchField, SearchFilters, SearchMetadata, SearchMode, SearchRequest,
	SearchResponse,
	suggest::{Suggestion, SuggestionKind},
};

use std::sync::Arc;

use recall_config::Config;
use recall_domain::{
	clock::{Clock, SystemClock},
	highlight::Highlighter,
	query::QueryParser,
	scoring::RelevanceScorer,
};
use recall_storage::{AnalyticsSink, Archive, TracingAnalyticsSink};

/// Search, suggestion, related-conversation and personalization entry point.
///
/// Every operation that reaches the archive takes the caller's cancellation token and forwards it
/// unchanged to each archive call it makes.
pub struct RecallService {
	pub cfg: Config,
	archive: Arc<dyn Archive>,
	analytics: Arc<dyn AnalyticsSink>,
	clock: Arc<dyn Clock>,
	parser: Arc<QueryParser>,
	scorer: RelevanceScorer,
	highlighter: Highlighter,
	contexts: ConversationContextManager,
}
impl RecallService {
	pub fn new(cfg: Config, archive: Arc<dyn Archive>) -> Result<Self> {
		Self::with_parts(cfg, archive, Arc::new(TracingAnalyticsSink), Arc::new(SystemClock))
	}

	pub fn with_parts(
		cfg: Config,
		archive: Arc<dyn Archive>,
		analytics: Arc<dyn AnalyticsSink>,
		clock: Arc<dyn Clock>,
	) -> Result<Self> {
		recall_config::validate(&cfg)?;

		let parser = Arc::new(QueryParser::new(&cfg.query)?);
		let scorer = RelevanceScorer::new(&cfg.scoring)?;
		let highlighter = Highlighter::new(
			cfg.search.highlight_window,
			cfg.search.highlight_open.clone(),
			cfg.search.highlight_close.clone(),
		);
		let contexts =
			ConversationContextManager::new(cfg.context.clone(), parser.clone(), clock.clone());

		Ok(Self { cfg, archive, analytics, clock, parser, scorer, highlighter, contexts })
	}

	pub fn parser(&self) -> &QueryParser {
		&self.parser
	}

	pub fn contexts(&self) -> &ConversationContextManager {
		&self.contexts
	}
}
