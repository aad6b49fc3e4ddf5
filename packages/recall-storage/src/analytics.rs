use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{BoxFuture, Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
	#[default]
	View,
	Click,
	Copy,
	Bookmark,
	Share,
}
impl InteractionKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::View => "view",
			Self::Click => "click",
			Self::Copy => "copy",
			Self::Bookmark => "bookmark",
			Self::Share => "share",
		}
	}
}

/// One user action on an archived conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
	pub user_id: Option<String>,
	pub conversation_id: String,
	#[serde(default)]
	pub kind: InteractionKind,
	/// The search that led to the interaction, if any.
	pub query: Option<String>,
	#[serde(default)]
	pub view_duration_ms: u64,
	#[serde(default)]
	pub topics: Vec<String>,
	#[serde(default)]
	pub tools: Vec<String>,
	pub model: Option<String>,
	/// Clamped to [0,1] by consumers.
	#[serde(default)]
	pub satisfaction: f32,
}

pub trait AnalyticsSink
where
	Self: Send + Sync,
{
	fn record<'a>(
		&'a self,
		interaction: &'a Interaction,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<()>>;
}

/// Emits every interaction as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsSink;
impl AnalyticsSink for TracingAnalyticsSink {
	fn record<'a>(
		&'a self,
		interaction: &'a Interaction,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			tracing::info!(
				user_id = interaction.user_id.as_deref().unwrap_or(""),
				conversation_id = %interaction.conversation_id,
				kind = interaction.kind.as_str(),
				view_duration_ms = interaction.view_duration_ms,
				satisfaction = interaction.satisfaction,
				"Conversation interaction."
			);

			Ok(())
		})
	}
}
