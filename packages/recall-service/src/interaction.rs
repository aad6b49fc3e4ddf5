use tokio_util::sync::CancellationToken;

use recall_storage::Interaction;

use crate::{RecallService, context::ConversationPattern};

impl RecallService {
	/// Forwards `interaction` to the analytics sink and, for identified users, to the context
	/// manager. Sink failures are logged and swallowed.
	pub async fn record_interaction(&self, interaction: Interaction, cancel: &CancellationToken) {
		if let Err(err) = self.analytics.record(&interaction, cancel).await {
			tracing::warn!(
				error = %err,
				conversation_id = %interaction.conversation_id,
				"Failed to record interaction."
			);
		}

		let Some(user_id) = interaction.user_id.as_deref().filter(|id| !id.trim().is_empty())
		else {
			return;
		};
		let pattern = ConversationPattern::from_interaction(&interaction, self.clock.now());

		self.contexts.record_interaction(user_id, pattern);
	}
}
