pub mod agentmail;

use async_trait::async_trait;

use crate::models::ThreadMessage;

/// A reply to send back on an existing message.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    pub text: String,
    pub subject: Option<String>,
    /// ICS calendar invite body, attached as `invite.ics` when present.
    pub ics_attachment: Option<String>,
    pub cc: Vec<String>,
}

/// Outbound mail plus thread-history lookups. Fire-and-forget from the
/// orchestrator's perspective, but delivery failures are reported.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn reply(
        &self,
        inbox_id: &str,
        message_id: &str,
        reply: &OutboundReply,
    ) -> anyhow::Result<()>;

    /// Prior messages in the thread, oldest first.
    async fn fetch_thread(&self, thread_id: &str) -> anyhow::Result<Vec<ThreadMessage>>;
}
