//! Message ingestion pipeline
//!
//! Turns an accepted inbound message into ledger state and dashboard events:
//!
//! 1. Command check (summary/help, with Portuguese aliases)
//! 2. LLM extraction
//! 3. Persist the transaction
//! 4. Recompute the monthly summary
//! 5. Run alert rules and persist findings
//! 6. Broadcast dashboard events
//! 7. Confirm back over the channel
//!
//! Persistence is the commit point. Everything after it is best-effort:
//! summary, rules, broadcast, or confirmation failures are logged and do
//! not roll the transaction back.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use tally_core::{
    extract::{ExtractionBackend, ExtractorClient},
    rules, Database, NewTransaction, Settings, TransactionKind, TransactionSource, RECENT_WINDOW,
};

use crate::broadcast::{EventBroadcaster, WireEvent};
use crate::channel::InboundMessage;
use crate::notify::NotificationDispatcher;

/// Reply sent when extraction cannot make sense of a message
pub const EXTRACTION_APOLOGY: &str =
    "Sorry, I couldn't understand that as a transaction. Try something like \"spent 45 on groceries\".";

const HELP_TEXT: &str = "Send me transactions in plain words, like:\n\
    - spent 45 on groceries\n\
    - received salary 3000\n\
    Commands: summary (or resumo) for this month's totals, help (or ajuda) for this text.";

pub struct MessageIngestionPipeline {
    db: Database,
    extractor: ExtractorClient,
    broadcaster: Arc<EventBroadcaster>,
    dispatcher: NotificationDispatcher,
    settings: Settings,
}

impl MessageIngestionPipeline {
    pub fn new(
        db: Database,
        extractor: ExtractorClient,
        broadcaster: Arc<EventBroadcaster>,
        dispatcher: NotificationDispatcher,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            extractor,
            broadcaster,
            dispatcher,
            settings,
        }
    }

    /// Process one inbound message end to end.
    ///
    /// Returns the reply text (also sent over the channel, best-effort).
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        source: TransactionSource,
    ) -> tally_core::Result<String> {
        let owner_id = message.sender_id.as_str();

        // 1. Commands short-circuit extraction entirely
        if let Some(reply) = self.handle_command(owner_id, &message.text)? {
            self.reply(owner_id, &reply).await;
            return Ok(reply);
        }

        // 2. Extraction
        let extracted = match self.extractor.extract(&message.text).await {
            Ok(extracted) => extracted,
            Err(e) => {
                info!(owner = %owner_id, error = %e, "Extraction failed, sending apology");
                self.reply(owner_id, EXTRACTION_APOLOGY).await;
                return Ok(EXTRACTION_APOLOGY.to_string());
            }
        };

        // 3. Persist - the commit point
        let transaction = self.db.create_transaction(&NewTransaction {
            owner_id: owner_id.to_string(),
            kind: extracted.kind,
            amount: extracted.amount,
            category: extracted.category.unwrap_or_else(|| "Other".to_string()),
            description: extracted
                .description
                .unwrap_or_else(|| message.text.trim().to_string()),
            occurred_at: message.occurred_at,
            source,
            raw_text: Some(message.text.clone()),
        })?;
        info!(
            owner = %owner_id,
            id = transaction.id,
            kind = transaction.kind.as_str(),
            amount = transaction.amount,
            "Transaction recorded"
        );

        // 4-6. Best-effort from here on
        let (summary, alert_titles) = match self.post_persist(owner_id, &transaction).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(owner = %owner_id, error = %e, "Post-persist steps failed");
                (None, Vec::new())
            }
        };

        // 7. Confirmation: the recorded line, updated totals, and any new alerts
        let verb = match transaction.kind {
            TransactionKind::Expense => "Recorded expense",
            TransactionKind::Income => "Recorded income",
        };
        let mut reply = format!(
            "{} of {:.2} in {}.",
            verb, transaction.amount, transaction.category
        );
        if let Some(summary) = summary {
            reply.push('\n');
            reply.push_str(&summary_line(&summary));
        }
        if !alert_titles.is_empty() {
            reply.push_str(&format!("\nAlerts: {}", alert_titles.join(", ")));
        }
        self.reply(owner_id, &reply).await;
        Ok(reply)
    }

    /// Summary refresh, rule evaluation, and dashboard broadcast.
    ///
    /// Returns the recomputed summary and the titles of any alerts produced,
    /// for the confirmation reply.
    async fn post_persist(
        &self,
        owner_id: &str,
        transaction: &tally_core::Transaction,
    ) -> tally_core::Result<(Option<tally_core::MonthlySummary>, Vec<String>)> {
        let summary = self.db.monthly_summary(owner_id)?;
        let recent = self.db.list_recent_transactions(owner_id, RECENT_WINDOW)?;

        let mut alert_titles = Vec::new();
        for finding in rules::evaluate(&recent, &summary, &self.settings.thresholds) {
            let alert = self.db.create_alert(owner_id, &finding)?;
            alert_titles.push(alert.title.clone());
            self.broadcaster
                .broadcast(
                    owner_id,
                    &WireEvent::new("new_alert", serde_json::to_value(&alert)?),
                )
                .await;
        }

        self.broadcaster
            .broadcast(
                owner_id,
                &WireEvent::new("new_transaction", serde_json::to_value(transaction)?),
            )
            .await;
        self.broadcaster
            .broadcast(
                owner_id,
                &WireEvent::new("summary_updated", serde_json::to_value(&summary)?),
            )
            .await;
        Ok((Some(summary), alert_titles))
    }

    /// Handle summary/help commands. Returns None when the text is not a command.
    ///
    /// Matching is a case-insensitive substring check, so "monthly summary
    /// please" works the same as a bare "summary".
    fn handle_command(&self, owner_id: &str, text: &str) -> tally_core::Result<Option<String>> {
        let lower = text.to_lowercase();
        if lower.contains("summary") || lower.contains("resumo") {
            let summary = self.db.monthly_summary(owner_id)?;
            Ok(Some(summary_line(&summary)))
        } else if lower.contains("help") || lower.contains("ajuda") {
            Ok(Some(HELP_TEXT.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Best-effort channel reply
    async fn reply(&self, owner_id: &str, text: &str) {
        if let Err(e) = self.dispatcher.send(owner_id, text).await {
            warn!(owner = %owner_id, error = %e, "Failed to send channel reply");
        }
    }
}

fn summary_line(summary: &tally_core::MonthlySummary) -> String {
    format!(
        "This month ({}): income {:.2}, expenses {:.2}, balance {:.2}.",
        summary.period, summary.income, summary.expense, summary.balance
    )
}

/// Consume inbound messages from the channel manager until the sender side closes
pub fn spawn_ingest_loop(
    pipeline: Arc<MessageIngestionPipeline>,
    mut rx: mpsc::Receiver<InboundMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = pipeline
                .handle_message(&message, TransactionSource::Channel)
                .await
            {
                warn!(sender = %message.sender_id, error = %e, "Message ingestion failed");
            }
        }
        info!("Ingestion loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelClient, ChannelConnectionManager, MockProvider};
    use chrono::Utc;
    use tally_core::{ExtractedTransaction, MockExtractor};

    struct Fixture {
        pipeline: MessageIngestionPipeline,
        provider: MockProvider,
        db: Database,
    }

    async fn fixture(extractor: ExtractorClient) -> Fixture {
        let db = Database::in_memory().unwrap();
        let provider = MockProvider::new();
        let broadcaster = Arc::new(EventBroadcaster::new());
        let (tx, _rx) = mpsc::channel(4);
        let manager = Arc::new(ChannelConnectionManager::new(
            ChannelClient::Mock(provider.clone()),
            &Settings::default(),
            Arc::clone(&broadcaster),
            tx,
        ));
        manager.start().await.unwrap();

        let pipeline = MessageIngestionPipeline::new(
            db.clone(),
            extractor,
            broadcaster,
            NotificationDispatcher::new(manager),
            Settings::default(),
        );
        Fixture {
            pipeline,
            provider,
            db,
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            sender_id: "alice".to_string(),
            text: text.to_string(),
            occurred_at: Utc::now(),
            media_type: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_message_becomes_transaction_and_confirmation() {
        let f = fixture(ExtractorClient::Mock(MockExtractor::new())).await;

        let reply = f
            .pipeline
            .handle_message(&message("Spent 45 on groceries"), TransactionSource::Channel)
            .await
            .unwrap();
        assert!(reply.contains("45.00"));
        assert!(reply.contains("Food"));
        // The confirmation carries the updated monthly totals
        assert!(reply.contains("balance -45.00"), "reply: {}", reply);

        let recent = f.db.list_recent_transactions("alice", 30).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].amount, 45.0);
        assert_eq!(recent[0].kind, TransactionKind::Expense);
        assert_eq!(recent[0].raw_text.as_deref(), Some("Spent 45 on groceries"));

        // Confirmation went out over the channel
        let sent = f.provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice");
    }

    #[tokio::test]
    async fn test_extraction_failure_sends_apology_and_persists_nothing() {
        let f = fixture(ExtractorClient::Mock(MockExtractor::failing())).await;

        let reply = f
            .pipeline
            .handle_message(&message("Spent 45 on groceries"), TransactionSource::Channel)
            .await
            .unwrap();
        assert_eq!(reply, EXTRACTION_APOLOGY);
        assert!(f.db.list_recent_transactions("alice", 30).unwrap().is_empty());
        assert_eq!(f.provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_command_short_circuits_extraction() {
        // A failing extractor proves commands never reach extraction
        let f = fixture(ExtractorClient::Mock(MockExtractor::failing())).await;

        f.db.create_transaction(&NewTransaction {
            owner_id: "alice".to_string(),
            kind: TransactionKind::Income,
            amount: 100.0,
            category: "Salary".to_string(),
            description: "pay".to_string(),
            occurred_at: Utc::now(),
            source: TransactionSource::Channel,
            raw_text: None,
        })
        .unwrap();

        for cmd in ["summary", "Resumo", "  SUMMARY  ", "send me the summary please"] {
            let reply = f
                .pipeline
                .handle_message(&message(cmd), TransactionSource::Channel)
                .await
                .unwrap();
            assert!(reply.contains("income 100.00"), "reply: {}", reply);
        }
    }

    #[tokio::test]
    async fn test_help_command() {
        let f = fixture(ExtractorClient::Mock(MockExtractor::new())).await;
        for cmd in ["help", "ajuda"] {
            let reply = f
                .pipeline
                .handle_message(&message(cmd), TransactionSource::Channel)
                .await
                .unwrap();
            assert!(reply.contains("summary"));
            assert!(f.db.list_recent_transactions("alice", 30).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_high_expense_triggers_alert() {
        let extractor = ExtractorClient::Mock(MockExtractor::with_response(ExtractedTransaction {
            kind: TransactionKind::Expense,
            amount: 1500.0,
            category: Some("Shopping".to_string()),
            description: Some("new laptop".to_string()),
        }));
        let f = fixture(extractor).await;

        f.pipeline
            .handle_message(&message("bought a laptop for 1500"), TransactionSource::Channel)
            .await
            .unwrap();

        let alerts = f.db.list_alerts("alice", false).unwrap();
        assert!(!alerts.is_empty());
        assert!(alerts.iter().any(|a| a.title.contains("High expense")));
    }
}
