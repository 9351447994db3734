use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::campaign::db::CampaignStore;
use crate::campaign::{Campaign, CampaignId, CampaignSummary};
use crate::error::Error;
use crate::recipient::db::RecipientStore;
use crate::recipient::{Recipient, RecipientId, RecipientStatus};

use super::Database;

#[derive(Debug, Default)]
struct Collections {
    campaigns: HashMap<CampaignId, Campaign>,
    recipients: HashMap<RecipientId, Recipient>,
}

/// Process-local storage, used when no MongoDB deployment is configured and
/// by the test suites.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDatabase {
    pub fn new() -> MemoryDatabase {
        MemoryDatabase::default()
    }
}

impl Database for MemoryDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        self
    }

    fn recipients(&self) -> &dyn RecipientStore {
        self
    }
}

#[async_trait]
impl CampaignStore for MemoryDatabase {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        let mut collections = self.collections.write().await;
        collections.campaigns.insert(campaign.id, campaign.clone());

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self, limit: u32) -> Result<Vec<Campaign>, Error> {
        let collections = self.collections.read().await;
        let mut campaigns: Vec<Campaign> = collections.campaigns.values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns.truncate(limit as usize);

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let collections = self.collections.read().await;

        Ok(collections.campaigns.get(&campaign_id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_summary(
        &self,
        campaign: Campaign,
        summary: CampaignSummary,
    ) -> Result<Campaign, Error> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .campaigns
            .get_mut(&campaign.id)
            .ok_or(Error::CampaignNotFound {
                campaign_id: campaign.id,
            })?;

        stored.sent_count = summary.sent_count;
        stored.status = summary.status;
        stored.completed_at = summary.completed_at;
        stored.modified_at = Utc::now();

        Ok(stored.clone())
    }
}

#[async_trait]
impl RecipientStore for MemoryDatabase {
    #[tracing::instrument(skip(self, recipients), fields(count = recipients.len()))]
    async fn insert_recipients(&self, recipients: &[Recipient]) -> Result<(), Error> {
        let mut collections = self.collections.write().await;
        for recipient in recipients {
            collections.recipients.insert(recipient.id, recipient.clone());
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_recipients_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Recipient>, Error> {
        let collections = self.collections.read().await;
        let mut recipients: Vec<Recipient> = collections
            .recipients
            .values()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect();
        recipients.sort_by_key(|r| r.position);

        Ok(recipients)
    }

    #[tracing::instrument(skip(self))]
    async fn update_recipient_status(
        &self,
        recipient_id: RecipientId,
        status: RecipientStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Recipient>, Error> {
        let mut collections = self.collections.write().await;
        let recipient = collections.recipients.get_mut(&recipient_id).map(|recipient| {
            recipient.status = status;
            recipient.sent_at = sent_at;
            recipient.clone()
        });

        Ok(recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::CampaignStatus;
    use crate::recipient::ContactRef;

    fn campaign() -> Campaign {
        let now = Utc::now();
        Campaign {
            id: CampaignId::new(),
            name: "Autumn promo".to_string(),
            message_template: "Hi {{nome}}".to_string(),
            recipient_count: 2,
            sent_count: 0,
            status: CampaignStatus::InProgress,
            created_at: now,
            modified_at: now,
            completed_at: None,
        }
    }

    fn recipient(campaign_id: CampaignId, position: u32) -> Recipient {
        Recipient {
            id: RecipientId::new(),
            campaign_id,
            contact: ContactRef {
                contact_id: format!("contact-{}", position),
                name: format!("Customer {}", position),
                phone: "3331234567".to_string(),
            },
            position,
            message: format!("Hi customer {}", position),
            status: RecipientStatus::Pending,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn recipients_come_back_in_creation_order() {
        let db = MemoryDatabase::new();
        let campaign = campaign();
        let recipients: Vec<_> = (0..5).rev().map(|p| recipient(campaign.id, p)).collect();
        db.insert_recipients(&recipients).await.unwrap();
        db.insert_recipients(&[recipient(CampaignId::new(), 0)])
            .await
            .unwrap();

        let fetched = db.fetch_recipients_by_campaign(campaign.id).await.unwrap();

        let positions: Vec<_> = fetched.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn update_recipient_status_returns_none_for_unknown_id() {
        let db = MemoryDatabase::new();

        let result = db
            .update_recipient_status(RecipientId::new(), RecipientStatus::Sent, Some(Utc::now()))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_campaign_summary_requires_existing_campaign() {
        let db = MemoryDatabase::new();
        let campaign = campaign();
        let campaign_id = campaign.id;
        let summary = campaign.summary();

        let result = db.update_campaign_summary(campaign, summary).await;

        assert_eq!(result.unwrap_err(), Error::CampaignNotFound { campaign_id });
    }
}
