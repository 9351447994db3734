use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{bson, Database};

use crate::database::MongoCampaignStore;
use crate::error::Error;

use super::{Campaign, CampaignId, CampaignSummary};

const CAMPAIGNS: &str = "campaigns";

pub async fn initialize(db: &Database) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": CAMPAIGNS,
            "indexes": [
                { "key": { "created_at": -1 }, "name": "by_created_at" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self, limit: u32) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(&self, campaign_id: CampaignId)
        -> Result<Option<Campaign>, Error>;

    async fn update_campaign_summary(
        &self,
        campaign: Campaign,
        summary: CampaignSummary,
    ) -> Result<Campaign, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self))]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self, limit: u32) -> Result<Vec<Campaign>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "created_at": -1 })
            .limit(i64::from(limit))
            .build();

        let campaigns: Vec<Campaign> = self
            .find(bson::doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign_summary(
        &self,
        mut campaign: Campaign,
        summary: CampaignSummary,
    ) -> Result<Campaign, Error> {
        let now = Utc::now();
        let new_modified_at = bson::DateTime::from_chrono(now);
        let new_status = bson::to_bson(&summary.status)?;
        let new_completed_at = summary.completed_at.map(bson::DateTime::from_chrono);

        let result = self
            .update_one(
                bson::doc! { "_id": campaign.id },
                bson::doc! { "$set": {
                    "sent_count": i64::from(summary.sent_count),
                    "status": new_status,
                    "completed_at": new_completed_at,
                    "modified_at": new_modified_at
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::CampaignNotFound {
                campaign_id: campaign.id,
            });
        }

        campaign.modified_at = now;
        campaign.sent_count = summary.sent_count;
        campaign.status = summary.status;
        campaign.completed_at = summary.completed_at;

        Ok(campaign)
    }
}
