use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{bson, Database};

use crate::campaign::CampaignId;
use crate::database::MongoRecipientStore;
use crate::error::Error;

use super::{Recipient, RecipientId, RecipientStatus};

const RECIPIENTS: &str = "recipients";

pub async fn initialize(db: &Database) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": RECIPIENTS,
            "indexes": [
                {
                    "key": { "campaign_id": 1, "position": 1 },
                    "name": "by_campaign_id",
                    "unique": true
                },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Stores a campaign's full recipient set in the given order.
    async fn insert_recipients(&self, recipients: &[Recipient]) -> Result<(), Error>;

    /// Returns every recipient of the campaign in creation order.
    async fn fetch_recipients_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Recipient>, Error>;

    async fn update_recipient_status(
        &self,
        recipient_id: RecipientId,
        status: RecipientStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Recipient>, Error>;
}

#[async_trait]
impl RecipientStore for MongoRecipientStore {
    #[tracing::instrument(skip(self, recipients), fields(count = recipients.len()))]
    async fn insert_recipients(&self, recipients: &[Recipient]) -> Result<(), Error> {
        if recipients.is_empty() {
            return Ok(());
        }

        self.insert_many(recipients, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_recipients_by_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Recipient>, Error> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "position": 1 })
            .build();

        let recipients: Vec<Recipient> = self
            .find(bson::doc! { "campaign_id": campaign_id }, options)
            .await?
            .try_collect()
            .await?;

        Ok(recipients)
    }

    #[tracing::instrument(skip(self))]
    async fn update_recipient_status(
        &self,
        recipient_id: RecipientId,
        status: RecipientStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Recipient>, Error> {
        let new_status = bson::to_bson(&status)?;
        let new_sent_at = sent_at.map(bson::DateTime::from_chrono);
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let recipient: Option<Recipient> = self
            .find_one_and_update(
                bson::doc! { "_id": recipient_id },
                bson::doc! { "$set": { "status": new_status, "sent_at": new_sent_at } },
                options,
            )
            .await?;

        Ok(recipient)
    }
}
