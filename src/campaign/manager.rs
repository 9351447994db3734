use chrono::Utc;

use crate::database::Database;
use crate::error::Error;
use crate::recipient::{NewRecipient, Recipient, RecipientId, RecipientStatus};

use super::{Campaign, CampaignId, CampaignStatus};

#[tracing::instrument(skip(db, message_template, recipients), fields(recipients = recipients.len()))]
pub async fn create_campaign(
    db: &dyn Database,
    name: String,
    message_template: String,
    recipients: Vec<NewRecipient>,
) -> Result<(Campaign, Vec<Recipient>), Error> {
    if name.trim().is_empty() {
        return Err(Error::InvalidCampaign {
            reason: "campaign name is empty",
        });
    }
    if message_template.trim().is_empty() {
        return Err(Error::InvalidCampaign {
            reason: "message template is empty",
        });
    }
    if recipients.is_empty() {
        return Err(Error::InvalidCampaign {
            reason: "campaign has no recipients",
        });
    }

    let now = Utc::now();
    let campaign = Campaign {
        id: CampaignId::new(),
        name,
        message_template,
        recipient_count: recipients.len() as u32,
        sent_count: 0,
        status: CampaignStatus::InProgress,
        created_at: now,
        modified_at: now,
        completed_at: None,
    };

    let recipients: Vec<Recipient> = recipients
        .into_iter()
        .enumerate()
        .map(|(position, new_recipient)| Recipient {
            id: RecipientId::new(),
            campaign_id: campaign.id,
            contact: new_recipient.contact,
            position: position as u32,
            message: new_recipient.message,
            status: RecipientStatus::Pending,
            sent_at: None,
            created_at: now,
        })
        .collect();

    // the campaign only becomes visible once its whole recipient set is stored
    db.recipients().insert_recipients(&recipients).await?;
    db.campaigns().insert_campaign(&campaign).await?;

    tracing::info!(campaign_id = %campaign.id, "created campaign");

    Ok((campaign, recipients))
}

#[tracing::instrument(skip(db))]
pub async fn get_campaigns(db: &dyn Database, limit: u32) -> Result<Vec<Campaign>, Error> {
    let campaigns = db.campaigns().fetch_campaigns(limit).await?;

    Ok(campaigns)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Option<Campaign>, Error> {
    let campaign = db.campaigns().fetch_campaign_by_id(campaign_id).await?;

    Ok(campaign)
}
