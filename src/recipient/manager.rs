use chrono::{DateTime, Utc};
use tracing::warn;

use crate::campaign::{Campaign, CampaignId};
use crate::database::Database;
use crate::error::Error;

use super::{Recipient, RecipientStatus};

/// Lists a campaign's recipients in creation order.
#[tracing::instrument(skip(db))]
pub async fn list_recipients(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Vec<Recipient>, Error> {
    let (_, recipients) = get_campaign_with_recipients(db, campaign_id).await?;

    Ok(recipients)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaign_with_recipients(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<(Campaign, Vec<Recipient>), Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    let recipients = db
        .recipients()
        .fetch_recipients_by_campaign(campaign_id)
        .await?;

    Ok((campaign, recipients))
}

/// Persists a status transition and returns the stored record. Any store
/// failure is reported as transient so the caller can offer a manual retry.
#[tracing::instrument(skip(db, recipient), fields(recipient_id = %recipient.id))]
pub async fn set_recipient_status(
    db: &dyn Database,
    recipient: &Recipient,
    status: RecipientStatus,
    now: DateTime<Utc>,
) -> Result<Recipient, Error> {
    let updated = db
        .recipients()
        .update_recipient_status(recipient.id, status, status.sent_at(now))
        .await
        .map_err(|err| {
            warn!(error = %err, "failed to write recipient status");
            Error::TransientWriteFailure {
                recipient_id: recipient.id,
                reason: err.to_string(),
            }
        })?;

    updated.ok_or(Error::RecipientNotFound {
        campaign_id: recipient.campaign_id,
        recipient_id: recipient.id,
    })
}
