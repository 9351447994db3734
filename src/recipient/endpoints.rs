use actix_web::web::{Data, Json, Path};
use actix_web::{get, put};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::database::Database;
use crate::dispatch::{DispatchController, Progress};
use crate::error::Error;

use super::{manager, ContactRef, Recipient, RecipientId, RecipientStatus};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecipientBody {
    pub id: RecipientId,
    pub campaign_id: CampaignId,
    pub contact: ContactRef,
    pub position: u32,
    pub message: String,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

impl RecipientBody {
    pub fn render(recipient: Recipient) -> RecipientBody {
        RecipientBody {
            id: recipient.id,
            campaign_id: recipient.campaign_id,
            contact: recipient.contact,
            position: recipient.position,
            message: recipient.message,
            status: recipient.status,
            sent_at: recipient.sent_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SetRecipientStatusBody {
    pub status: RecipientStatus,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecipientStatusResultBody {
    pub recipient: RecipientBody,
    pub progress: Progress,
    pub campaign_complete: bool,
    pub summary_synced: bool,
}

#[get("/campaigns/{campaign_id}/recipients")]
#[tracing::instrument(skip(db))]
pub async fn get_recipients_in_campaign(
    db: Data<dyn Database>,
    params: Path<CampaignId>,
) -> Result<Json<Vec<RecipientBody>>, Error> {
    let campaign_id = params.into_inner();

    let recipients = manager::list_recipients(&**db, campaign_id).await?;

    let body = recipients.into_iter().map(RecipientBody::render).collect();

    Ok(Json(body))
}

#[put("/campaigns/{campaign_id}/recipients/{recipient_id}/status")]
#[tracing::instrument(skip(controller))]
pub async fn set_recipient_status_in_campaign(
    controller: Data<DispatchController>,
    params: Path<(CampaignId, RecipientId)>,
    body: Json<SetRecipientStatusBody>,
) -> Result<Json<RecipientStatusResultBody>, Error> {
    let (campaign_id, recipient_id) = params.into_inner();

    let outcome = controller
        .set_recipient_status(campaign_id, recipient_id, body.status)
        .await?;

    Ok(Json(RecipientStatusResultBody {
        recipient: RecipientBody::render(outcome.recipient),
        progress: outcome.progress,
        campaign_complete: outcome.campaign_complete,
        summary_synced: outcome.summary_synced,
    }))
}
