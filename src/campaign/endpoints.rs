use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::dispatch::{DispatchController, Progress};
use crate::error::Error;
use crate::recipient::NewRecipient;

use super::{manager, Campaign, CampaignId, CampaignStatus};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateCampaignBody {
    pub name: String,
    pub message_template: String,
    pub recipients: Vec<NewRecipient>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CampaignsQuery {
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CampaignBody {
    pub id: CampaignId,
    pub name: String,
    pub message_template: String,
    pub recipient_count: u32,
    pub sent_count: u32,
    pub percent_complete: f64,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign) -> CampaignBody {
        let progress = Progress::from_counts(campaign.sent_count, campaign.recipient_count);
        CampaignBody {
            id: campaign.id,
            name: campaign.name,
            message_template: campaign.message_template,
            recipient_count: campaign.recipient_count,
            sent_count: campaign.sent_count,
            percent_complete: progress.percent_complete,
            status: campaign.status,
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
            completed_at: campaign.completed_at,
        }
    }
}

#[post("/campaigns")]
#[tracing::instrument(skip(db, body))]
pub async fn create_campaign(
    db: Data<dyn Database>,
    body: Json<CreateCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let body = body.into_inner();

    let (campaign, _) =
        manager::create_campaign(&**db, body.name, body.message_template, body.recipients).await?;

    Ok(Json(CampaignBody::render(campaign)))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaigns(
    db: Data<dyn Database>,
    query: Query<CampaignsQuery>,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let campaigns = manager::get_campaigns(&**db, limit).await?;

    let body = campaigns.into_iter().map(CampaignBody::render).collect();

    Ok(Json(body))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: Data<dyn Database>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::get_campaign_by_id(&**db, campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    Ok(Json(CampaignBody::render(campaign)))
}

#[post("/campaigns/{campaign_id}/summary/refresh")]
#[tracing::instrument(skip(controller))]
pub async fn refresh_campaign_summary(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = controller.refresh_summary(campaign_id).await?;

    Ok(Json(CampaignBody::render(campaign)))
}
