use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignBody, CampaignId};
use crate::error::Error;
use crate::recipient::RecipientBody;
use crate::utils::SuccessBody;

use super::{DispatchController, DispatchOutcome, Progress, SessionSnapshot};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DispatchBody {
    #[serde(default)]
    pub auto_advance: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionBody {
    pub campaign: CampaignBody,
    pub recipients: Vec<RecipientBody>,
    pub cursor: usize,
    pub current: Option<RecipientBody>,
    pub progress: Progress,
    pub auto_advance: bool,
    pub repeat_pending: bool,
}

impl SessionBody {
    pub fn render(snapshot: SessionSnapshot) -> SessionBody {
        let current = snapshot.current().cloned().map(RecipientBody::render);
        SessionBody {
            campaign: CampaignBody::render(snapshot.campaign),
            recipients: snapshot
                .recipients
                .into_iter()
                .map(RecipientBody::render)
                .collect(),
            cursor: snapshot.cursor,
            current,
            progress: snapshot.progress,
            auto_advance: snapshot.auto_advance,
            repeat_pending: snapshot.repeat_pending,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DispatchResultBody {
    pub dispatched: RecipientBody,
    pub cursor: usize,
    pub progress: Progress,
    pub advanced: bool,
    pub campaign_complete: bool,
    pub summary_synced: bool,
    pub repeat_scheduled: bool,
}

impl DispatchResultBody {
    pub fn render(outcome: DispatchOutcome) -> DispatchResultBody {
        DispatchResultBody {
            dispatched: RecipientBody::render(outcome.dispatched),
            cursor: outcome.cursor,
            progress: outcome.progress,
            advanced: outcome.advanced,
            campaign_complete: outcome.campaign_complete,
            summary_synced: outcome.summary_synced,
            repeat_scheduled: outcome.repeat_scheduled,
        }
    }
}

#[get("/campaigns/{campaign_id}/session")]
#[tracing::instrument(skip(controller))]
pub async fn get_session_in_campaign(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
) -> Result<Json<SessionBody>, Error> {
    let campaign_id = params.into_inner();

    let snapshot = controller.open_session(campaign_id).await?;

    Ok(Json(SessionBody::render(snapshot)))
}

#[post("/campaigns/{campaign_id}/session/dispatch")]
#[tracing::instrument(skip(controller))]
pub async fn dispatch_in_campaign(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
    body: Option<Json<DispatchBody>>,
) -> Result<Json<DispatchResultBody>, Error> {
    let campaign_id = params.into_inner();
    let body = body.map(Json::into_inner).unwrap_or_default();

    let outcome = controller
        .dispatch_and_advance(campaign_id, body.auto_advance)
        .await?;

    Ok(Json(DispatchResultBody::render(outcome)))
}

#[post("/campaigns/{campaign_id}/session/skip")]
#[tracing::instrument(skip(controller))]
pub async fn skip_in_campaign(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
) -> Result<Json<SessionBody>, Error> {
    let campaign_id = params.into_inner();

    let snapshot = controller.skip(campaign_id).await?;

    Ok(Json(SessionBody::render(snapshot)))
}

#[post("/campaigns/{campaign_id}/session/pause")]
#[tracing::instrument(skip(controller))]
pub async fn pause_in_campaign(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
) -> Result<Json<SessionBody>, Error> {
    let campaign_id = params.into_inner();

    let snapshot = controller.pause(campaign_id).await?;

    Ok(Json(SessionBody::render(snapshot)))
}

#[delete("/campaigns/{campaign_id}/session")]
#[tracing::instrument(skip(controller))]
pub async fn close_session_in_campaign(
    controller: Data<DispatchController>,
    params: Path<CampaignId>,
) -> Result<Json<SuccessBody>, Error> {
    let campaign_id = params.into_inner();

    controller.close_session(campaign_id).await;

    Ok(Json(SuccessBody {}))
}
