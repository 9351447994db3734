use actix_web::get;
use actix_web::web::{Data, Json, Path};

use crate::campaign::manager::get_campaign_by_id;
use crate::campaign::CampaignId;
use crate::database::Database;
use crate::error::Error;

use super::{Handoff, HandoffLog};

#[get("/campaigns/{campaign_id}/handoffs")]
#[tracing::instrument(skip(db, handoffs))]
pub async fn get_handoffs_in_campaign(
    db: Data<dyn Database>,
    handoffs: Data<HandoffLog>,
    params: Path<CampaignId>,
) -> Result<Json<Vec<Handoff>>, Error> {
    let campaign_id = params.into_inner();

    get_campaign_by_id(&**db, campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    Ok(Json(handoffs.recent(campaign_id).await))
}
