use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod summary;
pub use endpoints::*;

pub type CampaignId = TypedId<Campaign>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub name: String,
    pub message_template: String,
    pub recipient_count: u32,
    pub sent_count: u32,
    pub status: CampaignStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
    #[serde(with = "crate::utils::optional_bson_datetime", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum CampaignStatus {
    InProgress,
    Completed,
}

/// The derived fields the aggregate updater owns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub sent_count: u32,
    pub status: CampaignStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            sent_count: self.sent_count,
            status: self.status,
            completed_at: self.completed_at,
        }
    }
}
