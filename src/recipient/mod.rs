use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type RecipientId = TypedId<Recipient>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Recipient {
    #[serde(rename = "_id")]
    pub id: RecipientId,
    pub campaign_id: CampaignId,
    pub contact: ContactRef,
    pub position: u32,
    pub message: String,
    pub status: RecipientStatus,
    #[serde(with = "crate::utils::optional_bson_datetime", default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for Recipient {
    fn tag() -> &'static str {
        "RCP"
    }
}

impl Recipient {
    pub fn is_sent(&self) -> bool {
        self.status == RecipientStatus::Sent
    }

    pub fn is_pending(&self) -> bool {
        self.status == RecipientStatus::Pending
    }
}

/// Snapshot of the external contact a message is addressed to.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ContactRef {
    pub contact_id: String,
    pub name: String,
    pub phone: String,
}

/// A contact paired with its already personalized message, as supplied when
/// a campaign is created.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct NewRecipient {
    pub contact: ContactRef,
    pub message: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RecipientStatus {
    Pending,
    Sent,
}

impl RecipientStatus {
    /// The dispatch timestamp that must accompany this status.
    pub fn sent_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RecipientStatus::Pending => None,
            RecipientStatus::Sent => Some(now),
        }
    }
}
