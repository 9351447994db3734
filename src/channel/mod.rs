//! The hand-off boundary between the dispatch workflow and whatever actually
//! delivers a message.

use async_trait::async_trait;
use serde::Serialize;

use crate::campaign::CampaignId;
use crate::recipient::{ContactRef, Recipient, RecipientId};

mod deeplink;
pub mod endpoints;
mod handoff;

pub use deeplink::{deep_link, normalize_phone, DeepLinkChannel};
pub use endpoints::*;
pub use handoff::{Handoff, HandoffLog};

#[derive(Clone, Debug, Serialize)]
pub struct DispatchRequest {
    pub campaign_id: CampaignId,
    pub recipient_id: RecipientId,
    pub contact: ContactRef,
    pub message: String,
}

impl DispatchRequest {
    pub fn for_recipient(recipient: &Recipient) -> DispatchRequest {
        DispatchRequest {
            campaign_id: recipient.campaign_id,
            recipient_id: recipient.id,
            contact: recipient.contact.clone(),
            message: recipient.message.clone(),
        }
    }
}

/// Hands a message to an external channel. Delivery cannot be observed, so
/// there is nothing to return; the operator attests that it was sent.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest);

    /// Drops whatever the channel keeps for a campaign whose session ended.
    async fn release(&self, _campaign_id: CampaignId) {}
}
