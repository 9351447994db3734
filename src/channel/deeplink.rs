use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::info;

use crate::campaign::CampaignId;

use super::{ChannelSender, DispatchRequest, Handoff, HandoffLog};

const CHAT_LINK_BASE: &str = "https://wa.me/";

// same set a browser leaves untouched in a URI component
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Turns each dispatch into a click-to-chat link for the operator's client.
#[derive(Clone, Debug)]
pub struct DeepLinkChannel {
    default_country_code: String,
    handoffs: HandoffLog,
}

impl DeepLinkChannel {
    pub fn new(default_country_code: impl Into<String>, handoffs: HandoffLog) -> DeepLinkChannel {
        DeepLinkChannel {
            default_country_code: default_country_code.into(),
            handoffs,
        }
    }
}

#[async_trait]
impl ChannelSender for DeepLinkChannel {
    #[tracing::instrument(skip(self, request), fields(recipient_id = %request.recipient_id))]
    async fn dispatch(&self, request: &DispatchRequest) {
        let phone = normalize_phone(&request.contact.phone, &self.default_country_code);
        let link = deep_link(&phone, &request.message);

        info!(campaign_id = %request.campaign_id, %link, "handing message off to chat client");

        self.handoffs
            .record(Handoff {
                campaign_id: request.campaign_id,
                recipient_id: request.recipient_id,
                contact_name: request.contact.name.clone(),
                phone,
                link,
                created_at: Utc::now(),
            })
            .await;
    }

    async fn release(&self, campaign_id: CampaignId) {
        self.handoffs.forget(campaign_id).await;
    }
}

/// Reduces a phone number to the digits-only international form chat links
/// expect. A trunk `0` is replaced by the country code and a bare ten digit
/// national number gets the country code prepended.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(national) = digits.strip_prefix('0') {
        format!("{}{}", country_code, national)
    } else if !digits.starts_with(country_code) && digits.len() == 10 {
        format!("{}{}", country_code, digits)
    } else {
        digits
    }
}

pub fn deep_link(phone: &str, message: &str) -> String {
    format!(
        "{}{}?text={}",
        CHAT_LINK_BASE,
        phone,
        utf8_percent_encode(message, COMPONENT)
    )
}
