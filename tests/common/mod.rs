#![allow(dead_code)]

use std::sync::Arc;

use campaign_dispatch::config::DispatchConfig;
use campaign_dispatch::database::MemoryDatabase;
use campaign_dispatch::recipient::{ContactRef, NewRecipient};
use campaign_dispatch::{AppState, CreateCampaignBody};

pub fn state() -> AppState {
    state_with_delay(3000)
}

pub fn state_with_delay(auto_advance_delay_ms: u64) -> AppState {
    let config = DispatchConfig {
        auto_advance_delay_ms,
        ..DispatchConfig::default()
    };

    AppState::new(Arc::new(MemoryDatabase::new()), &config)
}

pub fn create_campaign_body(names: &[&str]) -> CreateCampaignBody {
    CreateCampaignBody {
        name: "Saldi di primavera".into(),
        message_template: "Ciao {{nome}}, sconti fino al 30%!".into(),
        recipients: names
            .iter()
            .map(|name| NewRecipient {
                contact: ContactRef {
                    contact_id: format!("contact-{}", name.to_lowercase()),
                    name: name.to_string(),
                    phone: "333 123 4567".into(),
                },
                message: format!("Ciao {}, sconti fino al 30%!", name),
            })
            .collect(),
    }
}
