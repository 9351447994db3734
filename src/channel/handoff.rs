use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::campaign::CampaignId;
use crate::recipient::RecipientId;

/// A generated deep link waiting for the operator's client to open it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Handoff {
    pub campaign_id: CampaignId,
    pub recipient_id: RecipientId,
    pub contact_name: String,
    pub phone: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

const TRACKED_CAMPAIGNS: usize = 64;

/// Keeps the most recent hand-offs of each campaign, oldest first. Only the
/// campaigns with the latest activity are tracked.
#[derive(Clone, Debug)]
pub struct HandoffLog {
    capacity: usize,
    max_campaigns: usize,
    entries: Arc<Mutex<HashMap<CampaignId, VecDeque<Handoff>>>>,
}

impl HandoffLog {
    pub fn new(capacity: usize) -> HandoffLog {
        HandoffLog::with_max_campaigns(capacity, TRACKED_CAMPAIGNS)
    }

    pub fn with_max_campaigns(capacity: usize, max_campaigns: usize) -> HandoffLog {
        HandoffLog {
            capacity: capacity.max(1),
            max_campaigns: max_campaigns.max(1),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn record(&self, handoff: Handoff) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&handoff.campaign_id) && entries.len() >= self.max_campaigns {
            let stalest = entries
                .iter()
                .min_by_key(|(_, queue)| queue.back().map(|h| h.created_at))
                .map(|(campaign_id, _)| *campaign_id);
            if let Some(campaign_id) = stalest {
                entries.remove(&campaign_id);
            }
        }

        let queue = entries.entry(handoff.campaign_id).or_default();
        while queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(handoff);
    }

    pub async fn recent(&self, campaign_id: CampaignId) -> Vec<Handoff> {
        let entries = self.entries.lock().await;
        entries
            .get(&campaign_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn forget(&self, campaign_id: CampaignId) {
        self.entries.lock().await.remove(&campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handoff(campaign_id: CampaignId, n: usize) -> Handoff {
        Handoff {
            campaign_id,
            recipient_id: RecipientId::new(),
            contact_name: format!("Customer {}", n),
            phone: "393331234567".to_string(),
            link: format!("https://wa.me/393331234567?text={}", n),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn drops_oldest_past_capacity() {
        let log = HandoffLog::new(2);
        let campaign_id = CampaignId::new();
        for n in 0..3 {
            log.record(handoff(campaign_id, n)).await;
        }

        let recent = log.recent(campaign_id).await;

        let names: Vec<_> = recent.iter().map(|h| h.contact_name.as_str()).collect();
        assert_eq!(names, vec!["Customer 1", "Customer 2"]);
    }

    #[tokio::test]
    async fn campaigns_are_kept_apart() {
        let log = HandoffLog::new(10);
        let first = CampaignId::new();
        let second = CampaignId::new();
        log.record(handoff(first, 0)).await;

        assert_eq!(log.recent(first).await.len(), 1);
        assert!(log.recent(second).await.is_empty());
    }

    #[tokio::test]
    async fn least_recent_campaign_is_evicted() {
        let log = HandoffLog::with_max_campaigns(10, 2);
        let campaigns = [CampaignId::new(), CampaignId::new(), CampaignId::new()];
        for (n, campaign_id) in campaigns.iter().enumerate() {
            log.record(handoff(*campaign_id, n)).await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        assert!(log.recent(campaigns[0]).await.is_empty());
        assert_eq!(log.recent(campaigns[1]).await.len(), 1);
        assert_eq!(log.recent(campaigns[2]).await.len(), 1);
    }

    #[tokio::test]
    async fn forget_drops_a_campaign() {
        let log = HandoffLog::new(10);
        let campaign_id = CampaignId::new();
        log.record(handoff(campaign_id, 0)).await;

        log.forget(campaign_id).await;

        assert!(log.recent(campaign_id).await.is_empty());
    }
}
