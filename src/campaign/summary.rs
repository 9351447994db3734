//! Rolls recipient statuses up into the campaign's derived fields.
//!
//! The rollup is always recomputed from the full recipient sequence.

use chrono::{DateTime, Utc};

use crate::database::Database;
use crate::error::Error;
use crate::recipient::Recipient;

use super::{Campaign, CampaignStatus, CampaignSummary};

pub fn compute_summary(
    campaign: &Campaign,
    recipients: &[Recipient],
    now: DateTime<Utc>,
) -> CampaignSummary {
    let sent_count = recipients.iter().filter(|r| r.is_sent()).count() as u32;

    if campaign.recipient_count > 0 && sent_count == campaign.recipient_count {
        CampaignSummary {
            sent_count,
            status: CampaignStatus::Completed,
            completed_at: Some(campaign.completed_at.unwrap_or(now)),
        }
    } else {
        CampaignSummary {
            sent_count,
            status: CampaignStatus::InProgress,
            completed_at: None,
        }
    }
}

#[tracing::instrument(skip(db, campaign, recipients), fields(campaign_id = %campaign.id))]
pub async fn refresh_campaign_summary(
    db: &dyn Database,
    campaign: Campaign,
    recipients: &[Recipient],
) -> Result<Campaign, Error> {
    if recipients.len() != campaign.recipient_count as usize {
        return Err(Error::ExistentialState(format!(
            "campaign {} expects {} recipients but has {}",
            campaign.id,
            campaign.recipient_count,
            recipients.len()
        )));
    }

    let summary = compute_summary(&campaign, recipients, Utc::now());
    let previous = campaign.status;
    let campaign = db
        .campaigns()
        .update_campaign_summary(campaign, summary)
        .await?;

    if previous != campaign.status {
        tracing::info!(status = ?campaign.status, sent_count = campaign.sent_count, "campaign status changed");
    }

    Ok(campaign)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::campaign::CampaignId;
    use crate::database::MemoryDatabase;
    use crate::recipient::{ContactRef, RecipientId, RecipientStatus};
    use RecipientStatus::{Pending, Sent};

    fn campaign(recipient_count: u32) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: CampaignId::new(),
            name: "Loyalty card".to_string(),
            message_template: "Ciao {{nome}}".to_string(),
            recipient_count,
            sent_count: 0,
            status: CampaignStatus::InProgress,
            created_at: now,
            modified_at: now,
            completed_at: None,
        }
    }

    fn recipients(campaign: &Campaign, statuses: &[RecipientStatus]) -> Vec<Recipient> {
        let now = Utc::now();
        statuses
            .iter()
            .enumerate()
            .map(|(position, status)| Recipient {
                id: RecipientId::new(),
                campaign_id: campaign.id,
                contact: ContactRef {
                    contact_id: position.to_string(),
                    name: "Mario Rossi".to_string(),
                    phone: "3331234567".to_string(),
                },
                position: position as u32,
                message: "Ciao Mario".to_string(),
                status: *status,
                sent_at: status.sent_at(now),
                created_at: now,
            })
            .collect()
    }

    #[test]
    fn partial_progress_stays_in_progress() {
        let campaign = campaign(3);
        let recipients = recipients(&campaign, &[Sent, Pending, Sent]);

        let summary = compute_summary(&campaign, &recipients, Utc::now());

        assert_eq!(summary.sent_count, 2);
        assert_eq!(summary.status, CampaignStatus::InProgress);
        assert_eq!(summary.completed_at, None);
    }

    #[test]
    fn all_sent_completes_with_now() {
        let campaign = campaign(2);
        let recipients = recipients(&campaign, &[Sent, Sent]);
        let now = Utc::now();

        let summary = compute_summary(&campaign, &recipients, now);

        assert_eq!(summary.status, CampaignStatus::Completed);
        assert_eq!(summary.completed_at, Some(now));
    }

    #[test]
    fn completed_at_is_kept_on_recompute() {
        let mut campaign = campaign(1);
        let first = Utc::now() - Duration::minutes(5);
        campaign.status = CampaignStatus::Completed;
        campaign.sent_count = 1;
        campaign.completed_at = Some(first);
        let recipients = recipients(&campaign, &[Sent]);

        let summary = compute_summary(&campaign, &recipients, Utc::now());

        assert_eq!(summary.completed_at, Some(first));
    }

    #[test]
    fn revert_clears_completion() {
        let mut campaign = campaign(3);
        campaign.status = CampaignStatus::Completed;
        campaign.sent_count = 3;
        campaign.completed_at = Some(Utc::now());
        let recipients = recipients(&campaign, &[Sent, Pending, Sent]);

        let summary = compute_summary(&campaign, &recipients, Utc::now());

        assert_eq!(summary.sent_count, 2);
        assert_eq!(summary.status, CampaignStatus::InProgress);
        assert_eq!(summary.completed_at, None);
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let db = MemoryDatabase::new();
        let campaign = campaign(2);
        db.campaigns().insert_campaign(&campaign).await.unwrap();
        let recipients = recipients(&campaign, &[Sent, Sent]);

        let first = refresh_campaign_summary(&db, campaign, &recipients)
            .await
            .unwrap();
        let second = refresh_campaign_summary(&db, first.clone(), &recipients)
            .await
            .unwrap();

        assert_eq!(second.summary(), first.summary());
        assert_eq!(second.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn refresh_rejects_mismatched_recipient_set() {
        let db = MemoryDatabase::new();
        let campaign = campaign(3);
        db.campaigns().insert_campaign(&campaign).await.unwrap();
        let recipients = recipients(&campaign, &[Sent]);

        let result = refresh_campaign_summary(&db, campaign, &recipients).await;

        assert!(matches!(result, Err(Error::ExistentialState(_))));
    }
}
