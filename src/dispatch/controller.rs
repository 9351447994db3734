use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::campaign::summary::refresh_campaign_summary;
use crate::campaign::{Campaign, CampaignId};
use crate::channel::{ChannelSender, DispatchRequest};
use crate::database::Database;
use crate::error::Error;
use crate::recipient::manager::{self, get_campaign_with_recipients};
use crate::recipient::{Recipient, RecipientId, RecipientStatus};

use super::cursor::resolve_cursor;
use super::progress::Progress;
use super::session::{Session, SessionRegistry, SharedSession};

pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(3000);

/// Result of handing the current recipient off and recording the send.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    pub dispatched: Recipient,
    pub cursor: usize,
    pub progress: Progress,
    pub advanced: bool,
    pub campaign_complete: bool,
    pub summary_synced: bool,
    pub repeat_scheduled: bool,
}

#[derive(Clone, Debug)]
pub struct OverrideOutcome {
    pub recipient: Recipient,
    pub progress: Progress,
    pub campaign_complete: bool,
    pub summary_synced: bool,
}

/// Everything a caller needs to redraw a campaign after any interruption.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub campaign: Campaign,
    pub recipients: Vec<Recipient>,
    pub cursor: usize,
    pub progress: Progress,
    pub auto_advance: bool,
    pub repeat_pending: bool,
}

impl SessionSnapshot {
    fn new(campaign: Campaign, recipients: Vec<Recipient>, session: &Session) -> SessionSnapshot {
        SessionSnapshot {
            progress: Progress::of(&recipients),
            campaign,
            recipients,
            cursor: session.cursor,
            auto_advance: session.auto_advance,
            repeat_pending: session.repeat_pending(),
        }
    }

    pub fn current(&self) -> Option<&Recipient> {
        self.recipients.get(self.cursor)
    }
}

type LockedSession = (SharedSession, OwnedMutexGuard<Session>);

/// Drives operators through a campaign's pending sends.
///
/// Every transition on a campaign runs under that campaign's session lock and
/// starts from a fresh read of the recipient sequence. The cursor only moves
/// after the store has acknowledged the write that justifies it.
#[derive(Clone)]
pub struct DispatchController {
    db: Arc<dyn Database>,
    channel: Arc<dyn ChannelSender>,
    sessions: SessionRegistry,
    auto_advance_delay: Duration,
}

impl DispatchController {
    pub fn new(db: Arc<dyn Database>, channel: Arc<dyn ChannelSender>) -> DispatchController {
        DispatchController {
            db,
            channel,
            sessions: SessionRegistry::new(),
            auto_advance_delay: AUTO_ADVANCE_DELAY,
        }
    }

    pub fn with_auto_advance_delay(mut self, delay: Duration) -> DispatchController {
        self.auto_advance_delay = delay;
        self
    }

    async fn session(&self, campaign_id: CampaignId) -> Result<SharedSession, Error> {
        if let Some(session) = self.sessions.get(campaign_id).await {
            return Ok(session);
        }

        let recipients = manager::list_recipients(&*self.db, campaign_id).await?;
        let cursor = resolve_cursor(&recipients);
        debug!(%campaign_id, cursor, "opening dispatch session");

        Ok(self.sessions.insert(campaign_id, Session::new(cursor)).await)
    }

    /// Locks the campaign's live session. A session closed while we waited
    /// for it is never used; the registry is asked again instead.
    async fn lock_session(&self, campaign_id: CampaignId) -> Result<LockedSession, Error> {
        loop {
            let shared = self.session(campaign_id).await?;
            let session = Arc::clone(&shared).lock_owned().await;
            if !session.is_closed() {
                return Ok((shared, session));
            }

            debug!(%campaign_id, "session closed while waiting for it");
        }
    }

    async fn retire(&self, campaign_id: CampaignId, shared: &SharedSession, session: &mut Session) {
        session.close();
        self.sessions.remove_if(campaign_id, shared).await;
        debug!(%campaign_id, "retired dispatch session");
    }

    /// Resume entry point. The cursor is always resolved again from the
    /// stored statuses.
    #[tracing::instrument(skip(self))]
    pub async fn open_session(&self, campaign_id: CampaignId) -> Result<SessionSnapshot, Error> {
        let (_, mut session) = self.lock_session(campaign_id).await?;
        let (campaign, recipients) = get_campaign_with_recipients(&*self.db, campaign_id).await?;

        session.cursor = resolve_cursor(&recipients);

        Ok(SessionSnapshot::new(campaign, recipients, &session))
    }

    #[tracing::instrument(skip(self))]
    pub async fn dispatch_and_advance(
        &self,
        campaign_id: CampaignId,
        auto_advance: bool,
    ) -> Result<DispatchOutcome, Error> {
        let (shared, mut session) = self.lock_session(campaign_id).await?;

        let mut outcome = self.dispatch_current(campaign_id, &mut session).await?;

        if session.cancel_repeat() {
            debug!(%campaign_id, "manual dispatch replaced a scheduled repeat");
        }
        session.auto_advance = auto_advance;

        if auto_advance && outcome.advanced && !outcome.campaign_complete {
            let generation = session.generation();
            let repeat = self
                .clone()
                .repeat_dispatch(campaign_id, Arc::clone(&shared), generation);
            session.set_repeat(tokio::spawn(repeat));
            outcome.repeat_scheduled = true;
        } else if outcome.campaign_complete {
            self.retire(campaign_id, &shared, &mut session).await;
        }

        Ok(outcome)
    }

    async fn repeat_dispatch(self, campaign_id: CampaignId, shared: SharedSession, generation: u64) {
        loop {
            tokio::time::sleep(self.auto_advance_delay).await;

            let mut session = shared.lock().await;
            if session.generation() != generation {
                debug!(%campaign_id, "auto-advance was cancelled");
                return;
            }

            match self.dispatch_current(campaign_id, &mut session).await {
                Ok(outcome) if outcome.advanced && !outcome.campaign_complete => {
                    debug!(%campaign_id, cursor = outcome.cursor, "auto-advance continues");
                }
                Ok(outcome) => {
                    info!(
                        %campaign_id,
                        campaign_complete = outcome.campaign_complete,
                        "auto-advance finished"
                    );
                    session.clear_repeat();
                    if outcome.campaign_complete {
                        self.retire(campaign_id, &shared, &mut session).await;
                    }
                    return;
                }
                Err(err) => {
                    warn!(%campaign_id, error = %err, "auto-advance stopped");
                    session.clear_repeat();
                    return;
                }
            }
        }
    }

    async fn dispatch_current(
        &self,
        campaign_id: CampaignId,
        session: &mut Session,
    ) -> Result<DispatchOutcome, Error> {
        let (campaign, mut recipients) =
            get_campaign_with_recipients(&*self.db, campaign_id).await?;

        if recipients.is_empty() {
            warn!(%campaign_id, "campaign has no recipients to dispatch");
            return Err(Error::CampaignHasNoRecipients { campaign_id });
        }

        let cursor = session.cursor;
        let current = recipients.get(cursor).ok_or_else(|| {
            Error::ExistentialState(format!(
                "cursor {} is past the {} recipients of campaign {}",
                cursor,
                recipients.len(),
                campaign_id
            ))
        })?;

        if current.is_sent() {
            warn!(%campaign_id, recipient_id = %current.id, "current recipient was already sent");
            return Err(Error::RecipientAlreadySent {
                campaign_id,
                recipient_id: current.id,
            });
        }

        self.channel
            .dispatch(&DispatchRequest::for_recipient(current))
            .await;

        let dispatched =
            manager::set_recipient_status(&*self.db, current, RecipientStatus::Sent, Utc::now())
                .await?;
        recipients[cursor] = dispatched.clone();

        let summary_synced = self.sync_summary(campaign, &recipients).await;
        let progress = Progress::of(&recipients);
        let advanced = cursor + 1 < recipients.len();
        if advanced {
            session.cursor = cursor + 1;
        }

        info!(
            %campaign_id,
            recipient_id = %dispatched.id,
            sent = progress.sent_count,
            total = progress.total_count,
            "recipient dispatched"
        );

        Ok(DispatchOutcome {
            dispatched,
            cursor: session.cursor,
            progress,
            advanced,
            campaign_complete: progress.is_complete(),
            summary_synced,
            repeat_scheduled: false,
        })
    }

    /// Moves the cursor past the current recipient without sending anything.
    #[tracing::instrument(skip(self))]
    pub async fn skip(&self, campaign_id: CampaignId) -> Result<SessionSnapshot, Error> {
        let (_, mut session) = self.lock_session(campaign_id).await?;
        let (campaign, recipients) = get_campaign_with_recipients(&*self.db, campaign_id).await?;

        if session.cursor + 1 >= recipients.len() {
            warn!(%campaign_id, cursor = session.cursor, "nothing to skip to");
            return Err(Error::NoNextRecipient {
                campaign_id,
                cursor: session.cursor,
            });
        }

        session.cursor += 1;

        Ok(SessionSnapshot::new(campaign, recipients, &session))
    }

    /// Manual correction of any recipient's status. The cursor is left where
    /// it is; the next `open_session` resolves it again.
    #[tracing::instrument(skip(self))]
    pub async fn set_recipient_status(
        &self,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
        status: RecipientStatus,
    ) -> Result<OverrideOutcome, Error> {
        let (shared, mut session) = self.lock_session(campaign_id).await?;
        let (campaign, mut recipients) =
            get_campaign_with_recipients(&*self.db, campaign_id).await?;

        let index = recipients
            .iter()
            .position(|r| r.id == recipient_id)
            .ok_or(Error::RecipientNotFound {
                campaign_id,
                recipient_id,
            })?;

        if recipients[index].status != status {
            let updated =
                manager::set_recipient_status(&*self.db, &recipients[index], status, Utc::now())
                    .await?;
            info!(%campaign_id, %recipient_id, status = ?status, "recipient status overridden");
            recipients[index] = updated;
        }

        let summary_synced = self.sync_summary(campaign, &recipients).await;
        let progress = Progress::of(&recipients);

        if progress.is_complete() && !session.repeat_pending() {
            self.retire(campaign_id, &shared, &mut session).await;
        }

        Ok(OverrideOutcome {
            recipient: recipients.swap_remove(index),
            progress,
            campaign_complete: progress.is_complete(),
            summary_synced,
        })
    }

    /// Cancels a scheduled auto-advance repeat. Recipient state is untouched
    /// and resuming is simply the next dispatch.
    #[tracing::instrument(skip(self))]
    pub async fn pause(&self, campaign_id: CampaignId) -> Result<SessionSnapshot, Error> {
        let (_, mut session) = self.lock_session(campaign_id).await?;

        if session.cancel_repeat() {
            info!(%campaign_id, "auto-advance paused");
        }
        session.auto_advance = false;

        let (campaign, recipients) = get_campaign_with_recipients(&*self.db, campaign_id).await?;

        Ok(SessionSnapshot::new(campaign, recipients, &session))
    }

    /// Tears a session down after any in-flight transition on it finished,
    /// and releases what the channel kept for the campaign. Returns whether a
    /// live session existed.
    #[tracing::instrument(skip(self))]
    pub async fn close_session(&self, campaign_id: CampaignId) -> bool {
        let closed = match self.sessions.get(campaign_id).await {
            Some(shared) => {
                let mut session = shared.lock().await;
                if session.is_closed() {
                    false
                } else {
                    session.cancel_repeat();
                    self.retire(campaign_id, &shared, &mut session).await;
                    true
                }
            }
            None => false,
        };

        self.channel.release(campaign_id).await;

        closed
    }

    pub async fn close_all(&self) {
        for (campaign_id, shared) in self.sessions.drain().await {
            let mut session = shared.lock().await;
            session.cancel_repeat();
            session.close();
            debug!(%campaign_id, "closed dispatch session");
        }
    }

    /// Recomputes the campaign summary from scratch.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_summary(&self, campaign_id: CampaignId) -> Result<Campaign, Error> {
        let (_session, _guard) = self.lock_session(campaign_id).await?;
        let (campaign, recipients) = get_campaign_with_recipients(&*self.db, campaign_id).await?;

        refresh_campaign_summary(&*self.db, campaign, &recipients).await
    }

    async fn sync_summary(&self, campaign: Campaign, recipients: &[Recipient]) -> bool {
        let campaign_id = campaign.id;
        match refresh_campaign_summary(&*self.db, campaign, recipients).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%campaign_id, error = %err, "failed to refresh campaign summary");
                false
            }
        }
    }
}
