use slog::{debug, error, info, Logger};

use primitives::{EventSubmission, UnifiedNum};

use crate::{
    db::{AdStore, Error, SkipReason, Submission},
    payout::get_payout,
};

/// The best-effort outcome of recording a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Applied {
        charged: UnifiedNum,
        completed: bool,
    },
    Skipped(SkipReason),
    /// A store failure; the event is lost and the serving path carries on.
    Dropped,
}

/// Prices an event and applies it to the ledger and the campaign spend.
///
/// Recording never propagates store errors to the caller. A failed event
/// is logged and dropped so that a reporting hiccup can not take the
/// serving path down with it.
pub async fn record_event<S: AdStore>(
    store: &S,
    logger: &Logger,
    submission: &EventSubmission,
) -> Recorded {
    match try_record(store, submission).await {
        Ok(Submission::Applied { charged, completed }) => {
            if completed {
                info!(logger, "Campaign budget exhausted, completing"; "campaign" => %submission.campaign_id);
            }

            Recorded::Applied { charged, completed }
        }
        Ok(Submission::Skipped(reason)) => {
            debug!(logger, "Event skipped"; "campaign" => %submission.campaign_id, "reason" => ?reason);

            Recorded::Skipped(reason)
        }
        Err(error) => {
            error!(logger, "Failed to record event"; "campaign" => %submission.campaign_id, "error" => ?error);

            Recorded::Dropped
        }
    }
}

async fn try_record<S: AdStore>(
    store: &S,
    submission: &EventSubmission,
) -> Result<Submission, Error> {
    // The rates are read outside the transaction, only `spent` has to be
    // re-read inside it. The store re-checks existence and status itself.
    let campaign = match store.campaign(submission.campaign_id).await? {
        Some(campaign) => campaign,
        None => return Ok(Submission::Skipped(SkipReason::NotFound)),
    };

    let nominal = get_payout(&campaign, submission.event_type);

    store.submit_event(submission, nominal).await
}
