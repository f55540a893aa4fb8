use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use herald_audit::{AuditLog, SendRecord};
use herald_campaign::flow::{self, DueStep};
use herald_campaign::{attach, schedule, Campaign, Trigger};
use herald_channels::{OutboundDelivery, TransportError, TransportRegistry};
use herald_core::error::{HeraldError, Result};
use herald_store::{MetadataStore, StepOutcome};

/// Counters for one evaluation pass, returned for observability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickSummary {
    pub campaigns_evaluated: usize,
    pub campaigns_skipped: usize,
    /// Campaigns whose schedule matched this tick's instant.
    pub campaigns_due: usize,
    pub claims_attempted: usize,
    pub claims_won: usize,
    /// Claims that found an existing entry for the tuple. Expected noise
    /// under racing evaluators, not an error.
    pub claims_lost: usize,
    pub sends_ok: usize,
    pub sends_failed: usize,
    /// Steps whose attachment failed to resolve; marked failed, never sent.
    pub malformed_attachments: usize,
    /// Pending claims older than the grace period, reported for operators.
    pub stuck_claims: usize,
}

/// Drives campaign evaluation: one [`Evaluator::evaluate_tick`] call decides,
/// for every enabled campaign and enrolled recipient, which flow steps are
/// due, claims each step exclusively through the metadata store, delivers it
/// over the campaign's transport, and records the outcome in the store and
/// the audit log.
///
/// The evaluator itself is stateless between ticks. Everything that must
/// survive a crash or a racing second instance lives in the metadata store,
/// so overlapping ticks and restarts are safe: re-derived steps collide on
/// the claim and lose.
pub struct Evaluator {
    campaigns: Vec<Campaign>,
    store: MetadataStore,
    audit: AuditLog,
    transports: TransportRegistry,
    tick_secs: u64,
    stuck_grace: Duration,
}

impl Evaluator {
    pub fn new(
        campaigns: Vec<Campaign>,
        store: MetadataStore,
        audit: AuditLog,
        transports: TransportRegistry,
        tick_secs: u64,
        stuck_grace_minutes: u64,
    ) -> Self {
        Self {
            campaigns,
            store,
            audit,
            transports,
            // A zero interval would panic in the tick loop.
            tick_secs: tick_secs.max(1),
            stuck_grace: Duration::minutes(stuck_grace_minutes as i64),
        }
    }

    /// Evaluate all campaigns at `now`.
    ///
    /// `now` is injected rather than read from the clock so ticks are
    /// deterministic under test. Campaign-level problems (invalid config,
    /// malformed attachment, transport failure) are contained and counted;
    /// store or audit failures abort the tick, because continuing without
    /// durable claim state could double-send on the next pass.
    pub async fn evaluate_tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let mut summary = TickSummary::default();

        for campaign in &self.campaigns {
            if !campaign.enabled {
                summary.campaigns_skipped += 1;
                continue;
            }
            if let Err(e) = campaign.validate() {
                warn!(campaign = %campaign.id, error = %e, "invalid campaign skipped");
                summary.campaigns_skipped += 1;
                continue;
            }
            summary.campaigns_evaluated += 1;

            // Instances owing work this tick: the schedule's current firing
            // (if any) plus recently claimed instances whose later reminders
            // may have matured. The set dedupes when both name the same one.
            let mut instances: BTreeSet<(String, DateTime<Utc>)> = BTreeSet::new();

            if let Some(trigger) = schedule::evaluate(&campaign.config, now, self.tick_secs) {
                summary.campaigns_due += 1;
                for recipient in &campaign.recipients {
                    instances.insert((recipient.clone(), trigger.at));
                }
            }

            // An instance can owe steps for as long as its last reminder
            // offset, plus the grace allowed for late delivery. Older
            // instances age out and their unsent reminders are abandoned.
            let horizon =
                Duration::minutes(campaign.flow.last_offset_minutes() as i64) + self.stuck_grace;
            let open = self
                .store
                .instances_since(&campaign.id, now - horizon)
                .map_err(store_err)?;
            let enrolled: HashSet<&str> =
                campaign.recipients.iter().map(|r| r.as_str()).collect();
            for instance in open {
                // Recipients dropped from the roster mid-flow get no
                // further steps.
                if enrolled.contains(instance.recipient_key.as_str()) {
                    instances.insert((instance.recipient_key, instance.trigger_at));
                }
            }

            for (recipient_key, trigger_at) in instances {
                let trigger = Trigger {
                    at: trigger_at,
                    window_end: schedule::window_end(&campaign.config, trigger_at),
                };
                let steps = flow::steps_due(&campaign.flow, &trigger, now);
                if steps.is_empty() {
                    continue;
                }

                // Offsets already claimed for this instance; skipping them
                // up front keeps revisits from burning an insert per step.
                let done: HashSet<u32> = self
                    .store
                    .list_for_instance(&recipient_key, &campaign.id, trigger_at)
                    .map_err(store_err)?
                    .iter()
                    .map(|item| item.step_offset)
                    .collect();

                for step in steps {
                    if done.contains(&step.offset_minutes) {
                        continue;
                    }
                    summary.claims_attempted += 1;
                    let won = self
                        .store
                        .try_claim(
                            &recipient_key,
                            &campaign.id,
                            trigger_at,
                            step.offset_minutes,
                            step.message,
                            step.due_at,
                        )
                        .map_err(store_err)?;
                    if !won {
                        summary.claims_lost += 1;
                        continue;
                    }
                    summary.claims_won += 1;

                    self.deliver(campaign, &recipient_key, trigger_at, &step, now, &mut summary)
                        .await?;
                }
            }
        }

        let stuck = self
            .store
            .stuck_claims(now, self.stuck_grace)
            .map_err(store_err)?;
        summary.stuck_claims = stuck.len();
        for claim in &stuck {
            warn!(
                campaign = %claim.campaign_id,
                recipient = %claim.recipient_key,
                offset = claim.step_offset,
                claimed_at = %claim.claimed_at,
                "claim pending past grace; needs operator review"
            );
        }

        Ok(summary)
    }

    /// Deliver one claimed step and record its terminal outcome.
    ///
    /// The claim is already won, so every path out of here must resolve it:
    /// a malformed attachment or a transport failure marks the step failed
    /// rather than leaving it pending for a retry that must never happen.
    async fn deliver(
        &self,
        campaign: &Campaign,
        recipient_key: &str,
        trigger_at: DateTime<Utc>,
        step: &DueStep<'_>,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) -> Result<()> {
        let payload = match attach::resolve(step.attachment) {
            Ok(payload) => payload,
            Err(e) => {
                summary.malformed_attachments += 1;
                warn!(
                    campaign = %campaign.id,
                    recipient = %recipient_key,
                    offset = step.offset_minutes,
                    error = %e,
                    "attachment rejected; step marked failed"
                );
                self.store
                    .record_outcome(
                        recipient_key,
                        &campaign.id,
                        trigger_at,
                        step.offset_minutes,
                        StepOutcome::Failed {
                            error: e.to_string(),
                        },
                    )
                    .map_err(store_err)?;
                return Ok(());
            }
        };

        let delivery = OutboundDelivery {
            campaign_id: campaign.id.clone(),
            recipient_key: recipient_key.to_string(),
            content: step.message.to_string(),
            payload: payload.clone(),
        };
        let send_result = match self.transports.get(&campaign.transport) {
            Some(transport) => transport.send(&delivery).await,
            None => Err(TransportError::Unavailable(format!(
                "no transport named '{}'",
                campaign.transport
            ))),
        };

        match send_result {
            Ok(()) => {
                summary.sends_ok += 1;
                self.store
                    .record_outcome(
                        recipient_key,
                        &campaign.id,
                        trigger_at,
                        step.offset_minutes,
                        StepOutcome::Sent {
                            attachment_sent: payload,
                        },
                    )
                    .map_err(store_err)?;
                self.audit
                    .append(&audit_record(campaign, recipient_key, step.message, now, None))
                    .map_err(audit_err)?;
                info!(
                    campaign = %campaign.id,
                    recipient = %recipient_key,
                    offset = step.offset_minutes,
                    "step delivered"
                );
            }
            Err(e) => {
                summary.sends_failed += 1;
                warn!(
                    campaign = %campaign.id,
                    recipient = %recipient_key,
                    offset = step.offset_minutes,
                    error = %e,
                    "delivery failed"
                );
                self.store
                    .record_outcome(
                        recipient_key,
                        &campaign.id,
                        trigger_at,
                        step.offset_minutes,
                        StepOutcome::Failed {
                            error: e.to_string(),
                        },
                    )
                    .map_err(store_err)?;
                self.audit
                    .append(&audit_record(
                        campaign,
                        recipient_key,
                        step.message,
                        now,
                        Some(format!("delivery failed: {e}")),
                    ))
                    .map_err(audit_err)?;
            }
        }
        Ok(())
    }

    /// Main loop. Ticks every `tick_secs` until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            campaigns = self.campaigns.len(),
            transports = ?self.transports.names(),
            tick_secs = self.tick_secs,
            "delivery engine started"
        );

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.tick_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.evaluate_tick(Utc::now()).await {
                        Ok(summary) => {
                            if summary.claims_attempted > 0 || summary.stuck_claims > 0 {
                                info!(
                                    claims_won = summary.claims_won,
                                    claims_lost = summary.claims_lost,
                                    sends_ok = summary.sends_ok,
                                    sends_failed = summary.sends_failed,
                                    stuck = summary.stuck_claims,
                                    "tick complete"
                                );
                            }
                        }
                        Err(e) => error!(code = e.code(), "tick failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("delivery engine shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn store_err(e: herald_store::StoreError) -> HeraldError {
    HeraldError::Store(e.to_string())
}

fn audit_err(e: herald_audit::AuditError) -> HeraldError {
    HeraldError::Audit(e.to_string())
}

/// Audit row for one delivery attempt.
fn audit_record(
    campaign: &Campaign,
    recipient_key: &str,
    message: &str,
    now: DateTime<Utc>,
    notes: Option<String>,
) -> SendRecord {
    SendRecord {
        content: message.to_string(),
        sent_at: now,
        sent_from: campaign.sender.clone(),
        sent_to: recipient_key.to_string(),
        recipient_key: Some(recipient_key.to_string()),
        user_id: None,
        send_function: campaign.send_function.clone(),
        notes,
    }
}
