//! Timezone-aware job scheduling.
//!
//! Times of day are authored in one timezone (where the operator
//! thinks) and fired relative to another (where the audience reads).
//! An `HH:MM` input resolves to the next occurrence of that wall-clock
//! time in the authoring zone, then converts to an absolute instant.
//!
//! Each job runs on its own driver task. Firing spawns the post
//! workflow detached, so stopping the scheduler halts future firings
//! without killing a cycle already in flight.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DuplicatePolicy;
use crate::engine::Orchestrator;
use crate::types::{HeraldError, SchedulerHealth};

struct JobEntry {
    next_fire: DateTime<Utc>,
    handle: JoinHandle<()>,
}

pub struct TimezoneScheduler {
    orchestrator: Arc<Orchestrator>,
    author_tz: Tz,
    publish_tz: Tz,
    recurring_times: Vec<String>,
    duplicate_policy: DuplicatePolicy,
    running: AtomicBool,
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl TimezoneScheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        author_tz: Tz,
        publish_tz: Tz,
        recurring_times: Vec<String>,
        duplicate_policy: DuplicatePolicy,
    ) -> Self {
        Self {
            orchestrator,
            author_tz,
            publish_tz,
            recurring_times,
            duplicate_policy,
            running: AtomicBool::new(false),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    // -- Trigger resolution -----------------------------------------------

    /// Resolve `HH:MM` to the next matching instant, expressed in the
    /// publishing timezone.
    ///
    /// The wall-clock time is anchored to "now" in the authoring zone
    /// and rolled forward a day when it has already passed. A time that
    /// falls inside a DST gap resolves to the earliest valid
    /// interpretation the zone offers.
    pub fn resolve_trigger(
        &self,
        time_str: &str,
        now_utc: DateTime<Utc>,
    ) -> Result<DateTime<Tz>, HeraldError> {
        let time = parse_time_of_day(time_str)?;
        let now_local = now_utc.with_timezone(&self.author_tz);

        let mut date = now_local.date_naive();
        for _ in 0..3 {
            let candidate = self
                .author_tz
                .from_local_datetime(&date.and_time(time))
                .earliest();
            match candidate {
                Some(instant) if instant > now_local => {
                    return Ok(instant.with_timezone(&self.publish_tz));
                }
                // Passed already, or a DST gap swallowed the wall time.
                _ => date = date.succ_opt().ok_or_else(|| {
                    HeraldError::InvalidTime(time_str.to_string())
                })?,
            }
        }
        Err(HeraldError::InvalidTime(time_str.to_string()))
    }

    // -- Job registration -------------------------------------------------

    /// Register a one-shot job for the next occurrence of `time_str`.
    /// Returns the job id. The same wall-clock time can be scheduled
    /// more than once; the random suffix keeps the keys distinct even
    /// for back-to-back requests.
    pub fn schedule_at(self: &Arc<Self>, time_str: &str) -> Result<String, HeraldError> {
        let fire_at = self.resolve_trigger(time_str, Utc::now())?;
        let fire_at_utc = fire_at.with_timezone(&Utc);
        let job_id = format!("once:{}@{}", time_str, Uuid::new_v4());

        info!(job_id = %job_id, fire_at = %fire_at, "One-shot job scheduled");

        let scheduler = Arc::clone(self);
        let id = job_id.clone();
        let handle = tokio::spawn(async move {
            sleep_until_utc(fire_at_utc).await;
            scheduler.fire(&id);
            scheduler.jobs.lock().expect("jobs lock poisoned").remove(&id);
        });

        self.jobs.lock().expect("jobs lock poisoned").insert(
            job_id.clone(),
            JobEntry {
                next_fire: fire_at_utc,
                handle,
            },
        );
        Ok(job_id)
    }

    /// Register a recurring daily job keyed by its wall-clock time.
    /// A duplicate key follows the configured policy: replace the
    /// existing job or keep it and ignore the request.
    pub fn schedule_daily(self: &Arc<Self>, time_str: &str) -> Result<String, HeraldError> {
        let first_fire = self
            .resolve_trigger(time_str, Utc::now())?
            .with_timezone(&Utc);
        let job_id = format!("daily:{time_str}");

        {
            let mut jobs = self.jobs.lock().expect("jobs lock poisoned");
            if let Some(existing) = jobs.get(&job_id) {
                match self.duplicate_policy {
                    DuplicatePolicy::Ignore => {
                        info!(job_id = %job_id, "Duplicate daily job ignored");
                        return Ok(job_id);
                    }
                    DuplicatePolicy::Replace => {
                        info!(job_id = %job_id, "Replacing existing daily job");
                        existing.handle.abort();
                        jobs.remove(&job_id);
                    }
                }
            }
        }

        info!(job_id = %job_id, first_fire = %first_fire, "Daily job scheduled");

        let scheduler = Arc::clone(self);
        let id = job_id.clone();
        let time = time_str.to_string();
        let handle = tokio::spawn(async move {
            let mut next = first_fire;
            loop {
                sleep_until_utc(next).await;
                scheduler.fire(&id);

                next = match scheduler.resolve_trigger(&time, Utc::now()) {
                    Ok(instant) => instant.with_timezone(&Utc),
                    // Cannot happen for a time that already resolved once.
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "Recompute failed, job stopping");
                        scheduler.jobs.lock().expect("jobs lock poisoned").remove(&id);
                        return;
                    }
                };
                if let Some(entry) = scheduler
                    .jobs
                    .lock()
                    .expect("jobs lock poisoned")
                    .get_mut(&id)
                {
                    entry.next_fire = next;
                }
            }
        });

        self.jobs.lock().expect("jobs lock poisoned").insert(
            job_id.clone(),
            JobEntry {
                next_fire: first_fire,
                handle,
            },
        );
        Ok(job_id)
    }

    /// Fire a job: spawn the post workflow detached. The driver task
    /// does not await the outcome; the workflow logs its own result.
    fn fire(&self, job_id: &str) {
        info!(job_id, "Job firing");
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            orchestrator.run_post_workflow(false).await;
        });
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Register every configured recurring time and mark the scheduler
    /// running. Idempotent under the replace policy.
    pub fn start(self: &Arc<Self>) -> Result<(), HeraldError> {
        for time in self.recurring_times.clone() {
            self.schedule_daily(&time)?;
        }
        self.running.store(true, Ordering::SeqCst);
        info!(jobs = self.job_count(), "Scheduler started");
        Ok(())
    }

    /// Halt all future firing. Workflows already spawned run to
    /// completion on their own tasks.
    pub fn stop(&self) {
        let mut jobs = self.jobs.lock().expect("jobs lock poisoned");
        for (job_id, entry) in jobs.drain() {
            entry.handle.abort();
            info!(job_id = %job_id, "Job cancelled");
        }
        self.running.store(false, Ordering::SeqCst);
        info!("Scheduler stopped");
    }

    pub fn health_status(&self) -> SchedulerHealth {
        let jobs = self.jobs.lock().expect("jobs lock poisoned");
        SchedulerHealth {
            running: self.running.load(Ordering::SeqCst),
            job_count: jobs.len(),
            next_fire_time: jobs.values().map(|e| e.next_fire).min(),
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().expect("jobs lock poisoned").len()
    }
}

/// Parse a strict `HH:MM` wall-clock time.
fn parse_time_of_day(time_str: &str) -> Result<NaiveTime, HeraldError> {
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .map_err(|_| HeraldError::InvalidTime(time_str.to_string()))
}

/// Sleep until an absolute UTC instant, in a form the paused test clock
/// can fast-forward through.
async fn sleep_until_utc(instant: DateTime<Utc>) {
    let wait = (instant - Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    tokio::time::sleep(wait).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
