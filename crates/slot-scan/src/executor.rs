use std::sync::Arc;

use notification_services::Notifier;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::cowin_client::{Appointments, CowinClient, FetchOutcome, today};
use crate::eligibility::filter_sessions;
use crate::location_resolver::LocationResolver;
use crate::scan_types::*;

/// What a single poll cycle ended with.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The API withheld data (HTTP 401); nothing to do until the next tick
    NoData,
    /// Data came back but no session qualified
    NoMatches,
    /// A report was delivered
    Notified {
        /// Number of sessions in the report
        sessions: usize,
    },
    /// A transient error ended the cycle early
    Skipped(ScanError),
}

/// Tunables for [`ScanExecutor`].
#[derive(Debug, Clone, Default)]
pub struct ScanExecutorConfig {
    /// Stop polling when a report cannot be delivered (default: false)
    pub fatal_notification_errors: bool,
}

/// Drives resolve → fetch → filter → notify on a fixed interval.
///
/// Cycles run one at a time and never overlap.
pub struct ScanExecutor {
    client: Arc<CowinClient>,
    resolver: LocationResolver,
    notifier: Arc<dyn Notifier>,
    criteria: SearchCriteria,
    config: ScanExecutorConfig,
    cycles: u64,
}

impl ScanExecutor {
    /// Create an executor; `config` falls back to [`ScanExecutorConfig::default`].
    pub fn new(
        client: Arc<CowinClient>,
        notifier: Arc<dyn Notifier>,
        criteria: SearchCriteria,
        config: Option<ScanExecutorConfig>,
    ) -> Self {
        Self {
            resolver: LocationResolver::new(client.clone()),
            client,
            notifier,
            criteria,
            config: config.unwrap_or_default(),
            cycles: 0,
        }
    }

    /// Criteria this executor searches with
    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Location IDs resolved so far
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Start polling; returns only on a fatal error.
    ///
    /// The first cycle runs immediately, later ones on every interval tick.
    pub async fn start(&mut self) -> Result<(), ScanError> {
        info!(
            "Starting slot search for {} every {}s",
            self.criteria.location(),
            self.criteria.interval().as_secs()
        );

        let mut poll_interval = interval(self.criteria.interval());
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            poll_interval.tick().await;
            self.tick().await?;
        }
    }

    /// Run one cycle, turning transient errors into [`CycleOutcome::Skipped`].
    pub async fn tick(&mut self) -> Result<CycleOutcome, ScanError> {
        self.cycles += 1;

        match self.run_cycle().await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => {
                error!("Stopping slot search: {}", e);
                Err(e)
            }
            Err(ScanError::Notify(e)) if self.config.fatal_notification_errors => {
                error!("Stopping slot search, report could not be delivered: {}", e);
                Err(ScanError::Notify(e))
            }
            Err(e) => {
                warn!("Cycle {} skipped: {}", self.cycles, e);
                Ok(CycleOutcome::Skipped(e))
            }
        }
    }

    /// Run one cycle and surface every error.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, ScanError> {
        debug!("Starting poll cycle {}", self.cycles);

        let date = today();
        let fetched = match self.criteria.location() {
            SearchLocation::PinCode(pin_code) => {
                self.client.calendar_by_pin(pin_code, &date).await?
            }
            SearchLocation::District { state, district } => {
                match self.resolver.resolve(state, district).await? {
                    Some(district_id) => {
                        self.client
                            .calendar_by_district(district_id, &date)
                            .await?
                    }
                    None => FetchOutcome::NoData,
                }
            }
        };

        let Some(appointments) = fetched.parse::<Appointments>()? else {
            info!("No data from the API this time, rechecking");
            return Ok(CycleOutcome::NoData);
        };

        let report = filter_sessions(&appointments, &self.criteria);
        if report.is_empty() {
            info!("No slots available, rechecking");
            return Ok(CycleOutcome::NoMatches);
        }

        info!(
            "Found {} available session(s), sending notification",
            report.len()
        );
        self.notifier.send_message(&report.to_text()).await?;

        Ok(CycleOutcome::Notified {
            sessions: report.len(),
        })
    }
}
