// Refresh service - periodic re-pull of the sample states and key states
use crate::application::pricing_service::PricingService;
use crate::domain::geography::SampleRoster;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub regional_saved: bool,
    pub key_states_saved: usize,
    pub key_states_failed: Vec<String>,
}

#[derive(Clone)]
pub struct RefreshService {
    pricing: PricingService,
    schedule: RefreshSchedule,
}

impl RefreshService {
    pub fn new(pricing: PricingService, schedule: RefreshSchedule) -> Self {
        Self { pricing, schedule }
    }

    /// Run the schedule on a background task until the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// One cycle after the initial delay, then one per interval. A failed cycle
    /// is logged and the next one still runs.
    pub async fn run(&self) {
        tracing::info!(
            initial_delay_secs = self.schedule.initial_delay.as_secs(),
            interval_secs = self.schedule.interval.as_secs(),
            "Scheduled fuel price refresh"
        );
        tokio::time::sleep(self.schedule.initial_delay).await;

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.schedule.interval,
            self.schedule.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.run_cycle().await;
            ticker.tick().await;
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        tracing::info!("Running scheduled data refresh");

        let national = self
            .pricing
            .national_averages(SampleRoster::Refresh)
            .await;
        let mut report = CycleReport {
            regional_saved: national.saved,
            ..Default::default()
        };

        for state in &self.pricing.geography().key_states {
            if self.pricing.refresh_state(state).await {
                report.key_states_saved += 1;
            } else {
                report.key_states_failed.push(state.clone());
            }
        }

        if report.regional_saved && report.key_states_failed.is_empty() {
            tracing::info!(
                key_states = report.key_states_saved,
                "Scheduled data refresh completed"
            );
        } else {
            tracing::warn!(
                regional_saved = report.regional_saved,
                failed = ?report.key_states_failed,
                "Scheduled data refresh completed with failures"
            );
        }
        report
    }
}
