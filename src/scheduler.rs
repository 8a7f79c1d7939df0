//! Background jobs run at fixed Istanbul wall clock times or intervals
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
use chrono_tz::{Europe::Istanbul, Tz};
use log::{error, info};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::alerts::AlertChecker;
use crate::datatypes::date_time_helper::istanbul_now;
use crate::sync::SyncJobs;

/// Time until the next `hour:minute` in Istanbul, strictly after `now`
pub fn duration_until(now: DateTime<Tz>, hour: u32, minute: u32) -> Duration {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .and_then(|t| Istanbul.from_local_datetime(&t).earliest());
    let next = match today {
        Some(target) if target > now => target,
        Some(target) => target + ChronoDuration::days(1),
        None => now + ChronoDuration::days(1),
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at the given Istanbul time
    Daily { hour: u32, minute: u32 },
    Every(Duration),
}

impl Schedule {
    pub fn next_delay(&self, now: DateTime<Tz>) -> Duration {
        match *self {
            Schedule::Daily { hour, minute } => duration_until(now, hour, minute),
            Schedule::Every(interval) => interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    TuikInflation,
    Tcmb,
    Scraper,
    AlertCheck,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TuikInflation => "TÜİK inflation",
            Self::Tcmb => "TCMB exchange rates",
            Self::Scraper => "doviz.com scraper",
            Self::AlertCheck => "alert check",
        }
    }
}

pub struct Scheduler {
    jobs: Arc<SyncJobs>,
    alerts: Arc<AlertChecker>,
    alert_interval: Duration,
}

impl Scheduler {
    pub fn new(jobs: Arc<SyncJobs>, alerts: Arc<AlertChecker>, alert_interval: Duration) -> Self {
        Scheduler {
            jobs,
            alerts,
            alert_interval,
        }
    }

    pub fn schedules(&self) -> [(JobKind, Schedule); 4] {
        [
            (JobKind::TuikInflation, Schedule::Daily { hour: 10, minute: 30 }),
            (JobKind::Tcmb, Schedule::Daily { hour: 15, minute: 45 }),
            (JobKind::Scraper, Schedule::Daily { hour: 18, minute: 30 }),
            (JobKind::AlertCheck, Schedule::Every(self.alert_interval)),
        ]
    }

    /// Run a job once, returning a short summary
    pub async fn run_once(&self, kind: JobKind) -> Result<String, String> {
        match kind {
            JobKind::TuikInflation => self
                .jobs
                .macro_data
                .sync_tuik_inflation()
                .await
                .map(|figures| format!("{} inflation figures stored", figures.len()))
                .map_err(|e| e.to_string()),
            JobKind::Tcmb => self
                .jobs
                .macro_data
                .sync_tcmb()
                .await
                .map(|report| format!("{} of {} rates stored", report.success_count, report.total))
                .map_err(|e| e.to_string()),
            JobKind::Scraper => self
                .jobs
                .scraper
                .run()
                .await
                .map(|report| format!("{} values stored, {} failed", report.stored, report.failed.len()))
                .map_err(|e| e.to_string()),
            JobKind::AlertCheck => self
                .alerts
                .check_all()
                .await
                .map(|report| format!("{} alerts checked, {} triggered", report.checked, report.triggered))
                .map_err(|e| e.to_string()),
        }
    }

    async fn run_loop(self: Arc<Self>, kind: JobKind, schedule: Schedule) {
        let mut iteration: u64 = 0;
        loop {
            let delay = schedule.next_delay(istanbul_now());
            info!("next {} run in {}s", kind.name(), delay.as_secs());
            sleep(delay).await;
            iteration += 1;
            match self.run_once(kind).await {
                Ok(summary) => info!("{} run #{}: {}", kind.name(), iteration, summary),
                Err(err) => error!("{} run #{} failed: {}", kind.name(), iteration, err),
            }
        }
    }

    /// Start one task per job on the current runtime
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let scheduler = Arc::new(self);
        scheduler
            .schedules()
            .into_iter()
            .map(|(kind, schedule)| tokio::spawn(scheduler.clone().run_loop(kind, schedule)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LogNotifier;
    use crate::config::Config;
    use crate::memory_handler::InMemoryDB;
    use crate::providers::tests::DummyProvider;

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        Istanbul.with_ymd_and_hms(2025, 10, 17, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_duration_until() {
        assert_eq!(duration_until(at(9, 0), 10, 30), Duration::from_secs(90 * 60));
        assert_eq!(
            duration_until(at(16, 0), 15, 45),
            Duration::from_secs((23 * 60 + 45) * 60)
        );
        assert_eq!(duration_until(at(18, 30), 18, 30), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_next_delay() {
        let every = Schedule::Every(Duration::from_secs(300));
        assert_eq!(every.next_delay(at(12, 0)), Duration::from_secs(300));
        let daily = Schedule::Daily { hour: 18, minute: 30 };
        assert_eq!(daily.next_delay(at(18, 0)), Duration::from_secs(1800));
    }

    fn scheduler(config: &Config) -> Scheduler {
        let db = Arc::new(InMemoryDB::new());
        let provider = Arc::new(DummyProvider::new());
        let jobs = SyncJobs::new(config, db.clone(), provider.clone(), reqwest::Client::new());
        let alerts = AlertChecker::new(db, provider, Arc::new(LogNotifier));
        Scheduler::new(
            Arc::new(jobs),
            Arc::new(alerts),
            config.scheduler.alert_check_interval,
        )
    }

    #[test]
    fn test_schedules() {
        let scheduler = scheduler(&Config::default());
        let schedules = scheduler.schedules();
        assert_eq!(
            schedules[1],
            (JobKind::Tcmb, Schedule::Daily { hour: 15, minute: 45 })
        );
        assert_eq!(
            schedules[3],
            (JobKind::AlertCheck, Schedule::Every(Duration::from_secs(300)))
        );
    }

    #[tokio::test]
    async fn test_run_once() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;
        let mut config = Config::default();
        config.providers.doviz = server.url();
        let scheduler = scheduler(&config);

        let summary = scheduler.run_once(JobKind::AlertCheck).await.unwrap();
        assert_eq!(summary, "0 alerts checked, 0 triggered");
        assert!(scheduler.run_once(JobKind::Scraper).await.is_err());
    }
}
