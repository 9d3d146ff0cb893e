//! Pass scheduler.
//!
//! Runs one pass when started and then one per interval, until asked to stop.
//! Passes never overlap: each one runs to completion on the blocking pool
//! before the loop looks at the timer or its command channel again.
//! A [`SchedulerHandle`] can request an extra pass or stop the loop; a pass
//! that is already running is never interrupted.

use crate::scanner::{BackupScanner, PassReport};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

enum Command {
    RunNow(oneshot::Sender<PassReport>),
    Shutdown,
}

/// Handle used to drive a running [`MirrorScheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    /// Run a pass now, out of schedule, and wait for its report
    pub async fn run_now(&self) -> Result<PassReport> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::RunNow(reply_tx))
            .await
            .map_err(|_| Error::SchedulerStopped)?;
        reply_rx.await.map_err(|_| Error::SchedulerStopped)
    }

    /// Ask the loop to stop once the current pass (if any) is done
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

/// What the loop did before it stopped
#[derive(Debug, Default)]
pub struct SchedulerSummary {
    pub passes: usize,
    pub last_report: Option<PassReport>,
}

/// Interval driven pass loop
pub struct MirrorScheduler {
    scanner: Arc<BackupScanner>,
    interval: Duration,
    commands: mpsc::Receiver<Command>,
    reports: Option<mpsc::UnboundedSender<PassReport>>,
}

impl MirrorScheduler {
    /// Scheduler ticking at the interval configured on `scanner`
    pub fn new(scanner: BackupScanner) -> (Self, SchedulerHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let interval = scanner.config().interval;

        (
            Self {
                scanner: Arc::new(scanner),
                interval,
                commands: commands_rx,
                reports: None,
            },
            SchedulerHandle {
                commands: commands_tx,
            },
        )
    }

    /// Also publish every pass report on `reports`
    pub fn report_to(mut self, reports: mpsc::UnboundedSender<PassReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Run until [`SchedulerHandle::shutdown`] or a fatal pass error.
    ///
    /// Dropping every handle does not stop the loop; it keeps passing on
    /// the timer.
    pub async fn run(mut self) -> Result<SchedulerSummary> {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = SchedulerSummary::default();
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::RunNow(reply)) => {
                        debug!("Out-of-band pass requested");
                        let report = self.pass(&mut summary).await?;
                        let _ = reply.send(report);
                    }
                    Some(Command::Shutdown) => {
                        info!("Scheduler stopping after {} passes", summary.passes);
                        break;
                    }
                    None => commands_open = false,
                },

                _ = ticker.tick() => {
                    self.pass(&mut summary).await?;
                    debug!("Next pass in {}s", self.interval.as_secs());
                }
            }
        }

        Ok(summary)
    }

    async fn pass(&self, summary: &mut SchedulerSummary) -> Result<PassReport> {
        let scanner = Arc::clone(&self.scanner);
        let report = tokio::task::spawn_blocking(move || scanner.run_pass()).await??;

        if let Some(failure) = &report.aborted {
            warn!("Pass ended early ({}); next pass starts over", failure);
        }

        summary.passes += 1;
        summary.last_report = Some(report.clone());
        if let Some(reports) = &self.reports {
            let _ = reports.send(report.clone());
        }

        Ok(report)
    }
}
