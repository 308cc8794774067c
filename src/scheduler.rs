//! Arranges for the ledger's rollover check to run again at the next cutoff.
//!
//! Timing is best effort. The check itself is idempotent, so a late, early
//! or missing wake-up only changes how soon the fold happens, never whether
//! it happens correctly.

use crate::clock::Clock;
use crate::ledger::{DailyLedger, Rollover};
use crate::repo::{AccountingRepository, HistoryRepository};
use crate::storage::StoreError;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const ROLLOVER_TRIGGER_ID: &str = "daily-rollover";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Exact,
    Inexact,
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("exact wake-ups are not permitted")]
    ExactNotPermitted,
    #[error("wake-up facility unavailable: {0}")]
    Unavailable(String),
}

/// Platform facility that calls back at or after an instant. Registering an
/// id again replaces the earlier registration.
pub trait WakeRegistrar {
    fn register(
        &self,
        id: &'static str,
        at: DateTime<Utc>,
        precision: Precision,
    ) -> Result<(), TriggerError>;
}

pub struct RolloverScheduler<W> {
    registrar: W,
}

impl<W: WakeRegistrar> RolloverScheduler<W> {
    pub fn new(registrar: W) -> Self {
        Self { registrar }
    }

    pub fn registrar(&self) -> &W {
        &self.registrar
    }

    /// Registers the rollover wake-up, falling back to an inexact one when
    /// exact timing is refused. Returns the precision that was granted.
    pub fn arm<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<Precision> {
        let at = at.with_timezone(&Utc);
        match self.registrar.register(ROLLOVER_TRIGGER_ID, at, Precision::Exact) {
            Ok(()) => {
                debug!(%at, "armed exact rollover wake-up");
                Some(Precision::Exact)
            }
            Err(err) => {
                warn!(%at, "exact wake-up refused ({err}); falling back to inexact");
                match self.registrar.register(ROLLOVER_TRIGGER_ID, at, Precision::Inexact) {
                    Ok(()) => Some(Precision::Inexact),
                    Err(err) => {
                        warn!(%at, "could not arm rollover wake-up: {err}");
                        None
                    }
                }
            }
        }
    }

    /// App came to the foreground: catch up on any missed cutoff and arm
    /// the next one.
    pub fn on_resume<R, C>(&self, ledger: &DailyLedger<R, C>) -> Result<Rollover, StoreError>
    where
        R: AccountingRepository + HistoryRepository,
        C: Clock,
    {
        let rollover = ledger.ensure_rollover();
        self.arm(&ledger.next_cutoff());
        rollover
    }

    /// User asked for a reset: fold the live day and arm the next cutoff.
    pub fn on_reset<R, C>(&self, ledger: &DailyLedger<R, C>) -> Result<Rollover, StoreError>
    where
        R: AccountingRepository + HistoryRepository,
        C: Clock,
    {
        let rollover = ledger.reset_now()?;
        self.arm(&ledger.next_cutoff());
        Ok(rollover)
    }

    /// The wake-up fired, possibly late.
    pub fn on_trigger<R, C>(&self, ledger: &DailyLedger<R, C>) -> Result<Rollover, StoreError>
    where
        R: AccountingRepository + HistoryRepository,
        C: Clock,
    {
        // re-arm even when the check failed so the next cutoff is not lost
        let rollover = ledger.ensure_rollover();
        self.arm(&ledger.next_cutoff());
        if let Ok(Rollover::Folded { date, .. }) = &rollover {
            info!(%date, "rollover wake-up folded the day");
        }
        rollover
    }
}

/// Wake-ups as tokio timers. Each firing sends the trigger id on the
/// channel returned by [`TokioWakeRegistrar::new`].
pub struct TokioWakeRegistrar {
    runtime: Handle,
    fired: mpsc::UnboundedSender<&'static str>,
    pending: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl TokioWakeRegistrar {
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<&'static str>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let registrar = Self {
            runtime,
            fired,
            pending: Mutex::new(HashMap::new()),
        };
        (registrar, receiver)
    }
}

impl WakeRegistrar for TokioWakeRegistrar {
    fn register(
        &self,
        id: &'static str,
        at: DateTime<Utc>,
        _precision: Precision,
    ) -> Result<(), TriggerError> {
        if self.fired.is_closed() {
            return Err(TriggerError::Unavailable("wake-up receiver dropped".into()));
        }

        // wall-clock deadline turned into a monotonic sleep
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let fired = self.fired.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if fired.send(id).is_err() {
                debug!(id, "wake-up fired after receiver closed");
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = pending.insert(id, handle) {
            previous.abort();
        }
        Ok(())
    }
}
