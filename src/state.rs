use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::ledger::DailyLedger;
use crate::repo::KvRepository;
use crate::scheduler::{RolloverScheduler, TokioWakeRegistrar};
use crate::storage::{JsonFileStore, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

pub type AppLedger = DailyLedger<KvRepository, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub repo: KvRepository,
    pub ledger: Arc<Mutex<AppLedger>>,
    pub scheduler: Arc<RolloverScheduler<TokioWakeRegistrar>>,
}

impl AppState {
    pub fn new(repo: KvRepository, ledger: AppLedger, registrar: TokioWakeRegistrar) -> Self {
        Self {
            repo,
            ledger: Arc::new(Mutex::new(ledger)),
            scheduler: Arc::new(RolloverScheduler::new(registrar)),
        }
    }

    /// Opens the file store under the configured data directory. Must be
    /// called inside a tokio runtime.
    pub fn open(
        config: &AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<&'static str>), StoreError> {
        let store = JsonFileStore::open(&config.data_dir)?;
        info!("data directory {}", store.dir().display());

        let repo = KvRepository::new(Arc::new(store));
        let ledger = DailyLedger::new(repo.clone(), SystemClock, config.cutoff)
            .with_default_food_name(config.default_food_name.clone());
        let (registrar, fired) = TokioWakeRegistrar::new(tokio::runtime::Handle::current());

        Ok((Self::new(repo, ledger, registrar), fired))
    }

    /// Catches up on missed cutoffs and arms the first wake-up.
    pub async fn resume(&self) -> Result<(), StoreError> {
        let ledger = self.ledger.lock().await;
        self.scheduler.on_resume(&*ledger)?;
        Ok(())
    }

    /// Runs the rollover check each time a wake-up fires, until the
    /// registrar goes away.
    pub async fn run_rollover_loop(self, mut fired: mpsc::UnboundedReceiver<&'static str>) {
        while let Some(id) = fired.recv().await {
            let ledger = self.ledger.lock().await;
            if let Err(err) = self.scheduler.on_trigger(&*ledger) {
                error!(id, "rollover wake-up failed: {err}");
            }
        }
    }
}
