pub mod app;
pub mod clock;
pub mod config;
pub mod cutoff;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod ledger;
pub mod models;
pub mod nutrition;
pub mod profile;
pub mod repo;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod storage;
pub mod weight;

pub use app::router;
pub use config::AppConfig;
pub use ledger::DailyLedger;
pub use state::AppState;
