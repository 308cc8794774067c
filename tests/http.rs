use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
struct Macros {
    calories: u32,
    proteins: u32,
    fats: u32,
    carbs: u32,
}

#[derive(Debug, Deserialize)]
struct TodayResponse {
    date: String,
    totals: Macros,
    targets: Macros,
    remaining: Macros,
    calorie_progress: f64,
}

#[derive(Debug, Deserialize)]
struct FoodEntry {
    id: i64,
    name: String,
    cal: u32,
    p: u32,
    f: u32,
    c: u32,
    qty: u32,
}

#[derive(Debug, Deserialize)]
struct Profile {
    name: String,
    targets: Macros,
    gender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    profile: Profile,
    onboarding_completed: bool,
}

#[derive(Debug, Deserialize)]
struct WeightSample {
    kg: f32,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    date: String,
    w: Option<f32>,
    cal: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    last_14_days: Vec<serde_json::Value>,
    weekly_averages: Vec<serde_json::Value>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("macro_ledger_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/today")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_macro_ledger"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", data_dir)
        .env("DEFAULT_FOOD_NAME", "Food")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn today(client: &Client, server: &TestServer) -> TodayResponse {
    client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_add_and_remove_entry_round_trip() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;

    let response = client
        .post(format!("{}/api/entries", server.base_url))
        .json(&serde_json::json!({
            "name": "  ",
            "per_100g": { "calories": 250, "proteins": 13, "fats": 7, "carbs": 33 },
            "quantity_grams": 150
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry: FoodEntry = response.json().await.unwrap();
    assert_eq!(entry.name, "Food");
    assert_eq!((entry.cal, entry.p, entry.f, entry.c), (375, 20, 11, 50));
    assert_eq!(entry.qty, 150);

    let during = today(&client, &server).await;
    assert_eq!(during.totals.calories, before.totals.calories + 375);
    assert_eq!(during.totals.proteins, before.totals.proteins + 20);
    assert!(!during.date.is_empty());

    let entries: Vec<FoodEntry> = client
        .get(format!("{}/api/entries", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entries[0].id, entry.id);

    let response = client
        .delete(format!("{}/api/entries/{}", server.base_url, entry.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = today(&client, &server).await;
    assert_eq!(after.totals, before.totals);
}

#[tokio::test]
async fn http_unknown_entry_delete_is_noop() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = today(&client, &server).await;
    let response = client
        .delete(format!("{}/api/entries/1", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(today(&client, &server).await.totals, before.totals);
}

#[tokio::test]
async fn http_estimate_sets_targets_and_onboarding() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response: ProfileResponse = client
        .post(format!("{}/api/profile/estimate", server.base_url))
        .json(&serde_json::json!({
            "gender": "male",
            "age": 30,
            "height_cm": 180,
            "weight_kg": 80,
            "activity_level": "sedentary",
            "goal": "maintain"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(response.onboarding_completed);
    assert_eq!(response.profile.gender.as_deref(), Some("male"));
    assert_eq!(
        response.profile.targets,
        Macros {
            calories: 2166,
            proteins: 128,
            fats: 64,
            carbs: 270
        }
    );

    let day = today(&client, &server).await;
    assert_eq!(day.targets.calories, 2166);
    assert_eq!(
        day.remaining.calories,
        2166u32.saturating_sub(day.totals.calories)
    );
    assert!(day.calorie_progress >= 0.0 && day.calorie_progress <= 1.0);
}

#[tokio::test]
async fn http_reset_zeroes_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    client
        .post(format!("{}/api/entries", server.base_url))
        .json(&serde_json::json!({
            "name": "Toast",
            "per_100g": { "calories": 300, "proteins": 9, "fats": 4, "carbs": 55 },
            "quantity_grams": 60
        }))
        .send()
        .await
        .unwrap();

    let reset: TodayResponse = client
        .post(format!("{}/api/reset", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        reset.totals,
        Macros {
            calories: 0,
            proteins: 0,
            fats: 0,
            carbs: 0
        }
    );

    let entries: Vec<FoodEntry> = client
        .get(format!("{}/api/entries", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn http_weight_lands_in_log_and_history() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let rejected = client
        .post(format!("{}/api/weight", server.base_url))
        .json(&serde_json::json!({ "kg": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/weight", server.base_url))
        .json(&serde_json::json!({ "kg": 72.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let weights: Vec<WeightSample> = client
        .get(format!("{}/api/weight", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(weights.last().map(|w| w.kg), Some(72.5));

    let history: Vec<HistoryRecord> = client
        .get(format!("{}/api/history?days=30", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.iter().any(|record| record.w == Some(72.5)));
    assert!(history.iter().all(|record| !record.date.is_empty()));
    // the live accounting day is always part of the series
    assert!(history.iter().any(|record| record.cal.is_some()));
}

#[tokio::test]
async fn http_language_and_stats() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let rejected = client
        .put(format!("{}/api/settings/language", server.base_url))
        .json(&serde_json::json!({ "language": "xx" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let accepted: serde_json::Value = client
        .put(format!("{}/api/settings/language", server.base_url))
        .json(&serde_json::json!({ "language": "pl" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(accepted["language"], "pl");

    let stats: StatsResponse = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.last_14_days.len(), 14);
    assert_eq!(stats.weekly_averages.len(), 8);
}

#[tokio::test]
async fn http_name_is_trimmed() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response: ProfileResponse = client
        .put(format!("{}/api/profile/name", server.base_url))
        .json(&serde_json::json!({ "name": "  Alex  " }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.profile.name, "Alex");
}
