// Startup/shutdown handlers

#[path = "../helpers/mod.rs"]
mod helpers;

use service_layout::config::AppSettings;
use service_layout::core::events::{
    catch_stop_errors, create_start_app_handler, create_stop_app_handler,
};
use service_layout::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn test_settings() -> AppSettings {
    AppSettings::from_lookup(|key| match key {
        "APP_ENV" => Some("test".to_string()),
        "DATABASE_URL" => Some(helpers::test_database_url()),
        _ => None,
    })
    .unwrap()
}

#[tokio::test]
async fn test_start_handler_succeeds() {
    let start_app = create_start_app_handler(&test_settings());
    start_app().await.unwrap();
}

#[tokio::test]
async fn test_stop_handler_completes() {
    let stop_app = create_stop_app_handler();
    stop_app().await;
}

#[tokio::test]
async fn test_stop_errors_are_swallowed() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    let stop_app = catch_stop_errors(move || async move {
        flag.store(true, Ordering::SeqCst);
        Err(AppError::internal("pool already gone"))
    });
    stop_app().await;

    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stop_panics_are_swallowed() {
    let stop_app = catch_stop_errors(|| async {
        if true {
            panic!("shutdown exploded");
        }
        Ok(())
    });
    stop_app().await;
}
