//! Kitchen calls: presets around flaky collaborators, answered through the error channel.
//!
//! Run with `cargo run --example kitchen_calls`.
use kitchen_resilience::prelude::*;
use kitchen_resilience::{result_api, safe, PipelineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    // The recipe store drops the first connection, the database preset retries once.
    let attempts = Arc::new(AtomicUsize::new(0));
    let database: Composite<Vec<String>, ErrorInfo> = presets::database();
    let recipes = database
        .run({
            let attempts = attempts.clone();
            move || {
                let attempts = attempts.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ResilienceError::Inner(ErrorInfo::new(
                            ErrorCode::DatabaseError,
                            "connection reset",
                        )))
                    } else {
                        Ok(vec!["pancakes".to_string(), "ramen".to_string()])
                    }
                }
            }
        })
        .await;
    println!("recipes after {} attempts: {:?}", attempts.load(Ordering::SeqCst), recipes);

    // A stalled cache answers with a timeout after one second instead of hanging.
    let cache: Composite<Option<String>, ErrorInfo> = presets::cache_lookup();
    let cached = cache
        .run(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Some("cached plan".to_string()))
        })
        .await
        .map_err(ErrorInfo::from);
    println!("cache: {}", serde_json::to_string(&result_api(cached))?);

    // A pipeline from settings: fall back to an empty suggestion list when the model is down.
    let settings = r#"{ "policies": [
        { "kind": "fallback_default" },
        { "kind": "timeout", "timeout_secs": 0.5 }
    ] }"#;
    let suggestions: Composite<Vec<String>, ErrorInfo> =
        PipelineConfig::from_json(settings)?.build_with_default()?;
    let ideas = suggestions
        .run(|| async {
            Err(ResilienceError::Inner(ErrorInfo::new(ErrorCode::AiError, "model overloaded")))
        })
        .await;
    println!("suggestions: {:?}", ideas);

    // Plain code joins the channel through `safe`.
    let servings = safe("portion_scaler", || "four".parse::<u32>());
    println!("servings: {}", serde_json::to_string_pretty(&result_api(servings))?);

    Ok(())
}
