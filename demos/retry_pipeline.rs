//! Example of the retry pipeline, on its own and behind the client.
//!
//! Run with: `RUST_LOG=reqtry=debug cargo run --example retry_pipeline`

use reqtry::{Client, Error, Execution, RequestMetadata, RetryPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reqtry=info")),
        )
        .init();

    println!("=== Alternate actions ===");
    // Attempts alternate between the primary and the mirror.
    let policy = RetryPolicy::new(3).with_delay(Duration::from_millis(100));
    let value = Execution::new(policy)
        .action(|attempt| async move {
            println!("  primary, attempt {}", attempt);
            Err::<&str, _>(Error::Timeout)
        })
        .action(|attempt| async move {
            println!("  mirror, attempt {}", attempt);
            Ok("from mirror")
        })
        .get_result_not_empty()
        .await?;
    println!("Result: {}", value);
    println!();

    println!("=== Sequential steps ===");
    let failures = AtomicUsize::new(0);
    Execution::<()>::new(RetryPolicy::new(3))
        .action(|_| async {
            println!("  step 1");
            Ok(())
        })
        .action(|_| {
            let failed = failures.fetch_add(1, Ordering::SeqCst);
            async move {
                if failed == 0 {
                    println!("  step 2 failed once");
                    Err(Error::Timeout)
                } else {
                    println!("  step 2");
                    Ok(())
                }
            }
        })
        .execute()
        .await?;
    println!();

    println!("=== Observer and cancellation ===");
    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .retry_count(3)
        .delay(Duration::from_millis(500))
        .on_error(|error| eprintln!("  gave up: {}", error))
        .build()?;

    let token = CancellationToken::new();
    let metadata = RequestMetadata::get("status/503").with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
    });

    match client.call::<(), serde_json::Value>(metadata, None).await {
        Ok(response) => println!("Unexpected success: {:?}", response.data),
        Err(Error::Empty) => println!("Failure was handed to the observer"),
        Err(e) => println!("Error: {}", e),
    }

    Ok(())
}
