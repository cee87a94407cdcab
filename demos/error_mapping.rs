//! Structured errors for both API failures and transport failures.
//!
//! This example shows how to:
//! - Decode non-2xx bodies into an application error type
//! - Install a process-wide mapping so timeouts and connectivity problems
//!   arrive as the same error type
//! - Attach user-facing messages to transport failures
//! - Cancel a call running in the background
//!
//! Run with: `cargo run --example error_mapping`

use flowline::{
    Client, ErrorMapping, FlowError, HttpMethod, Json, Outcome, Target, Timeouts,
    TransportFailure,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct AppError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("flowline=info,error_mapping=info")
        .init();

    ErrorMapping::install(
        ErrorMapping::new()
            .on_transport_failure(|kind: TransportFailure| match kind {
                TransportFailure::Cancelled => None,
                other => Some(AppError {
                    message: format!("network problem: {}", other),
                }),
            })
            .with_messages(|kind| match kind {
                TransportFailure::Cancelled => "The request was cancelled.".to_string(),
                _ => "Please check your connection and try again.".to_string(),
            }),
    )?;

    let client = Client::builder()
        .timeouts(Timeouts::short().with_resource(Duration::from_secs(5)))
        .build()?;

    println!("=== API error ===");
    let missing = Target::new(
        "https://jsonplaceholder.typicode.com",
        HttpMethod::Get,
        "/posts/999999",
    );
    match client
        .fetch::<Json<Post>, Json<AppError>>(&missing)
        .await?
        .into_result()
    {
        Ok(post) => println!("Found post {:?}", post.data),
        Err(FlowError::Domain(error)) => println!("API error: {:?}", error),
        Err(e) => println!("Other failure: {}", e),
    }
    println!();

    println!("=== Transport failure ===");
    let unreachable = Target::new("http://127.0.0.1:1", HttpMethod::Get, "/");
    let response = client.fetch::<Json<Post>, Json<AppError>>(&unreachable).await?;
    match response.data {
        Outcome::DomainError(error) => println!("Mapped: {}", error.message),
        other => println!("Unmapped: {}", other.kind()),
    }
    println!();

    println!("=== Cancellation ===");
    let slow = Target::new("https://httpbin.org", HttpMethod::Get, "/delay/3");
    let task = client.spawn::<Json<serde_json::Value>, Json<AppError>>(&slow)?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    task.cancel();
    let response = task.wait().await?;
    println!("State after cancel resolves to: {}", response.data.kind());
    if let Some(message) = response.data.user_message() {
        println!("Shown to the user: {}", message);
    }

    Ok(())
}
