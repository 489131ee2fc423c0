//! Retry and deadline behaviour of the vision client, on a paused clock.

mod common;

use std::time::Duration;

use common::{client, Behaviour, FakeVision};
use fieldjournal_core::{GalleryContext, VisionError};

fn ctx() -> GalleryContext {
    GalleryContext {
        title: "Highlands".into(),
        description: None,
        project_context: None,
    }
}

#[tokio::test(start_paused = true)]
async fn always_timing_out_model_gets_three_attempts() {
    let model = FakeVision::new(Behaviour::Hang);
    let err = client(model.clone())
        .analyze_with_retry("https://cdn.example/proxy.jpg", &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, VisionError::Timeout { timeout_ms: 60_000 }));
    assert_eq!(model.calls(), 3);

    // each gap is the 60s deadline plus the backoff: 2s, then 4s
    let started = model.started();
    let gaps: Vec<Duration> = started.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps, [Duration::from_secs(62), Duration::from_secs(64)]);
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_not_retried() {
    let model = FakeVision::new(Behaviour::Fail(VisionError::Http {
        status: 400,
        message: "bad request".into(),
    }));
    let err = client(model.clone())
        .analyze_with_retry("https://cdn.example/proxy.jpg", &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, VisionError::Http { status: 400, .. }));
    assert_eq!(model.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn single_attempt_analysis_does_not_retry() {
    let model = FakeVision::new(Behaviour::Fail(VisionError::Network("reset".into())));
    let result = client(model.clone())
        .analyze("https://cdn.example/proxy.jpg", &ctx())
        .await;

    assert!(matches!(result, Err(VisionError::Network(_))));
    assert_eq!(model.calls(), 1);
}
