// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use ll_core::RequestDescriptor;

use super::*;
use crate::commands::testing::TestContext;

#[tokio::test(start_paused = true)]
async fn test_watch_replays_queue_before_shutdown() {
    let ctx = TestContext::new();
    ctx.services.queue.enqueue(&RequestDescriptor::post("/scores").queueable()).unwrap();

    let interval = ctx.services.config.replay_interval();
    run_until(&ctx.services, tokio::time::sleep(interval + Duration::from_secs(1))).await;

    assert!(ctx.services.queue.is_empty());
    assert_eq!(ctx.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_shutdown_sends_nothing() {
    let ctx = TestContext::new();
    ctx.services.queue.enqueue(&RequestDescriptor::post("/scores").queueable()).unwrap();

    run_until(&ctx.services, async {}).await;

    assert_eq!(ctx.services.queue.len(), 1);
    assert_eq!(ctx.transport.calls(), 0);
}
