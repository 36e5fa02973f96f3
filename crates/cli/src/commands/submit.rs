// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use ll_core::RequestDescriptor;

use crate::cli::SubmitArgs;
use crate::error::{Error, Result};
use crate::net::Transport;
use crate::services::Services;

use super::to_json;

/// Builds the request descriptor described by the command-line flags.
pub fn build_request(args: &SubmitArgs) -> Result<RequestDescriptor> {
    let mut request = RequestDescriptor::new(args.method, args.endpoint.clone())
        .with_auth(!args.no_auth)
        .with_queueing(args.queue);

    if let Some(body) = &args.body {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| Error::InvalidInput(format!("--body is not valid JSON: {e}")))?;
        request = request.with_body(value);
    }
    if let Some(priority) = args.priority {
        request = request.with_priority(priority);
    }
    if let Some(retries) = args.retries {
        request = request.with_max_retries(retries);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            return Err(Error::InvalidInput("--timeout-ms must be at least 1".to_string()));
        }
        request = request.with_timeout(Duration::from_millis(timeout_ms));
    }
    Ok(request)
}

/// Sends the request and prints the response body.
pub async fn run<T: Transport + 'static>(services: &Services<T>, args: SubmitArgs) -> Result<()> {
    let request = build_request(&args)?;
    let value = services.dispatcher.submit(request).await?;
    println!("{}", to_json(&value)?);
    Ok(())
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
