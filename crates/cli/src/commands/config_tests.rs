// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use tempfile::TempDir;

use super::*;

#[test]
fn test_render_default_config() {
    let text = render(&Config::default()).unwrap();
    assert!(text.contains("[api]"));
    assert!(text.contains("base_url = \"http://localhost:8080\""));
    assert!(text.contains("[queue]"));
    assert!(text.contains("max_queue_size = 100"));
    assert!(text.contains("[sync]"));
}

#[test]
fn test_rendered_config_reads_back() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.queue.max_queue_size = 7;
    std::fs::write(config_path(dir.path()), render(&config).unwrap()).unwrap();

    assert_eq!(Config::read(dir.path()).unwrap(), config);
}
