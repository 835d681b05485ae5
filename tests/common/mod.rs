//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which writes a small extension directory into a
//! temp dir, builds a full [`AppContext`] over it, and can serve the router on
//! a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use bf_av::ToolRegistry;
use bf_core::config::Config;
use bf_server::context::AppContext;
use bf_server::router::build_router;

/// Manifest of the `files` extension used throughout the integration tests.
///
/// - `copy` copies input to output.
/// - `slow` sleeps `{delay}` seconds before copying.
/// - `fail` always exits non-zero.
pub const FILES_MANIFEST: &str = r#"{
    "id": "files",
    "name": "File utilities",
    "actions": [
        { "id": "copy", "name": "Copy", "kind": "exec",
          "program": "cp", "args": ["{input}", "{output}"] },
        { "id": "slow", "name": "Slow copy", "kind": "exec",
          "program": "sh", "args": ["-c", "sleep {delay} && cp \"$0\" \"$1\"", "{input}", "{output}"] },
        { "id": "fail", "name": "Fail", "kind": "exec",
          "program": "false" }
    ],
    "profiles": [
        { "id": "quick", "action": "slow", "name": "Quick", "params": { "delay": "0" } },
        { "id": "sluggish", "action": "slow", "name": "Sluggish", "params": { "delay": "30" } }
    ]
}"#;

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a harness with the `files` extension installed.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a harness with a custom configuration.
    ///
    /// The extension directory is always redirected into the harness temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let ext_dir = dir.path().join("extensions");
        write_extension(&ext_dir, "files", FILES_MANIFEST);

        config.extensions.dir = ext_dir;
        let ctx = AppContext::with_tools(config, ToolRegistry::default());

        Self { ctx, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Create an input tree under the temp dir and return `(input, output)`.
    pub fn input_tree(&self, files: &[&str]) -> (PathBuf, PathBuf) {
        let input = self.dir.path().join("in");
        let output = self.dir.path().join("out");
        for rel in files {
            let path = input.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, format!("contents of {rel}")).unwrap();
        }
        std::fs::create_dir_all(&input).unwrap();
        (input, output)
    }
}

/// Write `manifest` as `<ext_dir>/<name>/manifest.json`.
pub fn write_extension(ext_dir: &Path, name: &str, manifest: &str) {
    let dir = ext_dir.join(name);
    std::fs::create_dir_all(&dir).expect("failed to create extension dir");
    std::fs::write(dir.join("manifest.json"), manifest).expect("failed to write manifest");
}

/// Poll `GET /api/runners/{id}` until the runner is terminal.
pub async fn wait_terminal(
    client: &reqwest::Client,
    addr: SocketAddr,
    runner_id: u64,
) -> serde_json::Value {
    for _ in 0..200 {
        let body: serde_json::Value = client
            .get(format!("http://{addr}/api/runners/{runner_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let state = body["state"].as_str().unwrap_or_default();
        if state == "completed" || state == "stopped" {
            return body;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("runner {runner_id} did not settle");
}
