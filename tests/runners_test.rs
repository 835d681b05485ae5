//! Runner API integration tests.
//!
//! Drives the full HTTP surface: start a batch over a generated directory
//! worklist, poll it to completion, stop it mid-flight, and check the error
//! mapping for bad requests.

mod common;

use common::{wait_terminal, TestHarness};
use serde_json::json;

#[tokio::test]
async fn directory_batch_runs_to_completion() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["a.txt", "b.txt", "nested/c.txt"]);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "bak"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let started: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(started["amount"], 3);
    let runner_id = started["runner_id"].as_u64().unwrap();

    let done = wait_terminal(&client, addr, runner_id).await;
    assert_eq!(done["state"], "completed");
    assert_eq!(done["finished"], 3);
    assert_eq!(done["amount"], 3);
    assert_eq!(done["failed"], 0);
    assert_eq!(done["skipped"], 0);

    assert_eq!(
        std::fs::read_to_string(output.join("a.bak")).unwrap(),
        "contents of a.txt"
    );
    assert!(output.join("b.bak").is_file());
    assert_eq!(
        std::fs::read_to_string(output.join("nested/c.bak")).unwrap(),
        "contents of nested/c.txt"
    );
}

#[tokio::test]
async fn saved_profile_params_reach_the_action() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["one.txt"]);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "slow",
            "profile_id": "quick",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "out"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let done = wait_terminal(&client, addr, started["runner_id"].as_u64().unwrap()).await;
    assert_eq!(done["failed"], 0);
    assert!(output.join("one.out").is_file());
}

#[tokio::test]
async fn failing_entries_are_counted_not_fatal() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["a.txt", "b.txt"]);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "fail",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "x"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let done = wait_terminal(&client, addr, started["runner_id"].as_u64().unwrap()).await;
    assert_eq!(done["state"], "completed");
    assert_eq!(done["finished"], 2);
    assert_eq!(done["failed"], 2);
}

#[tokio::test]
async fn stop_halts_a_running_batch() {
    let (harness, addr) = TestHarness::with_server().await;
    let files: Vec<String> = (0..10).map(|i| format!("f{i}.txt")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let (input, output) = harness.input_tree(&refs);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "slow",
            "profile_id": "sluggish",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "out"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let runner_id = started["runner_id"].as_u64().unwrap();
    assert_eq!(started["amount"], 10);

    let resp = client
        .post(format!("http://{addr}/api/runners/{runner_id}/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let stopped: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(stopped["runner_id"], runner_id);

    let done = wait_terminal(&client, addr, runner_id).await;
    assert_eq!(done["state"], "stopped");
    let finished = done["finished"].as_u64().unwrap();
    let skipped = done["skipped"].as_u64().unwrap();
    assert_eq!(finished + skipped, 10);
    assert!(skipped >= 10 - harness.ctx.config.runner.effective_parallelism() as u64);

    // Stopping again is harmless.
    let again = client
        .post(format!("http://{addr}/api/runners/{runner_id}/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 200);
}

#[tokio::test]
async fn list_contains_started_runner() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["a.txt"]);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "bak"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let list: Vec<serde_json::Value> = client
        .get(format!("http://{addr}/api/runners"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["runner_id"], started["runner_id"]);
    assert_eq!(list[0]["extension_id"], "files");
    assert_eq!(list[0]["action_id"], "copy");
}

#[tokio::test]
async fn empty_input_directory_completes_immediately() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&[]);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "bak"
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started["amount"], 0);

    let done = wait_terminal(&client, addr, started["runner_id"].as_u64().unwrap()).await;
    assert_eq!(done["state"], "completed");
    assert_eq!(done["finished"], 0);
}

#[tokio::test]
async fn explicit_entry_list_is_used_as_given() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["a.txt", "b.txt"]);
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": {
                "mode": "list",
                "entries": [
                    { "input": { "main": [input.join("b.txt")] },
                      "output": { "main": [output.join("renamed.txt")] } }
                ]
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started["amount"], 1);

    wait_terminal(&client, addr, started["runner_id"].as_u64().unwrap()).await;
    assert_eq!(
        std::fs::read_to_string(output.join("renamed.txt")).unwrap(),
        "contents of b.txt"
    );
    assert!(!output.join("a.txt").exists());
}

#[tokio::test]
async fn missing_input_directory_is_422_and_registers_nothing() {
    let (harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": {
                "mode": "directory",
                "input_dir": harness.dir.path().join("does-not-exist"),
                "output_dir": harness.dir.path().join("out"),
                "output_extension": "bak"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "generation_error");
    assert!(harness.ctx.registry.is_empty());
}

#[tokio::test]
async fn unknown_action_is_404() {
    let (harness, addr) = TestHarness::with_server().await;
    let (input, output) = harness.input_tree(&["a.txt"]);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "teleport",
            "source": {
                "mode": "directory",
                "input_dir": input,
                "output_dir": output,
                "output_extension": "bak"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn sequence_mode_is_rejected() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/runners"))
        .json(&json!({
            "extension_id": "files",
            "action_id": "copy",
            "source": { "mode": "sequence" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unknown_runner_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{addr}/api/runners/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("http://{addr}/api/runners/999/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
