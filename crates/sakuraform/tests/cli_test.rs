#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

/// 一時ディレクトリで実行するコマンドを用意 (グローバル設定と API キーを切り離す)
fn sakuraform(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env_remove("SAKURAFORM_CONFIG_PATH")
        .env_remove("SAKURAFORM_ZONE")
        .env_remove("SAKURACLOUD_ACCESS_TOKEN")
        .env_remove("SAKURACLOUD_ACCESS_TOKEN_SECRET");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("待たずに確実に"))
        .stdout(predicate::str::contains("nosql"))
        .stdout(predicate::str::contains("subnet"))
        .stdout(predicate::str::contains("internet"))
        .stdout(predicate::str::contains("state"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sakuraform"));
}

/// nosqlコマンドのヘルプに全操作が並ぶことを確認
#[test]
fn test_nosql_help() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.args(["nosql", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("add-nodes"))
        .stdout(predicate::str::contains("read"));
}

/// subnet update は --next-hop が必須
#[test]
fn test_subnet_update_requires_next_hop() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.args(["subnet", "update", "113700000010"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--next-hop"));
}

/// 帯域は数値でなければエラー
#[test]
fn test_bandwidth_must_be_numeric() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.args(["internet", "bandwidth", "113700000009", "fast"])
        .assert()
        .failure();
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("sakuraform").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// 記録が無いときの state list
#[test]
fn test_state_list_empty() {
    let dir = tempfile::tempdir().unwrap();
    sakuraform(&dir)
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("記録済みのリソースはありません"));
}

/// 記録されていないリソースは API を呼ぶ前にエラー
#[test]
fn test_unknown_resource_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sakuraform(&dir)
        .args(["nosql", "delete", "db01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("記録されていません"));
}

/// API キーが無ければ操作前に止まる
#[test]
fn test_missing_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("subnet.yaml");
    fs::write(
        &file,
        "internet_id: \"113700000009\"\nnetmask: 28\nnext_hop: 203.0.113.2\n",
    )
    .unwrap();

    sakuraform(&dir)
        .args(["subnet", "create"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("APIキー"));
}

/// 設定ファイルの書式エラーはファイル名付きで報告
#[test]
fn test_malformed_settings() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("sakuraform.yaml"), "zone: [tk1b\n").unwrap();

    sakuraform(&dir)
        .args(["state", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sakuraform.yaml"));
}

/// 追加ノードは update できない
#[test]
fn test_additional_nodes_cannot_be_updated() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join(".sakuraform");
    fs::create_dir(&state_dir).unwrap();
    fs::write(
        state_dir.join("state.json"),
        r#"{
  "version": 1,
  "updated_at": "2026-01-01T00:00:00Z",
  "resources": {
    "nosql:db01-nodes": {
      "kind": "nosql",
      "name": "db01-nodes",
      "id": "113700000003",
      "status": "ready",
      "parent_id": "113700000001",
      "attributes": {},
      "created_at": "2026-01-01T00:00:00Z",
      "updated_at": "2026-01-01T00:00:00Z"
    }
  }
}"#,
    )
    .unwrap();
    let file = dir.path().join("update.yaml");
    fs::write(&file, "parameters: {}\n").unwrap();

    sakuraform(&dir)
        .args(["nosql", "update", "db01-nodes"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("追加ノード"));
}

/// 追加ノードが記録済みなら add-nodes は上書きせずに止まる
#[test]
fn test_add_nodes_refuses_to_overwrite_recorded_group() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join(".sakuraform");
    fs::create_dir(&state_dir).unwrap();
    fs::write(
        state_dir.join("state.json"),
        r#"{
  "version": 1,
  "updated_at": "2026-01-01T00:00:00Z",
  "resources": {
    "nosql:db01": {
      "kind": "nosql",
      "name": "db01",
      "id": "113700000001",
      "status": "ready",
      "attributes": {},
      "created_at": "2026-01-01T00:00:00Z",
      "updated_at": "2026-01-01T00:00:00Z"
    },
    "nosql:db01-nodes": {
      "kind": "nosql",
      "name": "db01-nodes",
      "id": "113700000003",
      "status": "ready",
      "parent_id": "113700000001",
      "attributes": {},
      "created_at": "2026-01-01T00:00:00Z",
      "updated_at": "2026-01-01T00:00:00Z"
    }
  }
}"#,
    )
    .unwrap();
    let file = dir.path().join("nodes.yaml");
    fs::write(&file, "zone: tk1b\n").unwrap();

    sakuraform(&dir)
        .args(["nosql", "add-nodes", "db01"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("113700000003"))
        .stderr(predicate::str::contains("既に作成済み"));

    // 記録はそのまま
    let state = fs::read_to_string(state_dir.join("state.json")).unwrap();
    assert!(state.contains("113700000003"));
}
