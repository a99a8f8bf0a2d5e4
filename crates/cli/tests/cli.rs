use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn haqei() -> Command {
    let mut cmd = Command::cargo_bin("haqei").expect("binary");
    cmd.env_remove("HAQEI_BUNDLE_DIR")
        .env_remove("HAQEI_EASY_BUNDLE_DIR");
    cmd
}

fn run_json(args: &[&str]) -> (bool, Value) {
    let output = haqei().args(args).output().expect("command run");
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    (output.status.success(), body)
}

fn write_store(path: &Path) {
    let store = json!({
        "乾為天 九五 | JJH": {
            "label": "JJH",
            "headline": "足場を固めてから視点を切り替える流れ",
            "stages": {
                "first": "頂点で慢心を戒める",
                "second": "初心に返って力を蓄える",
                "final": "新しい角度から機会を見いだす"
            },
            "start": {"hex": 1, "pos": 5, "name": "乾為天 九五"},
            "easy": {
                "headline": "ひと休みしてから向きを変える",
                "why": "勢いのあるうちに立ち止まるため"
            }
        }
    });
    fs::write(path, serde_json::to_string_pretty(&store).expect("json")).expect("write store");
}

#[test]
fn walk_json_follows_advance_moves_with_wrap() {
    let (ok, body) = run_json(&["walk", "-x", "1", "-l", "5", "-s", "JJJ", "--json"]);
    assert!(ok);

    let steps = body["steps"].as_array().expect("steps");
    let lines: Vec<(u64, u64)> = steps
        .iter()
        .map(|s| (s["hexagram"].as_u64().unwrap(), s["line"].as_u64().unwrap()))
        .collect();
    assert_eq!(lines, vec![(1, 6), (1, 1), (1, 2)]);
    assert!(steps.iter().all(|s| s["action"] == "advance"));
    assert_eq!(steps[0]["line_name"], "上九");
    assert_eq!(body["destination"]["hexagram"], 1);
    assert_eq!(body["destination"]["position"], 2);
}

#[test]
fn walk_transform_changes_hexagram_and_keeps_line() {
    let (ok, body) = run_json(&["walk", "-x", "1", "-l", "1", "-s", "HJJ", "--json"]);
    assert!(ok);
    // changing the bottom line of 乾為天 gives 天風姤
    assert_eq!(body["steps"][0]["hexagram"], 44);
    assert_eq!(body["steps"][0]["line"], 1);
    assert_eq!(body["steps"][0]["action"], "transform");
    assert_eq!(body["steps"][0]["hexagram_name"], "天風姤");
}

#[test]
fn walk_accepts_lowercase_signature() {
    haqei()
        .args(["walk", "-x", "2", "-l", "3", "-s", "hjh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("坤為地 六三"));
}

#[test]
fn walk_rejects_out_of_range_line() {
    haqei()
        .args(["walk", "-x", "1", "-l", "7", "-s", "JJJ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid starting line"));
}

#[test]
fn walk_rejects_unknown_signature() {
    haqei()
        .args(["walk", "-x", "1", "-l", "1", "-s", "JJX"])
        .assert()
        .failure();
}

#[test]
fn compose_text_names_each_step() {
    haqei()
        .args(["compose", "-x", "1", "-l", "5", "-s", "JJJ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("まず、"))
        .stdout(predicate::str::contains("乾為天の上九"))
        .stdout(predicate::str::contains("乾為天の初九"))
        .stdout(predicate::str::contains("乾為天の九二"));
}

#[test]
fn compose_json_reports_three_sentences() {
    let (ok, body) = run_json(&["compose", "-x", "64", "-l", "6", "-s", "HHH", "--json"]);
    assert!(ok);
    assert_eq!(body["placeholder"], false);
    assert_eq!(body["sentences"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["steps"].as_array().map(Vec::len), Some(3));
    assert!(body["text"].as_str().unwrap().ends_with(body["closing"].as_str().unwrap()));
}

#[test]
fn verify_table_is_clean_for_builtin_table() {
    let (ok, body) = run_json(&["verify-table", "--json"]);
    assert!(ok);
    assert_eq!(body["edges"], 384);
    assert_eq!(body["involution"], true);
    assert_eq!(body["issues"].as_array().map(Vec::len), Some(0));
}

#[test]
fn verify_table_fails_on_broken_table() {
    let temp = tempdir().expect("tempdir");
    let table = temp.path().join("table.json");
    // hexagram 1 only, with every edge pointing back at itself
    fs::write(
        &table,
        r#"[{"hexagram": 1, "targets": [1, 1, 1, 1, 1, 1]}]"#,
    )
    .expect("write table");

    let output = haqei()
        .args(["verify-table", "--json", "--table"])
        .arg(&table)
        .output()
        .expect("command run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["edges"], 6);
    assert!(!body["issues"].as_array().unwrap().is_empty());
}

#[test]
fn coverage_fails_on_gap_when_requested() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    write_store(&store);

    let output = haqei()
        .args(["coverage", "--json", "--fail-on-gap", "--store"])
        .arg(&store)
        .output()
        .expect("command run");
    assert!(!output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["coverage"]["expected"], 3072);
    assert_eq!(body["coverage"]["present"], 1);
    assert_eq!(body["coverage"]["missing"], 3071);
    assert_eq!(body["bundles"], Value::Null);
}

#[test]
fn coverage_markdown_succeeds_without_fail_flag() {
    let temp = tempdir().expect("tempdir");
    haqei()
        .args(["coverage", "--store"])
        .arg(temp.path().join("missing.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("# Narrative coverage report"))
        .stdout(predicate::str::contains("- Missing: `3072`"));
}

#[test]
fn coverage_rejects_unknown_config_fields() {
    let temp = tempdir().expect("tempdir");
    let config = temp.path().join("qa.toml");
    fs::write(&config, "[coverage]\nsample = 3\n").expect("write config");

    haqei()
        .args(["coverage", "--store"])
        .arg(temp.path().join("store.json"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load QA config"));
}

#[test]
fn backfill_then_bundle_completes_coverage() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    let bundles = temp.path().join("bundles");
    write_store(&store);

    let (ok, body) = run_json(&["backfill", "--json", "--store", store.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(body["inserted"], 3071);
    assert_eq!(body["total"], 3072);
    assert_eq!(body["saved"], true);

    let (ok, body) = run_json(&[
        "bundle",
        "--json",
        "--store",
        store.to_str().unwrap(),
        "--out",
        bundles.to_str().unwrap(),
    ]);
    assert!(ok);
    assert_eq!(body["files"], 64);
    assert!(bundles.join("hex-64.json").exists());

    let (ok, body) = run_json(&[
        "coverage",
        "--json",
        "--fail-on-gap",
        "--store",
        store.to_str().unwrap(),
        "--bundle-dir",
        bundles.to_str().unwrap(),
    ]);
    assert!(ok);
    assert_eq!(body["coverage"]["missing"], 0);
    assert_eq!(body["coverage"]["placeholders"], 3071);
    assert_eq!(body["bundles"]["total_items"], 3072);
}

#[test]
fn backfill_dry_run_leaves_store_untouched() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    write_store(&store);
    let before = fs::read_to_string(&store).expect("read");

    let (ok, body) = run_json(&["backfill", "--json", "--dry-run", "--store", store.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(body["inserted"], 3071);
    assert_eq!(body["saved"], false);
    assert_eq!(fs::read_to_string(&store).expect("read"), before);
}

#[test]
fn scenario_reads_bundles_from_env_dir() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    let bundles = temp.path().join("bundles");
    write_store(&store);

    haqei()
        .args(["bundle", "--store"])
        .arg(&store)
        .arg("--out")
        .arg(&bundles)
        .assert()
        .success();

    let output = haqei()
        .env("HAQEI_BUNDLE_DIR", &bundles)
        .args(["scenario", "-x", "1", "-l", "5", "--json"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let entries = body["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["variant"], "default");
    assert_eq!(entries[0]["headline"], "足場を固めてから視点を切り替える流れ");
    assert_eq!(body["stats"]["loads"], 1);

    let output = haqei()
        .env("HAQEI_BUNDLE_DIR", &bundles)
        .args(["scenario", "-x", "1", "-l", "5", "-s", "JJH", "--easy", "--json"])
        .output()
        .expect("command run");
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["entries"][0]["variant"], "easy");
    assert_eq!(body["entries"][0]["headline"], "ひと休みしてから向きを変える");
    assert_eq!(body["entries"][0]["why"], "勢いのあるうちに立ち止まるため");
}

#[test]
fn scenario_prints_placeholder_when_bundle_is_missing() {
    let temp = tempdir().expect("tempdir");
    haqei()
        .args(["scenario", "-x", "3", "-l", "2", "-s", "JJJ", "--bundle-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("（内容準備中）"));
}

#[test]
fn dupes_flags_repeated_stages() {
    let temp = tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    let entry = json!({
        "乾為天 初九 | JJJ": {
            "label": "JJJ",
            "headline": "静かに力を蓄えて時を待つ流れ",
            "stages": {
                "first": "焦らず準備を整える",
                "second": "焦らず準備を整える",
                "final": "機が熟して動き出す"
            },
            "start": {"hex": 1, "pos": 1, "name": "乾為天 初九"}
        }
    });
    fs::write(&store, entry.to_string()).expect("write store");

    let output = haqei()
        .args(["dupes", "--json", "--fail-on-findings", "--store"])
        .arg(&store)
        .output()
        .expect("command run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["checked"], 1);
    assert_eq!(body["findings"][0]["kind"], "stages_overlap");
    assert_eq!(body["findings"][0]["a"], "first");
    assert_eq!(body["findings"][0]["b"], "second");
}

#[test]
fn lint_reports_failing_rows() {
    let temp = tempdir().expect("tempdir");
    let states = temp.path().join("states.json");
    fs::write(
        &states,
        json!([
            {"name": "乾為天 初九", "now": "短い。"},
            {"name": "乾為天 九二", "text": "いまは焦らずに足元を整え、身近な人との信頼を少しずつ育てながら、次に訪れる機会に備えて力を蓄えておく時期で、無理に動かず流れを見極めることが大切です。"}
        ])
        .to_string(),
    )
    .expect("write states");

    let (ok, body) = run_json(&["lint", "--json", "--states", states.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(body["checked"], 2);
    assert!(body["findings"]
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["name"] == "乾為天 初九"));
}
