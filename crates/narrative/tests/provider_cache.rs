use async_trait::async_trait;
use haqei_iching::{HexagramId, LineRef, PathSignature};
use haqei_narrative::{
    bundle_file_name, BundleSource, NarrativeError, ProviderConfig, ScenarioDbProvider, Variant,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

/// In-memory source that counts fetches and can hold them until released
#[derive(Default)]
struct MockSource {
    files: Mutex<HashMap<(PathBuf, u8), Vec<u8>>>,
    fetches: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockSource {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn put(&self, root: &str, hexagram: u8, bytes: Vec<u8>) {
        self.files
            .lock()
            .expect("files lock")
            .insert((PathBuf::from(root), hexagram), bytes);
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleSource for MockSource {
    async fn fetch(&self, root: &Path, hexagram: HexagramId) -> haqei_narrative::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.files
            .lock()
            .expect("files lock")
            .get(&(root.to_path_buf(), hexagram.get()))
            .cloned()
            .ok_or_else(|| NarrativeError::bundle_load(hexagram.get(), "not found"))
    }
}

fn hex(n: u32) -> HexagramId {
    HexagramId::new(n).expect("hexagram")
}

fn sig(s: &str) -> PathSignature {
    s.parse().expect("signature")
}

fn bundle_bytes(hexagram: u32, headline: &str, with_easy: bool) -> Vec<u8> {
    let mut items = serde_json::Map::new();
    for (i, label) in ["JJJ", "JHJ", "HHH"].iter().enumerate() {
        let mut entry = json!({
            "label": label,
            "headline": format!("{headline}{i}"),
            "stages": {"first": "一", "second": "二", "final": "三"},
            "start": {"hex": hexagram, "pos": 2, "name": "start"}
        });
        if with_easy {
            entry["easy"] = json!({"headline": format!("やさしい{headline}{i}"), "next3": ["a", "b", "c"]});
        }
        items.insert(format!("{hexagram}_2_{label}"), entry);
    }
    serde_json::to_vec(&json!({"hexagram": hexagram, "items": items})).expect("bundle json")
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(MockSource::gated(gate.clone()));
    source.put("/std", 5, bundle_bytes(5, "需", false));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source.clone());

    let (a, b, ()) = tokio::join!(
        provider.load_bundle(hex(5)),
        provider.load_bundle(hex(5)),
        async {
            tokio::task::yield_now().await;
            gate.notify_one();
        }
    );

    assert_eq!(source.fetches(), 1);
    let (a, b) = (a.expect("bundle a"), b.expect("bundle b"));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(provider.stats().loads, 1);
    assert_eq!(provider.stats().coalesced, 1);
}

#[tokio::test]
async fn failed_load_is_cached_until_cleared() {
    let source = Arc::new(MockSource::default());
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source.clone());

    assert!(provider.load_bundle(hex(9)).await.is_none());
    assert!(provider.load_bundle(hex(9)).await.is_none());
    assert_eq!(source.fetches(), 1);
    assert_eq!(provider.stats().negative_hits, 1);

    source.put("/std", 9, bundle_bytes(9, "小畜", false));
    provider.clear_cache();
    assert!(provider.load_bundle(hex(9)).await.is_some());
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn invalid_bundle_counts_as_failure() {
    let source = Arc::new(MockSource::default());
    source.put("/std", 3, b"{not json".to_vec());
    source.put("/std", 4, bundle_bytes(7, "師", false));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source.clone());

    assert!(provider.load_bundle(hex(3)).await.is_none());
    // declares hexagram 7 but served as 4
    assert!(provider.load_bundle(hex(4)).await.is_none());
}

#[tokio::test]
async fn easy_root_is_tried_before_standard_root() {
    let source = Arc::new(MockSource::default());
    source.put("/easy", 1, bundle_bytes(1, "易", false));
    source.put("/std", 1, bundle_bytes(1, "標準", false));
    source.put("/std", 2, bundle_bytes(2, "標準", false));
    let config = ProviderConfig::new("/std").with_easy_root("/easy");
    let provider = ScenarioDbProvider::new(config, source.clone());

    let start = LineRef::from_raw(1, 2).expect("line");
    let from_easy = provider.get(start, sig("JJJ")).await.expect("entry");
    assert_eq!(from_easy.headline, "易0");

    // hexagram 2 is only under the standard root
    let start = LineRef::from_raw(2, 2).expect("line");
    let fallback = provider.get(start, sig("JHJ")).await.expect("entry");
    assert_eq!(fallback.headline, "標準1");
    assert_eq!(source.fetches(), 3);
}

#[tokio::test]
async fn prefer_easy_selects_easy_variant() {
    let source = Arc::new(MockSource::default());
    source.put("/std", 6, bundle_bytes(6, "訟", true));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std").prefer_easy(true), source);

    let resolved = provider
        .get(LineRef::from_raw(6, 2).expect("line"), sig("HHH"))
        .await
        .expect("entry");
    assert_eq!(resolved.variant, Variant::Easy);
    assert_eq!(resolved.headline, "やさしい訟2");
    assert_eq!(resolved.stages.first, "一");
}

#[tokio::test]
async fn get_all_for_start_keeps_signature_order() {
    let source = Arc::new(MockSource::default());
    source.put("/std", 8, bundle_bytes(8, "比", false));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source.clone());

    let all = provider
        .get_all_for_start(LineRef::from_raw(8, 2).expect("line"))
        .await;
    let labels: Vec<&str> = all.iter().map(|e| e.key.signature.as_str()).collect();
    assert_eq!(labels, vec!["JJJ", "JHJ", "HHH"]);
    assert!(all.iter().all(|e| e.variant == Variant::Default));

    assert!(provider
        .get_all_for_start(LineRef::from_raw(8, 3).expect("line"))
        .await
        .is_empty());
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn filesystem_source_reads_bundle_files() {
    let temp = TempDir::new().expect("tempdir");
    let std_root = temp.path().join("std");
    std::fs::create_dir_all(&std_root).expect("mkdir");
    std::fs::write(std_root.join(bundle_file_name(hex(12))), bundle_bytes(12, "否", false))
        .expect("write bundle");

    let config = ProviderConfig::new(&std_root).with_easy_root(temp.path().join("missing"));
    let provider = ScenarioDbProvider::from_fs(config);
    let entry = provider
        .get(LineRef::from_raw(12, 2).expect("line"), sig("JJJ"))
        .await
        .expect("entry");
    assert_eq!(entry.headline, "否0");
    assert!(provider.load_bundle(hex(13)).await.is_none());
}

#[tokio::test]
async fn placeholder_entry_resolves_to_none() {
    let mut bundle: serde_json::Value =
        serde_json::from_slice(&bundle_bytes(10, "履", false)).expect("bundle json");
    bundle["items"]["10_2_JHJ"]["placeholder"] = json!(true);
    let source = Arc::new(MockSource::default());
    source.put("/std", 10, serde_json::to_vec(&bundle).expect("bundle bytes"));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source);

    let start = LineRef::from_raw(10, 2).expect("line");
    assert!(provider.get(start, sig("JHJ")).await.is_none());
    assert!(provider.get(start, sig("JJJ")).await.is_some());

    let labels: Vec<String> = provider
        .get_all_for_start(start)
        .await
        .iter()
        .map(|e| e.key.signature.as_str().to_string())
        .collect();
    assert_eq!(labels, vec!["JJJ", "HHH"]);
}

#[tokio::test]
async fn clear_during_load_is_not_undone() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(MockSource::gated(gate.clone()));
    source.put("/std", 11, bundle_bytes(11, "泰", false));
    let provider = ScenarioDbProvider::new(ProviderConfig::new("/std"), source.clone());

    let (first, ()) = tokio::join!(provider.load_bundle(hex(11)), async {
        tokio::task::yield_now().await;
        provider.clear_cache();
        gate.notify_one();
    });
    assert!(first.is_some());
    assert_eq!(source.fetches(), 1);

    // the in-flight result was not cached, so this goes back to the source
    gate.notify_one();
    assert!(provider.load_bundle(hex(11)).await.is_some());
    assert_eq!(source.fetches(), 2);
    assert_eq!(provider.stats().loads, 2);
    assert_eq!(provider.stats().hits, 0);

    assert!(provider.load_bundle(hex(11)).await.is_some());
    assert_eq!(provider.stats().hits, 1);
}
