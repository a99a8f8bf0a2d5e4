use haqei_iching::{HexagramTable, LineRef, PathSignature};
use haqei_narrative::{BaseTable, NarrativeEntry, NarrativeKey, NarrativeStore};
use haqei_qa::{check_bundle_dir, check_coverage, check_duplication, QaConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn authored(line: LineRef, sig: PathSignature, i: usize) -> NarrativeEntry {
    let mut entry = NarrativeEntry::skeleton(line, "start", sig, line);
    entry.placeholder = false;
    entry.headline = format!("第{i}の流れで足場を固めて進む道筋");
    entry.stages.first = "静かに準備する".to_string();
    entry.stages.second = "仲間と動き出す".to_string();
    entry.stages.last = "成果を手放して次へ".to_string();
    entry
}

#[test]
fn coverage_reports_exact_shortfall_over_full_dataset() {
    let base = BaseTable::builtin().expect("base table");
    let mut store = NarrativeStore::new();

    // every key except the JJJ path of hexagram 64
    for (i, key) in NarrativeKey::all().enumerate() {
        if key.line.hexagram.get() == 64 && key.signature.as_str() == "JJJ" {
            continue;
        }
        store
            .insert(key, authored(key.line, key.signature, i))
            .expect("insert");
    }

    let report = check_coverage(&base, &store, 10);
    assert_eq!(report.expected, 3072);
    assert_eq!(report.present, 3066);
    assert_eq!(report.missing, 6);
    assert_eq!(report.placeholders, 0);
    assert_eq!(
        report.missing_sample,
        vec![
            "火水未済 初六 | JJJ",
            "火水未済 九二 | JJJ",
            "火水未済 六三 | JJJ",
            "火水未済 九四 | JJJ",
            "火水未済 六五 | JJJ",
            "火水未済 上九 | JJJ",
        ]
    );

    let inserted = store.backfill_skeletons(&base);
    assert_eq!(inserted, 6);
    let report = check_coverage(&base, &store, 10);
    assert_eq!(report.missing, 0);
    assert_eq!(report.placeholders, 6);
    assert_eq!(report.percentage, 100.0);
}

#[test]
fn compiled_bundles_cover_every_hexagram() {
    let base = BaseTable::builtin().expect("base table");
    let mut store = NarrativeStore::new();
    store.backfill_skeletons(&base);

    let temp = TempDir::new().expect("tempdir");
    let written = store.write_bundles(temp.path()).expect("write bundles");
    assert_eq!(written, 64);

    let coverage = check_bundle_dir(temp.path()).expect("scan");
    assert!(coverage.is_complete());
    assert_eq!(coverage.total_items, 3072);
}

#[test]
fn duplication_check_runs_over_store() {
    let table = HexagramTable::king_wen();
    let mut store = NarrativeStore::new();
    let line = LineRef::from_raw(1, 1).expect("line");
    let sig = PathSignature::ALL[0];
    let mut entry = authored(line, sig, 0);
    entry.stages.second = entry.stages.first.clone();
    store.insert(NarrativeKey::new(line, sig), entry).expect("insert");

    let report = check_duplication(store.iter(), &QaConfig::default().duplication);
    assert_eq!(report.checked, 1);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(
        report.findings[0].key,
        NarrativeKey::new(line, sig).authoring_key(table)
    );
}
