use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use decp_couverture::app::{App, DownloadOptions};
use decp_couverture::config::Settings;
use decp_couverture::download::DownloadClient;
use decp_couverture::error::DecpError;
use decp_couverture::store::DataStore;

const DECP_HEADER: &str =
    "id;sirenAcheteur;sirenAcheteurValide;codeCommuneAcheteur;departementAcheteur;codeRegionAcheteur;anneeNotification";

/// Records requested sources and writes a placeholder payload, so download
/// routing can be asserted without touching the network.
#[derive(Default)]
struct MockDownload {
    calls: Mutex<Vec<String>>,
}

impl MockDownload {
    fn record(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        }
        fs::write(destination.as_std_path(), b"payload")
            .map_err(|err| DecpError::Filesystem(err.to_string()))
    }
}

impl DownloadClient for MockDownload {
    fn download_decp(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        self.record(url, destination)
    }

    fn download_sirens(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        self.record(url, destination)
    }

    fn download_contour(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        self.record(url, destination)
    }
}

fn test_settings(dir: &tempfile::TempDir) -> (Settings, DataStore) {
    let root = Utf8PathBuf::from_path_buf(dir.path().join("data")).unwrap();
    let settings = Settings {
        data_dir: root.clone(),
        ..Settings::default()
    };
    let store = DataStore::new(root);
    (settings, store)
}

#[test]
fn download_fetches_all_sources_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    let app = App::new(settings, store, MockDownload::default());

    let result = app.download(DownloadOptions::default()).unwrap();
    let sources: Vec<&str> = result.items.iter().map(|item| item.source.as_str()).collect();
    assert_eq!(
        sources,
        [
            "decp",
            "contours-communes",
            "contours-departements",
            "contours-regions",
            "sirens"
        ]
    );
}

#[test]
fn download_decp_only_skips_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    let app = App::new(settings, store, MockDownload::default());

    let options = DownloadOptions {
        decp_only: true,
        ..DownloadOptions::default()
    };
    let result = app.download(options).unwrap();
    let sources: Vec<&str> = result.items.iter().map(|item| item.source.as_str()).collect();
    assert_eq!(sources, ["decp"]);
}

#[test]
fn download_row_cap_reaches_the_export_url() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    let client = MockDownload::default();
    let app = App::new(settings, store, client);

    let options = DownloadOptions {
        rows: Some(500),
        decp_only: true,
        ..DownloadOptions::default()
    };
    let result = app.download(options).unwrap();
    assert!(result.items[0].url.ends_with("&rows=500"));
}

#[test]
fn download_writes_a_provenance_stamp() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    let stamp_path = store.download_stamp_path("decp");
    let app = App::new(settings, store, MockDownload::default());

    let options = DownloadOptions {
        decp_only: true,
        ..DownloadOptions::default()
    };
    app.download(options).unwrap();

    let content = fs::read_to_string(stamp_path.as_std_path()).unwrap();
    let stamp: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(stamp["source"], "decp");
    assert!(stamp["downloaded_at"].as_str().unwrap().contains('T'));
}

#[test]
fn coverage_run_reads_the_store_and_writes_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    store.ensure_root().unwrap();

    fs::write(
        store.decp_path().as_std_path(),
        format!(
            "{DECP_HEADER}\nA1;21340000100010;True;75056;75;11;2021\nA2;99999999900010;True;75056;75;11;2021\n"
        ),
    )
    .unwrap();
    fs::write(
        store.sirens_path().as_std_path(),
        "siren;siret;codeCommuneEtablissement\n213400001;21340000100010;75056\n134000002;13400000200010;75056\n",
    )
    .unwrap();

    let output_path = store.coverage_path();
    let app = App::new(settings, store, MockDownload::default());
    let result = app.coverage(None).unwrap();

    assert_eq!(result.records, 1);
    assert_eq!(result.report.marches_tous_sirens, 2);
    assert_eq!(result.report.marches_sirens_publics, 1);
    assert_eq!(result.report.sirens_publics, 2);

    let content = fs::read_to_string(output_path.as_std_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[1], "2021;11;75;75056;1;1;2");
}

#[test]
fn coverage_without_downloaded_files_is_a_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    let app = App::new(settings, store, MockDownload::default());

    let err = app.coverage(None).unwrap_err();
    assert!(matches!(err, DecpError::SourceUnavailable { .. }));
}

#[test]
fn coverage_row_cap_bounds_both_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let (settings, store) = test_settings(&dir);
    store.ensure_root().unwrap();

    fs::write(
        store.decp_path().as_std_path(),
        format!(
            "{DECP_HEADER}\nA1;21340000100010;True;75056;75;11;2021\nA2;21340000100010;True;75056;75;11;2022\nA3;21340000100010;True;75056;75;11;2023\n"
        ),
    )
    .unwrap();
    fs::write(
        store.sirens_path().as_std_path(),
        "siren;siret;codeCommuneEtablissement\n213400001;21340000100010;75056\n134000002;13400000200010;75056\n",
    )
    .unwrap();

    let app = App::new(settings, store, MockDownload::default());
    let result = app.coverage(Some(1)).unwrap();
    assert_eq!(result.decp_rows_read, 1);
    assert_eq!(result.sirene_rows_read, 1);
    assert_eq!(result.records, 1);
}
