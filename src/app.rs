use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Settings, separator_byte};
use crate::coverage::{FilterReport, compute_coverage};
use crate::download::{DownloadClient, decp_url};
use crate::error::DecpError;
use crate::load::{load_decp, load_sirens, save_coverage};
use crate::store::{DataStore, DownloadStamp};

#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    pub rows: Option<usize>,
    pub decp_only: bool,
    pub sirens_only: bool,
    pub contours_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub items: Vec<DownloadItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadItemResult {
    pub source: String,
    pub url: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageRunResult {
    pub output_path: String,
    pub records: usize,
    pub decp_rows_read: usize,
    pub decp_rows_dropped: usize,
    pub sirene_rows_read: usize,
    pub sirene_rows_dropped: usize,
    pub report: FilterReport,
}

pub struct App<D: DownloadClient> {
    settings: Settings,
    store: DataStore,
    client: D,
}

impl<D: DownloadClient> App<D> {
    pub fn new(settings: Settings, store: DataStore, client: D) -> Self {
        Self {
            settings,
            store,
            client,
        }
    }

    /// Fetch the selected sources into the data store. The `--*-only` flags
    /// carve the full set down exactly the way the historical tool did.
    pub fn download(&self, options: DownloadOptions) -> Result<DownloadResult, DecpError> {
        self.store.ensure_root()?;
        let mut items = Vec::new();

        let want_decp = !options.contours_only && !options.sirens_only;
        let want_contours = !options.decp_only && !options.sirens_only;
        let want_sirens = !options.contours_only && !options.decp_only;

        if want_decp {
            let url = decp_url(&self.settings.decp.url, options.rows);
            let destination = self.store.decp_path();
            info!("downloading DECP export to {destination}");
            self.client.download_decp(&url, &destination)?;
            items.push(self.stamp("decp", &url, &destination)?);
        }

        if want_contours {
            for (source, url, destination) in [
                (
                    "contours-communes",
                    self.settings.contours.communes_url.clone(),
                    self.store.contours_communes_path(),
                ),
                (
                    "contours-departements",
                    self.settings.contours.departements_url.clone(),
                    self.store.contours_departements_path(),
                ),
                (
                    "contours-regions",
                    self.settings.contours.regions_url.clone(),
                    self.store.contours_regions_path(),
                ),
            ] {
                info!("downloading {source} to {destination}");
                self.client.download_contour(&url, &destination)?;
                items.push(self.stamp(source, &url, &destination)?);
            }
        }

        if want_sirens {
            let url = self.settings.sirene.url.clone();
            let destination = self.store.sirens_path();
            info!("downloading Sirene stock to {destination}");
            self.client.download_sirens(&url, &destination)?;
            items.push(self.stamp("sirens", &url, &destination)?);
        }

        Ok(DownloadResult { items })
    }

    /// Compute coverage statistics from the downloaded files and write the
    /// coverage CSV. The row cap bounds both input reads.
    pub fn coverage(&self, rows: Option<usize>) -> Result<CoverageRunResult, DecpError> {
        let decp_path = self.store.decp_path();
        let (procurement, decp_report) =
            load_decp(&decp_path, separator_byte(&self.settings.decp.separator)?, rows)?;

        let sirens_path = self.store.sirens_path();
        let (registry, sirene_report) = load_sirens(
            &sirens_path,
            separator_byte(&self.settings.sirene.separator)?,
            rows,
        )?;

        let outcome = compute_coverage(&procurement, &registry)?;
        if outcome.records.is_empty() {
            warn!("coverage output is empty");
        }

        let output_path = self.store.coverage_path();
        save_coverage(
            &output_path,
            separator_byte(&self.settings.coverage.separator)?,
            &outcome.records,
        )?;
        info!("wrote {} coverage rows to {output_path}", outcome.records.len());

        Ok(CoverageRunResult {
            output_path: output_path.to_string(),
            records: outcome.records.len(),
            decp_rows_read: decp_report.rows_read,
            decp_rows_dropped: decp_report.rows_dropped,
            sirene_rows_read: sirene_report.rows_read,
            sirene_rows_dropped: sirene_report.rows_dropped,
            report: outcome.report,
        })
    }

    fn stamp(
        &self,
        source: &str,
        url: &str,
        destination: &Utf8Path,
    ) -> Result<DownloadItemResult, DecpError> {
        let stamp = DownloadStamp {
            source: source.to_string(),
            url: url.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("decp-couverture/{}", env!("CARGO_PKG_VERSION")),
        };
        DataStore::write_stamp(&self.store.download_stamp_path(source), &stamp)?;
        Ok(DownloadItemResult {
            source: source.to_string(),
            url: url.to_string(),
            path: destination.to_string(),
        })
    }
}
