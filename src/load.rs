//! Loading the source tables into domain records, and writing the coverage
//! output back out.
//!
//! Loaders project to the columns the engine needs, apply the explicit type
//! map from `schema`, and rename the source column names to the canonical
//! ones so nothing downstream ever sees a raw source header.

use camino::Utf8Path;

use crate::domain::{CoverageRecord, ProcurementRecord, RegistryEstablishment};
use crate::error::DecpError;
use crate::schema;
use crate::store::DataStore;
use crate::table::{Cell, LoadReport, Table, TableSpec, read_table};

pub fn load_decp(
    path: &Utf8Path,
    delimiter: u8,
    rows: Option<usize>,
) -> Result<(Vec<ProcurementRecord>, LoadReport), DecpError> {
    let spec = TableSpec {
        delimiter,
        rows,
        columns: Some(schema::decp_columns()),
        types: schema::decp_types(),
    };
    let (table, report) = read_table(path, &spec)?;

    let id_marche = column(&table, schema::decp::ID_MARCHE, path)?;
    let siren = column(&table, schema::decp::SIREN_ACHETEUR, path)?;
    let valide = column(&table, schema::decp::SIREN_ACHETEUR_VALIDE, path)?;
    let commune = column(&table, schema::decp::CODE_COMMUNE_ACHETEUR, path)?;
    let departement = column(&table, schema::decp::CODE_DEPARTEMENT_ACHETEUR, path)?;
    let region = column(&table, schema::decp::CODE_REGION_ACHETEUR, path)?;
    let annee = column(&table, schema::decp::ANNEE_NOTIFICATION, path)?;

    let mut records = Vec::with_capacity(table.len());
    for (idx, cells) in table.rows().iter().enumerate() {
        records.push(ProcurementRecord {
            id_marche: text_or_empty(&cells[id_marche]),
            siren_acheteur: text_or_empty(&cells[siren]),
            siren_acheteur_valide: required_boolean(
                &cells[valide],
                idx,
                schema::canonical::SIREN_ACHETEUR_VALIDE,
            )?,
            code_commune_acheteur: optional_text(&cells[commune]),
            code_departement_acheteur: optional_text(&cells[departement]),
            code_region_acheteur: optional_text(&cells[region]),
            annee_marche: cells[annee].as_integer().map(|value| value as i32),
        });
    }
    Ok((records, report))
}

pub fn load_sirens(
    path: &Utf8Path,
    delimiter: u8,
    rows: Option<usize>,
) -> Result<(Vec<RegistryEstablishment>, LoadReport), DecpError> {
    let spec = TableSpec {
        delimiter,
        rows,
        columns: Some(schema::sirene_columns()),
        types: schema::sirene_types(),
    };
    let (table, report) = read_table(path, &spec)?;

    let siren = column(&table, schema::sirene::SIREN, path)?;
    let siret = column(&table, schema::sirene::SIRET, path)?;
    let commune = column(&table, schema::sirene::CODE_COMMUNE_ETABLISSEMENT, path)?;

    let mut records = Vec::with_capacity(table.len());
    for cells in table.rows() {
        records.push(RegistryEstablishment {
            siren_acheteur: text_or_empty(&cells[siren]),
            siret_acheteur: text_or_empty(&cells[siret]),
            code_commune_acheteur: optional_text(&cells[commune]),
        });
    }
    Ok((records, report))
}

/// Serialize coverage records: fixed column order, no index column, empty
/// field where the registry count is unknown. Written atomically so a
/// failed run leaves the previous output intact.
pub fn save_coverage(
    path: &Utf8Path,
    delimiter: u8,
    records: &[CoverageRecord],
) -> Result<(), DecpError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(schema::coverage_columns())
        .map_err(|err| DecpError::Filesystem(err.to_string()))?;
    for record in records {
        let insee = record
            .nombre_sirens_insee
            .map(|count| count.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                record.annee_marche.to_string(),
                record.code_region_acheteur.clone(),
                record.code_departement_acheteur.clone(),
                record.code_commune_acheteur.clone(),
                record.nombre_marches.to_string(),
                record.nombre_sirens_decp.to_string(),
                insee,
            ])
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
    }

    let content = writer
        .into_inner()
        .map_err(|err| DecpError::Filesystem(err.to_string()))?;
    DataStore::write_bytes_atomic(path, &content)
}

fn column(table: &Table, name: &str, path: &Utf8Path) -> Result<usize, DecpError> {
    table
        .column_index(name)
        .ok_or_else(|| DecpError::MissingColumn {
            column: name.to_string(),
            path: path.to_owned(),
        })
}

fn text_or_empty(cell: &Cell) -> String {
    cell.as_text().unwrap_or_default().to_string()
}

fn optional_text(cell: &Cell) -> Option<String> {
    cell.as_text().map(str::to_string)
}

fn required_boolean(cell: &Cell, row: usize, column: &str) -> Result<bool, DecpError> {
    cell.as_boolean().ok_or_else(|| DecpError::MalformedInput {
        row,
        column: column.to_string(),
        message: "expected a boolean value".to_string(),
    })
}
