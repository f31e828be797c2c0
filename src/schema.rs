//! Central declaration of the source file schemas.
//!
//! Area codes and entity identifiers must never go through numeric
//! inference: `"01"` read as an integer loses its leading zero and corrupts
//! every downstream join and grouping key. Every column the pipeline touches
//! is therefore declared here with an explicit type, and loaders rename the
//! source column names to the canonical names used everywhere else.

use std::collections::HashMap;

use crate::table::ColumnType;

/// Canonical internal column names, shared by loaders, the engine and the sink.
pub mod canonical {
    pub const ID_MARCHE: &str = "id_marche";
    pub const SIREN_ACHETEUR: &str = "siren_acheteur";
    pub const SIREN_ACHETEUR_VALIDE: &str = "siren_acheteur_valide";
    pub const SIRET_ACHETEUR: &str = "siret_acheteur";
    pub const CODE_COMMUNE_ACHETEUR: &str = "code_commune_acheteur";
    pub const CODE_DEPARTEMENT_ACHETEUR: &str = "code_departement_acheteur";
    pub const CODE_REGION_ACHETEUR: &str = "code_region_acheteur";
    pub const ANNEE_MARCHE: &str = "annee_marche";
    pub const NOMBRE_MARCHES: &str = "nombre_marches";
    pub const NOMBRE_SIRENS_DECP: &str = "nombre_sirens_decp";
    pub const NOMBRE_SIRENS_INSEE: &str = "nombre_sirens_insee";
}

/// Column names as they appear in the DECP export.
pub mod decp {
    pub const ID_MARCHE: &str = "id";
    pub const SIREN_ACHETEUR: &str = "sirenAcheteur";
    pub const SIREN_ACHETEUR_VALIDE: &str = "sirenAcheteurValide";
    pub const CODE_COMMUNE_ACHETEUR: &str = "codeCommuneAcheteur";
    pub const CODE_DEPARTEMENT_ACHETEUR: &str = "departementAcheteur";
    pub const CODE_REGION_ACHETEUR: &str = "codeRegionAcheteur";
    pub const ANNEE_NOTIFICATION: &str = "anneeNotification";
}

/// Column names as they appear in the Sirene establishment file.
pub mod sirene {
    pub const SIREN: &str = "siren";
    pub const SIRET: &str = "siret";
    pub const CODE_COMMUNE_ETABLISSEMENT: &str = "codeCommuneEtablissement";
}

/// Columns the coverage pipeline reads from the DECP export.
///
/// The row identifier is always included, matching the export's index column.
pub fn decp_columns() -> Vec<String> {
    vec![
        decp::ID_MARCHE.to_string(),
        decp::SIREN_ACHETEUR.to_string(),
        decp::SIREN_ACHETEUR_VALIDE.to_string(),
        decp::CODE_COMMUNE_ACHETEUR.to_string(),
        decp::CODE_DEPARTEMENT_ACHETEUR.to_string(),
        decp::CODE_REGION_ACHETEUR.to_string(),
        decp::ANNEE_NOTIFICATION.to_string(),
    ]
}

pub fn decp_types() -> HashMap<String, ColumnType> {
    HashMap::from([
        (decp::ID_MARCHE.to_string(), ColumnType::Text),
        (decp::SIREN_ACHETEUR.to_string(), ColumnType::Text),
        (decp::SIREN_ACHETEUR_VALIDE.to_string(), ColumnType::Boolean),
        (decp::CODE_COMMUNE_ACHETEUR.to_string(), ColumnType::Text),
        (decp::CODE_DEPARTEMENT_ACHETEUR.to_string(), ColumnType::Text),
        (decp::CODE_REGION_ACHETEUR.to_string(), ColumnType::Text),
        (decp::ANNEE_NOTIFICATION.to_string(), ColumnType::Integer),
    ])
}

/// Columns the coverage pipeline reads from the Sirene establishment file.
///
/// `siret` is the establishment-level key and is always included.
pub fn sirene_columns() -> Vec<String> {
    vec![
        sirene::SIREN.to_string(),
        sirene::SIRET.to_string(),
        sirene::CODE_COMMUNE_ETABLISSEMENT.to_string(),
    ]
}

pub fn sirene_types() -> HashMap<String, ColumnType> {
    HashMap::from([
        (sirene::SIREN.to_string(), ColumnType::Text),
        (sirene::SIRET.to_string(), ColumnType::Text),
        (
            sirene::CODE_COMMUNE_ETABLISSEMENT.to_string(),
            ColumnType::Text,
        ),
    ])
}

/// Output column order of the coverage file. Fixed; consumers rely on it.
pub fn coverage_columns() -> [&'static str; 7] {
    [
        canonical::ANNEE_MARCHE,
        canonical::CODE_REGION_ACHETEUR,
        canonical::CODE_DEPARTEMENT_ACHETEUR,
        canonical::CODE_COMMUNE_ACHETEUR,
        canonical::NOMBRE_MARCHES,
        canonical::NOMBRE_SIRENS_DECP,
        canonical::NOMBRE_SIRENS_INSEE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_projected_decp_column_has_a_declared_type() {
        let types = decp_types();
        for column in decp_columns() {
            assert!(types.contains_key(&column), "untyped column {column}");
        }
    }

    #[test]
    fn every_projected_sirene_column_has_a_declared_type() {
        let types = sirene_types();
        for column in sirene_columns() {
            assert!(types.contains_key(&column), "untyped column {column}");
        }
    }

    #[test]
    fn code_columns_are_declared_text() {
        let types = decp_types();
        for column in [
            decp::CODE_COMMUNE_ACHETEUR,
            decp::CODE_DEPARTEMENT_ACHETEUR,
            decp::CODE_REGION_ACHETEUR,
            decp::SIREN_ACHETEUR,
        ] {
            assert_eq!(types.get(column), Some(&ColumnType::Text));
        }
        assert_eq!(
            sirene_types().get(sirene::CODE_COMMUNE_ETABLISSEMENT),
            Some(&ColumnType::Text)
        );
    }
}
