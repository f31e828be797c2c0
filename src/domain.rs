use serde::Serialize;

/// Length of a SIREN, the national legal-entity identifier.
pub const SIREN_LEN: usize = 9;

/// One disclosed contract-award notice from the DECP export.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcurementRecord {
    pub id_marche: String,
    pub siren_acheteur: String,
    pub siren_acheteur_valide: bool,
    pub code_commune_acheteur: Option<String>,
    pub code_departement_acheteur: Option<String>,
    pub code_region_acheteur: Option<String>,
    pub annee_marche: Option<i32>,
}

/// One registered establishment from the Sirene file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEstablishment {
    pub siren_acheteur: String,
    pub siret_acheteur: String,
    pub code_commune_acheteur: Option<String>,
}

/// Coverage statistics for one (year, region, department, commune) group.
///
/// `nombre_sirens_insee` is `None` for communes absent from the registry.
/// Zero and unknown are different facts; the distinction is preserved for
/// the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRecord {
    pub annee_marche: i32,
    pub code_region_acheteur: String,
    pub code_departement_acheteur: String,
    pub code_commune_acheteur: String,
    pub nombre_marches: u64,
    pub nombre_sirens_decp: u64,
    pub nombre_sirens_insee: Option<u64>,
}

/// Truncate a buyer identifier to the SIREN prefix of a SIRET-like value.
///
/// Truncation only: values shorter than nine characters pass through
/// unchanged and will simply not match the public-sector prefix filter.
pub fn truncate_siren(value: &str) -> &str {
    match value.char_indices().nth(SIREN_LEN) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Public-sector entities carry a SIREN starting with 1 or 2 in the
/// national registry numbering scheme.
pub fn is_public_siren(siren: &str) -> bool {
    siren.starts_with('1') || siren.starts_with('2')
}
