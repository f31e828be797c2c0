//! Coverage aggregation engine.
//!
//! Turns procurement and registry rows into per-(year, region, department,
//! commune) coverage statistics: how many distinct public buyers placed a
//! contract in an area versus how many public-sector entities the registry
//! knows there.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{
    CoverageRecord, ProcurementRecord, RegistryEstablishment, SIREN_LEN, is_public_siren,
    truncate_siren,
};
use crate::error::DecpError;
use crate::schema::canonical;

/// Row counts observed at every filtering stage. This is the pipeline's one
/// operational sanity signal and is always reported to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub marches_tous_sirens: usize,
    pub marches_sirens_valides: usize,
    pub marches_sirens_publics: usize,
    pub marches_sans_localisation: usize,
    pub sirens_tous: usize,
    pub sirens_publics: usize,
    pub sirens_sans_commune: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageOutcome {
    pub records: Vec<CoverageRecord>,
    pub report: FilterReport,
}

type GroupKey = (i32, String, String, String);

#[derive(Default)]
struct Group<'a> {
    marches: HashSet<&'a str>,
    sirens: HashSet<&'a str>,
}

pub fn compute_coverage(
    procurement: &[ProcurementRecord],
    registry: &[RegistryEstablishment],
) -> Result<CoverageOutcome, DecpError> {
    let mut report = FilterReport {
        marches_tous_sirens: procurement.len(),
        ..FilterReport::default()
    };

    let valid: Vec<&ProcurementRecord> = procurement
        .iter()
        .filter(|record| record.siren_acheteur_valide)
        .collect();
    report.marches_sirens_valides = valid.len();
    info!(
        "notices reduced from {} to {} after dropping invalid buyer sirens",
        report.marches_tous_sirens, report.marches_sirens_valides
    );

    let public: Vec<(&ProcurementRecord, &str)> = valid
        .into_iter()
        .map(|record| (record, truncate_siren(&record.siren_acheteur)))
        .filter(|(_, siren)| is_public_siren(siren))
        .collect();
    report.marches_sirens_publics = public.len();
    info!(
        "notices reduced from {} to {} after keeping public-sector sirens (1* or 2*)",
        report.marches_tous_sirens, report.marches_sirens_publics
    );
    if public.is_empty() {
        warn!("no public-sector notices remain after filtering; check the source schema");
    }

    let mut groups: BTreeMap<GroupKey, Group<'_>> = BTreeMap::new();
    for (record, siren) in &public {
        let (Some(annee), Some(region), Some(departement), Some(commune)) = (
            record.annee_marche,
            record.code_region_acheteur.as_deref(),
            record.code_departement_acheteur.as_deref(),
            record.code_commune_acheteur.as_deref(),
        ) else {
            report.marches_sans_localisation += 1;
            continue;
        };
        let group = groups
            .entry((
                annee,
                region.to_string(),
                departement.to_string(),
                commune.to_string(),
            ))
            .or_default();
        group.marches.insert(record.id_marche.as_str());
        group.sirens.insert(*siren);
    }
    if report.marches_sans_localisation > 0 {
        warn!(
            "skipped {} public-sector notices missing a year or an area code",
            report.marches_sans_localisation
        );
    }

    let sirens_par_commune = group_registry_by_commune(registry, &mut report)?;

    let records = groups
        .into_iter()
        .map(|((annee, region, departement, commune), group)| {
            let nombre_sirens_insee = sirens_par_commune
                .get(commune.as_str())
                .map(|sirens| sirens.len() as u64);
            CoverageRecord {
                annee_marche: annee,
                code_region_acheteur: region,
                code_departement_acheteur: departement,
                code_commune_acheteur: commune,
                nombre_marches: group.marches.len() as u64,
                nombre_sirens_decp: group.sirens.len() as u64,
                nombre_sirens_insee,
            }
        })
        .collect();

    Ok(CoverageOutcome { records, report })
}

/// Distinct registry sirens per commune, restricted to public-sector sirens.
///
/// Registry sirens are already SIREN-level; a length other than nine
/// characters means the file is not what the loader thinks it is, and the
/// run aborts rather than corrupt the counts.
fn group_registry_by_commune<'a>(
    registry: &'a [RegistryEstablishment],
    report: &mut FilterReport,
) -> Result<HashMap<&'a str, HashSet<&'a str>>, DecpError> {
    report.sirens_tous = registry.len();

    let mut sirens_par_commune: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (idx, establishment) in registry.iter().enumerate() {
        if establishment.siren_acheteur.chars().count() != SIREN_LEN {
            return Err(DecpError::MalformedInput {
                row: idx,
                column: canonical::SIREN_ACHETEUR.to_string(),
                message: format!(
                    "expected a 9-character siren, got {:?}",
                    establishment.siren_acheteur
                ),
            });
        }
        if !is_public_siren(&establishment.siren_acheteur) {
            continue;
        }
        report.sirens_publics += 1;
        let Some(commune) = establishment.code_commune_acheteur.as_deref() else {
            report.sirens_sans_commune += 1;
            continue;
        };
        sirens_par_commune
            .entry(commune)
            .or_default()
            .insert(establishment.siren_acheteur.as_str());
    }

    info!(
        "registry sirens reduced from {} to {} after keeping public-sector sirens (1* or 2*)",
        report.sirens_tous, report.sirens_publics
    );
    if report.sirens_publics == 0 {
        warn!("no public-sector registry sirens remain after filtering; check the source schema");
    }
    if report.sirens_sans_commune > 0 {
        warn!(
            "skipped {} registry sirens missing a commune code",
            report.sirens_sans_commune
        );
    }

    Ok(sirens_par_commune)
}
