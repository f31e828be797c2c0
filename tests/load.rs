use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use decp_couverture::domain::CoverageRecord;
use decp_couverture::error::DecpError;
use decp_couverture::load::{load_decp, load_sirens, save_coverage};

const DECP_HEADER: &str =
    "id;sirenAcheteur;sirenAcheteurValide;codeCommuneAcheteur;departementAcheteur;codeRegionAcheteur;anneeNotification;montant";

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    Utf8PathBuf::from_path_buf(path).unwrap()
}

#[test]
fn decp_columns_are_renamed_to_canonical_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "decp.csv",
        &format!("{DECP_HEADER}\nA1;21340000100010;True;75056;75;11;2021;1000\n"),
    );

    let (records, report) = load_decp(&path, b';', None).unwrap();
    assert_eq!(report.rows_read, 1);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id_marche, "A1");
    assert_eq!(record.siren_acheteur, "21340000100010");
    assert!(record.siren_acheteur_valide);
    assert_eq!(record.code_commune_acheteur.as_deref(), Some("75056"));
    assert_eq!(record.code_departement_acheteur.as_deref(), Some("75"));
    assert_eq!(record.code_region_acheteur.as_deref(), Some("11"));
    assert_eq!(record.annee_marche, Some(2021));
}

#[test]
fn decp_missing_year_and_codes_become_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "decp.csv",
        &format!("{DECP_HEADER}\nA1;21340000100010;False;;;;;\n"),
    );

    let (records, _) = load_decp(&path, b';', None).unwrap();
    let record = &records[0];
    assert!(!record.siren_acheteur_valide);
    assert_eq!(record.code_commune_acheteur, None);
    assert_eq!(record.code_departement_acheteur, None);
    assert_eq!(record.code_region_acheteur, None);
    assert_eq!(record.annee_marche, None);
}

#[test]
fn decp_with_a_missing_required_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "decp.csv", "id;sirenAcheteur\nA1;213400001\n");

    let err = load_decp(&path, b';', None).unwrap_err();
    assert_matches!(err, DecpError::MissingColumn { .. });
}

#[test]
fn decp_invalid_boolean_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "decp.csv",
        &format!("{DECP_HEADER}\nA1;21340000100010;oui;75056;75;11;2021;1000\n"),
    );

    let err = load_decp(&path, b';', None).unwrap_err();
    assert_matches!(
        err,
        DecpError::MalformedInput { ref column, .. } if column == "sirenAcheteurValide"
    );
}

#[test]
fn sirene_columns_are_renamed_to_canonical_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "sirens.csv",
        "siren;siret;codeCommuneEtablissement;etatAdministratifEtablissement\n213400001;21340000100010;75056;A\n",
    );

    let (records, _) = load_sirens(&path, b';', None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].siren_acheteur, "213400001");
    assert_eq!(records[0].siret_acheteur, "21340000100010");
    assert_eq!(records[0].code_commune_acheteur.as_deref(), Some("75056"));
}

#[test]
fn row_cap_bounds_both_loaders() {
    let dir = tempfile::tempdir().unwrap();
    let decp_path = write_fixture(
        &dir,
        "decp.csv",
        &format!(
            "{DECP_HEADER}\nA1;213400001;True;75056;75;11;2021;1\nA2;213400001;True;75056;75;11;2021;1\nA3;213400001;True;75056;75;11;2021;1\n"
        ),
    );
    let sirens_path = write_fixture(
        &dir,
        "sirens.csv",
        "siren;siret;codeCommuneEtablissement\n213400001;21340000100010;75056\n134000002;13400000200010;75056\n",
    );

    let (decp, _) = load_decp(&decp_path, b';', Some(2)).unwrap();
    let (sirens, _) = load_sirens(&sirens_path, b';', Some(1)).unwrap();
    assert_eq!(decp.len(), 2);
    assert_eq!(sirens.len(), 1);
}

fn coverage_record(commune: &str, insee: Option<u64>) -> CoverageRecord {
    CoverageRecord {
        annee_marche: 2021,
        code_region_acheteur: "11".to_string(),
        code_departement_acheteur: "75".to_string(),
        code_commune_acheteur: commune.to_string(),
        nombre_marches: 3,
        nombre_sirens_decp: 2,
        nombre_sirens_insee: insee,
    }
}

#[test]
fn coverage_file_has_the_fixed_column_order_and_no_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("couverture.csv")).unwrap();

    save_coverage(
        &path,
        b';',
        &[coverage_record("75056", Some(147)), coverage_record("01053", None)],
    )
    .unwrap();

    let content = fs::read_to_string(path.as_std_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "annee_marche;code_region_acheteur;code_departement_acheteur;code_commune_acheteur;nombre_marches;nombre_sirens_decp;nombre_sirens_insee"
    );
    assert_eq!(lines[1], "2021;11;75;75056;3;2;147");
    // Unknown registry count serializes as an empty field, not zero.
    assert_eq!(lines[2], "2021;11;75;01053;3;2;");
    assert_eq!(lines.len(), 3);
}

#[test]
fn coverage_file_overwrite_replaces_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("couverture.csv")).unwrap();

    save_coverage(&path, b';', &[coverage_record("75056", Some(1))]).unwrap();
    save_coverage(&path, b';', &[coverage_record("34172", None)]).unwrap();

    let content = fs::read_to_string(path.as_std_path()).unwrap();
    assert!(content.contains("34172"));
    assert!(!content.contains("75056"));
}

#[test]
fn empty_record_set_writes_a_header_only_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("couverture.csv")).unwrap();

    save_coverage(&path, b';', &[]).unwrap();

    let content = fs::read_to_string(path.as_std_path()).unwrap();
    assert_eq!(content.lines().count(), 1);
}
