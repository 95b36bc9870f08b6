use crime_risk::assessment::{
    AssessmentEngine, PatternType, PersonCsvImporter, PersonImportError, RiskLevel,
};

#[test]
fn importer_reads_aliased_headers_and_normalizes_flags() {
    let import = PersonCsvImporter::from_path("tests/fixtures/persons.csv").expect("csv imports");

    assert_eq!(import.total_rows(), 5);
    assert_eq!(import.records.len(), 3);

    let first = &import.records[0];
    assert_eq!(first.row, 2);
    assert_eq!(first.person.iin.as_deref(), Some("900101350123"));
    assert_eq!(first.person.attributes.pattern_type, PatternType::MixedUnstable);
    assert_eq!(first.person.attributes.total_cases, 5);
    assert_eq!(first.person.attributes.current_age, 28);
    assert!(first.person.attributes.has_job);
    assert!(!first.person.attributes.has_property);

    let blank = &import.records[2];
    assert_eq!(blank.row, 6);
    assert!(blank.person.iin.is_none());
    assert_eq!(blank.person.attributes.pattern_type, PatternType::Unknown);
    assert_eq!(blank.person.attributes.days_since_last, 365);
}

#[test]
fn importer_reports_invalid_rows_with_context() {
    let import = PersonCsvImporter::from_path("tests/fixtures/persons.csv").expect("csv imports");

    assert_eq!(import.errors.len(), 2);

    let counts = &import.errors[0];
    assert_eq!(counts.row, 4);
    assert_eq!(counts.iin.as_deref(), Some("12345"));
    assert!(counts.message.contains("iin must contain exactly 12 digits"));
    assert!(counts.message.contains("criminal_count (3)"));

    let pattern = &import.errors[1];
    assert_eq!(pattern.row, 5);
    assert!(pattern.message.contains("unknown pattern_type 'volatile'"));
}

#[test]
fn imported_records_feed_the_engine() {
    let engine = AssessmentEngine::standard().expect("standard engine");
    let import = PersonCsvImporter::from_path("tests/fixtures/persons.csv").expect("csv imports");

    let levels: Vec<RiskLevel> = import
        .records
        .iter()
        .map(|record| engine.calculate(&record.person).risk_level)
        .collect();

    assert_eq!(levels[0], RiskLevel::High);
    assert_eq!(levels[1], RiskLevel::Critical);
}

#[test]
fn malformed_csv_aborts_the_import() {
    let csv = "iin,age\n900101350123,30,extra\n";
    let err = PersonCsvImporter::from_reader(csv.as_bytes()).expect_err("ragged rows rejected");
    assert!(matches!(err, PersonImportError::Csv(_)));
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = PersonCsvImporter::from_path("tests/fixtures/absent.csv")
        .expect_err("missing file rejected");
    assert!(err.to_string().contains("absent.csv"));
}
