//! Integration tests for end-to-end parameter handling.
//!
//! These tests verify the full pipeline:
//! Load family → Expand defaults → Apply revision → Validate → Query

use horizon_params::{Error, IssueKind, Severity};
use horizon_tests::TestHarness;

/// Defaults expand over the horizon, with the default CPI offset folded
/// into inflation and wage-indexed parameters on wage growth.
#[test]
fn test_fixture_defaults_expand() {
    let mut harness = TestHarness::from_fixtures();
    let params = harness.params();
    assert_eq!(params.start_year(), 2020);
    assert_eq!(params.end_year(), 2025);
    assert_eq!(params.last_known_year(), 2021);
    assert_eq!(
        params.inflation_rates(),
        &[0.02, 0.0175, 0.0175, 0.0175, 0.0175, 0.0175]
    );

    assert_eq!(
        harness.real_series("standard_deduction"),
        vec![5000.0, 5100.0, 5189.25, 5280.06, 5372.46, 5466.48]
    );
    assert_eq!(
        harness.real_series("earnings_cap"),
        vec![100000.0, 103000.0, 106090.0, 109272.7, 112550.88, 115927.41]
    );
    assert_eq!(harness.real_series("credit_phaseout"), vec![200.0; 6]);
    assert_eq!(harness.row_at("exemption", 2022), Some(vec![1037.85, 2075.7]));
    assert_eq!(harness.real_at("standard_rate", 2025), Some(0.12));
}

/// A compound reform file with comments applies only its family section.
#[test]
fn test_reform_file_applies_policy_section() {
    let mut harness = TestHarness::from_fixtures();
    let path = TestHarness::fixture_path("reform.json");
    harness.apply(path.to_str().unwrap()).unwrap();

    assert_eq!(
        harness.real_series("standard_deduction"),
        vec![5000.0, 5100.0, 6000.0, 6000.0, 6000.0, 6000.0]
    );
    assert!(!harness.params().is_indexed("standard_deduction").unwrap());

    assert_eq!(harness.row_at("exemption", 2022), Some(vec![1037.85, 2075.7]));
    assert_eq!(harness.row_at("exemption", 2024), Some(vec![1526.25, 3052.5]));
    assert_eq!(harness.row_at("exemption", 2025), Some(vec![1552.96, 3105.92]));

    let params = harness.params_mut();
    params.set_year(2023).unwrap();
    assert_eq!(params.value("filing_basis").unwrap().as_str(), Some("annual"));
    params.set_year(2024).unwrap();
    assert_eq!(params.value("filing_basis").unwrap().as_str(), Some("quarterly"));
    assert!(params.parameter_warnings().is_empty());
    assert!(params.parameter_errors().is_empty());
}

/// Replay runs in year order whatever order the revision lists them in,
/// and the cursor comes back to where it was.
#[test]
fn test_revision_years_replayed_in_order() {
    let mut harness = TestHarness::from_fixtures();
    harness.params_mut().set_year(2021).unwrap();
    harness
        .apply(
            r#"{
                "credit_phaseout": {"2024": 300.0, "2022": 250.0},
                "credit_phaseout-indexed": {"2023": true}
            }"#,
        )
        .unwrap();
    assert_eq!(harness.params().current_year(), 2021);
    assert_eq!(
        harness.real_series("credit_phaseout"),
        vec![200.0, 200.0, 250.0, 250.0, 300.0, 305.25]
    );
}

/// Re-indexing from a switch alone starts at the stored value and never
/// rewrites earlier years.
#[test]
fn test_sibling_only_switch_keeps_history() {
    let mut harness = TestHarness::from_fixtures();
    harness
        .apply(r#"{"standard_deduction-indexed": {"2023": false}}"#)
        .unwrap();
    assert_eq!(
        harness.real_series("standard_deduction"),
        vec![5000.0, 5100.0, 5189.25, 5280.06, 5280.06, 5280.06]
    );
}

/// Structural problems are all reported together and nothing changes.
#[test]
fn test_structural_errors_are_aggregated() {
    let mut harness = TestHarness::from_fixtures();
    let before = harness.real_series("standard_deduction");
    let err = harness
        .apply(
            r#"{
                "standard_deduction": {"2022": 6000.0},
                "old_credit": {"2022": 1.0},
                "no_such_param": {"2023": 1.0},
                "dependents_limit": {"2022": 2.5},
                "top_rate-indexed": {"2022": true},
                "exemption": {"2022": 1000.0}
            }"#,
        )
        .unwrap_err();
    let Error::InvalidRevision { report } = err else {
        panic!("expected InvalidRevision, got {err:?}");
    };
    assert_eq!(
        report,
        "ERROR: 2022 old_credit was repealed in 2019 and has no replacement\n\
         ERROR: 2022 dependents_limit value 2.5 is not integer\n\
         ERROR: 2022 top_rate parameter is not indexable\n\
         ERROR: 2022 exemption with value 1000 should be a vector parameter\n\
         ERROR: 2023 no_such_param is an unknown parameter name\n"
    );
    assert_eq!(harness.real_series("standard_deduction"), before);
}

/// Out-of-range values stay committed even when the revision is raised.
#[test]
fn test_range_violation_committed_and_raised() {
    let mut harness = TestHarness::from_fixtures();
    let err = harness
        .apply(r#"{"standard_rate": {"2022": 0.5}}"#)
        .unwrap_err();
    assert!(matches!(err, Error::RangeViolation { .. }));
    assert_eq!(harness.real_at("standard_rate", 2022), Some(0.5));

    let params = harness.params();
    assert_eq!(
        params.parameter_errors(),
        "ERROR: 2022 standard_rate value 0.5 > max value 0.4\n\
         ERROR: 2023 standard_rate value 0.5 > max value 0.4\n\
         ERROR: 2024 standard_rate value 0.5 > max value 0.4\n\
         ERROR: 2025 standard_rate value 0.5 > max value 0.4\n"
    );
    assert_eq!(
        params.parameter_warnings(),
        "standard_rate applies to net income from 2022\n"
    );
    assert_eq!(params.warnings()[0].kind, IssueKind::Redefined);
}

/// Bounds naming another parameter follow that parameter's revised values.
#[test]
fn test_parameter_bound_tracks_revised_limit() {
    let mut harness = TestHarness::from_fixtures();
    harness
        .apply(r#"{"standard_rate": {"2022": 0.5}, "top_rate": {"2022": 0.6}}"#)
        .unwrap();
    assert!(harness.params().errors().is_empty());
}

/// Warn-level violations on vector cells name the column.
#[test]
fn test_vector_warning_names_column() {
    let mut harness = TestHarness::from_fixtures();
    harness
        .apply(r#"{"exemption": {"2025": [-5.0, 100.0]}}"#)
        .unwrap();
    let warnings = harness.params().warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(warnings[0].name, "exemption[single]");
    assert_eq!(
        harness.params().parameter_warnings(),
        "WARNING: 2025 exemption[single] value -5 < min value 0 for personal exemption[single]\n"
    );
}

/// String options are enforced after the revision is installed.
#[test]
fn test_string_options_enforced() {
    let mut harness = TestHarness::from_fixtures();
    harness
        .apply_lenient(r#"{"filing_basis": {"2025": "monthly"}}"#)
        .unwrap();
    assert_eq!(
        harness.params().parameter_errors(),
        "ERROR: 2025 filing_basis value 'monthly' not in [\"annual\", \"quarterly\"]\n"
    );
}

/// A revised CPI offset re-bases inflation and rebuilds untouched indexed
/// parameters from their law defaults.
#[test]
fn test_cpi_offset_revision_rebases_indexed_parameters() {
    let mut harness = TestHarness::from_fixtures();
    harness
        .apply(r#"{"CPI_offset": {"2023": -0.01}}"#)
        .unwrap();
    assert_eq!(
        harness.params().inflation_rates(),
        &[0.02, 0.0175, 0.0175, 0.0075, 0.0075, 0.0075]
    );
    assert_eq!(
        harness.real_series("standard_deduction"),
        vec![5000.0, 5100.0, 5189.25, 5280.06, 5319.66, 5359.56]
    );
    assert_eq!(
        harness.real_series("earnings_cap"),
        vec![100000.0, 103000.0, 106090.0, 109272.7, 112550.88, 115927.41]
    );
    assert_eq!(harness.real_series("credit_phaseout"), vec![200.0; 6]);
}

/// Untouched indexed parameters come out the same whether or not other
/// parameters ride along with the offset change.
#[test]
fn test_cpi_offset_rebasing_is_idempotent_for_untouched_parameters() {
    let mut plain = TestHarness::from_fixtures();
    plain.apply(r#"{"CPI_offset": {"2023": -0.01}}"#).unwrap();

    let mut combined = TestHarness::from_fixtures();
    combined
        .apply(
            r#"{
                "CPI_offset": {"2023": -0.01},
                "earnings_cap": {"2024": 120000.0},
                "dependents_limit": {"2022": 4}
            }"#,
        )
        .unwrap();

    assert_eq!(
        plain.real_series("standard_deduction"),
        combined.real_series("standard_deduction")
    );
    assert_eq!(
        plain.params().series("exemption").unwrap(),
        combined.params().series("exemption").unwrap()
    );
    assert_eq!(
        combined.real_series("earnings_cap")[4..],
        [120000.0, 123600.0]
    );
}

/// Year limits are checked before anything is validated or mutated.
#[test]
fn test_revision_year_limits() {
    let mut harness = TestHarness::from_fixtures();
    harness.params_mut().set_year(2023).unwrap();
    let err = harness
        .apply(r#"{"top_rate": {"2022": 0.5}}"#)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::YearOutOfRange { year: 2022, min: 2023, max: 2025 }
    ));
    let err = harness
        .apply(r#"{"top_rate": {"2026": 0.5}}"#)
        .unwrap_err();
    assert!(matches!(err, Error::YearOutOfRange { year: 2026, .. }));
    assert_eq!(harness.real_series("top_rate"), vec![0.4; 6]);
}

/// Malformed revision documents are rejected before reaching the engine.
#[test]
fn test_malformed_revision_documents() {
    let mut harness = TestHarness::from_fixtures();
    for source in [
        r#"{"top_rate": 0.5}"#,
        r#"{"top_rate": {"next": 0.5}}"#,
        r#"{"top_rate": {"2022": {"value": 0.5}}}"#,
    ] {
        assert!(matches!(
            harness.apply(source),
            Err(Error::MalformedRevision(_))
        ));
    }
    assert!(matches!(harness.apply("{not json"), Err(Error::Json(_))));
}

/// The snapshot reports one year's values with descriptive fields and
/// declared bounds intact.
#[test]
fn test_metadata_snapshot_serializes() {
    let mut harness = TestHarness::from_fixtures();
    harness.params_mut().set_year(2023).unwrap();
    let snapshot = harness.params().metadata().unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    let deduction = &json["standard_deduction"];
    assert_eq!(deduction["start_year"], "2023");
    assert_eq!(deduction["value_yrs"], serde_json::json!(["2023"]));
    assert_eq!(deduction["value"], serde_json::json!(5280.06));
    assert_eq!(deduction["long_name"], "Standard deduction");
    assert_eq!(deduction["indexed"], true);

    assert_eq!(json["exemption"]["value"], serde_json::json!([1056.01, 2112.02]));
    assert_eq!(json["exemption"]["valid_values"], serde_json::json!({"min": 0.0}));
    assert_eq!(json["exemption"]["invalid_minmsg"], "for personal exemption");
    assert_eq!(json["exemption"]["invalid_action"], "warn");
    assert_eq!(
        json["standard_rate"]["valid_values"],
        serde_json::json!({"min": 0.0, "max": "top_rate"})
    );
    assert_eq!(json["dependents_limit"]["value"], serde_json::json!(3));
    assert_eq!(json["filing_basis"]["value"], "annual");
}

/// Inline family documents work the same as fixture files.
#[test]
fn test_inline_documents() {
    let mut harness = TestHarness::from_documents(
        r#"{"name": "growth", "start_year": 2030, "num_years": 3,
            "inflation_rates": [0.1, 0.1, 0.1]}"#,
        r#"{"factor": {"value": [1.0], "value_type": "real", "indexed": true}}"#,
    );
    assert_eq!(harness.real_series("factor"), vec![1.0, 1.1, 1.21]);
    harness
        .apply(r#"{"growth": {"factor": {"2031": 2.0}}, "policy": {}}"#)
        .unwrap();
    assert_eq!(harness.real_series("factor"), vec![1.0, 2.0, 2.2]);
}
