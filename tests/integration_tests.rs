use chrono::{NaiveDate, NaiveDateTime};
use player_hours::align::{HourAligner, MinutePolicy};
use player_hours::analyzers::correlation::{correlation_matrix, load_table};
use player_hours::analyzers::descriptives::{SUMMARY_FILE, describe_dir};
use player_hours::analyzers::heatmap::{
    HEATMAP_PNG, MATRIX_CSV, MATRIX_HTML, render_html, write_artifacts, write_matrix_csv,
};
use player_hours::analyzers::types::CorrelationMatrix;
use player_hours::batch::{align_dir, profile_dir};
use player_hours::profile::DailyProfiler;
use std::fs;
use std::path::Path;

fn midnight() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn test_worked_example_through_both_stages() {
    let root = tempfile::tempdir().unwrap();
    let (raw, hourly, daily) = (
        root.path().join("raw"),
        root.path().join("hourly"),
        root.path().join("daily"),
    );
    fs::create_dir(&raw).unwrap();
    write(
        &raw,
        "game.csv",
        "DateTime,Players\n2023-12-31 23:50:00,999\n2024-01-01 10:30:00,100\n2024-01-01 11:10:00,200\n",
    );

    let report = align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();
    assert_eq!(report.written.len(), 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        read(&hourly, "filtered_game.csv"),
        "DateTime,AvgPlayers\n2024-01-01 10:00:00,100.0\n2024-01-01 11:00:00,150.0\n"
    );

    let zone = "+05:00".parse().unwrap();
    profile_dir(&hourly, &daily, &DailyProfiler::new(zone)).unwrap();
    assert_eq!(
        read(&daily, "daily_avg_filtered_game.csv"),
        "Hour,AvgPlayers\n15,100.0\n16,150.0\n"
    );
}

#[test]
fn test_users_column_matches_players_column() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();

    let rows = "2024-01-01 00:00:00,5\n2024-01-01 00:30:00,7\n2024-01-01 00:40:00,9\n";
    write(&raw, "game.csv", &format!("DateTime,Players\n{rows}"));
    write(&raw, "tool.csv", &format!("DateTime,Users\n{rows}"));

    align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();

    let game = read(&hourly, "filtered_game.csv");
    assert_eq!(game, read(&hourly, "filtered_tool.csv"));
    assert_eq!(
        game,
        "DateTime,AvgPlayers\n2024-01-01 00:00:00,6.0\n2024-01-01 01:00:00,8.0\n"
    );
}

#[test]
fn test_corrupt_file_is_skipped_and_others_survive() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();
    fs::create_dir(&hourly).unwrap();

    // output from an earlier run must not be touched
    write(&hourly, "filtered_old.csv", "DateTime,AvgPlayers\n2023-01-01 00:00:00,1.0\n");

    write(&raw, "a_good.csv", "DateTime,Players\n2024-01-01 02:00:00,10\n");
    write(&raw, "b_garbage.csv", "DateTime,Players\n???,abc\nnull,\n");
    write(&raw, "c_noschema.csv", "\u{0}\u{1}\u{2}binary\n\u{3}\n");
    write(&raw, "d_offgrid.csv", "DateTime,Players\n2024-01-01 02:07:00,10\n");
    write(&raw, "readme.txt", "not data");

    let report = align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();

    assert_eq!(report.written.len(), 1);
    let failed: Vec<_> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(failed, vec!["b_garbage.csv", "c_noschema.csv", "d_offgrid.csv"]);

    assert!(hourly.join("filtered_a_good.csv").exists());
    assert!(!hourly.join("filtered_b_garbage.csv").exists());
    assert!(!hourly.join("filtered_c_noschema.csv").exists());
    assert!(!hourly.join("filtered_d_offgrid.csv").exists());
    assert!(!hourly.join("filtered_readme.txt").exists());
    assert_eq!(
        read(&hourly, "filtered_old.csv"),
        "DateTime,AvgPlayers\n2023-01-01 00:00:00,1.0\n"
    );
}

#[test]
fn test_nearest_policy_accepts_off_grid_file() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();
    write(&raw, "game.csv", "DateTime,Players\n2024-01-01 02:07:00,10\n2024-01-01 02:46:00,30\n");

    let aligner = HourAligner::new(midnight()).with_policy(MinutePolicy::Nearest);
    let report = align_dir(&raw, &hourly, &aligner).unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(
        read(&hourly, "filtered_game.csv"),
        "DateTime,AvgPlayers\n2024-01-01 02:00:00,10.0\n2024-01-01 03:00:00,30.0\n"
    );
}

#[test]
fn test_cutoff_after_all_rows_writes_empty_grid() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();
    write(&raw, "game.csv", "DateTime,Players\n2023-06-01 12:00:00,10\n");

    align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();

    assert_eq!(read(&hourly, "filtered_game.csv"), "DateTime,AvgPlayers\n");
}

#[test]
fn test_profile_skips_file_without_datetime() {
    let root = tempfile::tempdir().unwrap();
    let hourly = root.path().join("hourly");
    let daily = root.path().join("daily");
    fs::create_dir(&hourly).unwrap();
    write(&hourly, "filtered_a.csv", "DateTime,AvgPlayers\n2024-01-01 05:00:00,1\n2024-01-02 05:00:00,3\n");
    write(&hourly, "filtered_b.csv", "Stamp,AvgPlayers\n2024-01-01 05:00:00,1\n");

    let report = profile_dir(&hourly, &daily, &DailyProfiler::default()).unwrap();

    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(read(&daily, "daily_avg_filtered_a.csv"), "Hour,AvgPlayers\n5,2.0\n");
    assert!(!daily.join("daily_avg_filtered_b.csv").exists());
}

#[test]
fn test_descriptives_over_daily_profiles() {
    let root = tempfile::tempdir().unwrap();
    let daily = root.path().join("daily");
    let summary = root.path().join("summary");
    fs::create_dir(&daily).unwrap();
    write(&daily, "daily_avg_filtered_beta.csv", "Hour,AvgPlayers\n0,2\n1,4\n2,4\n3,4\n4,5\n5,5\n6,7\n7,9\n");
    write(&daily, "daily_avg_filtered_alpha.csv", "Hour,AvgPlayers\n0,10\n1,20\n2,30\n");
    write(&daily, "daily_avg_filtered_broken.csv", "Hour,Players\n0,1\n");

    let (path, rows) = describe_dir(&daily, &summary).unwrap();

    assert_eq!(path, summary.join(SUMMARY_FILE));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].game, "alpha");
    assert!((rows[0].mean - 20.0).abs() < 1e-9);
    assert!((rows[0].sd - 10.0).abs() < 1e-9);
    assert_eq!(rows[1].game, "beta");
    assert!((rows[1].mean - 5.0).abs() < 1e-9);
    assert!((rows[1].sd - 2.138089935299395).abs() < 1e-9);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("Game,Mean,SD\nalpha,20.0,10.0\nbeta,5.0,"));
}

#[test]
fn test_correlation_artifacts_from_curated_table() {
    let root = tempfile::tempdir().unwrap();
    let table = "Game,Mean,Year,isIndie,Genre1\n\
                 a,10,2010,True,Action\n\
                 b,20,2012,False,RPG\n\
                 c,30,2014,True,Action\n\
                 d,40,2016,False,Puzzle\n";
    let values = vec!["Mean".to_string(), "Year".to_string()];
    let flags = vec!["isIndie".to_string()];

    let data = load_table(table.as_bytes(), &values, &flags).unwrap();
    let matrix = correlation_matrix(&data);
    assert!((matrix.r[0][1] - 1.0).abs() < 1e-12);

    write_matrix_csv(&root.path().join(MATRIX_CSV), &matrix).unwrap();
    fs::write(root.path().join(MATRIX_HTML), render_html(&matrix).unwrap()).unwrap();

    let csv = read(root.path(), MATRIX_CSV);
    assert!(csv.starts_with(",Mean,Year,isIndie\nMean,1.0000,1.0000,"));
    assert!(read(root.path(), MATRIX_HTML).contains("<table>"));
}

#[test]
fn test_row_at_end_of_date_range_does_not_stop_batch() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();
    write(&raw, "a.csv", "DateTime,Players\n+262142-12-31 23:50:00,1\n");
    write(&raw, "b.csv", "DateTime,Players\n2024-01-01 02:00:00,10\n");

    let report = align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(read(&hourly, "filtered_a.csv"), "DateTime,AvgPlayers\n");
    assert_eq!(
        read(&hourly, "filtered_b.csv"),
        "DateTime,AvgPlayers\n2024-01-01 02:00:00,10.0\n"
    );
}

#[test]
fn test_non_utf8_cell_drops_only_that_row() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("raw");
    let hourly = root.path().join("hourly");
    fs::create_dir(&raw).unwrap();
    fs::write(
        raw.join("game.csv"),
        b"DateTime,Players\n2024-01-01 02:00:00,10\n2024-01-01 03:00:00,\xff\xfe\n2024-01-01 04:00:00,30\n",
    )
    .unwrap();

    let report = align_dir(&raw, &hourly, &HourAligner::new(midnight())).unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(
        read(&hourly, "filtered_game.csv"),
        "DateTime,AvgPlayers\n2024-01-01 02:00:00,10.0\n2024-01-01 04:00:00,30.0\n"
    );
}

#[test]
fn test_write_artifacts_with_undefined_cells() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("correlation");
    let matrix = CorrelationMatrix {
        names: vec!["Mean".into(), "hasKernel".into()],
        r: vec![vec![1.0, f64::NAN], vec![f64::NAN, f64::NAN]],
        n: vec![vec![4, 4], vec![4, 4]],
    };

    write_artifacts(&out, &matrix).unwrap();

    for name in [MATRIX_CSV, HEATMAP_PNG, MATRIX_HTML] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    assert!(fs::metadata(out.join(HEATMAP_PNG)).unwrap().len() > 0);
    assert!(read(&out, MATRIX_CSV).contains("Mean,1.0000,NaN"));
    assert!(read(&out, MATRIX_HTML).contains("n/a"));
}
