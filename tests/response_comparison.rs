//! Integration tests: CSV import, storage, frequencies and group comparison.

use approx::assert_relative_eq;
use cell_frequency::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str = "project,subject,condition,age,sex,treatment,response,sample,sample_type,time_from_treatment_start,b_cell,cd8_t_cell,cd4_t_cell,nk_cell,monocyte";

/// Create a synthetic cohort with a known responder effect.
///
/// - 24 melanoma/miraclib/PBMC subjects, half responders, sampled at days 0, 7, 14
/// - `cd8_t_cell` is three times higher in responders; other populations have no effect
/// - 4 carcinoma subjects treated with phauximab, response unknown, WB samples
fn create_synthetic_csv() -> String {
    let mut rng_seed = 42u64;
    let mut simple_rand = move || -> f64 {
        rng_seed = rng_seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((rng_seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut lines = vec![HEADER.to_string()];
    let mut sample_no = 0;
    for subject in 0..24 {
        let responder = subject % 2 == 0;
        let project = if subject < 12 { "prj1" } else { "prj2" };
        let sex = if subject % 3 == 0 { "M" } else { "F" };
        for day in [0, 7, 14] {
            let mut count = |base: f64| (base * (0.9 + 0.2 * simple_rand())).round() as u64;
            let cd8 = count(if responder { 300.0 } else { 100.0 });
            let (b, cd4, nk, mono) = (count(200.0), count(250.0), count(120.0), count(130.0));
            lines.push(format!(
                "{},sbj{:03},melanoma,{},{},miraclib,{},s{:04},PBMC,{},{},{},{},{},{}",
                project,
                subject,
                40 + subject,
                sex,
                if responder { "yes" } else { "no" },
                sample_no,
                day,
                b,
                cd8,
                cd4,
                nk,
                mono
            ));
            sample_no += 1;
        }
    }
    for subject in 24..28 {
        lines.push(format!(
            "prj3,sbj{:03},carcinoma,,F,phauximab,,s{:04},WB,,50,50,50,50,50",
            subject, sample_no
        ));
        sample_no += 1;
    }
    lines.join("\n") + "\n"
}

fn write_csv(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", text).unwrap();
    file.flush().unwrap();
    file
}

fn load_store() -> (Store, NamedTempFile) {
    let csv = write_csv(&create_synthetic_csv());
    let mut store = Store::open_in_memory().unwrap();
    store.import_csv(csv.path()).unwrap();
    (store, csv)
}

#[test]
fn test_percentages_sum_to_100() {
    let (store, _csv) = load_store();
    let summary = summarize_frequencies(&store.load_counts().unwrap());

    assert_eq!(summary.len(), 76 * 5);
    for (sample, total) in summary.percentage_sums() {
        assert!((total - 100.0).abs() < 1e-9, "{} sums to {}", sample, total);
    }
}

#[test]
fn test_known_frequency() {
    let csv = write_csv(&format!(
        "{}\nprj1,sbj1,melanoma,57,M,miraclib,yes,S1,PBMC,0,100,50,150,25,25\n",
        HEADER
    ));
    let data = read_csv(csv.path()).unwrap();
    let summary = summarize_frequencies(&data.counts);

    let b = summary
        .for_population("b_cell")
        .next()
        .expect("b_cell row");
    assert_eq!(b.total_count, 350);
    assert_relative_eq!(b.percentage, 28.571428, epsilon = 1e-5);
}

#[test]
fn test_single_timepoint_comparison() {
    let (store, _csv) = load_store();
    let samples = store.load_samples().unwrap();
    let summary = summarize_frequencies(&store.load_counts().unwrap());

    let filter = SampleFilter::new()
        .with_conditions(["melanoma"])
        .with_treatments(["miraclib"])
        .with_sample_types(["PBMC"])
        .with_timepoints([0]);
    let report =
        compare_response_groups(&summary, &samples, &filter, DEFAULT_ALPHA, &LmmConfig::default())
            .unwrap();

    assert_eq!(report.method, TestMethod::MannWhitney);
    assert_eq!(report.n_samples, 24);
    assert_eq!(report.len(), 5);

    let cd8 = report.get("cd8_t_cell").unwrap();
    assert_eq!(cd8.n_responders, 12);
    assert_eq!(cd8.n_non_responders, 12);
    assert!(cd8.is_significant());
    assert!(cd8.median_responders > cd8.median_non_responders);
}

#[test]
fn test_repeated_measures_comparison() {
    let (store, _csv) = load_store();
    let samples = store.load_samples().unwrap();
    let summary = summarize_frequencies(&store.load_counts().unwrap());

    let filter = SampleFilter::new().with_conditions(["melanoma"]);
    let report =
        compare_response_groups(&summary, &samples, &filter, DEFAULT_ALPHA, &LmmConfig::default())
            .unwrap();

    assert_eq!(report.method, TestMethod::MixedModel);
    assert_eq!(report.n_samples, 72);
    assert_eq!(report.n_subjects, 24);
    assert!(report.get("cd8_t_cell").unwrap().is_significant());
    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.tested, 5);
}

#[test]
fn test_unknown_responses_are_insufficient() {
    let (store, _csv) = load_store();
    let samples = store.load_samples().unwrap();
    let summary = summarize_frequencies(&store.load_counts().unwrap());

    let filter = SampleFilter::new().with_conditions(["carcinoma"]);
    let report =
        compare_response_groups(&summary, &samples, &filter, DEFAULT_ALPHA, &LmmConfig::default())
            .unwrap();
    assert_eq!(report.n_samples, 0);
    assert_eq!(report.summary.insufficient_data, 5);
}

#[test]
fn test_subset_description() {
    let (store, _csv) = load_store();
    let samples = store.load_samples().unwrap();

    let options = FilterOptions::collect(&samples, &store.load_counts().unwrap());
    let filter = DashboardConfig::default().subset_filter(&SampleFilter::new(), &options);
    let baseline = filter_samples(&samples, &filter);
    let d = describe_subset(&baseline);

    assert_eq!(d.n_samples, 24);
    assert_eq!(d.n_subjects, 24);
    assert_eq!(d.samples_per_project.get("prj1"), Some(&12));
    assert_eq!(d.samples_per_project.get("prj2"), Some(&12));
    assert_eq!(d.responders(), 12);
    assert_eq!(d.non_responders(), 12);
    assert_eq!(d.subjects_per_sex.get("M"), Some(&8));
    assert_eq!(d.subjects_per_sex.get("F"), Some(&16));
}

#[test]
fn test_filter_options() {
    let (store, _csv) = load_store();
    let options =
        FilterOptions::collect(&store.load_samples().unwrap(), &store.load_counts().unwrap());
    assert_eq!(options.conditions, vec!["carcinoma", "melanoma"]);
    assert_eq!(options.sample_types, vec!["PBMC", "WB"]);
    assert_eq!(options.timepoints, vec![0, 7, 14]);
    assert_eq!(options.populations.len(), 5);
}

#[test]
fn test_database_bootstrap_and_reload() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("database.db");
    let csv = write_csv(&create_synthetic_csv());

    let mut store = Store::open_or_import(&db_path, csv.path()).unwrap();
    assert_eq!(store.n_samples().unwrap(), 76);

    // Reload replaces rather than appends.
    store.import_csv(csv.path()).unwrap();
    assert_eq!(store.n_samples().unwrap(), 76);
    assert_eq!(store.load_counts().unwrap().len(), 76 * 5);
    drop(store);

    let reopened = Store::open(&db_path).unwrap();
    let samples = reopened.load_samples().unwrap();
    let s = samples.get("s0072").unwrap();
    assert_eq!(s.condition, "carcinoma");
    assert_eq!(s.response, Response::Missing);
    assert_eq!(s.time_from_treatment_start, None);
}
