//! Events from JSON-lines records through the batch driver.

use ngl_shower::{
    Event, ProductionDipoles, Role, RunConfig, Topology, records_from_jsonl, run_batch,
};

/// Dilepton top-pair event: g g → t t̄, t → b e⁺ ν, t̄ → b̄ μ⁻ ν̄.
fn ttbar_line(weight: f64, bottom_pz: f64) -> String {
    serde_json::json!({
        "weight": weight,
        "particles": [
            {"id": 21, "status": -1, "e": 500.0, "px": 0.0, "py": 0.0, "pz": 500.0, "color": [501, 502]},
            {"id": 21, "status": -1, "e": 500.0, "px": 0.0, "py": 0.0, "pz": -500.0, "color": [503, 501]},
            {"id": 6, "status": 2, "e": 500.0, "px": 100.0, "py": 50.0, "pz": 200.0, "color": [503, 0], "mothers": [1, 2]},
            {"id": -6, "status": 2, "e": 500.0, "px": -100.0, "py": -50.0, "pz": -200.0, "color": [0, 502], "mothers": [1, 2]},
            {"id": 5, "status": 1, "e": 200.0, "px": 20.0, "py": 50.0, "pz": bottom_pz, "color": [503, 0], "mothers": [3, 0]},
            {"id": -5, "status": 1, "e": 200.0, "px": -20.0, "py": -50.0, "pz": -150.0, "color": [0, 502], "mothers": [4, 0]},
            {"id": -11, "status": 1, "e": 150.0, "px": 40.0, "py": 0.0, "pz": 100.0, "mothers": [3, 0]},
            {"id": 12, "status": 1, "e": 150.0, "px": 40.0, "py": 0.0, "pz": 50.0, "mothers": [3, 0]},
            {"id": 13, "status": 1, "e": 150.0, "px": -40.0, "py": 0.0, "pz": -100.0, "mothers": [4, 0]},
            {"id": -14, "status": 1, "e": 150.0, "px": -40.0, "py": 0.0, "pz": -50.0, "mothers": [4, 0]}
        ]
    })
    .to_string()
}

/// The same event with the anti-top removed.
fn incomplete_line() -> String {
    let mut value: serde_json::Value = serde_json::from_str(&ttbar_line(0.5, 150.0)).unwrap();
    value["particles"].as_array_mut().unwrap().remove(3);
    value.to_string()
}

fn small_config() -> RunConfig {
    RunConfig { nsh: 32, n_bins: 10, seed: Some(2024), ..RunConfig::default() }
}

#[test]
fn reconstructs_dipoles_from_jsonl() {
    let text = format!("{}\n", ttbar_line(0.5, 150.0));
    let record = records_from_jsonl(text.as_bytes()).next().unwrap().unwrap();

    let production = Event::from_record(&record, &Topology::default()).unwrap();
    assert_eq!(production.dipoles().len(), 3);
    assert_eq!(production.weight(), 0.5);
    assert_eq!(production.particles(Role::OutgoingBottom).len(), 2);

    let decay = Topology { production: ProductionDipoles::None, decay_dipoles: true };
    assert_eq!(Event::from_record(&record, &decay).unwrap().dipoles().len(), 2);

    let both = Topology { production: ProductionDipoles::Intermediate, decay_dipoles: true };
    assert_eq!(Event::from_record(&record, &both).unwrap().dipoles().len(), 5);
}

#[test]
fn batch_over_jsonl_skips_incomplete_events() {
    let text = [ttbar_line(0.5, 150.0), String::new(), incomplete_line(), ttbar_line(0.5, 120.0)]
        .join("\n");
    let config = small_config();
    let region = config.region();
    let agg = run_batch(
        records_from_jsonl(text.as_bytes()),
        &config.batch_options(config.resolve_seed()),
        |_| true,
        |event: &Event| region.build(event),
    )
    .unwrap();

    let report = agg.report().unwrap();
    assert_eq!(report.n_events, 3);
    assert_eq!(report.n_valid_events, 2);
    assert_eq!(report.event_weight, 0.5);
    assert_eq!(report.weight_mismatches, 0);
    assert_eq!(report.bins.len(), 10);
    for w in report.bins.windows(2) {
        assert!(w[0].ll >= w[1].ll);
    }
    assert!(report.bins.iter().all(|b| b.error >= 0.0 && b.error.is_finite()));
    assert!(report.snlo <= 0.0);
    assert!(report.snlo_error.is_finite() && report.snnlo_error.is_finite());
}

#[test]
fn batch_flags_weight_mismatch() {
    let text = [ttbar_line(0.5, 150.0), ttbar_line(0.25, 150.0)].join("\n");
    let config = small_config();
    let region = config.region();
    let agg = run_batch(
        records_from_jsonl(text.as_bytes()),
        &config.batch_options(1),
        |_| true,
        |event: &Event| region.build(event),
    )
    .unwrap();
    let report = agg.report().unwrap();
    assert_eq!(report.weight_mismatches, 1);
    assert_eq!(report.event_weight, 0.5);
}

#[test]
fn batch_is_reproducible() {
    let text = [ttbar_line(1.0, 150.0), ttbar_line(1.0, 100.0)].join("\n");
    let config = small_config();
    let region = config.region();
    let run = || {
        run_batch(
            records_from_jsonl(text.as_bytes()),
            &config.batch_options(7),
            |_| true,
            |event: &Event| region.build(event),
        )
        .unwrap()
        .report()
        .unwrap()
    };
    assert_eq!(run(), run());
}
