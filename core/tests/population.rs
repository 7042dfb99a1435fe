//! Statistical properties of the generated population and activity.
//!
//! Thresholds are chi-square critical values at p = 0.001, so a correct
//! sampler fails these roughly once in a thousand seeds. Seeds are fixed.

use engagement_core::{
    config::{GeneratorConfig, WeightedCategory},
    model::{EngagementRecord, User},
    population::PopulationGenerator,
    rng::SimRng,
    synthesizer::Synthesizer,
};

fn chi_square(users: &[User], categories: &[WeightedCategory], field: fn(&User) -> &str) -> f64 {
    let n = users.len() as f64;
    categories
        .iter()
        .map(|c| {
            let observed = users.iter().filter(|u| field(u) == c.label).count() as f64;
            let expected = n * c.weight;
            (observed - expected).powi(2) / expected
        })
        .sum()
}

fn mean_of(records: &[&EngagementRecord], value: fn(&EngagementRecord) -> u32) -> f64 {
    let total: f64 = records.iter().map(|r| f64::from(value(r))).sum();
    total / records.len() as f64
}

fn big_population(seed: u64) -> (GeneratorConfig, Vec<User>) {
    let config = GeneratorConfig {
        seed,
        n_users: 20_000,
        ..GeneratorConfig::default()
    };
    let mut rng = SimRng::new(seed);
    let users = PopulationGenerator::new(&config).generate(&mut rng);
    (config, users)
}

#[test]
fn record_count_is_users_times_days() {
    let config = GeneratorConfig {
        n_users: 37,
        n_days: 11,
        ..GeneratorConfig::default()
    };
    let out = Synthesizer::new(config).unwrap().run();
    assert_eq!(out.dataset.len(), 37 * 11);
    assert_eq!(out.dataset.unique_users(), 37);
}

#[test]
fn every_row_satisfies_the_invariants() {
    let config = GeneratorConfig {
        n_users: 500,
        n_days: 10,
        ..GeneratorConfig::default()
    };
    let out = Synthesizer::new(config.clone()).unwrap().run();

    for r in out.dataset.records() {
        assert!(r.session_duration >= 30, "duration {} below floor", r.session_duration);
        assert!(r.data_used_mb >= 0.0, "negative data usage {}", r.data_used_mb);
        assert!(r.data_used_mb.is_finite());
        assert!(
            r.feedback_score.map_or(true, |s| (1..=5).contains(&s)),
            "feedback {:?} out of range",
            r.feedback_score
        );
        assert!(r.age >= config.age_min && r.age < config.age_max, "age {}", r.age);
        assert!(config.locations.contains(&r.location));
        assert!(r.feature_version == "A" || r.feature_version == "B");
    }
}

#[test]
fn rows_are_user_major_day_minor() {
    let out = Synthesizer::new(GeneratorConfig::default_test()).unwrap().run();
    let records = out.dataset.records();
    for pair in records.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.user_id == b.user_id {
            assert_eq!(b.date, a.date.succ_opt().unwrap());
        } else {
            assert_eq!(b.user_id, a.user_id + 1);
        }
    }
    assert_eq!(records[0].date.to_string(), "2025-11-01");
}

#[test]
fn user_attributes_repeat_on_every_day() {
    let out = Synthesizer::new(GeneratorConfig::default_test()).unwrap().run();
    for r in out.dataset.records() {
        let u = &out.users[r.user_id as usize];
        assert_eq!(
            (&r.gender, &r.location, &r.device, &r.network),
            (&u.gender, &u.location, &u.device, &u.network)
        );
        assert_eq!(r.age, u.age);
    }
}

#[test]
fn device_frequencies_match_weights() {
    let (config, users) = big_population(7);
    let chi2 = chi_square(&users, &config.devices, |u| u.device.as_str());
    assert!(chi2 < 20.52, "device chi-square {chi2:.2} exceeds critical value (5 dof)");
}

#[test]
fn network_frequencies_match_weights() {
    let (config, users) = big_population(8);
    let chi2 = chi_square(&users, &config.networks, |u| u.network.as_str());
    assert!(chi2 < 13.82, "network chi-square {chi2:.2} exceeds critical value (2 dof)");
}

#[test]
fn gender_frequencies_match_weights() {
    let (config, users) = big_population(9);
    let chi2 = chi_square(&users, &config.genders, |u| u.gender.as_str());
    assert!(chi2 < 10.83, "gender chi-square {chi2:.2} exceeds critical value (1 dof)");
}

#[test]
fn urban_users_engage_more_than_rural_on_the_same_device() {
    let config = GeneratorConfig {
        seed: 11,
        n_users: 3000,
        n_days: 5,
        ..GeneratorConfig::default()
    };
    let out = Synthesizer::new(config.clone()).unwrap().run();

    let android: Vec<&EngagementRecord> = out
        .dataset
        .records()
        .iter()
        .filter(|r| r.device == "Android")
        .collect();
    let (urban, rural): (Vec<&EngagementRecord>, Vec<&EngagementRecord>) =
        android.into_iter().partition(|r| config.is_urban(&r.location));
    assert!(!urban.is_empty() && !rural.is_empty());

    let duration_ratio = mean_of(&urban, |r| r.session_duration) / mean_of(&rural, |r| r.session_duration);
    let clicks_ratio = mean_of(&urban, |r| r.clicks) / mean_of(&rural, |r| r.clicks);

    assert!((duration_ratio - 1.5).abs() < 0.05, "duration ratio {duration_ratio:.3}");
    assert!((clicks_ratio - 1.5).abs() < 0.08, "clicks ratio {clicks_ratio:.3}");
}
