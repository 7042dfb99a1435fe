//! engagement-runner: headless generator and reporter for the Malawi
//! user engagement dataset.
//!
//! Usage:
//!   engagement-runner generate --seed 42 --users 3000 --days 30 --out-dir ./out
//!   engagement-runner report --profile overview --data ./out/user_engagement_data.csv
//!   engagement-runner all --config engagement.json
//!   engagement-runner --seed 7 --out-dir ./out      (no command runs `all`)

use anyhow::{anyhow, bail, Context, Result};
use engagement_core::{
    config::{GeneratorConfig, ReportProfile},
    dataset::Dataset,
    report::{generate_report, ReportOutcome},
    store::OutputStore,
    synthesizer::{log_distribution_summary, Synthesizer, DATASET_FILE},
};
use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = resolve_command(&args)?;
    let out_dir = flag_value(&args, "--out-dir").unwrap_or(".");
    let store = OutputStore::open(out_dir).with_context(|| format!("cannot open output dir {out_dir}"))?;

    match command {
        "generate" => {
            generate(&args, &store)?;
        }
        "report" => {
            let data = flag_value(&args, "--data")
                .map(PathBuf::from)
                .unwrap_or_else(|| store.path_for(DATASET_FILE));
            let profiles = select_profiles(flag_value(&args, "--profile").unwrap_or("all"))?;
            report(&data, &profiles, &store)?;
        }
        "all" => {
            let data = generate(&args, &store)?;
            report(&data, &ReportProfile::all(), &store)?;
        }
        _ => unreachable!("resolve_command only returns known commands"),
    }
    Ok(())
}

/// The first argument names the command unless it is a flag.
fn resolve_command(args: &[String]) -> Result<&str> {
    match args.get(1).map(String::as_str) {
        None => Ok("all"),
        Some(arg) if arg.starts_with("--") => Ok("all"),
        Some(arg @ ("generate" | "report" | "all")) => Ok(arg),
        Some(other) => bail!("unknown command '{other}' (expected generate, report or all)"),
    }
}

fn generate(args: &[String], store: &OutputStore) -> Result<PathBuf> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    config.seed = parse_arg(args, "--seed", config.seed)?;
    config.n_users = parse_arg(args, "--users", config.n_users)?;
    config.n_days = parse_arg(args, "--days", config.n_days)?;

    println!("Malawi engagement dataset generator");
    println!("  seed:      {}", config.seed);
    println!("  users:     {}", config.n_users);
    println!("  days:      {}", config.n_days);
    println!("  out_dir:   {}", store.root().display());
    println!("  started:   {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();

    let synthesizer = Synthesizer::new(config)?;
    let output = synthesizer.run();
    let written = Synthesizer::write_outputs(&output, store)?;
    log_distribution_summary(&output.dataset);

    println!("=== Generation summary ===");
    println!("  records:   {}", output.dataset.len());
    println!("  users:     {}", output.users.len());
    for path in &written {
        println!("  wrote:     {}", path.display());
    }
    println!();
    Ok(store.path_for(DATASET_FILE))
}

fn report(data: &Path, profiles: &[ReportProfile], store: &OutputStore) -> Result<()> {
    let dataset = Dataset::read_csv(data).with_context(|| format!("cannot load {}", data.display()))?;
    log::info!("loaded {} records from {}", dataset.len(), data.display());

    for profile in profiles {
        let outcome = generate_report(&dataset, profile, store)
            .with_context(|| format!("report profile '{}' failed", profile.name))?;
        print_summary(&outcome);
    }
    Ok(())
}

fn select_profiles(name: &str) -> Result<Vec<ReportProfile>> {
    if name == "all" {
        return Ok(ReportProfile::all());
    }
    match ReportProfile::by_name(name) {
        Some(profile) => Ok(vec![profile]),
        None => bail!("unknown profile '{name}' (expected complete, overview or all)"),
    }
}

fn print_summary(outcome: &ReportOutcome) {
    let s = &outcome.summary;
    let or_na = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));

    println!("=== Report: {} ===", outcome.profile);
    println!("  users:            {}", s.kpis.unique_users);
    println!("  records:          {}", s.kpis.total_records);
    println!("  retention:        {:.1}%", s.kpis.retention_pct);
    println!("  avg session:      {:.0}s", s.kpis.avg_session);
    println!("  avg clicks:       {:.1}", s.kpis.avg_clicks);
    println!("  avg feedback:     {}", or_na(s.kpis.avg_feedback));
    println!("  A/B delta:        {}", or_na(s.ab.retention_delta));
    println!(
        "  best network:     {}",
        s.best_network.as_ref().map_or("n/a", |g| g.key.as_str())
    );
    println!("  low engagement:   {} records", s.segments.low.count);
    println!("  image:            {}", outcome.image_path.display());
    println!("  html:             {}", outcome.html_path.display());
    println!();
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// `default` when the flag is absent. A present but unparsable value is
/// an error rather than a silent fallback.
fn parse_arg<T: FromStr>(args: &[String], flag: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match flag_value(args, flag) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value '{raw}' for {flag}: {e}")),
    }
}
