//! check-runner: headless due-diligence runner.
//!
//! Usage:
//!   check-runner --name "John Smith" --alias "J. Smith" --jurisdiction RU
//!   check-runner --name "John Smith" --seed 42 --stream --db cases.db
//!   check-runner --name "John Smith" --disable community_fraud_db

use anyhow::Result;
use duediligence_core::{
    config::EngineConfig,
    data_source::UnavailableSource,
    event::ProgressEvent,
    pipeline::{CheckOptions, CheckPipeline, SourceSet},
    report::Report,
    store::CaseStore,
    subject::SubjectRequest,
    types::source_ids,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(name) = flag_value(&args, "--name") else {
        eprintln!("usage: check-runner --name <subject> [--alias <a>]... [--jurisdiction <cc>] [--industry <i>]");
        eprintln!("                    [--data-dir ./data] [--db <path>] [--timeout-ms <ms>] [--seed <u64>]");
        eprintln!("                    [--outage <p>] [--disable <source_id>]... [--stream]");
        std::process::exit(2);
    };
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let stream = args.iter().any(|a| a == "--stream");

    let mut request = SubjectRequest::named(name);
    for alias in flag_values(&args, "--alias") {
        request = request.with_alias(alias);
    }
    if let Some(j) = flag_value(&args, "--jurisdiction") {
        request = request.with_jurisdiction(j);
    }
    if let Some(i) = flag_value(&args, "--industry") {
        request = request.with_industry(i);
    }

    let config = EngineConfig::load(data_dir)?;
    let mut sources = SourceSet::load(data_dir)?;
    if args.iter().any(|a| a == "--seed") {
        let seed = parse_arg(&args, "--seed", 42u64);
        let outage = parse_arg(&args, "--outage", 0.0f64);
        sources = sources.simulated(seed, (20, 400), outage);
    }
    for disabled in flag_values(&args, "--disable") {
        disable_source(&mut sources, disabled);
    }

    let mut pipeline = CheckPipeline::build(&config, sources);
    if let Some(db) = flag_value(&args, "--db") {
        let store = CaseStore::open(db)?;
        store.migrate()?;
        pipeline = pipeline.with_recorder(Arc::new(store));
    }

    let options = CheckOptions {
        adapter_timeout: flag_value(&args, "--timeout-ms")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis),
    };

    let mut handle = pipeline.start_with(request, options)?;
    if !stream {
        println!("Due-diligence check {}", handle.check_id());
        println!("  sources: {}", pipeline.source_ids().join(", "));
        println!();
    }

    while let Some(event) = handle.next_event().await {
        if stream {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            ProgressEvent::Partial {
                source_id,
                finding,
                verdict,
                completed,
                total,
                ..
            } => {
                let status = if finding.source_failed { "unavailable" } else { "ok" };
                println!(
                    "  [{completed}/{total}] {source_id:<20} {status:<11} hits: {:<3} running tier: {}",
                    finding.records.len(),
                    verdict.tier.label()
                );
            }
            ProgressEvent::Final { report, .. } => print_report(&report),
            ProgressEvent::Cancelled { .. } => println!("Check cancelled."),
            ProgressEvent::Error { message, .. } => {
                anyhow::bail!("check failed: {message}");
            }
        }
    }
    Ok(())
}

fn disable_source(sources: &mut SourceSet, source_id: &str) {
    let off = Arc::new(UnavailableSource::new(source_id, "disabled by operator"));
    match source_id {
        source_ids::SANCTIONS => sources.sanctions = off,
        source_ids::AML_PEP => sources.aml_pep = off,
        source_ids::CRIMINAL_FRAUD_SITE => sources.criminal_fraud_site = off,
        source_ids::COMMUNITY_FRAUD_DB => sources.community_fraud_db = off,
        other => log::warn!("Unknown source id: {other}"),
    }
}

fn print_report(report: &Report) {
    println!();
    println!("=== VERDICT ===");
    println!("  subject:           {}", report.subject.primary_name());
    println!("  tier:              {}", report.tier.label());
    println!("  score:             {:.1} / 10", report.overall_score);
    println!("  high findings:     {}", report.total_findings);
    println!("  block transaction: {}", report.block_transaction);
    println!("  requires approval: {}", report.requires_approval);
    println!();
    println!("  {}", report.summary);

    println!();
    println!("=== SOURCES ===");
    for section in &report.sources {
        println!(
            "  {:<20} {:<28} score {:.2}",
            section.source_id, section.status_label, section.source_risk_score
        );
        for record in &section.records {
            println!(
                "      - {} ({}, {:?}, {:?} {:.2})",
                record.candidate_name,
                record.category.label(),
                record.severity,
                record.match_kind,
                record.match_score
            );
        }
    }

    println!();
    println!("=== NEXT STEPS ===");
    for step in &report.next_steps {
        println!("  * {step}");
    }
    for note in &report.audit_notes {
        println!("  ! {note}");
    }
    println!();
    println!("  {}", report.disclaimer);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn flag_values<'a>(args: &'a [String], flag: &'a str) -> impl Iterator<Item = &'a str> {
    args.windows(2)
        .filter(move |w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
