use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::assemble::{assemble, ReportInputs};
use crate::cache::{ArtifactCache, ARTIFACTS, CHECKS, CI_RESULTS, SKIPPED_PACKAGES};
use crate::config::{Config, OutputFormat};
use crate::evaluation::{Checks, NixEvaluator, SkippedPackages};
use crate::output::{export_report, print_summary, PhaseProgress};
use crate::providers::{BuildbotProvider, CollectSettings};
use crate::results::ResultMap;

#[derive(Parser, Debug)]
#[command(name = "cireport")]
#[command(author, version, about = "Buildbot CI package report", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./cireport.{toml,json,yaml} or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect CI results and evaluation output into a package report
    Report(ReportArgs),

    /// Delete the cached artifacts
    ClearCache {
        #[arg(long, env = "CIREPORT_CACHE_DIR")]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ReportArgs {
    /// Buildbot instance base URL
    #[arg(short, long, env = "CIREPORT_BUILDBOT_URL")]
    url: Option<String>,

    /// Buildbot project name
    #[arg(short = 'P', long)]
    project: Option<String>,

    /// Number of jobs collected concurrently
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Log lines kept per job
    #[arg(long)]
    log_lines: Option<usize>,

    /// Flake reference to evaluate
    #[arg(long)]
    flake: Option<String>,

    /// Platform to report on, repeatable; the first one is primary
    #[arg(short, long = "system")]
    systems: Vec<String>,

    #[arg(long, env = "CIREPORT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Recompute every cached artifact
    #[arg(long, default_value_t = false)]
    refresh: bool,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

impl ReportArgs {
    /// Overlays the flags that were given onto the loaded configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.url {
            config.buildbot.url.clone_from(url);
        }
        if let Some(project) = &self.project {
            config.buildbot.project.clone_from(project);
        }
        if let Some(concurrency) = self.concurrency {
            config.buildbot.concurrency = concurrency;
        }
        if let Some(log_lines) = self.log_lines {
            config.buildbot.log_lines = log_lines;
        }
        if let Some(flake) = &self.flake {
            config.evaluation.flake.clone_from(flake);
        }
        if !self.systems.is_empty() {
            config.evaluation.systems.clone_from(&self.systems);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir.clone_from(dir);
        }
        if let Some(format) = &self.format {
            config.output.format = format.clone();
        }
        config
    }
}

impl Cli {
    async fn execute_report(&self, args: &ReportArgs) -> Result<()> {
        let config = args.apply(Config::load(self.config.as_deref())?);
        let pretty = self.pretty || config.output.pretty;

        info!(
            "Building report for {} on {}",
            config.buildbot.project, config.buildbot.url
        );

        let provider = BuildbotProvider::new(
            &config.buildbot.url,
            config.buildbot.project.clone(),
            &config.evaluation.systems,
            CollectSettings {
                concurrency: config.buildbot.concurrency,
                log_lines: config.buildbot.log_lines,
            },
            Duration::from_secs(config.buildbot.request_timeout_secs),
        )?;
        let evaluator = NixEvaluator::new(
            config.evaluation.flake.clone(),
            config.evaluation.inputs.clone(),
        );
        let cache = ArtifactCache::new(&config.cache.dir).refresh(args.refresh);

        let progress = PhaseProgress::start_phase_1();
        let inputs = evaluator.inputs().await?;

        let progress = progress.finish_phase_1_start_phase_2(inputs.len());
        let ci_results: ResultMap = cache
            .load_or_compute(CI_RESULTS, || provider.collect_results(progress.bar()))
            .await?;

        let progress = progress.finish_phase_2_start_phase_3(ci_results.len());
        let checks: Checks = cache
            .load_or_compute(CHECKS, || evaluator.checks(&config.evaluation.systems))
            .await?;
        let skipped_packages: SkippedPackages = cache
            .load_or_compute(SKIPPED_PACKAGES, || evaluator.skipped_packages())
            .await?;

        let progress = progress.finish_phase_3_start_phase_4();
        let report = assemble(ReportInputs {
            project: &config.buildbot.project,
            systems: &config.evaluation.systems,
            ci_results,
            checks: &checks,
            skipped_packages,
            inputs,
        })?;
        progress.finish_phase_4();

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            export_report(&report, &config.output.format, pretty, &mut file)?;
            file.flush()?;
            info!("Report written to: {}", output_path.display());
        } else if config.output.format == OutputFormat::Summary {
            print_summary(&report);
        } else {
            let mut stdout = std::io::stdout().lock();
            export_report(&report, &config.output.format, pretty, &mut stdout)?;
        }

        Ok(())
    }

    fn execute_clear_cache(&self, cache_dir: Option<&PathBuf>) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let dir = cache_dir.unwrap_or(&config.cache.dir);

        let removed = ArtifactCache::new(dir).clear(&ARTIFACTS)?;
        eprintln!("Removed {removed} cached artifacts from {}", dir.display());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Report(args) => self.execute_report(args).await,
            Commands::ClearCache { cache_dir } => self.execute_clear_cache(cache_dir.as_ref()),
        }
    }
}
