//! CLI commands implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use console::style;
use tokio::sync::mpsc;
use tracing::{error, warn};

use anexos::{cancel_pair, CancelSignal, Config, Pipeline};

use super::progress::spawn_download_progress;

#[derive(Parser)]
#[command(name = "anexos")]
#[command(about = "Download and archive the Anexo I / Anexo II attachments of the ANS procedure list")]
#[command(version)]
pub struct Cli {
    /// Config file (default: discovered anexos.toml / .yaml / .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, download and archive the attachments (default)
    Run(RunArgs),

    /// Find the attachment links and print them without downloading
    Discover(PageArgs),
}

#[derive(Args, Default)]
struct PageArgs {
    /// Page to search instead of the configured one
    #[arg(long)]
    url: Option<String>,

    /// Skip the headless browser fallback
    #[arg(long)]
    no_browser: bool,
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Output directory for downloads and the archive
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Archive file name
    #[arg(long)]
    archive_name: Option<String>,

    /// Concurrent downloads
    #[arg(short, long)]
    workers: Option<usize>,
}

impl PageArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.url {
            config.page_url = url.clone();
        }
        if self.no_browser {
            config.browser.enabled = false;
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        self.page.apply(config);
        if let Some(ref output) = self.output {
            // Relative to the working directory, not the config file.
            let output = if output.is_absolute() {
                output.clone()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(output))
                    .unwrap_or_else(|_| output.clone())
            };
            config.output_dir = output.to_string_lossy().into_owned();
        }
        if let Some(ref name) = self.archive_name {
            config.archive_name = name.clone();
        }
        if let Some(workers) = self.workers {
            config.download_workers = workers;
        }
    }
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        match self.command {
            Some(Commands::Run(ref args)) => args.apply(&mut config),
            Some(Commands::Discover(ref args)) => args.apply(&mut config),
            None => {}
        }
        config
    }
}

/// Run the selected command. Ctrl-C cancels the run.
pub async fn run(cli: Cli, config: Config) -> ExitCode {
    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            handle.cancel();
        }
    });

    match cli.command {
        Some(Commands::Discover(_)) => cmd_discover(config, cancel).await,
        Some(Commands::Run(_)) | None => cmd_run(config, cancel).await,
    }
}

async fn cmd_run(config: Config, cancel: CancelSignal) -> ExitCode {
    let (tx, rx) = mpsc::channel(16);
    let progress = spawn_download_progress(config.required_count as u64, rx);

    let pipeline = Pipeline::from_config(config).with_events(tx);
    let result = pipeline.run(&cancel).await;
    let required = pipeline.config().required_count;

    // Closes the event channel so the progress task finishes.
    drop(pipeline);
    let _ = progress.await;

    match result {
        Ok(outcome) => {
            if outcome.is_partial(required) {
                println!(
                    "{} only {} of {} attachments were downloaded",
                    style("!").yellow(),
                    outcome.retrieved.len(),
                    required
                );
            }
            println!(
                "{} Done, archive at {}",
                style("✓").green(),
                outcome.manifest.path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {}", e);
            println!(
                "{} Failed: {}. Consult the logs for details.",
                style("✗").red(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

async fn cmd_discover(config: Config, cancel: CancelSignal) -> ExitCode {
    let pipeline = Pipeline::from_config(config);

    match pipeline.discover(&cancel).await {
        Ok(report) if report.set.is_empty() => {
            println!("{} No attachment links found", style("✗").red());
            ExitCode::FAILURE
        }
        Ok(report) => {
            for link in report.set.links() {
                println!("{}\t{}", style(link.identity).cyan(), link.url);
            }
            if report.escalated {
                println!("{}", style("(browser fallback was used)").dim());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Discovery failed: {}", e);
            println!(
                "{} Failed: {}. Consult the logs for details.",
                style("✗").red(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default() {
        let cli = Cli::try_parse_from(["anexos"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "anexos",
            "run",
            "--url",
            "https://example.com/rol",
            "-o",
            "/tmp/anexos-out",
            "-w",
            "2",
            "--no-browser",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);

        let config = cli.apply_overrides(Config::default());
        assert_eq!(config.page_url, "https://example.com/rol");
        assert_eq!(config.output_dir, "/tmp/anexos-out");
        assert_eq!(config.download_workers, 2);
        assert!(!config.browser.enabled);
    }

    #[test]
    fn test_discover_parses() {
        let cli = Cli::try_parse_from(["anexos", "discover", "--no-browser"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Discover(ref a)) if a.no_browser));
    }
}
