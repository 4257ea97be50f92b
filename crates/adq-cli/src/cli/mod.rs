//! CLI for the ADQ audio download queue.

mod commands;
mod render;
mod session;

use adq_core::admission::PlanTier;
use adq_core::config::{self, AdqConfig};
use adq_core::job::{AudioFormat, JobOptions};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_completions, run_config, run_get, run_shell};

/// Top-level CLI for the ADQ audio download queue.
#[derive(Debug, Parser)]
#[command(name = "adq")]
#[command(about = "ADQ: single-slot audio download queue driving yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-job overrides on top of the `[defaults]` config section.
#[derive(Debug, Clone, Default, Args)]
pub struct JobArgs {
    /// Directory for finished files (default: config, else the current directory).
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Audio format: mp3, opus or flac.
    #[arg(long, short = 'f', value_name = "FORMAT")]
    pub format: Option<AudioFormat>,

    /// Do not embed metadata tags.
    #[arg(long)]
    pub no_metadata: bool,

    /// Do not embed the thumbnail as cover art.
    #[arg(long)]
    pub no_thumbnail: bool,

    /// Let playlist URLs expand into every item.
    #[arg(long)]
    pub playlists: bool,
}

impl JobArgs {
    pub fn apply(&self, mut opts: JobOptions) -> JobOptions {
        if let Some(dir) = &self.output_dir {
            opts.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            opts.audio_format = format;
        }
        if self.no_metadata {
            opts.embed_metadata = false;
        }
        if self.no_thumbnail {
            opts.embed_thumbnail = false;
        }
        if self.playlists {
            opts.allow_playlists = true;
        }
        opts
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs, one at a time, then exit.
    Get {
        /// Media page URLs, queued in the order given.
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        job: JobArgs,

        /// Plan tier for this run (overrides config).
        #[arg(long, value_name = "TIER")]
        plan: Option<PlanTier>,

        /// Print every queue snapshot as one JSON line instead of progress text.
        #[arg(long)]
        json: bool,
    },

    /// Interactive queue: read commands (add, cancel, retry, ...) from stdin.
    Shell {
        #[command(flatten)]
        job: JobArgs,

        /// Plan tier for this session (overrides config).
        #[arg(long, value_name = "TIER")]
        plan: Option<PlanTier>,

        /// Print every queue snapshot as one JSON line instead of progress text.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file path and effective configuration.
    Config,

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                job,
                plan,
                json,
            } => {
                let opts = job_options(&cfg, &job)?;
                run_get(&cfg, &urls, opts, plan, json).await?;
            }
            CliCommand::Shell { job, plan, json } => {
                let opts = job_options(&cfg, &job)?;
                run_shell(&cfg, opts, plan, json).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

fn job_options(cfg: &AdqConfig, args: &JobArgs) -> Result<JobOptions> {
    let cwd = std::env::current_dir()?;
    Ok(args.apply(cfg.job_options(&cwd)))
}

#[cfg(test)]
mod tests;
