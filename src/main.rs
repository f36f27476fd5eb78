use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringbyte::cli::{Cli, Commands};
use ringbyte::config::Config;
use ringbyte::retention::Sweeper;
use ringbyte::tools::{AudioFormat, Ffmpeg, YtDlp};
use ringbyte::{output, server, utils, ConversionRequest, Converter, RingtoneMaker};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Formats = cli.command {
        println!("Supported output formats:");
        for format in AudioFormat::TARGETS {
            println!("  • {:<4} {}", format.extension(), format.content_type());
        }
        println!("Ringtones from links are always produced as mp3 + m4r.");
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref()).await?;
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            warn_missing_dependencies(&config).await;

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "ringbyte starting");
            server::serve(config).await?;
        }
        Commands::Byte { url, format } => {
            warn_missing_dependencies(&config).await;

            let downloader = Arc::new(YtDlp::with_program(&config.tools.yt_dlp_path));
            let maker = RingtoneMaker::from_config(&config, downloader);

            let progress = spinner(cli.quiet, "Cutting ringtone with yt-dlp...");
            let result = maker.make(&url).await;
            progress.finish_and_clear();

            let links = result?;
            output::print_links(&links, maker.downloads_dir(), &format)?;
        }
        Commands::Convert { input, to, output } => {
            warn_missing_dependencies(&config).await;

            let format = AudioFormat::from_target(&to)
                .ok_or_else(|| ringbyte::RingbyteError::UnsupportedFormat(to.clone()))?;

            let output_path = match output {
                Some(path) => path,
                None => {
                    let default = input.with_extension(format.extension());
                    if default == input {
                        anyhow::bail!(
                            "{} is already named .{}; pass --output to avoid overwriting it",
                            input.display(),
                            format
                        );
                    }
                    default
                }
            };

            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());

            let transcoder = Arc::new(Ffmpeg::with_program(&config.tools.ffmpeg_path));
            let converter = Converter::from_config(&config, transcoder);

            let progress = spinner(cli.quiet, "Converting with ffmpeg...");
            let result = converter
                .convert(ConversionRequest {
                    file_name,
                    data,
                    format,
                })
                .await;
            progress.finish_and_clear();

            output::save_converted(&result?, &output_path).await?;
        }
        Commands::Sweep => {
            let (scratch, downloads) = Sweeper::from_config(&config).run_once().await;
            println!("Scratch entries removed: {}", scratch.removed);
            match downloads {
                Some(report) => println!(
                    "Ringtones removed: {} (kept {})",
                    report.removed, report.kept
                ),
                None => println!("Ringtone expiry is disabled (retention.download_ttl_hours = 0)"),
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                if !path.exists() {
                    config.save(&path).await?;
                }
                println!("Edit the config file to change settings:");
                println!("  {}", path.display());
            }
        }
        Commands::Formats => unreachable!("handled before loading config"),
    }

    Ok(())
}

fn init_tracing(config: &Config, verbose: bool) {
    let default_filter = if verbose {
        "ringbyte=debug,tower_http=debug".to_string()
    } else {
        config.logging.filter.clone()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Check for required external tools (non-fatal; they may appear on PATH later)
async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(&config.tools).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
