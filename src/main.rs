use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guide_scrape::{
    config::{Config, DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_FILE},
    scheduler::RefreshScheduler,
    services::{format_channel_table, format_provider_table, GuideService},
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "guide-scrape")]
#[command(version)]
#[command(about = "Parse Zap2it Guide into XMLTV")]
struct Cli {
    /// Path to the config file
    #[arg(short = 'c', long = "configfile", alias = "ifile", default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Path to the output guide file
    #[arg(short = 'o', long = "outputfile", alias = "ofile", default_value = DEFAULT_OUTPUT_FILE)]
    output_file: String,

    /// Language of the listings (overrides prefs.lang)
    #[arg(short = 'l', long)]
    language: Option<String>,

    /// Find provider and lineup ids for the configured postal codes
    #[arg(short = 'f', long)]
    findid: bool,

    /// List the channels available for the configured postal codes
    #[arg(short = 'C', long)]
    channels: bool,

    /// Serve the guide over HTTP and keep it refreshed
    #[arg(short = 'w', long)]
    web: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("guide_scrape={},tower_http=trace", cli.log_level)
    } else {
        format!("guide_scrape={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config_file)?;
    info!("Configuration loaded from: {}", cli.config_file);
    if let Some(language) = cli.language {
        config.prefs.lang = language;
    }

    let service = GuideService::new(config, &cli.output_file);

    if cli.findid {
        for (postal_code, providers) in service.find_ids().await? {
            println!("Providers for {}:", postal_code);
            print!("{}", format_provider_table(&providers));
        }
        return Ok(());
    }

    if cli.channels {
        let channels = service.available_channels().await?;
        print!("{}", format_channel_table(&channels));
        return Ok(());
    }

    if cli.web {
        let web_server = WebServer::new(service.config(), &cli.output_file)?;
        let scheduler = RefreshScheduler::new(Arc::new(service));
        tokio::spawn(scheduler.start());

        info!(
            "Starting web server on {}:{}",
            web_server.host(),
            web_server.port()
        );
        web_server.serve().await?;
        return Ok(());
    }

    match service.refresh().await {
        Ok(report) => {
            info!(
                "Guide written with {} channels and {} programmes",
                report.channel_count(),
                report.programme_count()
            );
            Ok(())
        }
        Err(e) => {
            error!("Guide build failed: {}", e);
            Err(e.into())
        }
    }
}
