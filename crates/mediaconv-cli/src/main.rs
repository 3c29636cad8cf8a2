//! Mediaconv CLI: bulk-convert media library images between jpg, jpeg, gif
//! and png.
//!
//! Connection and upload-root settings come from the environment (see
//! `ConverterConfig::from_env`); flags override the upload root, page size
//! and quality.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediaconv_cli::{init_tracing, print_json};
use mediaconv_core::validation::resolve_target_format;
use mediaconv_core::{ConversionValidator, ConverterConfig, SupportedFormat};
use mediaconv_db::{connect_pool, AttachmentRepository};
use mediaconv_processing::{CodecRegistry, ConversionPipeline, PipelineOptions, QualityPreset};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediaconv", about = "Bulk image format converter for a media library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every jpg/jpeg/gif/png attachment to one format
    Convert(ConvertArgs),
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Target format: jpg, jpeg, gif or png
    #[arg(long)]
    to: Option<String>,
    /// Validate and decode only; write nothing
    #[arg(long)]
    dry_run: bool,
    /// Attachments fetched per page
    #[arg(long)]
    page_size: Option<u32>,
    /// Encoding preset: normal, better, best, lighter, lightest
    #[arg(long)]
    quality: Option<String>,
    /// Public URL of the upload directory
    #[arg(long)]
    base_url: Option<String>,
    /// Absolute path of the upload directory
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

impl ConvertArgs {
    fn target_format(&self) -> anyhow::Result<SupportedFormat> {
        resolve_target_format(self.to.as_deref()).map_err(|_| {
            anyhow::anyhow!(
                "--to parameter should be in {}",
                SupportedFormat::extension_list()
            )
        })
    }

    fn apply_overrides(&self, config: &mut ConverterConfig) {
        if let Some(base_url) = &self.base_url {
            config.upload_base_url = base_url.clone();
        }
        if let Some(base_dir) = &self.base_dir {
            config.upload_base_dir = base_dir.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(quality) = &self.quality {
            config.quality = quality.trim().to_lowercase();
        }
    }
}

async fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    // Checked before anything touches the database.
    let target = args.target_format()?;

    let mut config = ConverterConfig::from_env().context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    init_tracing(config.is_production());
    config.validate().context("Invalid configuration")?;

    let quality = QualityPreset::parse(&config.quality)?;

    tracing::info!(
        target_format = %target,
        dry_run = args.dry_run,
        page_size = config.page_size,
        quality = %config.quality,
        base_url = %config.upload_base_url,
        base_dir = %config.upload_base_dir.display(),
        "Starting conversion"
    );

    let pool = connect_pool(&config)
        .await
        .context("Failed to connect to database")?;

    let upload_root = config.upload_root();
    let store = Arc::new(AttachmentRepository::new(
        pool.clone(),
        config.table_prefix.clone(),
        upload_root.clone(),
    ));
    let validator = Arc::new(ConversionValidator::new(upload_root)?);
    let pipeline = ConversionPipeline::new(
        store,
        validator,
        CodecRegistry::new(quality),
        PipelineOptions {
            page_size: config.page_size,
            dry_run: args.dry_run,
        },
    );

    let summary = pipeline.run(target).await;
    pool.close().await;
    let summary = summary.context("Conversion aborted")?;

    print_json(&summary)?;

    if summary.has_failures() {
        tracing::warn!(
            failed = summary.failed.len(),
            "Some attachments could not be converted"
        );
    }
    tracing::info!("convert succeeded.");
    if !summary.dry_run && summary.converted > 0 {
        tracing::info!("Run `wp media regenerate` to rebuild thumbnails for converted images");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => convert(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ConvertArgs {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Convert(args) => args,
        }
    }

    #[test]
    fn parses_convert_flags() {
        let args = parse(&[
            "mediaconv",
            "convert",
            "--to",
            "png",
            "--dry-run",
            "--page-size",
            "25",
            "--base-dir",
            "/srv/uploads",
        ]);
        assert_eq!(args.to.as_deref(), Some("png"));
        assert!(args.dry_run);
        assert_eq!(args.page_size, Some(25));
        assert_eq!(args.base_dir, Some(PathBuf::from("/srv/uploads")));
        assert_eq!(args.target_format().unwrap(), SupportedFormat::Png);
    }

    #[test]
    fn invalid_target_has_operator_message() {
        for to in [None, Some("webp"), Some("PNG"), Some("")] {
            let mut argv = vec!["mediaconv", "convert"];
            if let Some(to) = to {
                argv.extend(["--to", to]);
            }
            let err = parse(&argv).target_format().unwrap_err();
            assert_eq!(
                err.to_string(),
                "--to parameter should be in jpg, jpeg, gif, png"
            );
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let args = parse(&[
            "mediaconv",
            "convert",
            "--to",
            "jpg",
            "--quality",
            " Best ",
            "--base-url",
            "https://example.com/uploads",
        ]);
        let mut config = ConverterConfig {
            database_url: "mysql://localhost/wp".to_string(),
            db_max_connections: 20,
            db_timeout_seconds: 30,
            table_prefix: "wp_".to_string(),
            upload_base_url: "https://old.example.com/uploads".to_string(),
            upload_base_dir: PathBuf::from("/var/www/uploads"),
            page_size: 100,
            quality: "normal".to_string(),
            environment: "development".to_string(),
        };
        args.apply_overrides(&mut config);
        assert_eq!(config.upload_base_url, "https://example.com/uploads");
        assert_eq!(config.upload_base_dir, PathBuf::from("/var/www/uploads"));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.quality, "best");
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["mediaconv", "regenerate"]).is_err());
    }
}
