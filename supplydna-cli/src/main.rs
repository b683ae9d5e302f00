//! SupplyDNA CLI
//!
//! Command-line interface for publishing and reading SupplyDNA component metadata.

use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use supplydna_api::{ApiConfig, ApiServer};
use supplydna_core::constants::DEFAULT_PROXY_PORT;
use supplydna_core::traits::ContentPublisher;
use supplydna_core::types::{ComponentRecord, ContentId, MetadataDocument, NftMetadata};
use supplydna_ipfs::{CancellationToken, Publisher, Retriever, StorageConfig};

/// SupplyDNA - component metadata on IPFS
#[derive(Parser)]
#[command(name = "supplydna")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Upload proxy endpoint
    #[arg(long, global = true, env = "SUPPLYDNA_UPLOAD_ENDPOINT")]
    upload_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a JSON document and print its CID
    Publish {
        /// JSON file, or `-` for stdin
        input: String,
    },

    /// Fetch a document by CID
    Fetch {
        /// CID, `ipfs://` URI or `/ipfs/` path
        cid: String,
        #[command(flatten)]
        gateways: GatewayArgs,
    },

    /// Register a component: build its NFT metadata and publish it
    Register {
        /// Component ID
        #[arg(long)]
        id: Option<String>,
        /// Component name
        #[arg(long)]
        name: Option<String>,
        /// Supplier
        #[arg(long)]
        supplier: Option<String>,
        /// Batch
        #[arg(long)]
        batch: Option<String>,
        /// Manufacturing date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Print the metadata without publishing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch component metadata and show its attributes
    Show {
        /// CID of the component metadata
        cid: String,
        #[command(flatten)]
        gateways: GatewayArgs,
    },

    /// Run the upload proxy
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PROXY_PORT)]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },
}

#[derive(clap::Args)]
struct GatewayArgs {
    /// Gateway prefix to try, in order (repeatable; replaces the defaults)
    #[arg(long = "gateway")]
    gateways: Vec<String>,
    /// Per-gateway timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Reject content that does not hash to the CID
    #[arg(long)]
    verify: bool,
}

impl GatewayArgs {
    fn apply(self, mut config: StorageConfig) -> StorageConfig {
        if !self.gateways.is_empty() {
            config = config.with_gateways(self.gateways);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_gateway_timeout(Duration::from_millis(ms));
        }
        if self.verify {
            config = config.with_integrity_check(true);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "supplydna=debug,info"
    } else {
        "supplydna=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut storage = StorageConfig::from_env();
    if let Some(endpoint) = cli.upload_endpoint {
        storage = storage.with_upload_endpoint(endpoint);
    }

    match cli.command {
        Commands::Publish { input } => cmd_publish(&storage, &input).await,
        Commands::Fetch { cid, gateways } => cmd_fetch(gateways.apply(storage), &cid).await,
        Commands::Register { id, name, supplier, batch, date, dry_run } => {
            let record = ComponentRecord {
                id: field_or_prompt(id, "Component ID")?,
                name: field_or_prompt(name, "Component name")?,
                supplier: field_or_prompt(supplier, "Supplier")?,
                batch: field_or_prompt(batch, "Batch")?,
                date: field_or_prompt(date, "Manufacturing date (YYYY-MM-DD)")?,
            };
            cmd_register(&storage, record, dry_run).await
        }
        Commands::Show { cid, gateways } => cmd_show(gateways.apply(storage), &cid).await,
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
    }
}

/// Token cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn field_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {}", prompt)),
    }
}

fn read_document(input: &str) -> Result<MetadataDocument> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input))
            .with_context(|| format!("Failed to read {}", input))?
    };

    let value: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;
    Ok(MetadataDocument::new(value)?)
}

/// Publish a JSON document
async fn cmd_publish(storage: &StorageConfig, input: &str) -> Result<()> {
    let document = read_document(input)?;
    let publisher = Publisher::new(storage)?;
    let cancel = cancel_on_ctrl_c();

    let pb = spinner("Uploading to IPFS...")?;
    let result = publisher.publish_with_cancel(&document, &cancel).await;
    pb.finish_and_clear();

    let cid = result.context("Failed to publish document")?;
    eprintln!("{} {}", "✅ Published:".green().bold(), cid.to_uri());
    println!("{}", cid);

    Ok(())
}

/// Fetch a document by CID
async fn cmd_fetch(storage: StorageConfig, cid: &str) -> Result<()> {
    let cid = ContentId::parse(cid).context("Invalid CID")?;
    let document = fetch(&storage, &cid).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn fetch(storage: &StorageConfig, cid: &ContentId) -> Result<Value> {
    let retriever = Retriever::new(storage)?;
    let cancel = cancel_on_ctrl_c();

    let pb = spinner("Fetching from IPFS gateways...")?;
    let result = retriever.retrieve_with_cancel(cid, &cancel).await;
    pb.finish_and_clear();

    result.with_context(|| format!("Failed to fetch {}", cid))
}

/// Build the metadata for `record` and publish it unless this is a dry run.
async fn register_component<P>(
    publisher: Option<&P>,
    record: &ComponentRecord,
    registered_on: NaiveDate,
) -> Result<(NftMetadata, Option<ContentId>)>
where
    P: ContentPublisher + ?Sized,
{
    record.validate().context("Invalid component")?;
    let metadata = NftMetadata::for_component(record, registered_on);

    let cid = match publisher {
        Some(publisher) => {
            let document = MetadataDocument::from_serializable(&metadata)?;
            Some(publisher.publish(&document).await.context("Failed to upload metadata")?)
        }
        None => None,
    };

    Ok((metadata, cid))
}

/// Register a component
async fn cmd_register(storage: &StorageConfig, record: ComponentRecord, dry_run: bool) -> Result<()> {
    println!("{} {}", "📦 Registering component:".cyan().bold(), record.id);

    let today = Local::now().date_naive();

    let (metadata, cid) = if dry_run {
        register_component::<Publisher>(None, &record, today).await?
    } else {
        let publisher = Publisher::new(storage)?;
        let cancel = cancel_on_ctrl_c();
        let pb = spinner("Uploading metadata to IPFS...")?;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(anyhow::anyhow!("Registration cancelled")),
            result = register_component(Some(&publisher), &record, today) => result,
        };
        pb.finish_and_clear();
        result?
    };

    println!("\n{}", "📋 Metadata (JSON):".yellow().bold());
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    match cid {
        Some(cid) => {
            println!("\n{}", "✅ Metadata published:".green().bold());
            println!("   {} {}", "CID:".yellow(), cid);
            println!("   {} {}", "Token URI:".dimmed(), cid.to_uri());
            println!("\n{}", "ℹ️  Next steps:".cyan());
            println!("   1. Mint the component NFT with the token URI above");
            println!("   2. Check it with `supplydna show {}`", cid);
        }
        None => println!("\n{}", "Dry run: nothing was published.".yellow()),
    }

    Ok(())
}

/// Show component metadata
async fn cmd_show(storage: StorageConfig, cid: &str) -> Result<()> {
    let cid = ContentId::parse(cid).context("Invalid CID")?;
    let document = fetch(&storage, &cid).await?;
    let metadata = NftMetadata::from_document(&document)
        .context("Document is not component metadata")?;

    println!("{} {}", "🔍 Component metadata:".cyan().bold(), cid);
    if !metadata.name.is_empty() {
        println!("   {} {}", "Name:".dimmed(), metadata.name);
    }
    if !metadata.description.is_empty() {
        println!("   {} {}", "Description:".dimmed(), metadata.description);
    }

    if metadata.attributes.is_empty() {
        println!("\n{}", "⚠️  No attributes found.".yellow());
    } else {
        println!("\n{}", "Attributes:".yellow().bold());
        for attribute in &metadata.attributes {
            println!("   {:<20} {}", attribute.trait_type.green(), attribute.display_value());
        }
    }

    Ok(())
}

/// Run the upload proxy
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting SupplyDNA upload proxy...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let config = ApiConfig { port, ..ApiConfig::from_env() };
    let server = ApiServer::new(config)?;

    let addr: SocketAddr = format!("{}:{}", bind, server.port()).parse()?;
    server.run(addr).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use supplydna_core::error::{Result as CoreResult, SupplyDnaError};

    #[derive(Default)]
    struct RecordingPublisher {
        documents: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl ContentPublisher for RecordingPublisher {
        async fn publish(&self, document: &MetadataDocument) -> CoreResult<ContentId> {
            self.documents.lock().unwrap().push(document.as_value().clone());
            ContentId::parse("QmRecorded")
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl ContentPublisher for FailingPublisher {
        async fn publish(&self, _document: &MetadataDocument) -> CoreResult<ContentId> {
            Err(SupplyDnaError::UploadIncomplete { endpoint: "http://proxy".into() })
        }
    }

    fn record() -> ComponentRecord {
        ComponentRecord {
            id: "CMP-001".into(),
            name: "Brake caliper".into(),
            supplier: "Acme Parts".into(),
            batch: "B-42".into(),
            date: "2024-07-15".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    }

    #[tokio::test]
    async fn test_register_publishes_metadata() {
        let publisher = RecordingPublisher::default();

        let (metadata, cid) = register_component(Some(&publisher), &record(), today())
            .await
            .unwrap();

        assert_eq!(cid.unwrap().as_str(), "QmRecorded");
        let published = publisher.documents.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], serde_json::to_value(&metadata).unwrap());
        assert_eq!(metadata.attribute("Registration Date").as_deref(), Some("2024-08-01"));
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let (metadata, cid) = register_component::<RecordingPublisher>(None, &record(), today())
            .await
            .unwrap();

        assert!(cid.is_none());
        assert_eq!(metadata.name, "SupplyDNA Component - CMP-001");
    }

    #[tokio::test]
    async fn test_invalid_record_is_not_published() {
        let publisher = RecordingPublisher::default();
        let mut invalid = record();
        invalid.date = "15/07/2024".into();

        let result = register_component(Some(&publisher), &invalid, today()).await;

        assert!(result.is_err());
        assert!(publisher.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_propagates() {
        let result = register_component(Some(&FailingPublisher), &record(), today()).await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to upload metadata"));
    }

    #[test]
    fn test_read_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("component.json");
        std::fs::write(&path, r#"{"name":"bolt","attributes":[]}"#).unwrap();

        let document = read_document(path.to_str().unwrap()).unwrap();
        assert_eq!(document.as_value()["name"], "bolt");

        std::fs::write(&path, "{}").unwrap();
        assert!(read_document(path.to_str().unwrap()).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(read_document(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_gateway_args_override_config() {
        let args = GatewayArgs {
            gateways: vec!["http://localhost:8080/ipfs".into()],
            timeout_ms: Some(250),
            verify: true,
        };

        let config = args.apply(StorageConfig::default());

        assert_eq!(config.gateway_prefixes(), vec!["http://localhost:8080/ipfs/".to_string()]);
        assert_eq!(config.gateway_timeout(), Duration::from_millis(250));
        assert!(config.verify_integrity);
    }

    #[test]
    fn test_cli_parses_fetch_flags() {
        let cli = Cli::try_parse_from([
            "supplydna", "fetch", "ipfs://QmX", "--gateway", "https://a/ipfs/",
            "--gateway", "https://b/ipfs/", "--timeout-ms", "100", "--verify",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch { cid, gateways } => {
                assert_eq!(cid, "ipfs://QmX");
                assert_eq!(gateways.gateways.len(), 2);
                assert_eq!(gateways.timeout_ms, Some(100));
                assert!(gateways.verify);
            }
            _ => panic!("expected fetch"),
        }
    }
}
