use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pix_payments::application::lifecycle::PaymentLifecycle;
use pix_payments::domain::ports::{CodeGeneratorBox, PaymentStoreBox};
use pix_payments::infrastructure::clock::SystemClock;
use pix_payments::infrastructure::in_memory::{InMemoryCodeGenerator, InMemoryPaymentStore};
use pix_payments::infrastructure::notification::NotificationHub;
use pix_payments::infrastructure::qr_code::QrCodeGenerator;
use pix_payments::interfaces::http::{AppState, router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory where QR codes are written (optional). Codes are kept in
    /// memory otherwise.
    #[arg(long)]
    codes_dir: Option<PathBuf>,
}

fn init_tracing() {
    let filter = std::env::var("PIX_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".into());
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[cfg(feature = "storage-rocksdb")]
fn payment_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    use pix_payments::infrastructure::rocksdb::RocksDBStore;

    Ok(match db_path {
        Some(db_path) => {
            tracing::info!(path = %db_path.display(), "Using RocksDB payment store");
            Box::new(RocksDBStore::open(db_path).into_diagnostic()?)
        }
        None => Box::new(InMemoryPaymentStore::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn payment_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryPaymentStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let store = payment_store(cli.db_path)?;
    let codes: CodeGeneratorBox = match cli.codes_dir {
        Some(dir) => Box::new(QrCodeGenerator::open(dir).into_diagnostic()?),
        None => Box::new(InMemoryCodeGenerator::new()),
    };

    let hub = Arc::new(NotificationHub::new());
    let lifecycle = PaymentLifecycle::new(store, codes, hub.clone(), Arc::new(SystemClock));
    let app = router(AppState {
        lifecycle: Arc::new(lifecycle),
        hub,
    });

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()?;
    tracing::info!(addr = %cli.bind, "PIX payment service listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}
