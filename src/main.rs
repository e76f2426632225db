use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bindery::config::Config;
use bindery::db::{create_pool, init_db, queries, AppState};
use bindery::fulfillment;
use bindery::handlers;
use bindery::models::{CreateBookRequest, CreateFulfilledRequest};
use bindery::payments::PayPalClient;

#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(about = "Book-request fulfillment and payment-gated download service")]
struct Cli {
    /// Seed the database with dev data (a book request and a fulfilled book)
    #[arg(long)]
    seed: bool,
}

/// Seeds the database with dev data for testing the request/fulfill/download
/// flow without a real payment.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    if !queries::list_book_requests(&conn)
        .expect("Failed to list book requests")
        .is_empty()
    {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let request = queries::create_book_request(
        &conn,
        &CreateBookRequest {
            title: "Gray's Anatomy".to_string(),
            author: Some("Henry Gray".to_string()),
            edition: Some("42nd".to_string()),
            email: "dev@bindery.local".to_string(),
            notes: None,
            image: None,
        },
    )
    .expect("Failed to seed book request");

    let outcome = fulfillment::fulfill(
        &conn,
        &CreateFulfilledRequest {
            email: "dev@bindery.local".to_string(),
            title: "Gray's Anatomy".to_string(),
            author: Some("Henry Gray".to_string()),
            edition: Some("42nd".to_string()),
            notes: None,
            download_url: "https://example.com/grays-anatomy.pdf".to_string(),
            price: 20.0,
        },
    )
    .expect("Failed to seed fulfillment");

    tracing::info!("Seeded book request {} and fulfillment {}", request.id, outcome.book_id());
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bindery=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    // Missing service credentials are the only process-fatal configuration
    // error: without them the verifier cannot confirm any payment.
    let credentials = config
        .paypal
        .clone()
        .expect("PAYPAL_CLIENT_ID and PAYPAL_SECRET must be set");
    let paypal = PayPalClient::new(&config.paypal_api_base, credentials);

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState { db: db_pool, paypal };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set BINDERY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::public::router())
        .merge(handlers::admin::router())
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Bindery server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
