use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use riseup_auth::auth::{PgCredentialStore, PgRefreshTokenLedger, SessionService, TokenIssuer};
use riseup_auth::configuration::get_configuration;
use riseup_auth::startup::run;
use riseup_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    // Assemble the session core once, at startup; everything downstream
    // receives it by injection.
    let sessions = SessionService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgRefreshTokenLedger::new(pool)),
        TokenIssuer::new(configuration.jwt.clone()),
    );

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, sessions)?;
    let _ = server.await;

    Ok(())
}
