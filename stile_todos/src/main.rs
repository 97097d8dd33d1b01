use stile::privileges;
use stile_todos::{
    config::Config,
    credentials::{CredentialStore, Identity},
    routes,
    store::TodoStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    // Demo registry; a real deployment would load identities from elsewhere.
    let mut credentials = CredentialStore::new();
    credentials.register(Identity::new(
        "admin",
        "SecurePassword123",
        privileges![CanView, CanDelete],
    ));
    credentials.register(Identity::new("reader", "ReadOnly456", privileges![CanView]));

    let router = routes::router(&config.auth, credentials, TodoStore::new());

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(listen = %config.listen, "serving todo api");
    axum::serve(listener, router).await?;

    Ok(())
}
