use tubely_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under large
// concurrent uploads, especially on musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Telemetry, database, storage, toolkit and routes
    let (_state, router) = tubely_api::setup::initialize_app(config.clone()).await?;

    tubely_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
