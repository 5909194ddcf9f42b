#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::Context;
    use clap::Parser;
    use tracing::info;

    use imaginehub::config::Config;
    use imaginehub::context::AppContext;
    use imaginehub::core::db::seed_demo_data;
    use imaginehub::core::kv::{KvStore, MemoryStore};
    use imaginehub::core::redb_store::RedbStore;
    use imaginehub::generator::{HttpGenerator, ImageGenerator, PlaceholderGenerator};
    use imaginehub::server;

    /// ImagineHub API server.
    #[derive(Parser, Debug)]
    #[command(name = "imaginehub", about = "ImagineHub API server")]
    struct Cli {
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:5169")]
        bind: String,
        /// Directory holding the database file.
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
        /// Keep everything in memory; nothing survives a restart.
        #[arg(long)]
        ephemeral: bool,
        /// Create the demo accounts on startup.
        #[arg(long)]
        seed_demo: bool,
        /// Log filter used when RUST_LOG is unset.
        #[arg(long, default_value = "info")]
        log_level: String,
    }

    pub fn run() -> anyhow::Result<()> {
        let cli = Cli::parse();

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| cli.log_level.clone().into()),
            )
            .init();

        let config = Config::from_env();

        let store: Box<dyn KvStore> = if cli.ephemeral {
            info!("Using in-memory store");
            Box::new(MemoryStore::new())
        } else {
            std::fs::create_dir_all(&cli.data_dir)
                .with_context(|| format!("creating {}", cli.data_dir.display()))?;
            Box::new(RedbStore::open(&cli.data_dir.join("imaginehub.redb"))?)
        };

        let generator: Box<dyn ImageGenerator> = match &config.generator_url {
            Some(url) => {
                info!(%url, "Using external image generator");
                Box::new(HttpGenerator::new(url.clone())?)
            }
            None => {
                info!("Using placeholder image generator");
                Box::new(PlaceholderGenerator::new(config.generated_image_size))
            }
        };

        let ctx = Arc::new(AppContext::new(store, generator, config));
        if cli.seed_demo {
            seed_demo_data(&ctx)?;
        }

        // The blocking HTTP client above must not be created inside the runtime.
        actix_web::rt::System::new().block_on(server::run(ctx, &cli.bind))?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
