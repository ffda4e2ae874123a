use std::sync::Arc;

use envconfig::Envconfig;
use eyre::Result;
use fireworq_exporter::app_context::AppContext;
use fireworq_exporter::config::{Config, Mode};
use fireworq_exporter::http::{app, listen};
use fireworq_exporter::mackerel::{self, META_ENV};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    // stdout is reserved for the plugin output in mackerel mode
    let log_layer = match config.mode {
        Mode::Serve => tracing_subscriber::fmt::layer().with_filter(filter).boxed(),
        Mode::Mackerel => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).init();
}

async fn serve(config: Config) -> Result<()> {
    let context = Arc::new(AppContext::new(&config)?);

    let poll_context = context.clone();
    let poll_loop = tokio::spawn(async move { poll_context.poll_loop().await });

    let http_server = tokio::spawn(listen(app(context)?, config.bind()));
    info!("listening on {}", config.bind());

    tokio::select! {
        res = poll_loop => {
            error!("poll loop exited");
            if let Err(e) = res {
                error!("poll loop failed with: {}", e)
            }
        }
        res = http_server => {
            error!("http server exited");
            match res {
                Ok(Err(e)) => error!("server failed with: {}", e),
                Err(e) => error!("server task failed with: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }

    info!("exiting");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::init_from_env()?;
    init_tracing(&config);

    match config.mode {
        Mode::Serve => serve(config).await,
        Mode::Mackerel => {
            let meta = std::env::var(META_ENV).is_ok_and(|value| !value.is_empty());
            let mut out = std::io::stdout().lock();
            mackerel::run(&config, meta, &mut out).await?;
            Ok(())
        }
    }
}
