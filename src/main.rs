use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cache;
mod cli;
mod config;
mod errors;
mod fetch;
mod lang;
mod metadata;
#[cfg(test)]
mod tests;
mod web;

use cache::MetaCache;
use config::Config;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load(args.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match args.command {
        cli::Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }

            let cache = MetaCache::new(&config)?;
            log::info!(
                "default lang {}, fallback proxy {}",
                config.default_lang,
                config.fallback_proxy.as_deref().unwrap_or("disabled")
            );

            runtime.block_on(web::serve(cache, &config.listen))?;
            Ok(())
        }

        cli::Command::Fetch {
            url,
            lang,
            user_agent,
        } => {
            let cache = MetaCache::new(&config)?;
            let record = runtime.block_on(cache.get(
                Some(&url),
                lang.as_deref(),
                user_agent.as_deref(),
            ));

            match record {
                Some(record) => println!("{}", serde_json::to_string_pretty(&*record)?),
                None => anyhow::bail!("no url given"),
            }
            Ok(())
        }
    }
}
