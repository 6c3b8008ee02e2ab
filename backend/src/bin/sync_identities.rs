//! Backfill local users from every identity provider account, or, with
//! `--revert`, undo the onboarding write-back on every account.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::io;
use std::sync::Arc;

use clap::Parser;
use mockable::DefaultEnv;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use echo_backend::config::IdentitySettings;
use echo_backend::domain::{IdentityBackfill, IdentitySyncService, OnboardingRevert};
use echo_backend::outbound::clerk::ClerkHttpClient;
use echo_backend::outbound::persistence::{
    DbPool, DieselUserRepository, PoolConfig, run_pending_migrations,
};

/// `sync-identities` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sync-identities",
    about = "Create or refresh a local user for every identity provider account",
    long_about = "Create or refresh a local user for every identity provider account. \
With --revert, clear the stored local id and onboarding flag on every account instead; \
intended for development environments.",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `ECHO_DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Accounts requested per provider page.
    #[arg(long = "page-size", value_name = "n", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..=500))]
    page_size: u32,
    /// Undo the onboarding write-back instead of syncing. No database needed.
    #[arg(long)]
    revert: bool,
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt().with_env_filter(EnvFilter::from_default_env()).try_init() {
        warn!(error = %e, "tracing init failed");
    }
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let identity = IdentitySettings::from_env(&DefaultEnv::new())
        .map_err(|error| io::Error::other(error.to_string()))?;
    let idp = Arc::new(
        ClerkHttpClient::new(identity.api_url, identity.secret_key, identity.http_timeout)
            .map_err(|error| io::Error::other(format!("identity provider client: {error}")))?,
    );

    if args.revert {
        revert(idp, args.page_size).await
    } else {
        let database_url = resolve_database_url(args.database_url)?;
        sync(idp, &database_url, args.page_size).await
    }
}

async fn sync(idp: Arc<ClerkHttpClient>, database_url: &str, page_size: u32) -> io::Result<()> {
    run_pending_migrations(database_url)
        .await
        .map_err(io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    let sync = IdentitySyncService::new(Arc::new(DieselUserRepository::new(pool)));
    let report = IdentityBackfill::new(idp, Arc::new(sync))
        .with_page_size(page_size)
        .run()
        .await
        .map_err(|error| io::Error::other(format!("backfill aborted: {error}")))?;

    println!("seen={}", report.seen);
    println!("created={}", report.created);
    println!("updated={}", report.updated);
    println!("skipped={}", report.skipped);
    println!("failed={}", report.failed);
    fail_on_errors(report.failed)
}

async fn revert(idp: Arc<ClerkHttpClient>, page_size: u32) -> io::Result<()> {
    let report = OnboardingRevert::new(idp)
        .with_page_size(page_size)
        .run()
        .await
        .map_err(|error| io::Error::other(format!("revert aborted: {error}")))?;

    println!("seen={}", report.seen);
    println!("reverted={}", report.reverted);
    println!("failed={}", report.failed);
    fail_on_errors(report.failed)
}

fn fail_on_errors(failed: u64) -> io::Result<()> {
    if failed > 0 {
        return Err(io::Error::other(format!(
            "{failed} account(s) could not be processed"
        )));
    }
    Ok(())
}

fn resolve_database_url(from_args: Option<String>) -> io::Result<String> {
    from_args
        .or_else(|| env::var("ECHO_DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "pass --database-url or set ECHO_DATABASE_URL",
            )
        })
}
