use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use toptalk::Pipeline;
use toptalk_core::config::{Config, Overrides};
use toptalk_feeds::RedisStore;

#[derive(Parser)]
#[command(name = "toptalk", about = "Per-window top-talker extraction and publishing daemon")]
struct Cli {
    /// INI configuration file.
    #[arg(short, long, default_value = "cls.conf")]
    config: PathBuf,

    /// Queue store host; overrides redis.server.
    #[arg(short = 'H', long)]
    redis_host: Option<String>,

    /// Queue store port; overrides redis.port.
    #[arg(short = 'p', long)]
    redis_port: Option<u16>,

    /// Stay attached to the terminal and log to stderr, even if system.daemon is on.
    #[arg(short, long)]
    foreground: bool,

    /// Log at debug level; same as system.debug = on.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            redis_server: self.redis_host.clone(),
            redis_port: self.redis_port,
            debug: self.debug.then_some(true),
            daemon: self.foreground.then_some(false),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config, &cli.overrides())?;

    // Fork before any thread exists: the log writer and the runtime both own threads.
    if cfg.system.daemon {
        daemonize()?;
    }
    let _guard = toptalk::logging::init(&cfg.log.dir, cfg.system.debug, !cfg.system.daemon)?;
    tracing::info!(
        config = %cli.config.display(),
        request_log = %cfg.loglocation.request_log.display(),
        detail_log = %cfg.loglocation.f5_log.display(),
        top = cfg.ip.top,
        url = cfg.url.url,
        "toptalk starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let store = RedisStore::new(&cfg.redis.server, cfg.redis.port, cfg.redis.database)?;
    let mut pipeline = Pipeline::from_config(&cfg, store)?;
    pipeline.connect().await;
    pipeline.run().await;
    Ok(())
}

#[cfg(unix)]
fn daemonize() -> anyhow::Result<()> {
    // Keep the working directory (relative command paths) and the standard streams.
    // SAFETY: called from `main` before any other thread has been spawned.
    let rc = unsafe { libc::daemon(1, 1) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()).context("daemonizing");
    }
    Ok(())
}

#[cfg(not(unix))]
fn daemonize() -> anyhow::Result<()> {
    anyhow::bail!("system.daemon is only supported on unix; run with --foreground")
}
