//! CLI mode for offline-cache: install, inspect and serve a cache from the terminal.

mod progress;

use std::path::PathBuf;

#[cfg(feature = "proxy")]
use std::net::{IpAddr, SocketAddr};

use crate::{
    AssetRequest, CacheConfig, CacheStorage, DiskStorage, Error, Fetcher, NoProgress,
    OfflineCache, PathConfig, ReqwestFetcher, Result,
};

use progress::{BarProgress, print_keys, print_resolved, print_summary};

const DEFAULT_PORT: u16 = 9724;

/// What the CLI was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Populate the store from the manifest.
    Install,
    /// Answer one URL through the cache.
    Resolve(String),
    /// List stored keys.
    List,
    /// Install, then run the local proxy.
    Serve,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Subcommand to run.
    pub command: Command,
    /// TOML config file; defaults apply when absent.
    pub config_path: Option<PathBuf>,
    /// Store root, overriding [`PathConfig`].
    pub store_dir: Option<PathBuf>,
    /// IP address the proxy binds to.
    pub host: String,
    /// Port the proxy binds to.
    pub port: u16,
    /// Suppresses the progress bar.
    pub quiet: bool,
}

/// Prints usage to stderr.
pub fn print_usage() {
    eprintln!("Usage: offline-cache <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install             Fetch every manifest asset into the store");
    eprintln!("  resolve <url>       Answer <url> from the store, or the network on a miss");
    eprintln!("  list                List keys held by the store");
    eprintln!("  serve               Install, then serve the origin through the cache;");
    eprintln!("                      a failed install still serves an existing store");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH> TOML config (cache_name, origin, assets, concurrent_fetches)");
    eprintln!("  --store-dir <PATH>  Store root (default: $OFFLINE_CACHE_DIR or the data dir)");
    eprintln!("  --host <ADDR>       Proxy bind IP, v4 or v6 (default: 127.0.0.1)");
    eprintln!("  --port <PORT>       Proxy port (default: 9724)");
    eprintln!("  -q, --quiet         No progress bar");
    eprintln!("  -h, --help          Show this help");
}

fn usage_error(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}

/// Parses arguments (without the program name).
///
/// Returns `Ok(None)` when help was requested or no command was given.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown flags or missing values.
pub fn parse_args(args: &[String]) -> Result<Option<Invocation>> {
    let mut command = None;
    let mut config_path = None;
    let mut store_dir = None;
    let mut host = "127.0.0.1".to_string();
    let mut port = DEFAULT_PORT;
    let mut quiet = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-q" | "--quiet" => quiet = true,
            "-c" | "--config" => {
                let value = iter.next().ok_or_else(|| usage_error("--config requires a value"))?;
                config_path = Some(PathBuf::from(value));
            }
            "--store-dir" => {
                let value = iter
                    .next()
                    .ok_or_else(|| usage_error("--store-dir requires a value"))?;
                store_dir = Some(PathBuf::from(value));
            }
            "--host" => {
                host = iter
                    .next()
                    .ok_or_else(|| usage_error("--host requires a value"))?
                    .clone();
            }
            "--port" => {
                let value = iter.next().ok_or_else(|| usage_error("--port requires a value"))?;
                port = value
                    .parse()
                    .map_err(|_| usage_error(format!("invalid port: {value}")))?;
            }
            flag if flag.starts_with('-') => {
                return Err(usage_error(format!("unknown option: {flag}")));
            }
            "install" if command.is_none() => command = Some(Command::Install),
            "list" if command.is_none() => command = Some(Command::List),
            "serve" if command.is_none() => command = Some(Command::Serve),
            "resolve" if command.is_none() => {
                let url = iter
                    .next()
                    .ok_or_else(|| usage_error("resolve requires a URL"))?;
                command = Some(Command::Resolve(url.clone()));
            }
            other => return Err(usage_error(format!("unexpected argument: {other}"))),
        }
    }

    Ok(command.map(|command| Invocation {
        command,
        config_path,
        store_dir,
        host,
        port,
        quiet,
    }))
}

/// Runs a parsed invocation.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the command fails.
pub async fn run(invocation: Invocation) -> Result<()> {
    let config = CacheConfig::load(invocation.config_path.as_deref()).await?;
    let store_dir = invocation
        .store_dir
        .clone()
        .unwrap_or_else(|| PathConfig::default().store_dir);
    log::debug!("Using store root {}", store_dir.display());

    let cache = OfflineCache::new(config, DiskStorage::new(store_dir), ReqwestFetcher::new()?);

    match &invocation.command {
        Command::Install => install(&cache, invocation.quiet).await,
        Command::Resolve(url) => {
            let request = AssetRequest::parse(url)?;
            let resolved = cache.resolve(&request).await?;
            print_resolved(url, &resolved);
            Ok(())
        }
        Command::List => {
            let keys = cache.cached_keys().await?;
            print_keys(&cache.config().cache_name, &keys);
            Ok(())
        }
        Command::Serve => serve(cache, &invocation).await,
    }
}

async fn install<S, F>(cache: &OfflineCache<S, F>, quiet: bool) -> Result<()>
where
    S: CacheStorage,
    F: Fetcher,
{
    let stats = if quiet {
        cache.install(&NoProgress).await?
    } else {
        let bar = BarProgress::new(cache.config().assets.len());
        cache.install(&bar).await?
    };
    print_summary(&stats);
    Ok(())
}

/// Installs ahead of serving. A failed install is only fatal when the store
/// holds nothing from an earlier one.
#[cfg(feature = "proxy")]
async fn install_or_reuse<S, F>(cache: &OfflineCache<S, F>, quiet: bool) -> Result<()>
where
    S: CacheStorage,
    F: Fetcher,
{
    let Err(e) = install(cache, quiet).await else {
        return Ok(());
    };
    let keys = cache.cached_keys().await?;
    if keys.is_empty() {
        return Err(e);
    }
    log::warn!(
        "Install of {} failed ({e}); serving {} previously cached entries",
        cache.config().cache_name,
        keys.len()
    );
    Ok(())
}

#[cfg(feature = "proxy")]
fn bind_addr(invocation: &Invocation) -> Result<SocketAddr> {
    let ip: IpAddr = invocation
        .host
        .parse()
        .map_err(|e| usage_error(format!("invalid bind address {}: {e}", invocation.host)))?;
    Ok(SocketAddr::new(ip, invocation.port))
}

#[cfg(feature = "proxy")]
async fn serve(
    cache: OfflineCache<DiskStorage, ReqwestFetcher>,
    invocation: &Invocation,
) -> Result<()> {
    let addr = bind_addr(invocation)?;
    install_or_reuse(&cache, invocation.quiet).await?;
    crate::proxy::serve(std::sync::Arc::new(cache), addr).await?;
    Ok(())
}

#[cfg(not(feature = "proxy"))]
async fn serve(
    _cache: OfflineCache<DiskStorage, ReqwestFetcher>,
    _invocation: &Invocation,
) -> Result<()> {
    Err(usage_error("serve requires the 'proxy' feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_install_with_options() {
        let inv = parse_args(&args(&["install", "-c", "cache.toml", "--quiet"]))
            .unwrap()
            .unwrap();
        assert_eq!(inv.command, Command::Install);
        assert_eq!(inv.config_path, Some(PathBuf::from("cache.toml")));
        assert!(inv.quiet);
        assert_eq!(inv.port, 9724);
    }

    #[test]
    fn parses_resolve_url() {
        let inv = parse_args(&args(&["resolve", "http://127.0.0.1:8080/app.js?v=1"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            inv.command,
            Command::Resolve("http://127.0.0.1:8080/app.js?v=1".to_string())
        );
    }

    #[test]
    fn parses_serve_bind_options() {
        let inv = parse_args(&args(&[
            "--host",
            "0.0.0.0",
            "serve",
            "--port",
            "8000",
            "--store-dir",
            "/tmp/stores",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(inv.command, Command::Serve);
        assert_eq!(inv.host, "0.0.0.0");
        assert_eq!(inv.port, 8000);
        assert_eq!(inv.store_dir, Some(PathBuf::from("/tmp/stores")));
    }

    #[test]
    fn help_and_empty_return_none() {
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), None);
        assert_eq!(parse_args(&args(&[])).unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["install", "--bogus"])).is_err());
        assert!(parse_args(&args(&["resolve"])).is_err());
        assert!(parse_args(&args(&["serve", "--port", "http"])).is_err());
        assert!(parse_args(&args(&["install", "list"])).is_err());
    }

    #[cfg(feature = "proxy")]
    mod serving {
        use super::*;
        use crate::store::MemoryStorage;
        use crate::testing::{MockFetcher, origin};
        use crate::{AssetManifest, Cache};
        use tempfile::TempDir;

        fn invocation(command: Command, dir: &TempDir) -> Invocation {
            Invocation {
                command,
                config_path: Some(dir.path().join("offline-cache.toml")),
                store_dir: Some(dir.path().join("stores")),
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
                quiet: true,
            }
        }

        fn blocks_config() -> CacheConfig {
            CacheConfig::new()
                .with_origin(origin())
                .with_assets(AssetManifest::new(["/", "/app.js"]).unwrap())
        }

        #[test]
        fn bind_addr_accepts_ipv4_and_ipv6() {
            let mut inv = parse_args(&args(&["serve", "--port", "8000"])).unwrap().unwrap();
            assert_eq!(bind_addr(&inv).unwrap(), "127.0.0.1:8000".parse().unwrap());

            inv.host = "::1".to_string();
            assert_eq!(bind_addr(&inv).unwrap(), "[::1]:8000".parse().unwrap());

            inv.host = "localhost".to_string();
            assert!(matches!(bind_addr(&inv), Err(Error::Config(_))));
        }

        #[tokio::test]
        async fn failed_install_reuses_populated_store() {
            let storage = MemoryStorage::new();
            let online = OfflineCache::new(
                blocks_config(),
                storage.clone(),
                MockFetcher::new()
                    .respond("/", 200, "<h1>blocks</h1>")
                    .respond("/app.js", 200, "console.log('app');"),
            );
            online.install(&NoProgress).await.unwrap();

            let offline = OfflineCache::new(blocks_config(), storage, MockFetcher::new());
            install_or_reuse(&offline, true).await.unwrap();
            assert_eq!(offline.cached_keys().await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn failed_install_into_empty_store_is_fatal() {
            let offline =
                OfflineCache::new(blocks_config(), MemoryStorage::new(), MockFetcher::new());
            let err = install_or_reuse(&offline, true).await.unwrap_err();
            assert!(matches!(err, Error::Io(_)));
        }

        #[tokio::test]
        async fn run_installs_lists_and_resolves() {
            let origin = crate::testing::spawn_origin().await;
            let dir = TempDir::new().unwrap();
            std::fs::write(
                dir.path().join("offline-cache.toml"),
                format!("origin = \"{origin}\"\nassets = [\"/\", \"/app.js\"]\n"),
            )
            .unwrap();

            run(invocation(Command::Install, &dir)).await.unwrap();
            let store = DiskStorage::new(dir.path().join("stores"))
                .open("blocks-v1")
                .await
                .unwrap();
            let keys = store.keys().await.unwrap();
            assert_eq!(keys.len(), 2);

            run(invocation(Command::List, &dir)).await.unwrap();

            let url = origin.join("/app.js?v=9").unwrap().to_string();
            run(invocation(Command::Resolve(url), &dir)).await.unwrap();

            let err = run(invocation(Command::Resolve("app.js".to_string()), &dir))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidUrl { .. }));
        }

        #[tokio::test]
        async fn run_install_fails_for_missing_config() {
            let dir = TempDir::new().unwrap();
            let err = run(invocation(Command::Install, &dir)).await.unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }
}
