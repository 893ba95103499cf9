use std::env;

#[tokio::main]
async fn main() -> offline_cache::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();

    #[cfg(feature = "cli")]
    {
        let invocation = match offline_cache::cli::parse_args(&args) {
            Ok(Some(invocation)) => invocation,
            Ok(None) => {
                offline_cache::cli::print_usage();
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                eprintln!();
                offline_cache::cli::print_usage();
                std::process::exit(2);
            }
        };
        offline_cache::cli::run(invocation).await
    }
    #[cfg(not(feature = "cli"))]
    {
        let _ = args;
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
