use specsmith::cli;
use specsmith::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = logger::init() {
        eprintln!("Warning: Failed to initialize logging: {e}");
    }

    if let Err(e) = cli::main().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
