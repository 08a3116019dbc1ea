use clap::Parser;
use memsqs::app::cli::Args;
use memsqs::app::startup::startup;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = startup(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
