mod cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let (config, json_logs) = match cli::run() {
        cli::RunOutcome::Serve { config, json_logs } => (config, json_logs),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    timetrack::init_tracing(json_logs);

    if let Err(err) = timetrack::serve(config).await {
        tracing::error!(error = %err, "server stopped");
        std::process::exit(1);
    }
}
