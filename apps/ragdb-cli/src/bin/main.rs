use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use ragdb_core::config::Config;
use ragdb_core::loader::DirectoryLoader;
use ragdb_core::logging::init_tracing;
use ragdb_rag::{ErrorBody, RagContext, RagService};
use tracing::error;

const USAGE: &str = "Usage: ragdb <ingest [dir] | query \"<question>\" | status>";

fn parse_args() -> Option<(String, Vec<String>)> {
    let mut args = env::args().skip(1);
    let cmd = args.next()?;
    Some((cmd, args.collect()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(e: &ragdb_core::Error) -> ExitCode {
    error!(error = %e, fatal = e.is_fatal(), "request failed");
    match serde_json::to_string_pretty(&ErrorBody::from(e)) {
        Ok(body) => eprintln!("{body}"),
        Err(_) => eprintln!("internal error: {e}"),
    }
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let Some((cmd, args)) = parse_args() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.rag_config()?;
    init_tracing(&settings.logging);

    // Nothing is served until every dependency is up.
    let service = match RagContext::initialize(settings).await {
        Ok(context) => RagService::new(context),
        Err(e) => return Ok(fail(&e)),
    };

    match cmd.as_str() {
        "ingest" => {
            let result = match args.first() {
                Some(dir) => service.ingest_from(&DirectoryLoader::new(PathBuf::from(dir))).await,
                None => service.ingest().await,
            };
            match result {
                Ok(response) => print_json(&response)?,
                Err(e) => return Ok(fail(&e)),
            }
        }
        "query" => {
            if args.is_empty() {
                eprintln!("Usage: ragdb query \"<question>\"");
                return Ok(ExitCode::from(2));
            }
            match service.query(&args.join(" ")).await {
                Ok(answer) => print_json(&answer)?,
                Err(e) => return Ok(fail(&e)),
            }
        }
        "status" => {
            let context = service.context();
            match context.store().count().await {
                Ok(records) => print_json(&serde_json::json!({
                    "collection": context.config().store.collection,
                    "records": records,
                }))?,
                Err(e) => return Ok(fail(&e)),
            }
        }
        _ => {
            eprintln!("Unknown command: {}\n{USAGE}", cmd);
            return Ok(ExitCode::from(2));
        }
    }
    Ok(ExitCode::SUCCESS)
}
