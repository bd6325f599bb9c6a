//! edge-router — inspect region selection and route requests from the shell
//!
//! Usage:
//!   edge-router regions                                   List configured regions
//!   edge-router select [--location L] [--model M]         Show which region would be chosen
//!   edge-router key <user> <session> <model> <message>    Print the cache key for a request
//!   edge-router route --user U --session S [...] <msg>    Route one request and print the reply

use anyhow::{anyhow, bail, Context};
use edge_ai_router::analytics::TracingSink;
use edge_ai_router::cache::CacheKeyGenerator;
use edge_ai_router::{EdgeRouterBuilder, Priority, RequestContext, RouterConfig, RoutingRequest};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "regions" => cmd_regions(),
        "select" => cmd_select(&args[2..]),
        "key" => cmd_key(&args[2..]),
        "route" => cmd_route(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"edge-router — multi-region AI request router

USAGE:
    edge-router <COMMAND> [OPTIONS]

COMMANDS:
    regions                                 List configured regions
    select [--location L] [--model M]       Show which region would be chosen
    key <user> <session> <model> <message>  Print the cache key for a request
    route --user U --session S [--model M] [--location L] [--priority P] <message>
                                            Route one request and print the reply
    version                                 Show version information
    help                                    Show this help message

ENVIRONMENT:
    EDGE_ROUTER_CONFIG          YAML configuration file
    SUPABASE_URL                Project URL hosting the edge function
    SUPABASE_ANON_KEY           API key sent with each request
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("edge-router {}", env!("CARGO_PKG_VERSION"));
}

/// Value following `--name`, if present.
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg.starts_with("--") {
            skip = true;
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn cmd_regions() -> anyhow::Result<()> {
    let config = RouterConfig::from_env()?;
    let registry = config.build_registry()?;
    let selector = config.build_selector();
    println!(
        "{:<14} {:<12} {:>8} {:>9} {:>7}  MODELS",
        "ID", "LOCATION", "LATENCY", "CAPACITY", "SCORE"
    );
    for region in registry.iter() {
        let marker = if selector.is_eligible(region, None) { " " } else { "!" };
        println!(
            "{:<14} {:<12} {:>6}ms {:>8.0}% {:>7.1}{} {}",
            region.id,
            region.location,
            region.latency_estimate_ms,
            region.capacity * 100.0,
            region.score(),
            marker,
            region
                .supported_models
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn cmd_select(args: &[String]) -> anyhow::Result<()> {
    let config = RouterConfig::from_env()?;
    let registry = config.build_registry()?;
    let selector = config.build_selector();
    let region = selector.select(&registry, flag(args, "--location"), flag(args, "--model"))?;
    println!("{} ({}, score {:.1})", region.id, region.location, region.score());
    Ok(())
}

fn cmd_key(args: &[String]) -> anyhow::Result<()> {
    let rest = positional(args);
    if rest.len() < 4 {
        bail!("usage: edge-router key <user> <session> <model> <message>");
    }
    let message = rest[3..].join(" ");
    let key = CacheKeyGenerator::new().generate(&message, rest[0], rest[2], rest[1]);
    println!("{}", key);
    Ok(())
}

async fn cmd_route(args: &[String]) -> anyhow::Result<()> {
    let user = flag(args, "--user").ok_or_else(|| anyhow!("--user is required"))?;
    let session = flag(args, "--session").unwrap_or("therapy");
    let message = positional(args).join(" ");

    let mut request = RoutingRequest::new(message, RequestContext::new(user, session));
    if let Some(model) = flag(args, "--model") {
        request = request.with_model(model);
    }
    if let Some(location) = flag(args, "--location") {
        request = request.with_location(location);
    }
    if let Some(priority) = flag(args, "--priority") {
        request = request.with_priority(priority.parse::<Priority>()?);
    }

    let config = RouterConfig::from_env()?;
    let router = EdgeRouterBuilder::from_config(&config)?
        .analytics(Arc::new(TracingSink))
        .build()?;
    let response = router
        .route(&request)
        .await
        .context("routing request failed")?;

    println!("{}", serde_json::to_string_pretty(&response.payload)?);
    eprintln!(
        "region={} model={} fallback={} latency={}ms",
        response.region_id,
        response.model,
        response.fallback_used,
        response.latency.as_millis()
    );
    Ok(())
}
