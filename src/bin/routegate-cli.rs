use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use axum::http::Method;
use clap::{Parser, Subcommand};

use routegate::config::{load_config, AuthPolicy, GatewayConfig};
use routegate::middleware::MiddlewareRegistry;
use routegate::routing::{substitute, RouteTable};
use routegate::store::InMemoryStore;
use routegate::upstream::ReqwestTransport;
use routegate::GatewayPipeline;

#[derive(Parser)]
#[command(name = "routegate-cli")]
#[command(about = "Offline configuration tool for routegate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and compile a configuration
    Validate { config: PathBuf },
    /// List routes in match precedence order
    Routes { config: PathBuf },
    /// Show which route would serve a request
    Match {
        config: PathBuf,
        method: String,
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let loaded = load_config(&config)?;
            let routes = loaded.routes.len();
            GatewayPipeline::new(
                loaded.routes,
                Arc::new(InMemoryStore::new()),
                Arc::new(ReqwestTransport::new()?),
                &MiddlewareRegistry::with_builtins(),
            )?;
            println!("{}: OK ({} routes)", config.display(), routes);
        }
        Commands::Routes { config } => {
            print_routes(&load_config(&config)?);
        }
        Commands::Match {
            config,
            method,
            path,
        } => {
            let table = RouteTable::from_config(load_config(&config)?.routes)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;

            let Some(matched) = table.match_path(&path) else {
                println!("no route matches {path}");
                return Ok(ExitCode::FAILURE);
            };
            let route = matched.route;

            println!("route:    {}", route.name());
            println!("pattern:  {}", route.pattern().as_str());
            if route.allows(&method) {
                println!("method:   {method} allowed");
            } else {
                let allowed: Vec<&str> = route.allowed_methods().iter().map(Method::as_str).collect();
                println!("method:   {method} not allowed (allowed: {})", allowed.join(", "));
            }

            let mut variables: Vec<_> = matched.variables.iter().collect();
            variables.sort();
            for (name, value) in variables {
                println!("var:      {name} = {value}");
            }
            for url in route.definition.target.urls() {
                println!("target:   {}", substitute(url, &matched.variables));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_routes(config: &GatewayConfig) {
    for (index, route) in config.routes.iter().enumerate() {
        let mut policies = Vec::new();
        if !matches!(route.auth, AuthPolicy::None) {
            policies.push(format!("auth={}", route.auth.kind()));
        }
        if route.rate_limit.is_enabled() {
            policies.push(format!(
                "rate_limit={}/{}s{}",
                route.rate_limit.limit,
                route.rate_limit.period,
                if route.rate_limit.per_client { "" } else { " (global)" }
            ));
        }
        if route.cache.is_enabled() {
            policies.push(format!("cache={}s", route.cache.ttl));
        }
        if route.timeout.retries > 0 {
            policies.push(format!("retries={}", route.timeout.retries));
        }
        if !route.middleware.is_empty() {
            policies.push(format!("middleware={}", route.middleware.join(",")));
        }
        if route.logging.enabled {
            policies.push(format!("log={}", route.logging.level));
        }

        println!(
            "{:>3}. {:<20} {:<24} {:<40} -> {}",
            index + 1,
            route.name,
            route.methods.join(","),
            route.path,
            route.target.urls().join(" | ")
        );
        if !policies.is_empty() {
            println!("     {}", policies.join("  "));
        }
    }
}
