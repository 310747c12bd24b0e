use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "kubefacade")]
#[command(about = "HTTP facade for scaling and managing Kubernetes deployments")]
#[command(version)]
pub struct Args {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file (default: ~/.kubefacade/config)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long, value_name = "ADDR")]
    pub bind_addr: Option<String>,

    /// Override the listening port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Kubeconfig file to use instead of the inferred configuration
    #[arg(long, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, value_name = "NAME")]
    pub context: Option<String>,

    /// Serve against an in-process cluster instead of a real one
    #[arg(long)]
    pub in_memory: bool,

    /// Path to a .env file to load before connecting
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(ref addr) = self.bind_addr {
            config.server.bind_addr = addr.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref path) = self.kubeconfig {
            config.kube.kubeconfig = Some(path.clone());
        }
        if let Some(ref context) = self.context {
            config.kube.context = Some(context.clone());
        }
        config
    }

    /// Log filter selected by the verbosity flag
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Endpoint listing printed at startup
pub fn format_endpoints() -> String {
    let endpoints = [
        ("GET", "/health", "Health check"),
        (
            "POST",
            "/api/orchestration/deployments/{namespace}/{name}/scale?replicas=N",
            "Scale a deployment",
        ),
        ("GET", "/api/orchestration/pods/{namespace}", "List pods"),
        (
            "POST",
            "/api/orchestration/deployments/{namespace}",
            "Create a deployment",
        ),
        (
            "GET",
            "/api/orchestration/deployments/{namespace}",
            "List deployments",
        ),
        (
            "GET",
            "/api/orchestration/deployments/{namespace}/{name}",
            "Get a deployment",
        ),
        (
            "DELETE",
            "/api/orchestration/deployments/{namespace}/{name}",
            "Delete a deployment",
        ),
    ];

    let mut output = String::from("Endpoints:\n");
    for (method, path, purpose) in endpoints {
        output.push_str(&format!("  {:<6} {} - {}\n", method, path, purpose));
    }
    output
}
