use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Trait for reading configuration parameters
pub trait Config {
    fn graph_path(&self) -> &Path;
    fn index_path(&self) -> &Path;
    fn bind_addr(&self) -> SocketAddr;
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "fraud-graph-api",
    about = "HTTP API for exploring and updating a fraud transaction graph",
    version
)]
pub struct CliConfig {
    /// GraphML file holding accounts and aggregated transactions
    #[arg(
        long = "graph",
        value_name = "PATH",
        env = "FRAUD_GRAPH_PATH",
        default_value = "gnn/data/graph.graphml"
    )]
    graph_file: PathBuf,

    /// Front-end page served at `/`
    #[arg(
        long = "index",
        value_name = "PATH",
        env = "FRAUD_GRAPH_INDEX",
        default_value = "lab/frontend/index.html"
    )]
    index_file: PathBuf,

    /// Address to listen on
    #[arg(long, env = "FRAUD_GRAPH_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "FRAUD_GRAPH_PORT", default_value_t = 5001)]
    port: u16,
}

impl Config for CliConfig {
    fn graph_path(&self) -> &Path {
        &self.graph_file
    }

    fn index_path(&self) -> &Path {
        &self.index_file
    }

    fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::try_parse_from(["fraud-graph-api"]).unwrap();

        assert_eq!(config.graph_path(), Path::new("gnn/data/graph.graphml"));
        assert_eq!(config.index_path(), Path::new("lab/frontend/index.html"));
        assert_eq!(config.bind_addr(), SocketAddr::from(([0, 0, 0, 0], 5001)));
    }

    #[test]
    fn test_overrides() {
        let config = CliConfig::try_parse_from([
            "fraud-graph-api",
            "--graph",
            "data/g.graphml",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(config.graph_path(), Path::new("data/g.graphml"));
        assert_eq!(config.bind_addr(), SocketAddr::from(([127, 0, 0, 1], 8080)));
    }
}
