//! CLI binary to form a local CASPaxos cluster and run one round on it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use caspaxos_consensus::change::{read_only, set};
use caspaxos_consensus::{Node, NodeError, NodeId, ProposeError, ProposerConfig, mingle_nodes};
use caspaxos_store_memory::MemoryStore;
use caspaxos_transport_http::{HttpAcceptorServer, HttpTransport, HttpTransportConfig};
use caspaxos_transport_memory::MemoryTransport;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use url::Url;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node assembly error
    #[error(transparent)]
    Node(#[from] NodeError),

    /// The round failed on every attempt
    #[error(transparent)]
    Propose(#[from] ProposeError),

    /// HTTP transport error
    #[error(transparent)]
    Http(#[from] caspaxos_transport_http::Error),

    /// Invalid listen URL
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Proposing node outside the cluster
    #[error("node {via} is not one of nodes 1..={nodes}")]
    UnknownNode {
        /// Requested node
        via: NodeId,
        /// Cluster size
        nodes: u64,
    },

    /// Port arithmetic overflowed
    #[error("base port {0} leaves no room for the cluster")]
    PortRange(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// In-process calls
    Memory,
    /// JSON over HTTP on loopback
    Http,
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes in the cluster
    #[arg(long, default_value_t = 3, env = "CASPAXOS_NODES")]
    nodes: u64,

    /// Transport between proposers and acceptors
    #[arg(long, value_enum, default_value_t = TransportKind::Memory, env = "CASPAXOS_TRANSPORT")]
    transport: TransportKind,

    /// First HTTP port, node `i` listens on `base_port + i - 1` (0 picks free ports)
    #[arg(long, default_value_t = 7700, env = "CASPAXOS_BASE_PORT")]
    base_port: u16,

    /// Node whose proposer runs the round
    #[arg(long, default_value_t = 1, env = "CASPAXOS_VIA")]
    via: NodeId,

    /// Smallest cluster a proposer will run rounds against
    #[arg(long, default_value_t = 3, env = "CASPAXOS_MIN_ACCEPTORS")]
    min_acceptors: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 3000, env = "CASPAXOS_TIMEOUT_MS")]
    timeout_ms: u64,

    /// Rounds to try before giving up on a lost quorum
    #[arg(long, default_value_t = 3, env = "CASPAXOS_ATTEMPTS")]
    attempts: u32,

    /// Key to read or write
    key: String,

    /// Value to write; the key is only read when omitted
    value: Option<String>,
}

impl Args {
    fn proposer_config(&self) -> ProposerConfig {
        ProposerConfig {
            min_acceptors: self.min_acceptors,
            request_timeout: Some(Duration::from_millis(self.timeout_ms)),
        }
    }

    fn http_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            ..HttpTransportConfig::default()
        }
    }
}

async fn memory_cluster(args: &Args) -> Result<Vec<Node<MemoryStore>>, Error> {
    let mut nodes = Vec::new();

    for id in 1..=args.nodes {
        let node = Node::new(id, MemoryStore::new(), args.proposer_config()).await?;
        node.add_transport(Arc::new(MemoryTransport::new(node.acceptor())));
        nodes.push(node);
    }

    Ok(nodes)
}

async fn http_cluster(
    args: &Args,
) -> Result<(Vec<Node<MemoryStore>>, Vec<HttpAcceptorServer>), Error> {
    let config = args.http_config();
    let mut nodes = Vec::new();
    let mut servers = Vec::new();

    for id in 1..=args.nodes {
        let port = if args.base_port == 0 {
            0
        } else {
            u16::try_from(id - 1)
                .ok()
                .and_then(|offset| args.base_port.checked_add(offset))
                .ok_or(Error::PortRange(args.base_port))?
        };

        let node = Node::new(id, MemoryStore::new(), args.proposer_config()).await?;
        let listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let server = HttpAcceptorServer::new(listen_addr, node.acceptor(), &config);
        let bound = server.start().await?;

        let base_url = Url::parse(&format!("http://{bound}"))?;
        node.add_transport(Arc::new(HttpTransport::new(id, &base_url, &config)?));
        info!(node = id, %base_url, "acceptor serving");

        nodes.push(node);
        servers.push(server);
    }

    Ok((nodes, servers))
}

async fn run_round(args: &Args, node: &Node<MemoryStore>) -> Result<Bytes, Error> {
    let mut attempt = 1;

    loop {
        let result = match &args.value {
            Some(value) => node.propose(args.key.clone(), set(value.clone())).await,
            None => node.propose(args.key.clone(), read_only()).await,
        };

        match result {
            Ok(state) => return Ok(state),
            Err(e @ (ProposeError::PrepareQuorum { .. } | ProposeError::AcceptQuorum { .. }))
                if attempt < args.attempts =>
            {
                warn!(attempt, "round failed, retrying: {}", e);
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for better logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if args.via == 0 || args.via > args.nodes {
        return Err(Error::UnknownNode {
            via: args.via,
            nodes: args.nodes,
        });
    }

    let (nodes, servers) = match args.transport {
        TransportKind::Memory => (memory_cluster(&args).await?, Vec::new()),
        TransportKind::Http => http_cluster(&args).await?,
    };
    mingle_nodes(&nodes);

    let node = &nodes[usize::try_from(args.via - 1).unwrap_or_default()];
    let result = run_round(&args, node).await;

    for server in &servers {
        server.shutdown().await;
    }

    let state = result?;
    println!("{}", String::from_utf8_lossy(&state));

    Ok(())
}
