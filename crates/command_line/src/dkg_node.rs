//! Operator node for distributed generation of Ethereum
//! validator keys.
//!
//! Every operator holds an RSA key that signs its messages and
//! receives its encrypted BLS key share. No operator ever learns
//! the validator secret key.
//!
//! # Generate keypair
//!
//! ```no_run
//! dkg-node generate-keypair operator.pem --public-key operator.pub
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! operator-id = 538
//! keystore = "operator.pem"
//!
//! [[operators]]
//! id = 538
//! public-key = "operator.pub"
//! url = "http://127.0.0.1:8080"
//! ```
//!
//! # Server
//!
//! ```no_run
//! dkg-node start --config config.toml
//! ```
//!
//! # Key generation
//!
//! ```no_run
//! dkg-node init --keystore operator.pem --operator-id 538 \
//!   --node 538=http://127.0.0.1:8080 --node 539=http://127.0.0.1:8081 \
//!   --node 540=http://127.0.0.1:8082 --node 541=http://127.0.0.1:8083 \
//!   --threshold 3
//! ```
//!
//! # Results
//!
//! ```no_run
//! dkg-node get-results --validator-pk <hex> \
//!   --node 538=http://127.0.0.1:8080 --node 539=http://127.0.0.1:8081
//! ```

#[doc(hidden)]
mod node;

#[doc(hidden)]
mod cli {
    use anyhow::Result;
    use clap::{Parser, Subcommand};
    use dkgnode_protocol::OperatorId;
    use std::path::PathBuf;

    use super::node::{self, init::NodeAddress};

    #[derive(Parser, Debug)]
    #[clap(author, version, about, long_about = None)]
    pub struct DkgNode {
        #[clap(subcommand)]
        cmd: Command,
    }

    #[derive(Debug, Subcommand)]
    pub enum Command {
        /// Generate a PEM-encoded RSA operator key and write to file.
        GenerateKeypair {
            /// Force overwrite if the file exists.
            #[clap(short, long)]
            force: bool,

            /// Write the PEM-encoded public key to a file.
            #[clap(long)]
            public_key: Option<PathBuf>,

            /// Modulus size in bits.
            #[clap(long, default_value_t = dkgnode_driver::keypair::DEFAULT_KEY_BITS)]
            bits: usize,

            /// Write the private key to this file.
            file: PathBuf,
        },

        /// Start an operator node.
        Start {
            /// Override the operator identifier in the config.
            #[clap(long, env = "NODE_OPERATOR_ID")]
            operator_id: Option<OperatorId>,

            /// Bind to host:port.
            #[clap(short, long, env = "NODE_ADDR", default_value = "0.0.0.0:8080")]
            bind: String,

            /// Config file to load.
            #[clap(short, long)]
            config: PathBuf,
        },

        /// Ask a set of operator nodes to generate a validator key.
        Init {
            /// Private key of the initiating operator.
            #[clap(long, env = "KEYSTORE_FILE_PATH")]
            keystore: PathBuf,

            /// Identifier of the initiating operator.
            #[clap(long)]
            operator_id: OperatorId,

            /// Participating node as `id=url`, repeat for each operator.
            #[clap(long = "node", required = true)]
            nodes: Vec<NodeAddress>,

            /// Number of key shares needed to sign.
            #[clap(short, long)]
            threshold: u64,

            /// Hex-encoded withdrawal credentials.
            #[clap(long, default_value = "")]
            withdrawal_credentials: String,

            /// Hex-encoded fork version.
            #[clap(long, default_value = "00000000")]
            fork_version: String,
        },

        /// Fetch the key generation result for a validator key.
        GetResults {
            /// Hex-encoded validator public key.
            #[clap(long)]
            validator_pk: String,

            /// Operator node as `id=url`, repeat for each operator.
            #[clap(long = "node", required = true)]
            nodes: Vec<NodeAddress>,
        },
    }

    pub(super) async fn run() -> Result<()> {
        let args = DkgNode::parse();
        match args.cmd {
            Command::GenerateKeypair {
                file,
                force,
                public_key,
                bits,
            } => node::generate_keypair::run(file, force, public_key, bits)
                .await?,
            Command::Start {
                operator_id,
                bind,
                config,
            } => node::start::run(bind, config, operator_id).await?,
            Command::Init {
                keystore,
                operator_id,
                nodes,
                threshold,
                withdrawal_credentials,
                fork_version,
            } => {
                node::init::run(
                    keystore,
                    operator_id,
                    nodes,
                    threshold,
                    withdrawal_credentials,
                    fork_version,
                )
                .await?
            }
            Command::GetResults {
                validator_pk,
                nodes,
            } => node::get_results::run(validator_pk, nodes).await?,
        }
        Ok(())
    }
}

#[doc(hidden)]
#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{
        layer::SubscriberExt, util::SubscriberInitExt,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "dkg_node=debug,dkgnode_driver=debug,dkgnode_server=debug"
                    .into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(e) = cli::run().await {
        tracing::error!("{}", e);
    }

    Ok(())
}
