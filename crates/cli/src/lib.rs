mod options;
pub mod precompile;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use options::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "getsmart",
    version,
    about = "Serve and precompile JavaScript bundles from a source tree",
    long_about = "GetSmart resolves a script URL to a file, a CoffeeScript source, or a whole \
                  directory bundled in sorted order. Results are minified, cached with \
                  mtime-based staleness checks, and optionally written to a destination tree."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an HTTP server that answers script requests from the source tree
    #[command(
        long_about = "Starts an HTTP server. Requests for *.js are resolved against the source \
                            tree; everything else falls through to the public directory, if any."
    )]
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Directory for non-script requests and unresolved scripts
        #[arg(long, value_name = "DIR")]
        public: Option<PathBuf>,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Precompile every top-level script, source and bundle into the destination
    #[command(
        long_about = "Walks the top level of the source tree and builds each script, alternate \
                            source and directory bundle exactly as a request would, writing the \
                            results under --dest."
    )]
    Build {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Serve { .. } => "serve",
        Commands::Build { .. } => "build",
    };
    let _guard = getsmart_runtime::init_logging(component, true);

    match cli.command {
        Commands::Serve {
            config,
            public,
            addr,
        } => serve::run(config.load()?, public, &addr),
        Commands::Build { config } => precompile::run(config.load()?),
    }
}
