//! Generates the `nnet` configuration header and layer calls of a bidirectional recurrent model.

mod desc;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use desc::ModelDesc;
use itertools::Itertools;
use rnnflow::{hls, VivadoRegistry};

const HEADER: &str = "parameters.h";
const CALLS: &str = "layers.inc";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML description of the model
    model: PathBuf,

    /// Directory the generated files are written to
    #[arg(short, long, default_value = "./build")]
    out: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<()> {
    let text = fs::read_to_string(&args.model).with_context(|| format!("reading {}", args.model.display()))?;
    let desc: ModelDesc = toml::from_str(&text).with_context(|| format!("parsing {}", args.model.display()))?;
    let model = desc.into_model()?;
    log::info!("loaded {} layer(s) from {}", model.layers.len(), args.model.display());

    let bundles = model.derive(&VivadoRegistry)?;

    fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;

    let header = args.out.join(HEADER);
    fs::write(&header, hls::gen_header("PARAMETERS_H_", &bundles))
        .with_context(|| format!("writing {}", header.display()))?;

    let calls = args.out.join(CALLS);
    let body = bundles.iter().map(|bundle| format!("// {}\n{}", bundle.config.name, bundle.call)).join("\n");
    fs::write(&calls, body + "\n").with_context(|| format!("writing {}", calls.display()))?;

    log::info!("wrote {} and {}", header.display(), calls.display());
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level))
        .init();

    if let Err(e) = run(&args) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
