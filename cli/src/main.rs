//! covtree CLI - Command-line driver for the tree SCM sampler
//!
//! Builds the tree from arguments, prints its topology, draws samples and
//! reports mean reward across many draws.

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use covtree_engine::{Intervention, MonteCarlo, TreeScm};
use covtree_tree::Scenario;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::args::{Cli, Commands, TreeArgs};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Err(e) = execute(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` directives win; otherwise the `-d` count picks the level.
fn log_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy()
}

fn setup_logging(verbosity: u8) {
    let filter = log_filter(verbosity);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let scm = cli
        .tree
        .params()
        .build()
        .context("failed to build tree SCM")?;
    let mc = MonteCarlo::new(cli.tree.draws, cli.tree.seed);

    match &cli.command {
        Some(Commands::Topology) => print_topology(&scm),
        Some(Commands::Observe) => {
            let mut rng = ChaCha8Rng::seed_from_u64(cli.tree.seed);
            println!("sample = {}", scm.observe(&mut rng));
            let est = mc.observe(&scm)?;
            println!(
                "average reward (no intervention) = {:.4} ± {:.4}",
                est.mean_reward, est.std_error
            );
            Ok(())
        }
        Some(Commands::Intervene { target }) => {
            let doing = resolve(&scm, &target.scenario())?;
            let mut rng = ChaCha8Rng::seed_from_u64(cli.tree.seed);
            println!("do({})", describe(&doing));
            println!("sample = {}", scm.intervene_with(&doing, &mut rng)?);
            let est = mc.intervene(&scm, &doing)?;
            println!(
                "average reward (do) = {:.4} ± {:.4}",
                est.mean_reward, est.std_error
            );
            Ok(())
        }
        Some(Commands::Compare { target }) => {
            let doing = resolve(&scm, &target.scenario())?;
            compare(&scm, &mc, &doing)
        }
        None => reference_run(&scm, &cli.tree, &mc),
    }
}

fn resolve(scm: &TreeScm, scenario: &Scenario) -> Result<Intervention> {
    scenario
        .intervention(scm)
        .context("invalid intervention")
}

fn describe(doing: &Intervention) -> String {
    doing
        .pairs()
        .iter()
        .map(|(k, v)| format!("X{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_topology(scm: &TreeScm) -> Result<()> {
    let t = scm.topology();
    println!(
        "degree={} layers={} nodes={} leaves={} internal={} penultimate={} chosen={}",
        t.degree(),
        t.num_layers(),
        t.num_nodes(),
        t.num_leaves(),
        t.num_internal(),
        t.num_penultimate(),
        t.distinguished_penultimate_index()
    );
    for layer in 0..=t.num_layers() {
        if let Some(range) = t.layer_range(layer) {
            println!("layer {layer}: nodes {}..={}", range.start, range.end - 1);
        }
    }
    for k in 0..t.num_nodes() {
        let parent = match t.parent_of(k)? {
            Some(p) => p.to_string(),
            None => "-".to_string(),
        };
        let children: Vec<_> = t.children_of(k)?.collect();
        println!("node {k:>4}  {:?}  parent {parent:>4}  children {children:?}", t.kind(k)?);
    }
    Ok(())
}

fn compare(scm: &TreeScm, mc: &MonteCarlo, doing: &Intervention) -> Result<()> {
    let cmp = mc.compare(scm, doing)?;
    let exact_obs = scm.expected_reward(None)?;
    let exact_do = scm.expected_reward(Some(doing))?;
    println!("do({})", describe(doing));
    println!(
        "average reward on do nothing = {:.4}  (exact {:.4})",
        cmp.observed.mean_reward, exact_obs
    );
    println!(
        "average reward on do         = {:.4}  (exact {:.4})",
        cmp.intervened.mean_reward, exact_do
    );
    println!(
        "effect on reward             = {:+.4}  (exact {:+.4})",
        cmp.effect,
        exact_do - exact_obs
    );
    Ok(())
}

/// Topology summary, one observation, then the observational and
/// chosen-leaf interventional reward averages.
fn reference_run(scm: &TreeScm, tree: &TreeArgs, mc: &MonteCarlo) -> Result<()> {
    println!("{:?}", tree.params());
    let mut rng = ChaCha8Rng::seed_from_u64(tree.seed);
    println!("sample = {}", scm.observe(&mut rng));
    let doing = resolve(scm, &Scenario::ChosenLeaves { value: 1 })?;
    compare(scm, mc, &doing)
}
