//! Command-line front end: decides termination of loop sources.
//!
//! Run with:
//! ```bash
//! cargo run --example amber -- benchmarks/ast/fair_walk.prob
//! cargo run --example amber -- --rules supermartingale,geometric benchmarks/past/*.prob
//! cargo run --example amber -- --bounds "x**2" benchmarks/ast/fair_walk.prob
//! ```

use std::path::PathBuf;

use clap::Parser;

use amber_rs::analysis::Analysis;
use amber_rs::decision::{decide_termination_with, Config};
use amber_rs::parser::{parse_expr, parse_program};
use amber_rs::rules::Rule;

#[derive(Debug, Parser)]
#[command(author, version, about = "Termination analysis of probabilistic loops")]
struct Cli {
    /// Loop source files.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Comma-separated proof rules to try, in order.
    #[arg(long, value_name = "RULES", value_delimiter = ',')]
    rules: Vec<Rule>,

    /// Print the eventual bounds of a polynomial instead of deciding termination.
    #[arg(long, value_name = "EXPR")]
    bounds: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.debug {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Warn
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = if args.rules.is_empty() {
        Config::default()
    } else {
        Config::new(args.rules.iter().copied())
    };

    for path in &args.files {
        let source = std::fs::read_to_string(path)?;
        let program = parse_program(&source)?;
        println!("=== {} ===", path.display());

        if let Some(bounds) = &args.bounds {
            let expr = parse_expr(bounds, &program)?;
            let mut analysis = Analysis::new(&program);
            let bounds = analysis.bounds_of_expr(&expr)?;
            println!("Lower bound: {}", bounds.lower);
            println!("Upper bound: {}", bounds.upper);
            println!("Maybe positive: {}", bounds.maybe_positive);
            println!("Maybe negative: {}", bounds.maybe_negative);
            continue;
        }

        let time_decide = std::time::Instant::now();
        let result = decide_termination_with(&program, &config)?;
        println!("{}", result);
        println!("Computed in {:.3} s", time_decide.elapsed().as_secs_f64());
    }

    Ok(())
}
