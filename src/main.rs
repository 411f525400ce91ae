use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use skipmark::{
    find_written, remove_cache_markers, remove_written, Config, Exclusion, GitOracle, Heuristics,
    Walker,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Slim down a Deja Dup backup by marking directories that can be recreated",
    long_about = "Walks DIRECTORY and writes .deja-dup-ignore markers into clean git checkouts \
                  (every local branch tracking an upstream) and into recreatable build output. \
                  Without DIRECTORY the home directory is used: earlier markers are removed first \
                  and well-known package manager caches are marked as well."
)]
struct Args {
    /// Directory to walk (defaults to the home directory)
    directory: Option<PathBuf>,

    /// Remove markers and explanations from an earlier run before walking
    #[arg(long)]
    reset: bool,

    /// List every marker and explanation file under the directory afterwards
    #[arg(long)]
    report: bool,

    /// TOML file overriding the built-in heuristics
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug output for every directory visited
    #[arg(long, short)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init()
        .ok();
}

fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .context("Could not determine the home directory")
}

fn spinner() -> Result<ProgressBar> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}

fn print_exclusions(exclusions: &[Exclusion]) {
    for exclusion in exclusions {
        println!(
            "  {:<20} {}",
            exclusion.reason.to_string().cyan(),
            exclusion.path.display()
        );
    }
}

fn print_report(root: &Path, config: &Config, heuristics: &Heuristics) {
    let written = find_written(root, &config.files, heuristics);

    println!("{}", format!("{} in {}", config.files.marker, root.display()).bold());
    for path in &written.markers {
        println!("  {}", path.display());
    }
    println!(
        "{}",
        format!("{} in {}", config.files.explanation, root.display()).bold()
    );
    for path in &written.explanations {
        println!("  {}", path.display());
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let heuristics = Heuristics::new(&config);

    let (root, home_mode) = match args.directory {
        Some(directory) => (directory, false),
        None => (home_dir()?, true),
    };
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    if home_mode || args.reset {
        let mut removed = remove_written(&root, &config.files, &heuristics);
        if home_mode {
            // Built-in caches too, in case the config no longer lists some of them
            let mut caches = Config::embedded()?.home.package_caches;
            caches.extend(config.home.package_caches.iter().cloned());
            caches.sort();
            caches.dedup();
            removed += remove_cache_markers(&root, &caches, &config.files);
        }
        log::info!("Removed {} file(s) from an earlier run", removed);
    }

    let oracle = GitOracle::new(&config.files);
    let progress = spinner()?;
    let walker = Walker::new(&oracle, &config).with_progress(progress.clone());

    let mut exclusions = if home_mode {
        walker.mark_package_caches(&root)
    } else {
        Vec::new()
    };
    let summary = walker.walk(&root);
    progress.finish_and_clear();

    exclusions.extend(summary.exclusions.iter().cloned());
    print_exclusions(&exclusions);

    println!("========================================");
    println!(
        "{}",
        format!("Marked {} directories", exclusions.len()).green().bold()
    );
    println!(
        "Visited {}, skipped {}, unreadable {}, repositories checked {}",
        summary.visited, summary.skipped, summary.unreadable, summary.repositories
    );
    if summary.failed_writes > 0 {
        println!(
            "{}",
            format!(
                "{} exclusion(s) abandoned after write errors",
                summary.failed_writes
            )
            .yellow()
        );
    }

    if args.report {
        println!();
        print_report(&root, &config, &heuristics);
    }

    Ok(())
}

fn main() {
    // Usage errors, --help and --version all exit with 1
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        process::exit(1);
    }
}
