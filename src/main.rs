use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use gitlore_core::{GitloreConfig, OutputFormat};
use gitlore_mining::Report;
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = ".gitlore.toml";

#[derive(Parser)]
#[command(
    name = "gitlore",
    version,
    about = "Mine a git history into commits, authors and file hotspots",
    long_about = "Mine a git history into a de-duplicated summary.\n\n\
                   Walks the commit graph, merges author name/email variants into\n\
                   identities, and follows the most-committed files across renames.\n\n\
                   Examples:\n  \
                     gitlore analyze                      Analyze the repository in the current directory\n  \
                     gitlore analyze ../other -o out.json  Write the document to a file\n  \
                     gitlore analyze --format text        Print a human summary\n  \
                     gitlore init                         Create a .gitlore.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .gitlore.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "json",
        long_help = "Output format for the analysis.\n\n\
                       Formats:\n  \
                         json  The full analysis document, pretty-printed (default)\n  \
                         text  Human-readable summary and hotspot table"
    )]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a repository's history
    #[command(long_about = "Analyze a repository's history.\n\n\
        Produces time-sorted commits, main and long-tail author identities, the\n\
        commit time distribution, line-count percentiles, and the hotspot files\n\
        with their rename-spanning histories.\n\n\
        Examples:\n  gitlore analyze\n  gitlore analyze /path/to/repo --max-files 30\n  gitlore analyze --branch release --output release.json")]
    Analyze {
        /// Repository path (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write the result to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Number of hotspot files to track (overrides config)
        #[arg(long)]
        max_files: Option<usize>,

        /// Walk from this branch instead of HEAD (overrides config)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Create a default .gitlore.toml configuration file
    #[command(long_about = "Create a default .gitlore.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .gitlore.toml already exists.")]
    Init,
}

const DEFAULT_CONFIG: &str = r#"# gitlore configuration

[walk]
# Start from this branch instead of HEAD
# branch = "main"

[hotspots]
# max_files = 15
# extensions = ["m", "cc", "cpp", "mm", "h", "c", "swift", "py", "rb", "js", "json",
#               "html", "txt", "go", "rs", "clj", "cljs", "md", "rst", "yml", "erb", "scss"]

[authors]
# "count" keeps the main_cohort_size most active authors as main,
# "percentile" moves the bottom long_tail_fraction to the long tail
# strategy = "count"
# main_cohort_size = 14
# long_tail_fraction = 0.1

[stats]
# percentile = 0.99
# boundary_window = 3
"#;

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "warn,gitlore=debug,gitlore_mining=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<GitloreConfig> {
    let config = match explicit {
        Some(path) => GitloreConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                GitloreConfig::from_file(default_path)
                    .wrap_err_with(|| format!("failed to load {CONFIG_FILE}"))?
            } else {
                GitloreConfig::default()
            }
        }
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Commits:  {}", report.commits.len());
    let _ = writeln!(
        out,
        "Authors:  {} main, {} long-tail",
        report.authors.len(),
        report.low_commit_authors.len()
    );
    if let [earliest, latest] = report.time_extent.as_slice() {
        let _ = writeln!(out, "Span:     {earliest} .. {latest}");
    }
    let _ = writeln!(
        out,
        "Lines per commit:  min {}, p {}, max {}",
        report.line_stats.min, report.line_stats.percentile_value, report.line_stats.max
    );
    let _ = writeln!(
        out,
        "Lines per hotspot: min {}, p {}, max {}",
        report.filestats_line_stats.min,
        report.filestats_line_stats.percentile_value,
        report.filestats_line_stats.max
    );

    if report.files_with_max_commits.is_empty() {
        let _ = writeln!(out, "\nNo hotspot files.");
        return out;
    }

    let _ = writeln!(
        out,
        "\n{:<48} {:>7} {:>7} {:>7} {:>7}",
        "FILE", "COMMITS", "+", "-", "AUTHORS"
    );
    for file in &report.files_with_max_commits {
        let insertions: usize = file.commits.iter().map(|e| e.insertions).sum();
        let deletions: usize = file.commits.iter().map(|e| e.deletions).sum();
        let _ = writeln!(
            out,
            "{:<48} {:>7} {:>7} {:>7} {:>7}",
            file.file,
            file.commits.len(),
            insertions,
            deletions,
            file.authors.len()
        );
    }
    out
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze {
            ref path,
            ref output,
            max_files,
            ref branch,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(max_files) = max_files {
                config.hotspots.max_files = max_files;
            }
            if let Some(branch) = branch {
                config.walk.branch = Some(branch.clone());
            }

            let spinner = if std::io::stderr().is_terminal() {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .into_diagnostic()?,
                );
                pb.set_message(format!("Mining {}...", path.display()));
                pb.enable_steady_tick(Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let report = gitlore_mining::analyze(path, &config).inspect_err(|_| {
                if let Some(pb) = &spinner {
                    pb.finish_and_clear();
                }
            })?;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            let rendered = match cli.format {
                OutputFormat::Json => {
                    let mut json = serde_json::to_string_pretty(&report).into_diagnostic()?;
                    json.push('\n');
                    json
                }
                OutputFormat::Text => render_text(&report),
            };

            match output {
                Some(file) => {
                    std::fs::write(file, rendered)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("failed to write {}", file.display()))?;
                    eprintln!("Wrote {}", file.display());
                }
                None => print!("{rendered}"),
            }
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!(miette::miette!(
                    help = "Edit the existing file, or remove it to start over",
                    "{CONFIG_FILE} already exists"
                ));
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
    }

    Ok(())
}
