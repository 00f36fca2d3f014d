use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use proxy_patcher::{
    fix_routing, inject_interceptor, inspect, NearMiss, PatchOptions, PatchReport, StatusReport,
    StepOutcome, Upstream,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "proxy-patcher")]
#[command(about = "Patch the Monday.com form proxy server file", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject the fetch/XMLHttpRequest interceptor into the HTML handler
    InjectInterceptor(PatchArgs),

    /// Route proxied requests to an upstream domain chosen by request path
    FixRouting(PatchArgs),

    /// Report which patches a file already carries, without writing
    Status {
        /// Path to the proxy server file (e.g. app.js)
        path: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which upstream domain each request path is routed to
    Route {
        /// Request paths, e.g. /assets/app.css
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Args)]
struct PatchArgs {
    /// Path to the proxy server file (e.g. app.js)
    path: PathBuf,

    /// Dry run - show what would be changed without modifying the file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Exit with status 1 if any anchor was not found
    #[arg(long)]
    strict: bool,
}

impl PatchArgs {
    fn options(&self) -> PatchOptions {
        PatchOptions {
            dry_run: self.dry_run,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InjectInterceptor(args) => cmd_inject(&args),
        Commands::FixRouting(args) => cmd_fix_routing(&args),
        Commands::Status { path, json } => cmd_status(&path, json),
        Commands::Route { paths } => cmd_route(&paths),
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn display_near_miss(near_miss: &NearMiss) {
    eprintln!("  Expected line: {}", near_miss.expected);
    match &near_miss.closest {
        Some(candidate) => eprintln!(
            "  Closest line {}: {} ({:.0}% similar)",
            candidate.line,
            candidate.text,
            candidate.similarity * 100.0
        ),
        None => eprintln!("  No similar line in the file"),
    }
}

/// Shared tail of both patch commands: JSON, diff, dry-run note, exit status.
fn finish_report(report: &PatchReport, args: &PatchArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        if args.dry_run && report.changed() {
            println!("{}", "  [DRY RUN - file not modified]".cyan());
        }
        if args.diff && report.changed() {
            display_diff(&report.file, &report.original, &report.patched);
        }
    }

    if args.strict && !report.is_complete() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_inject(args: &PatchArgs) -> Result<()> {
    let report = inject_interceptor(&args.path, args.options())
        .with_context(|| format!("interceptor injection failed for {}", args.path.display()))?;

    if !args.json {
        for step in &report.steps {
            match &step.outcome {
                StepOutcome::AlreadyPresent => {
                    println!("{} Interceptor already exists, skipping...", "⊙".yellow());
                }
                StepOutcome::Applied { replacements } => {
                    println!(
                        "{} Interceptor script injected successfully ({} site{})",
                        "✓".green(),
                        replacements,
                        if *replacements == 1 { "" } else { "s" }
                    );
                }
                StepOutcome::AnchorMissing => {
                    eprintln!("{} Could not find the insertion point", "✗".red());
                    eprintln!("  File: {}", report.file.display());
                    if let Some(near_miss) = &step.near_miss {
                        display_near_miss(near_miss);
                    }
                }
            }
        }
    }

    finish_report(&report, args)
}

fn cmd_fix_routing(args: &PatchArgs) -> Result<()> {
    let report = fix_routing(&args.path, args.options())
        .with_context(|| format!("routing patch failed for {}", args.path.display()))?;

    if !args.json {
        for step in &report.steps {
            match &step.outcome {
                StepOutcome::Applied { .. } => {
                    println!("{} {}: {}", "✓".green(), step.name, step.outcome);
                }
                StepOutcome::AlreadyPresent => {
                    println!("{} {}: {}", "⊙".yellow(), step.name, step.outcome);
                }
                StepOutcome::AnchorMissing => {
                    println!("{} {}: {}", "⊘".cyan(), step.name, step.outcome);
                    if let Some(near_miss) = &step.near_miss {
                        display_near_miss(near_miss);
                    }
                }
            }
        }

        let skipped = report.skipped_steps().count();
        if skipped == 0 {
            println!("{} Monday.com proxy fixed successfully", "✓".green());
        } else {
            println!(
                "{}",
                format!(
                    "Warning: {} of {} steps skipped; {} written anyway",
                    skipped,
                    report.steps.len(),
                    report.file.display()
                )
                .yellow()
            );
        }

        if let Some(remaining) = report.remaining_hardcoded.filter(|n| *n > 0) {
            println!(
                "{}",
                format!(
                    "Note: {} hardcoded forms.monday.com header literal(s) remain",
                    remaining
                )
                .yellow()
            );
        }
    }

    finish_report(&report, args)
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".red()
    }
}

fn cmd_status(path: &Path, json: bool) -> Result<()> {
    let report: StatusReport =
        inspect(path).with_context(|| format!("failed to inspect {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Patch Status Report".bold());
    println!("File: {}", report.file.display());
    println!();
    println!(
        "  Interceptor installed:     {}",
        yes_no(report.interceptor_installed)
    );
    println!(
        "  Interceptor anchor found:  {}",
        yes_no(report.interceptor_anchor_present)
    );
    println!(
        "  Routing helper defined:    {}",
        yes_no(report.helper_defined)
    );
    println!(
        "  Helper insertion marker:   {}",
        yes_no(report.helper_marker_present)
    );

    if report.unpatched_literals.is_empty() {
        println!("  Unpatched route literals:  none");
    } else {
        println!(
            "  Unpatched route literals:  {}",
            report.unpatched_literals.join(", ").yellow()
        );
    }
    println!(
        "  Hardcoded header literals: {}",
        report.remaining_hardcoded
    );

    println!();
    if report.fully_patched() {
        println!("{} {}", "✓".green(), "FULLY PATCHED".green().bold());
    } else {
        println!("{} {}", "⊙".yellow(), "NOT FULLY PATCHED".yellow().bold());
    }

    Ok(())
}

fn cmd_route(paths: &[String]) -> Result<()> {
    for path in paths {
        println!("{} -> {}", path, Upstream::for_path(path));
    }
    Ok(())
}
