//! CLI entrypoint for `reconprobe`.
//!
//! Parses command-line arguments, validates the target address, runs every
//! reconnaissance stage through the library orchestrator, prints a terminal
//! summary and optionally writes CSV exports. The exit code is the only
//! result an external runner reads: 0 when data was extracted, 1 otherwise.
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info};
use reconprobe::{
    config::{DEFAULT_DOMAIN, ReconConfig},
    events::LogSink,
    export::{save_attempts_csv, save_findings_csv},
    finding::ReconResult,
    recon::Reconnaissance,
    report::render_summary,
    target::Target,
};

#[derive(Parser, Debug)]
#[command(
    name = "reconprobe",
    version,
    about = "SMB/RPC/LDAP reconnaissance and data extraction probe"
)]
struct Args {
    /// IPv4 address of the target host
    target: String,

    /// Domain used to derive the LDAP base DN
    #[arg(short = 'd', long = "domain", default_value = DEFAULT_DOMAIN)]
    domain: String,

    /// Directory where artifacts and downloads are kept
    #[arg(short = 'o', long = "output", default_value = ".")]
    output: PathBuf,

    /// Pause after each stage, in milliseconds
    #[arg(long = "pause-ms", default_value_t = 1000)]
    pause_ms: u64,

    /// Only check LDAP ports instead of searching the directory
    #[arg(long = "no-directory-search")]
    no_directory_search: bool,

    /// Write attempt and finding CSV files into the output directory
    #[arg(long = "export")]
    export: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress summary output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

fn export(result: &ReconResult, outdir: &std::path::Path) -> anyhow::Result<()> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let attempts = outdir.join(format!("recon_attempts_{}.csv", ts));
    let findings = outdir.join(format!("recon_findings_{}.csv", ts));
    save_attempts_csv(result, &attempts)?;
    save_findings_csv(result, &findings)?;
    info!(
        "exported {} and {}",
        attempts.display(),
        findings.display()
    );
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    let target = match Target::parse(&args.target, &args.domain) {
        Ok(target) => target,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = fs::create_dir_all(&args.output) {
        error!(
            "failed to create output directory {}: {}",
            args.output.display(),
            e
        );
        process::exit(1);
    }

    let config = ReconConfig {
        output_dir: args.output.clone(),
        stage_pause: Duration::from_millis(args.pause_ms),
        directory_search: !args.no_directory_search,
        ..ReconConfig::default()
    };
    let recon = Reconnaissance::new(target, config);
    let result = match panic::catch_unwind(AssertUnwindSafe(|| recon.run(&mut LogSink))) {
        Ok(result) => result,
        Err(_) => {
            error!("critical error during reconnaissance, aborting");
            process::exit(1);
        }
    };

    if !args.quiet {
        println!("{}", render_summary(&result, recon.target()));
    }
    if args.export {
        if let Err(e) = export(&result, &args.output) {
            error!("failed to write exports: {:#}", e);
        }
    }

    if result.success {
        info!("[+] Reconnaissance succeeded: data extracted");
        process::exit(0);
    }
    info!(
        "[-] Reconnaissance failed: no data extracted ({}/{} techniques succeeded)",
        result.succeeded_attempts(),
        result.attempts.len()
    );
    process::exit(1);
}
