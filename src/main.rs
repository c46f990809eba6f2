// src/main.rs

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;

use repocheck::check::{self, package_manager_pin, CheckOptions};
use repocheck::repo::{self, rpmmd, RepoFormat};
use repocheck::{compression, Pool};

#[derive(Parser)]
#[command(name = "repocheck")]
#[command(author, version, about = "Check that every package in a repository is installable", long_about = None)]
#[command(override_usage = "repocheck <ARCH> [OPTIONS] <REPO> [--nocheck <REPO>]...")]
struct Cli {
    /// Target architecture to audit against
    arch: String,

    /// Whitespace-separated list of substrings; candidates whose
    /// identity matches any of them are skipped
    #[arg(long, value_name = "PATTERN")]
    exclude: Option<String>,

    /// Check for obsoletes conflicts between packages contained in the repos
    #[arg(long)]
    withobsoletes: bool,

    /// Also check dependencies of source packages
    #[arg(long)]
    withsrc: bool,

    /// Repository files (or `-` for stdin). Everything after a literal
    /// `--nocheck` is only used to fulfill dependencies, never checked
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true, value_name = "REPO")]
    repos: Vec<String>,
}

fn main() {
    // clap's usage errors exit with 2, which collides with the
    // obsolescence status; fatal input errors must exit 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("repocheck: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut pool = Pool::new();
    pool.set_arch(&cli.arch);

    let mut background = false;
    let mut args = cli.repos.iter().peekable();
    while let Some(arg) = args.next() {
        if arg == "--nocheck" {
            background = true;
            continue;
        }
        let before = pool.npackages();
        let repo_id = pool.add_repo(arg, background);
        let format = RepoFormat::detect(arg);
        let reader = open_input(arg)?;
        repo::load(&mut pool, repo_id, format, reader)
            .map_err(|e| e.in_repo(arg))
            .with_context(|| format!("loading {arg}"))?;

        // An rpm-md index may be extended by a filelists argument that
        // directly follows it.
        if format == RepoFormat::RpmMd && args.peek().is_some_and(|n| repo::is_filelists(n)) {
            if let Some(next) = args.next() {
                let reader = open_input(next)?;
                rpmmd::load_filelists(&mut pool, repo_id, reader)
                    .map_err(|e| e.in_repo(next))
                    .with_context(|| format!("loading {next}"))?;
            }
        }
        info!(
            "loaded {} packages from {}{}",
            pool.npackages() - before,
            arg,
            if background { " (nocheck)" } else { "" }
        );
    }

    pool.add_file_provides();
    pool.prepare();
    let pin = package_manager_pin(&mut pool);

    let opts = CheckOptions {
        with_src: cli.withsrc,
        with_obsoletes: cli.withobsoletes,
        exclude: cli.exclude,
        pin,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let status = check::run(&pool, &opts, &mut out)?;
    Ok(status.exit_code())
}

fn open_input(arg: &str) -> Result<Box<dyn Read>> {
    if arg == "-" {
        Ok(Box::new(io::stdin()))
    } else {
        compression::open(Path::new(arg)).with_context(|| format!("cannot open {arg}"))
    }
}
