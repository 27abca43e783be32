use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use partlib::check::{self, CheckReport};
use partlib::render::PlaceholderRenderer;
use partlib::template::{self, AutocreateOutcome};
use partlib::{alias, generate, library};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "partlib")]
#[command(about = "Parts library checker and script generator", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check rules, units declaration and field uniformity of a library.
    Check { library: PathBuf },

    /// Expand aliases and write the resolved library.
    Resolve {
        input: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,
    },

    /// Create library.json from a template, then check it.
    Autocreate { template: PathBuf },

    /// Check a library, then write one geometry script per part.
    Generate { library: PathBuf },

    /// Check every library.json under a folder and generate scripts for the clean ones.
    GenerateAll {
        dir: PathBuf,

        /// Check only, write nothing.
        #[arg(long)]
        preview: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "partlib=debug" } else { "partlib=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &CheckReport) -> Result<()> {
    let names = ["rules", "units", "fields"];
    for ((name, ok), errors) in names.iter().zip(report.results()).zip(report.errors()) {
        println!("{:<7} {}", name, if ok { "ok" } else { "FAILED" });
        if !errors.is_empty() {
            println!("{}", serde_json::to_string_pretty(errors)?);
        }
    }
    Ok(())
}

fn check_file(path: &Path) -> Result<()> {
    let report = check::check_library_file(path)
        .with_context(|| format!("check library {}", path.display()))?;
    print_report(&report)?;
    if !report.is_ok() {
        bail!("library {} has errors", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Commands::Check { library } => check_file(&library)?,

        Commands::Resolve { input, out } => {
            let doc = library::load_document(&input)
                .with_context(|| format!("read library {}", input.display()))?;
            let resolved = alias::resolve_document(doc)
                .with_context(|| format!("resolve aliases of {}", input.display()))?;
            library::write_document(&out, &resolved)
                .with_context(|| format!("write {}", out.display()))?;
            println!("Wrote {}", out.display());
        }

        Commands::Autocreate { template } => {
            let renderer = PlaceholderRenderer::new()?;
            let outcome = template::autocreate_library(&template, &renderer)
                .with_context(|| format!("create library from {}", template.display()))?;
            match outcome {
                AutocreateOutcome::Created { path, .. } => {
                    println!("Wrote {}", path.display());
                    check_file(&path)?;
                }
                AutocreateOutcome::NothingToDo => {
                    bail!(
                        "{} has no generators tag and no aliases, nothing was created",
                        template.display()
                    );
                }
            }
        }

        Commands::Generate { library } => {
            check_file(&library)?;
            let renderer = PlaceholderRenderer::new()?;
            let written = generate::generate_scripts(&library, &renderer)
                .with_context(|| format!("generate scripts for {}", library.display()))?;
            println!("Wrote {} script(s)", written.len());
        }

        Commands::GenerateAll { dir, preview } => {
            let renderer = PlaceholderRenderer::new()?;
            let summary = generate::generate_all(&dir, preview, &renderer)
                .with_context(|| format!("generate libraries under {}", dir.display()))?;
            for status in &summary.libraries {
                println!(
                    "{} {} ({} script(s))",
                    if status.ok { "ok    " } else { "FAILED" },
                    status.path.display(),
                    status.scripts
                );
                if !status.errors.is_empty() {
                    println!("{}", serde_json::to_string_pretty(&status.errors)?);
                }
            }
            if !summary.all_ok() {
                bail!("some libraries under {} have errors", dir.display());
            }
        }
    }

    Ok(())
}
