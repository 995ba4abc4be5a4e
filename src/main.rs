use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use param_values::backend::{FileBackend, HttpBackend, ValueBackend};
use param_values::config::BackendConfig;
use param_values::wire::ValueQuery;
use param_values::{EditingSession, EngineConfig, Result, SaveError, resolve_kind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "param-values")]
#[command(about = "Inspect and edit typed parameter values", long_about = None)]
struct Cli {
    /// Engine config (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the fiscal minimum wage.
    #[arg(long, global = true)]
    minimum_wage: Option<f64>,

    /// Override the fiscal base transport allowance.
    #[arg(long, global = true)]
    base_allowance: Option<f64>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct Source {
    /// JSON export of value records.
    #[arg(long, required_unless_present = "url", conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Base URL of the value store.
    #[arg(long)]
    url: Option<String>,

    /// Parameter code substring.
    #[arg(long)]
    code: Option<String>,

    #[arg(long)]
    employee: Option<String>,

    #[arg(long)]
    client: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved kind of each declared type description.
    Kind {
        #[arg(required = true)]
        descriptions: Vec<String>,
    },

    /// Load values and print them in display order.
    Show {
        #[command(flatten)]
        source: Source,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load, apply edits, propagate, then write or send the save payload.
    Edit {
        #[command(flatten)]
        source: Source,

        /// Set a value by id (repeatable).
        #[arg(long = "set", value_name = "ID=VALUE", value_parser = parse_assignment)]
        sets: Vec<(String, String)>,

        /// Set every value of a parameter code in the loaded snapshot (repeatable).
        #[arg(long = "set-code", value_name = "CODE=VALUE", value_parser = parse_assignment)]
        set_codes: Vec<(String, String)>,

        /// Write the save payload to a file.
        #[arg(short = 'o', long, required_unless_present = "save")]
        out: Option<PathBuf>,

        /// Send the save payload to the value store at --url.
        #[arg(long, requires = "url", conflicts_with = "out")]
        save: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "param_values=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.cmd {
        Commands::Kind { descriptions } => {
            for d in &descriptions {
                println!("{}\t{}", d, resolve_kind(d));
            }
        }

        Commands::Show { source, json } => {
            let session = open(&source, config)?;
            if json {
                let entries = session.store().display_order();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_session(&session);
            }
        }

        Commands::Edit {
            source,
            sets,
            set_codes,
            out,
            save,
        } => {
            let mut session = open(&source, config)?;

            for (id, value) in &sets {
                session
                    .set_input(id, value)
                    .with_context(|| format!("--set {id}={value}"))?;
            }
            for (code, value) in &set_codes {
                let n = session
                    .set_code_input(code, value)
                    .with_context(|| format!("--set-code {code}={value}"))?;
                info!(%code, values = n, "applied");
            }

            let payload = match session.payload(Utc::now()) {
                Ok(payload) => payload,
                Err(SaveError::Invalid(issues)) => {
                    for issue in &issues {
                        eprintln!(
                            "{} ({}): {:?} rejected: {}",
                            issue.value_id, issue.code, issue.input, issue.error
                        );
                    }
                    bail!("{} invalid field(s); nothing saved", issues.len());
                }
                Err(e) => return Err(e).context("save failed"),
            };

            if save {
                let backend = backend_for(&source, &session.config().backend)?;
                backend.save(&payload).context("save failed")?;
                println!("Saved {} values", payload.len());
            } else if let Some(out) = out {
                std::fs::write(&out, serde_json::to_string_pretty(&payload)?)
                    .with_context(|| format!("write {}", out.display()))?;
                println!("Wrote {} values to {}", payload.len(), out.display());
            } else {
                bail!("either --out or --save is required");
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(w) = cli.minimum_wage {
        config.fiscal.minimum_wage = w;
    }
    if let Some(a) = cli.base_allowance {
        config.fiscal.base_allowance = a;
    }
    config.validate()?;
    Ok(config)
}

fn query_of(source: &Source) -> ValueQuery {
    ValueQuery {
        code: source.code.clone(),
        employee_id: source.employee.clone(),
        client_id: source.client.clone(),
    }
}

fn backend_for(source: &Source, config: &BackendConfig) -> Result<Box<dyn ValueBackend>> {
    match (&source.input, &source.url) {
        (Some(path), _) => Ok(Box::new(FileBackend::new(path))),
        (None, Some(url)) => Ok(Box::new(HttpBackend::new(url, config)?)),
        (None, None) => bail!("either --input or --url is required"),
    }
}

fn open(source: &Source, config: EngineConfig) -> Result<EditingSession> {
    let backend = backend_for(source, &config.backend)?;
    EditingSession::load(&backend, query_of(source), config).context("failed to load values")
}

fn print_session(session: &EditingSession) {
    for entry in session.store().display_order() {
        let mut flags = Vec::new();
        if !entry.editable {
            flags.push("locked");
        }
        if entry.derived {
            flags.push("derived");
        }
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            entry.id,
            entry.code(),
            entry.scope,
            entry.kind(),
            entry.display(),
            flags.join(",")
        );
    }
    for inconsistency in session.inconsistencies() {
        println!("! {inconsistency}");
    }
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
