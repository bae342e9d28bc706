//! Fleet register server: HTTP API, migrations and spreadsheet import.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod logging;
mod server;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fleet_register::{
    FleetRegister, ImportDocument, ImportOptions, NewParty, connect_db,
};
use fleet_security::Role;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "fleet-register-server", version, about = "Fleet register server")]
struct Cli {
    /// YAML configuration file; `FLEET__*` environment variables override it.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations, then serve the HTTP API (default).
    Run,
    /// Apply database migrations and exit.
    Migrate,
    /// Load machines, maintenance and complaints from a JSON document.
    Import {
        /// JSON file with `machines`, `maintenance` and `complaints` rows.
        file: PathBuf,
        /// Service company for machine rows that name none.
        #[arg(long)]
        default_service_company: Option<String>,
    },
    /// Load and print the effective configuration.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => check(&cfg),
        Command::Run => {
            logging::init(&cfg.logging)?;
            run(cfg).await
        }
        Command::Migrate => {
            logging::init(&cfg.logging)?;
            let register = open(&cfg).await?;
            register.migrate().await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Import {
            file,
            default_service_company,
        } => {
            logging::init(&cfg.logging)?;
            import(&cfg, &file, default_service_company).await
        }
    }
}

fn check(cfg: &AppConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn open(cfg: &AppConfig) -> anyhow::Result<FleetRegister> {
    let db = connect_db(&cfg.database.dsn, cfg.database.connect_opts())
        .await
        .context("failed to connect to the database")?;
    Ok(FleetRegister::new(db, cfg.fleet_register.clone()))
}

/// Make sure the configured default user exists as a staff manager.
async fn bootstrap_admin(register: &FleetRegister, cfg: &AppConfig) -> anyhow::Result<()> {
    let admin = register
        .bootstrap_party(NewParty {
            username: cfg.authn.default_username.clone(),
            display_name: String::new(),
            is_staff: true,
            roles: [Role::Manager].into(),
        })
        .await?;
    tracing::info!(party.id = %admin.id, party.username = %admin.username, "Default party ready");
    Ok(())
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let register = open(&cfg).await?;
    register.migrate().await?;
    bootstrap_admin(&register, &cfg).await?;

    tracing::info!(mode = ?cfg.authn.mode, "Starting fleet register");
    let router = register.router(cfg.authn)?;
    let router = server::apply_http_layers(router, &cfg.server);
    server::serve(router, &cfg.server.bind_addr).await
}

async fn import(
    cfg: &AppConfig,
    file: &Path,
    default_service_company: Option<String>,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let doc: ImportDocument = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid import document", file.display()))?;

    let register = open(cfg).await?;
    register.migrate().await?;

    let opts = ImportOptions {
        default_service_company,
    };
    let summary = register.import(doc, &opts).await?;
    tracing::info!(
        machines.created = summary.machines.created,
        machines.updated = summary.machines.updated,
        maintenance.created = summary.maintenance.created,
        complaints.created = summary.complaints.created,
        "Import finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["fleet-register-server", "-c", "fleet.yaml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.as_deref(), Some(Path::new("fleet.yaml")));
    }

    #[test]
    fn import_takes_a_file_and_default_company() {
        let cli = Cli::try_parse_from([
            "fleet-register-server",
            "import",
            "rows.json",
            "--default-service-company",
            "Acme Service",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Import {
                file,
                default_service_company,
            }) => {
                assert_eq!(file, PathBuf::from("rows.json"));
                assert_eq!(default_service_company.as_deref(), Some("Acme Service"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn import_skips_unknown_machines_and_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let rows = dir.path().join("rows.json");
        std::fs::write(
            &rows,
            serde_json::json!({
                "maintenance": [{
                    "machine_serial": "0017",
                    "kind": "TO-1",
                    "performed_date": "2024-05-01",
                    "operating_hours": 50,
                    "work_order_number": "WO-1",
                    "work_order_date": "2024-05-01",
                    "organization": "Self-service",
                    "service_company": "Acme"
                }]
            })
            .to_string(),
        )
        .unwrap();

        let mut cfg = AppConfig::default();
        cfg.database.dsn = format!("sqlite://{}?mode=rwc", dir.path().join("fleet.db").display());
        import(&cfg, &rows, None).await.unwrap();

        let missing = import(&cfg, &dir.path().join("absent.json"), None).await;
        assert!(missing.unwrap_err().to_string().contains("failed to read"));
    }
}
