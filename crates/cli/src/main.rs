use api_shared::{ConsultationRes, PatientRes, SummaryJobRes};
use clap::{Parser, Subcommand};
use consult_core::{
    ai::build_summary_client, validation, CoreConfig, Database, JobQueue, PageRequest, RecordStore,
    SqliteJobQueue, SqliteRecordStore, SummaryService, WorkerPool,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Consultation record service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patient records
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Consultation records
    Consultations {
        #[command(subcommand)]
        command: ConsultationCommands,
    },
    /// Generate the AI summary of a consultation now, in this process
    Summarise {
        /// Consultation id
        id: i64,
        /// Retry transient provider failures with the configured backoff
        #[arg(long)]
        retry: bool,
    },
    /// Show a summary job
    Job {
        /// Job id
        id: i64,
    },
    /// Run a standalone summary worker pool until Ctrl-C
    Worker,
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List patients by name
    List {
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        page_size: Option<String>,
    },
    /// Create a patient
    Create {
        full_name: String,
        /// Date of birth (YYYY-MM-DD)
        date_of_birth: String,
        email: String,
    },
}

#[derive(Subcommand)]
enum ConsultationCommands {
    /// List consultations, newest first
    List {
        /// Only this patient's consultations
        #[arg(long)]
        patient: Option<i64>,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        page_size: Option<String>,
    },
    /// Create a consultation
    Create {
        /// Patient id
        patient: i64,
        symptoms: String,
        #[arg(long)]
        diagnosis: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let db = Database::open(cfg.database_path())?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(db));

    match cli.command {
        Commands::Patients {
            command: PatientCommands::List { page, page_size },
        } => {
            let request = PageRequest::from_query(page.as_deref(), page_size.as_deref())?;
            let page = store.list_patients(request)?;
            if page.items.is_empty() {
                println!("No patients found.");
            } else {
                for patient in page.items {
                    println!(
                        "ID: {}, Name: {}, Born: {}, Email: {}",
                        patient.id, patient.full_name, patient.date_of_birth, patient.email
                    );
                }
                println!("({} total)", page.count);
            }
        }
        Commands::Patients {
            command:
                PatientCommands::Create {
                    full_name,
                    date_of_birth,
                    email,
                },
        } => {
            let new = validation::new_patient(Some(&full_name), Some(&date_of_birth), Some(&email))?;
            print_json(&PatientRes::from(store.create_patient(new)?))?;
        }
        Commands::Consultations {
            command:
                ConsultationCommands::List {
                    patient,
                    page,
                    page_size,
                },
        } => {
            let request = PageRequest::from_query(page.as_deref(), page_size.as_deref())?;
            let page = store.list_consultations(patient, request)?;
            if page.items.is_empty() {
                println!("No consultations found.");
            } else {
                for c in page.items {
                    println!(
                        "ID: {}, Patient: {} ({}), Created: {}, Summary: {}",
                        c.id,
                        c.patient_name,
                        c.patient_id,
                        c.created_at.to_rfc3339(),
                        if c.ai_summary.is_some() { "yes" } else { "no" }
                    );
                }
                println!("({} total)", page.count);
            }
        }
        Commands::Consultations {
            command:
                ConsultationCommands::Create {
                    patient,
                    symptoms,
                    diagnosis,
                },
        } => {
            let new = validation::new_consultation(Some(patient), Some(&symptoms), diagnosis.as_deref())?;
            print_json(&ConsultationRes::from(store.create_consultation(new)?))?;
        }
        Commands::Summarise { id, retry } => {
            let service = SummaryService::new(store, build_summary_client(cfg.ai())?);
            let consultation = if retry {
                service
                    .generate_with_retry(id, &cfg.worker().retry, |_, _| {})
                    .await?
            } else {
                service.generate(id).await?
            };
            print_json(&ConsultationRes::from(consultation))?;
        }
        Commands::Job { id } => {
            print_json(&SummaryJobRes::from(queue.get(id)?))?;
        }
        Commands::Worker => {
            let service = SummaryService::new(store, build_summary_client(cfg.ai())?);
            // No in-process submitter: this pool relies on polling alone.
            let pool = WorkerPool::start(queue, service, Arc::new(Notify::new()), *cfg.worker())?;
            println!(
                "Summary worker pool running with {} workers; press Ctrl-C to stop.",
                cfg.worker().workers
            );
            tokio::signal::ctrl_c().await?;
            pool.shutdown().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from(["consult", "consultations", "list", "--patient", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Consultations {
                command: ConsultationCommands::List { patient: Some(3), .. }
            }
        ));

        let cli = Cli::try_parse_from(["consult", "summarise", "7", "--retry"]).unwrap();
        assert!(matches!(cli.command, Commands::Summarise { id: 7, retry: true }));
    }
}
