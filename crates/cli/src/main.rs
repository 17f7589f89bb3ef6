use anyhow::Context;
use api_shared::{auth::token_secret_from_env_value, OdontogramRes, TokenIssuer};
use clap::{Parser, Subcommand};
use odonto_core::{
    config::core_config_from_env_values, ClinicalRecordService, FileStore, OdontogramService,
    PatientService, RecordStore,
};
use odonto_types::SubjectId;
use serde_json::json;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "odonto")]
#[command(about = "Dental clinic odontogram CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue an identity token signed with ODONTO_TOKEN_SECRET
    IssueToken {
        /// Subject the token identifies
        subject: String,
        /// Token lifetime in minutes
        #[arg(long, default_value_t = 60)]
        ttl_minutes: i64,
    },
    /// Register a patient
    CreatePatient {
        /// Full name
        full_name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
    },
    /// List all patients
    ListPatients,
    /// Open a clinical record for a patient
    CreateRecord {
        /// Patient id
        patient_id: String,
        /// Short summary of the record
        #[arg(long)]
        summary: Option<String>,
    },
    /// List the clinical records of a patient
    ListRecords {
        /// Patient id
        patient_id: String,
    },
    /// Print the odontogram of a clinical record as JSON
    ShowOdontogram {
        /// Patient id
        patient_id: String,
        /// Clinical record id
        record_id: String,
    },
    /// Append a procedure to the odontogram of a clinical record
    ///
    /// Writes PATIENT_DATA_DIR directly. Do not run this while the server is writing the same
    /// directory: appends are only serialised within one process.
    AddProcedure {
        /// Patient id
        patient_id: String,
        /// Clinical record id
        record_id: String,
        /// Tooth designation, e.g. 11
        #[arg(long)]
        tooth: String,
        /// Procedure type
        #[arg(long = "type")]
        kind: String,
        /// Tooth surface
        #[arg(long)]
        face: Option<String>,
        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },
}

struct Services {
    patients: PatientService,
    records: ClinicalRecordService,
    odontograms: OdontogramService,
}

fn services() -> anyhow::Result<Services> {
    let cfg = Arc::new(core_config_from_env_values(
        std::env::var("PATIENT_DATA_DIR").ok(),
        std::env::var("ODONTO_STORE_TIMEOUT_MS").ok(),
        std::env::var("ODONTO_APPEND_ATTEMPTS").ok(),
    )?);
    let store: Arc<dyn RecordStore> = Arc::new(FileStore::new(&cfg));
    Ok(Services {
        patients: PatientService::new(cfg.clone(), store.clone()),
        records: ClinicalRecordService::new(cfg.clone(), store.clone()),
        odontograms: OdontogramService::new(cfg, store),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::IssueToken {
            subject,
            ttl_minutes,
        }) => {
            let secret = token_secret_from_env_value(std::env::var("ODONTO_TOKEN_SECRET").ok())?;
            let subject = SubjectId::new(&subject).context("subject must not be empty")?;
            let token = TokenIssuer::new(secret)?
                .issue(&subject, chrono::Duration::minutes(ttl_minutes))?;
            println!("{}", token);
        }
        Some(Commands::CreatePatient {
            full_name,
            birth_date,
        }) => {
            let patient = services()?
                .patients
                .create_patient(&full_name, birth_date.as_deref())
                .await?;
            println!("Created patient with ID: {}", patient.id);
        }
        Some(Commands::ListPatients) => {
            let patients = services()?.patients.list_patients().await?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Born: {}, Created: {}",
                        patient.id,
                        patient.full_name,
                        patient.birth_date.as_deref().unwrap_or("-"),
                        patient.created_at
                    );
                }
            }
        }
        Some(Commands::CreateRecord {
            patient_id,
            summary,
        }) => {
            let record = services()?
                .records
                .create_record(&patient_id, summary)
                .await?;
            println!("Created clinical record with ID: {}", record.id);
        }
        Some(Commands::ListRecords { patient_id }) => {
            let records = services()?.records.list_records(&patient_id).await?;
            if records.is_empty() {
                println!("No clinical records found.");
            } else {
                for record in records {
                    println!(
                        "ID: {}, Summary: {}, Created: {}",
                        record.id,
                        record.summary.as_deref().unwrap_or("-"),
                        record.created_at
                    );
                }
            }
        }
        Some(Commands::ShowOdontogram {
            patient_id,
            record_id,
        }) => {
            let view = services()?
                .odontograms
                .get(&patient_id, &record_id)
                .await?;
            print_json(&OdontogramRes::from(&view))?;
        }
        Some(Commands::AddProcedure {
            patient_id,
            record_id,
            tooth,
            kind,
            face,
            note,
        }) => {
            let input = json!({"tooth": tooth, "type": kind, "face": face, "note": note});
            let view = services()?
                .odontograms
                .append_procedure(&patient_id, &record_id, &input)
                .await?;
            print_json(&OdontogramRes::from(&view))?;
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_procedure_parses_type_flag() {
        let cli = Cli::try_parse_from([
            "odonto",
            "add-procedure",
            "p",
            "r",
            "--tooth",
            "11",
            "--type",
            "canal",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::AddProcedure {
                tooth, kind, face, ..
            }) => {
                assert_eq!(tooth, "11");
                assert_eq!(kind, "canal");
                assert_eq!(face, None);
            }
            _ => panic!("expected add-procedure"),
        }
    }
}
