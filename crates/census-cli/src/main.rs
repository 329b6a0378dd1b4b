use std::sync::Arc;

use clap::{Parser, Subcommand};

use census_client::{
    fetch_adt_records, fetch_events, fetch_facilities, fetch_patient_coverage,
    fetch_patient_details, fetch_patients, login, ApiClient, CensusFeed, ClientConfig, EventQuery,
    FacilityContext, PatientQuery,
};
use census_core::{event_summary, event_type_label, CensusFilters};
use census_types::{DateRangeFilter, PatientStatus, StatusFilter};

#[derive(Parser)]
#[command(name = "census")]
#[command(about = "Census/ADT monitoring CLI")]
struct Cli {
    /// Backend API base URL
    #[arg(long, default_value = "http://localhost:3000/api")]
    base_url: String,
    /// Bearer token from a previous login
    #[arg(long)]
    token: Option<String>,
    /// Facility to scope the view to (omit for all facilities)
    #[arg(long)]
    facility: Option<i64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the bearer token
    Login {
        email: String,
        password: String,
    },
    /// List the patient census
    Patients {
        /// Filter by backend patient status (New, Current, Discharged)
        #[arg(long)]
        status: Option<String>,
    },
    /// Show the census dashboard rows
    Census {
        /// Status filter: all, active or discharged
        #[arg(long, default_value = "all")]
        status: String,
        /// Only show one event type (e.g. RoomChange)
        #[arg(long)]
        event_type: Option<String>,
        /// Free-text search against name or patient id
        #[arg(long)]
        search: Option<String>,
        /// Date range: 24h, 7d, 30d or all
        #[arg(long, default_value = "all")]
        range: String,
    },
    /// List recent events
    Events {
        #[arg(long)]
        patient_id: Option<i64>,
        #[arg(long)]
        event_type: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a patient's insurance coverage
    Coverage {
        patient_id: i64,
    },
    /// Show a patient's ADT history
    Adt {
        patient_id: i64,
    },
    /// Show the enriched patient detail record
    Patient {
        patient_id: i64,
    },
    /// List accessible facilities
    Facilities,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ClientConfig::new(&cli.base_url)?;
    let api = Arc::new(ApiClient::new(config));
    if let Some(token) = &cli.token {
        api.set_token(Some(token.clone()));
    }

    let scope = Arc::new(FacilityContext::new());
    scope.set(cli.facility);
    api.attach_scope(scope.clone());

    match cli.command {
        Some(Commands::Login { email, password }) => {
            let response = login(&api, &email, &password).await?;
            println!("{}", response.message);
            println!("Token: {}", response.jwt_token);
        }
        Some(Commands::Patients { status }) => {
            let query = PatientQuery {
                patient_id: None,
                patient_status: status,
            };
            let patients = fetch_patients(&api, &query).await?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Status: {}, Facility: {}",
                        patient.patient_id,
                        patient.display_name(),
                        String::from(patient.patient_status.clone()),
                        patient
                            .facility_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".into()),
                    );
                }
            }
        }
        Some(Commands::Census {
            status,
            event_type,
            search,
            range,
        }) => {
            let filters = CensusFilters {
                status: status.parse::<StatusFilter>()?,
                event_type,
                search: search.unwrap_or_default(),
                date_range: range.parse::<DateRangeFilter>()?,
            };

            let mut feed = CensusFeed::new(api.clone(), scope.clone());
            feed.set_filters(filters);
            let snapshot = feed.refresh().await;

            if snapshot.has_error() {
                eprintln!("Warning: failed to retrieve part of the census data.");
            }
            if snapshot.rows.is_empty() {
                println!("No records found.");
            } else {
                for row in &snapshot.rows {
                    let insurance = snapshot
                        .coverage_for(row.patient.patient_id)
                        .and_then(|c| c.payers.first())
                        .map(|p| p.payer_name.clone())
                        .unwrap_or_else(|| "No Insurance".into());
                    println!(
                        "{} | {} | {} | {} | {}",
                        row.patient.display_name(),
                        status_label(&row.patient.patient_status, &row.event.event_type),
                        event_type_label(&row.event.event_type),
                        insurance,
                        row.event.timestamp,
                    );
                }
                println!("\nLive updates:");
                for event in &snapshot.live_updates {
                    println!("  {}", event_summary(event));
                }
            }
        }
        Some(Commands::Events {
            patient_id,
            event_type,
            limit,
        }) => {
            let query = EventQuery {
                patient_id,
                event_type,
                limit,
            };
            let events = fetch_events(&api, &query).await?;
            if events.is_empty() {
                println!("No events found.");
            } else {
                for event in events {
                    println!("{} | {}", event.timestamp, event_summary(&event));
                }
            }
        }
        Some(Commands::Coverage { patient_id }) => {
            match fetch_patient_coverage(&api, patient_id).await? {
                Some(coverage) => {
                    for payer in &coverage.payers {
                        println!(
                            "{}: {}",
                            String::from(payer.payer_rank.clone()),
                            payer.payer_name
                        );
                    }
                }
                None => println!("No insurance on file."),
            }
        }
        Some(Commands::Adt { patient_id }) => {
            let records = fetch_adt_records(&api, patient_id).await?;
            if records.is_empty() {
                println!("No ADT records found.");
            } else {
                for record in records {
                    println!(
                        "{} | {} | entered by {}",
                        record.effective_date_time, record.standard_action_type, record.entered_by,
                    );
                }
            }
        }
        Some(Commands::Patient { patient_id }) => {
            match fetch_patient_details(&api, patient_id).await? {
                Some(detail) => {
                    println!("{}", detail.patient.display_name());
                    println!(
                        "Status: {}",
                        String::from(detail.patient.patient_status.clone())
                    );
                    match &detail.active_coverage.primary {
                        Some(payer) => println!("Primary insurance: {}", payer.payer_name),
                        None => println!("Primary insurance: none"),
                    }
                    println!("ADT records: {}", detail.adt_history.len());
                    println!("Recent events: {}", detail.recent_events.len());
                }
                None => println!("Patient not found."),
            }
        }
        Some(Commands::Facilities) => {
            let facilities = fetch_facilities(&api).await?;
            if facilities.is_empty() {
                println!("No facilities found.");
            } else {
                for facility in facilities {
                    println!("ID: {}, Name: {}", facility.fac_id, facility.facility_name);
                }
            }
        }
        None => {
            println!("No command given. Try --help.");
        }
    }

    Ok(())
}

fn status_label(status: &PatientStatus, event_type: &str) -> &'static str {
    if event_type == "Death" {
        return "Deceased";
    }
    match status {
        PatientStatus::Discharged => "Discharged",
        _ => "Active",
    }
}
