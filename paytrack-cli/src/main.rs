//! paytrack - command-line client for the PayTrack intake service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paytrack_common::api::{JobStatus, JobStatusResponse, NewEmployee};
use paytrack_common::config::{CompiledDefaults, TomlConfig};
use paytrack_common::logging::init_logging;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use paytrack_cli::{IntakeClient, Phase, Poller, UploadSession};

#[derive(Parser, Debug)]
#[command(name = "paytrack")]
#[command(about = "Client for the PayTrack payroll intake service")]
#[command(version)]
struct Cli {
    /// Service base URL (defaults to the configured host and port)
    #[arg(long, env = "PAYTRACK_SERVER", global = true)]
    server: Option<String>,

    /// Status polling interval in milliseconds
    #[arg(long, env = "PAYTRACK_POLL_INTERVAL_MS", global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload contracts and follow each job to completion
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Let the service finish the job before responding instead of polling
        #[arg(long)]
        wait: bool,
    },
    /// Show the status of a payroll job
    Status { request_id: Uuid },
    /// List payroll jobs of an employee
    History { employee_id: String },
    /// Employee records
    #[command(subcommand)]
    Employees(EmployeeCommand),
    /// Dashboard KPIs, recent runs and alerts
    Dashboard,
    /// Pipeline stages
    Agents,
    /// Service health
    Health,
    /// Save a generated document
    Download {
        /// Artifact URL as reported by the job status
        artifact_url: String,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum EmployeeCommand {
    List,
    Get {
        employee_id: String,
    },
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        designation: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Import a .csv or .xlsx spreadsheet
    Import { file: PathBuf },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe(job: &JobStatusResponse) -> String {
    match job.current_stage {
        Some(stage) => format!("{} [{}% - {}]", job.status, job.progress_percentage, stage),
        None => format!("{} [{}%]", job.status, job.progress_percentage),
    }
}

/// Upload each queued file in order; stops at the first failure
async fn run_upload(
    client: &IntakeClient,
    poller: Poller,
    files: Vec<PathBuf>,
    wait: bool,
) -> Result<bool> {
    let mut session = UploadSession::new();
    for file in files {
        if !session.add_file(&file) {
            eprintln!("Skipping duplicate {}", file.display());
        }
    }

    let queued = session.begin()?;
    let mut last: Option<JobStatusResponse> = None;

    for path in queued {
        println!("Uploading {}", path.display());
        let uploaded = match client.upload(&path, wait).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                session.fail(e.to_string())?;
                break;
            }
        };
        println!(
            "  request {} for {} ({})",
            uploaded.request_id, uploaded.contract.employee_name, uploaded.contract.employee_id
        );

        let job = if uploaded.job.is_terminal() {
            uploaded.job
        } else {
            let mut shown = String::new();
            let polled = tokio::select! {
                polled = poller.until_terminal(client, uploaded.request_id, |job| {
                    let line = describe(job);
                    if line != shown {
                        println!("  {}", line);
                        shown = line;
                    }
                }) => polled,
                _ = tokio::signal::ctrl_c() => {
                    println!("Stopped polling; check later with: paytrack status {}", uploaded.request_id);
                    return Ok(false);
                }
            };
            match polled {
                Ok(job) => job,
                Err(e) => {
                    session.fail(e.to_string())?;
                    break;
                }
            }
        };

        if job.status == JobStatus::Failed {
            let message = job
                .error_message
                .clone()
                .unwrap_or_else(|| "Payroll job failed".to_string());
            session.fail(message)?;
            break;
        }

        if let Some(result) = &job.result {
            let b = &result.salary_breakdown;
            println!(
                "  gross {:.2}  deductions {:.2}  net {:.2} {}",
                b.gross_salary, b.total_deductions, b.net_salary, result.contract.currency
            );
        }
        if let Some(url) = &job.artifact_url {
            println!("  payslip: {}{}", client.base_url(), url);
        }
        last = Some(job);
    }

    if session.phase() == &Phase::Loading {
        if let Some(job) = last {
            session.succeed(job)?;
        }
    }

    match session.phase().clone() {
        Phase::Failed(message) => {
            eprintln!("Error: {}", message);
            Ok(false)
        }
        _ => {
            session.acknowledge();
            Ok(true)
        }
    }
}

async fn dispatch(command: Command, client: &IntakeClient, poller: Poller) -> Result<bool> {
    match command {
        Command::Upload { files, wait } => run_upload(client, poller, files, wait).await,
        Command::Status { request_id } => {
            print_json(&client.status(request_id).await?)?;
            Ok(true)
        }
        Command::History { employee_id } => {
            for job in client.history(&employee_id).await? {
                println!("{}  {}  {}", job.request_id, job.created_at, describe(&job));
            }
            Ok(true)
        }
        Command::Employees(EmployeeCommand::List) => {
            print_json(&client.employees().await?)?;
            Ok(true)
        }
        Command::Employees(EmployeeCommand::Get { employee_id }) => {
            print_json(&client.employee(&employee_id).await?)?;
            Ok(true)
        }
        Command::Employees(EmployeeCommand::Create {
            id,
            name,
            email,
            phone,
            designation,
            department,
        }) => {
            let employee = NewEmployee {
                employee_id: id,
                name,
                email,
                phone,
                designation,
                department,
                ..Default::default()
            };
            println!("{}", client.create_employee(&employee).await?.message);
            Ok(true)
        }
        Command::Employees(EmployeeCommand::Import { file }) => {
            let response = client.import_employees(&file).await?;
            println!("{}", response.message);
            print_json(&response.details)?;
            Ok(response.details.errors.is_empty())
        }
        Command::Dashboard => {
            print_json(&client.dashboard().await?)?;
            Ok(true)
        }
        Command::Agents => {
            for agent in client.agents().await? {
                println!("{:<20} {}", agent.name.name(), agent.description);
            }
            Ok(true)
        }
        Command::Health => {
            print_json(&client.health().await?)?;
            Ok(true)
        }
        Command::Download {
            artifact_url,
            output,
        } => {
            let bytes = client.download(&artifact_url).await?;
            tokio::fs::write(&output, bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved {}", output.display());
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("warn");

    let cli = Cli::parse();
    let toml = TomlConfig::load_or_default();
    let defaults = CompiledDefaults::for_current_platform();

    let server = cli.server.clone().unwrap_or_else(|| {
        format!(
            "http://{}:{}",
            toml.host.clone().unwrap_or(defaults.host.clone()),
            toml.port.unwrap_or(defaults.port)
        )
    });
    let interval = cli
        .poll_interval_ms
        .or(toml.poll_interval_ms)
        .unwrap_or(defaults.poll_interval_ms);

    let client = IntakeClient::new(&server)?;
    let poller = Poller::new(Duration::from_millis(interval));

    let outcome = dispatch(cli.command, &client, poller).await;

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
