mod answers;
mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use catalog::EventCatalog;
use clap::{Parser, Subcommand};
use registration::{
    ContactClient, HttpSubmissionTransport, MissingSubmissionEndpoint, Registrar,
    SubmissionEncoder, SubmissionTransport,
};
use shared::domain::{ContactField, EventKind, EventRecord};
use tracing::warn;

use crate::{
    answers::RegistrationAnswers,
    config::{load_settings, Settings, SETTINGS_FILE},
};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every event and workshop with fee and team size.
    Events,
    Show {
        name: String,
    },
    /// Submit a filled-in answers file for one event.
    Register {
        #[arg(long)]
        event: String,
        #[arg(long)]
        answers: PathBuf,
    },
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    let catalog = EventCatalog::load(&settings.events_path, &settings.workshops_path)?;

    match cli.command {
        Command::Events => {
            for record in catalog.iter() {
                println!(
                    "{:<8} {:<28} team {:<5} fee {}",
                    kind_label(record.kind),
                    record.name,
                    record.team_size,
                    record.registration_fee
                );
            }
        }
        Command::Show { name } => {
            let record = catalog.find_by_name(&name)?;
            print_details(record);
            let others: Vec<&str> = catalog
                .list_excluding(&name)
                .into_iter()
                .map(|other| other.name.as_str())
                .collect();
            println!("also on: {}", others.join(", "));
        }
        Command::Register { event, answers } => {
            let record = Arc::clone(catalog.find_by_name(&event)?);
            let answers = RegistrationAnswers::load(&answers)?;
            let registrar = Registrar::open(
                record,
                &settings.participant_rules(),
                SubmissionEncoder::new(settings.attachment_policy()),
                transport(&settings)?,
            )?;

            registrar
                .with_session(|session| answers.apply(session))
                .await?;
            let total = registrar.with_session(|session| session.total_amount()).await;
            println!("total due: {total}");

            let status = registrar.submit_for_status().await;
            println!("{}", status.message);
            if !status.is_success() {
                bail!("registration for '{event}' was not delivered");
            }
        }
        Command::Contact {
            name,
            email,
            phone,
            message,
        } => {
            let client = ContactClient::new(transport(&settings)?);
            for (field, value) in [
                (ContactField::Name, name),
                (ContactField::Email, email),
                (ContactField::Phone, phone),
                (ContactField::Message, message),
            ] {
                client.set_field(field, value).await?;
            }

            let sent = client.send().await;
            if let Some(status) = client.status().await {
                println!("{}", status.message);
            }
            sent?;
        }
    }

    Ok(())
}

fn transport(settings: &Settings) -> Result<Arc<dyn SubmissionTransport>> {
    match settings.submit_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpSubmissionTransport::new(url)?)),
        None => {
            warn!("registrar: no submit_url configured; submissions will fail");
            Ok(Arc::new(MissingSubmissionEndpoint))
        }
    }
}

fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Event => "event",
        EventKind::Workshop => "workshop",
    }
}

fn print_details(record: &EventRecord) {
    println!("{}", record.name);
    println!("  date: {}", record.date);
    println!("  venue: {}", record.venue);
    println!("  team size: {}", record.team_size);
    println!("  fee per participant: {}", record.registration_fee);
    println!("  NAAC grade: {}", record.naac_grade_or_default());
    println!("  about: {}", record.about);
    if let Some(highlights) = &record.highlights {
        println!("  highlights: {highlights}");
    }
    if let Some(details) = &record.details {
        println!("  details: {details}");
    }
    println!("  convener: {}", record.convener);
    println!("  faculty coordinator: {}", record.faculty_coordinator);
    println!("  student coordinator: {}", record.student_coordinator);
}
