//! Request lifecycle commands: new, submit, assign, status, reject,
//! complete, note, document, show, list, counts.

use clap::{Subcommand, ValueEnum};
use jiff::Timestamp;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::lifecycle::{self, NewRequest};
use crate::model::{NoteKind, Priority, RequestStatus, ServiceRequest};
use crate::notify::{self, StatusNotification};
use crate::storage::{RequestFilter, Storage};

use super::format::{
    citizen_status_label, format_activity, priority_label, status_label,
};

#[derive(Debug, Subcommand)]
pub enum RequestCommand {
    /// Open a new request in draft. Prints the request id and number.
    New {
        /// Service identifier (e.g. `passport-renewal`).
        service: String,

        /// Handling organization (embassy or consulate) identifier.
        #[arg(long)]
        organization: String,

        /// Profile of the person the request is for.
        #[arg(long)]
        profile: String,

        /// Profile of the person filing the request.
        /// When omitted, the request is filed by its subject.
        #[arg(long)]
        requester: Option<String>,

        #[arg(long, value_enum, default_value = "normal")]
        priority: PriorityArg,

        /// Service-specific form fields, as `key=value`. Repeatable.
        #[arg(long = "data")]
        data: Vec<String>,
    },

    /// Submit a draft for processing.
    Submit {
        id: String,

        /// Acting profile, recorded in the audit trail.
        #[arg(long)]
        by: Option<String>,
    },

    /// Assign an agent. Moves the request into review or assignment.
    Assign {
        id: String,

        /// Agent profile taking the request.
        #[arg(long)]
        agent: String,

        #[arg(long)]
        by: Option<String>,
    },

    /// Move a request to a new status.
    Status {
        id: String,

        #[arg(value_enum)]
        status: StatusArg,

        #[arg(long)]
        by: Option<String>,
    },

    /// Reject a request, optionally with a reason.
    Reject {
        id: String,

        /// Human-readable reason; recorded in the audit trail and as an
        /// internal note.
        #[arg(long)]
        reason: Option<String>,

        #[arg(long)]
        by: Option<String>,
    },

    /// Complete a validated request.
    Complete {
        id: String,

        #[arg(long)]
        by: Option<String>,
    },

    /// Append a note. Notes are never edited or removed.
    Note {
        id: String,

        content: String,

        /// Make the note visible to the citizen (default: internal).
        #[arg(long)]
        citizen_visible: bool,

        #[arg(long)]
        author: Option<String>,
    },

    /// Manage document references on a request.
    Document {
        #[command(subcommand)]
        command: DocumentCommand,
    },

    /// Show one request: accepts an id, id prefix, or `REQ-` number.
    Show {
        reference: String,

        /// Print the full request as JSON instead of the summary.
        #[arg(long)]
        json: bool,
    },

    /// List requests, newest first.
    List {
        /// Filter by status. Repeatable.
        #[arg(long, value_enum)]
        status: Vec<StatusArg>,

        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,

        #[arg(long)]
        service: Option<String>,

        #[arg(long)]
        organization: Option<String>,

        #[arg(long)]
        profile: Option<String>,

        /// Filter by assigned agent.
        #[arg(long)]
        agent: Option<String>,

        /// Filter by the handling organization's country code.
        #[arg(long)]
        country: Option<String>,

        /// Only requests created at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,

        /// Only requests created at or before this RFC 3339 timestamp.
        #[arg(long)]
        until: Option<String>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },

    /// Per-status request counts, for dashboards.
    Counts {
        #[arg(long)]
        organization: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum DocumentCommand {
    /// Attach a document reference.
    Add {
        id: String,
        document: String,
        #[arg(long)]
        by: Option<String>,
    },

    /// Detach a document reference.
    Remove {
        id: String,
        document: String,
        #[arg(long)]
        by: Option<String>,
    },
}

/// CLI-facing status, mapped to the domain `RequestStatus`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Draft,
    Submitted,
    UnderReview,
    Assigned,
    AwaitingDocuments,
    Validated,
    Rejected,
    Completed,
}

impl StatusArg {
    fn to_domain(self) -> RequestStatus {
        match self {
            Self::Draft => RequestStatus::Draft,
            Self::Submitted => RequestStatus::Submitted,
            Self::UnderReview => RequestStatus::UnderReview,
            Self::Assigned => RequestStatus::Assigned,
            Self::AwaitingDocuments => RequestStatus::AwaitingDocuments,
            Self::Validated => RequestStatus::Validated,
            Self::Rejected => RequestStatus::Rejected,
            Self::Completed => RequestStatus::Completed,
        }
    }
}

/// CLI-facing priority, mapped to the domain `Priority`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Normal,
    High,
    Urgent,
}

impl PriorityArg {
    fn to_domain(self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Normal => Priority::Normal,
            Self::High => Priority::High,
            Self::Urgent => Priority::Urgent,
        }
    }
}

pub(super) fn run(
    command: RequestCommand,
    storage: &Storage,
    config: &Config,
) -> Result<(), String> {
    match command {
        RequestCommand::New {
            service,
            organization,
            profile,
            requester,
            priority,
            data,
        } => cmd_new(
            storage,
            &service,
            &organization,
            &profile,
            requester.as_deref(),
            priority.to_domain(),
            &data,
        ),
        RequestCommand::Submit { id, by } => {
            with_notification(storage, config, &id, |request_id| {
                lifecycle::submit(storage, request_id, by.as_deref())
            })
        }
        RequestCommand::Assign { id, agent, by } => {
            with_notification(storage, config, &id, |request_id| {
                lifecycle::assign(storage, request_id, &agent, by.as_deref())
            })
        }
        RequestCommand::Status { id, status, by } => {
            with_notification(storage, config, &id, |request_id| {
                lifecycle::change_status(storage, request_id, status.to_domain(), by.as_deref())
            })
        }
        RequestCommand::Reject { id, reason, by } => {
            with_notification(storage, config, &id, |request_id| {
                lifecycle::reject(storage, request_id, reason.as_deref(), by.as_deref())
            })
        }
        RequestCommand::Complete { id, by } => {
            with_notification(storage, config, &id, |request_id| {
                lifecycle::complete(storage, request_id, by.as_deref())
            })
        }
        RequestCommand::Note {
            id,
            content,
            citizen_visible,
            author,
        } => {
            let kind = if citizen_visible {
                NoteKind::CitizenVisible
            } else {
                NoteKind::Internal
            };
            let request_id = storage.resolve_id(&id).map_err(|e| e.to_string())?;
            lifecycle::add_note(storage, request_id, &content, kind, author.as_deref())
                .map_err(|e| e.to_string())?;
            eprintln!("Note added");
            Ok(())
        }
        RequestCommand::Document { command } => cmd_document(storage, command),
        RequestCommand::Show { reference, json } => cmd_show(storage, &reference, json),
        RequestCommand::List {
            status,
            priority,
            service,
            organization,
            profile,
            agent,
            country,
            since,
            until,
            limit,
            offset,
        } => {
            let filter = RequestFilter {
                statuses: status.into_iter().map(StatusArg::to_domain).collect(),
                priority: priority.map(PriorityArg::to_domain),
                service_id: service,
                organization_id: organization,
                profile_id: profile,
                assigned_agent_id: agent,
                country_code: country,
                created_since: since.as_deref().map(parse_timestamp).transpose()?,
                created_until: until.as_deref().map(parse_timestamp).transpose()?,
                limit,
                offset,
            };
            cmd_list(storage, &filter)
        }
        RequestCommand::Counts { organization } => cmd_counts(storage, organization.as_deref()),
    }
}

fn cmd_new(
    storage: &Storage,
    service: &str,
    organization: &str,
    profile: &str,
    requester: Option<&str>,
    priority: Priority,
    data: &[String],
) -> Result<(), String> {
    let request = lifecycle::create(
        storage,
        NewRequest {
            service_id: service.to_string(),
            organization_id: organization.to_string(),
            profile_id: profile.to_string(),
            requester_id: requester.unwrap_or(profile).to_string(),
            priority,
            data: parse_data_pairs(data)?,
        },
    )
    .map_err(|e| format!("failed to create request: {e}"))?;

    println!("{}", request.id);
    eprintln!("Request {} opened in draft", request.number);
    Ok(())
}

/// Resolves the id, runs the mutation, and fires the best-effort
/// notification when the status actually changed.
fn with_notification<F>(
    storage: &Storage,
    config: &Config,
    id: &str,
    operation: F,
) -> Result<(), String>
where
    F: FnOnce(uuid::Uuid) -> lifecycle::Result<ServiceRequest>,
{
    let request_id = storage.resolve_id(id).map_err(|e| e.to_string())?;
    let before = lifecycle::get(storage, request_id).map_err(|e| e.to_string())?;

    let after = operation(request_id).map_err(|e| e.to_string())?;

    eprintln!(
        "Request {} is now {}",
        after.number,
        status_label(after.status)
    );

    if before.status != after.status {
        let profile = storage.profile(&after.profile_id).ok().flatten();
        let notes: Vec<&str> = after
            .notes
            .iter()
            .filter(|n| n.kind == NoteKind::CitizenVisible)
            .map(|n| n.content.as_str())
            .collect();
        notify::status_changed(
            config.notify_command.as_deref(),
            &StatusNotification {
                request_id: after.id,
                number: &after.number,
                old_status: before.status,
                new_status: after.status,
                recipient_contact: profile.as_ref().and_then(|p| p.email.as_deref()),
                notes,
            },
        );
    }
    Ok(())
}

fn cmd_document(storage: &Storage, command: DocumentCommand) -> Result<(), String> {
    match command {
        DocumentCommand::Add { id, document, by } => {
            let request_id = storage.resolve_id(&id).map_err(|e| e.to_string())?;
            let request =
                lifecycle::add_document(storage, request_id, &document, by.as_deref())
                    .map_err(|e| e.to_string())?;
            eprintln!("{} documents on {}", request.document_ids.len(), request.number);
            Ok(())
        }
        DocumentCommand::Remove { id, document, by } => {
            let request_id = storage.resolve_id(&id).map_err(|e| e.to_string())?;
            let request =
                lifecycle::remove_document(storage, request_id, &document, by.as_deref())
                    .map_err(|e| e.to_string())?;
            eprintln!("{} documents on {}", request.document_ids.len(), request.number);
            Ok(())
        }
    }
}

fn cmd_show(storage: &Storage, reference: &str, json: bool) -> Result<(), String> {
    let request = if reference.starts_with("REQ-") {
        lifecycle::get_by_number(storage, reference).map_err(|e| e.to_string())?
    } else {
        let request_id = storage.resolve_id(reference).map_err(|e| e.to_string())?;
        lifecycle::get(storage, request_id).map_err(|e| e.to_string())?
    };

    if json {
        let rendered = serde_json::to_string_pretty(&request)
            .map_err(|e| format!("failed to encode request: {e}"))?;
        println!("{rendered}");
        return Ok(());
    }

    // Enrichment lookups degrade to the raw id when the reference data
    // does not know the entity.
    let service = storage
        .service(&request.service_id)
        .ok()
        .flatten()
        .map_or_else(|| request.service_id.clone(), |s| s.name);
    let organization = storage
        .organization(&request.organization_id)
        .ok()
        .flatten()
        .map_or_else(|| request.organization_id.clone(), |o| o.name);
    let profile = storage
        .profile(&request.profile_id)
        .ok()
        .flatten()
        .map_or_else(|| request.profile_id.clone(), |p| p.full_name);

    println!("{}  ({})", request.number, request.id);
    println!("Service:      {service}");
    println!("Organization: {organization}");
    println!("Applicant:    {profile}");
    println!(
        "Status:       {}  (shown to citizen as: {})",
        status_label(request.status),
        citizen_status_label(request.status)
    );
    println!("Priority:     {}", priority_label(request.priority));
    if let Some(agent) = &request.assigned_agent_id {
        println!("Agent:        {agent}");
    }
    println!("Created:      {}", request.created_at);
    if let Some(at) = request.submitted_at {
        println!("Submitted:    {at}");
    }
    if let Some(at) = request.completed_at {
        println!("Completed:    {at}");
    }
    if !request.data.is_empty() {
        println!("Data:");
        for (key, value) in &request.data {
            println!("  {key} = {value}");
        }
    }
    if !request.document_ids.is_empty() {
        println!("Documents:    {}", request.document_ids.join(", "));
    }
    if !request.notes.is_empty() {
        println!("Notes:");
        for note in &request.notes {
            let author = note.author_id.as_deref().unwrap_or("system");
            println!("  [{}] {author}: {}", note.kind.as_str(), note.content);
        }
    }
    println!("History:");
    for activity in &request.activities {
        println!("  {}", format_activity(activity));
    }
    Ok(())
}

fn cmd_list(storage: &Storage, filter: &RequestFilter) -> Result<(), String> {
    let requests =
        lifecycle::list(storage, filter).map_err(|e| format!("failed to list requests: {e}"))?;

    if requests.is_empty() {
        println!("No requests");
        return Ok(());
    }

    for request in &requests {
        let short_id = &request.id.to_string()[..8];
        let agent = request.assigned_agent_id.as_deref().unwrap_or("-");
        println!(
            "{}  {short_id}  [{}]  {}  {}  agent:{agent}",
            request.number,
            status_label(request.status),
            priority_label(request.priority),
            request.service_id,
        );
    }
    Ok(())
}

fn cmd_counts(storage: &Storage, organization: Option<&str>) -> Result<(), String> {
    let counts = lifecycle::status_counts(storage, organization)
        .map_err(|e| format!("failed to count requests: {e}"))?;

    for (status, count) in counts {
        println!("{:<20} {count}", status_label(status));
    }
    Ok(())
}

/// Parses repeated `key=value` flags into the opaque data payload.
fn parse_data_pairs(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut data = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("invalid --data {pair:?}: expected key=value"));
        };
        data.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(data)
}

fn parse_timestamp(raw: &str) -> Result<Timestamp, String> {
    raw.parse()
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_pairs() {
        let data = parse_data_pairs(&["pages=32".into(), "urgent-pickup=yes".into()]).unwrap();
        assert_eq!(data["pages"], "32");
        assert_eq!(data["urgent-pickup"], "yes");
    }

    #[test]
    fn rejects_malformed_data_pair() {
        assert!(parse_data_pairs(&["pages".into()]).is_err());
    }

    #[test]
    fn status_args_cover_the_domain() {
        for status in RequestStatus::ALL {
            // Every domain status must be reachable from the CLI.
            let arg = match status {
                RequestStatus::Draft => StatusArg::Draft,
                RequestStatus::Submitted => StatusArg::Submitted,
                RequestStatus::UnderReview => StatusArg::UnderReview,
                RequestStatus::Assigned => StatusArg::Assigned,
                RequestStatus::AwaitingDocuments => StatusArg::AwaitingDocuments,
                RequestStatus::Validated => StatusArg::Validated,
                RequestStatus::Rejected => StatusArg::Rejected,
                RequestStatus::Completed => StatusArg::Completed,
            };
            assert_eq!(arg.to_domain(), status);
        }
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        assert!(parse_timestamp("2026-01-01T00:00:00Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
