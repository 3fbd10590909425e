//! Output formatting for the domain-broker CLI.
//!
//! Text mode uses the `console` crate for colors and alignment; JSON mode
//! prints one pretty-printed document per command on stdout. The spinner and
//! error messages go to stderr so stdout stays machine-readable.

use console::{pad_str, style, Alignment, StyledObject, Term};
use domain_broker_lib::{
    Availability, BrokerError, CheckResult, RegistrationRecord, RegistrationStatus,
    SuggestionResponse, TldRecord, WizardSession,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 32;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Braille-dot spinner on stderr, shown only on an interactive terminal.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner unless `quiet` is set or stderr is not a terminal.
    pub fn start_unless(quiet: bool, message: &str) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let term = Term::stderr();
        if quiet || !term.is_term() {
            return Self {
                running,
                handle: None,
            };
        }

        let flag = running.clone();
        let message = message.to_string();
        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while flag.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), BrokerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn availability_label(availability: Availability) -> StyledObject<&'static str> {
    match availability {
        Availability::Available => style("AVAILABLE").green().bold(),
        Availability::Unavailable => style("TAKEN").red().bold(),
        Availability::Unknown => style("UNKNOWN").yellow(),
    }
}

fn status_label(status: RegistrationStatus) -> StyledObject<String> {
    let text = status.to_string().to_uppercase();
    match status {
        RegistrationStatus::Registered => style(text).green().bold(),
        RegistrationStatus::Pending => style(text).yellow().bold(),
        RegistrationStatus::Failed => style(text).red().bold(),
        RegistrationStatus::Cancelled => style(text).dim(),
    }
}

// ── Suggestions ──────────────────────────────────────────────────────────────

pub fn print_suggestions(response: &SuggestionResponse, json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(response);
    }

    println!(
        "{} {}",
        style("Suggestions for").bold(),
        style(&response.label).cyan().bold()
    );
    println!();

    for (rank, s) in response.suggestions.iter().enumerate() {
        let marker = if s.recommended {
            style("★").yellow().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {:>2}. {} {}  {:>8} EUR  {}  {}",
            rank + 1,
            marker,
            pad_str(&s.domain, DOMAIN_WIDTH, Alignment::Left, Some("..")),
            s.price.to_string(),
            availability_label(s.availability),
            style(format!("score {}", s.score)).dim(),
        );
    }

    if let Some(e) = &response.availability_error {
        println!();
        println!(
            "  {} {}",
            style("Availability unknown:").yellow(),
            style(e).dim()
        );
    }
    Ok(())
}

// ── Direct checks ────────────────────────────────────────────────────────────

pub fn print_checks(results: &[CheckResult], json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(results);
    }

    for r in results {
        let price = r
            .price
            .map(|p| format!("{:>8} EUR", p.to_string()))
            .unwrap_or_else(|| format!("{:>12}", "-"));
        let note = r
            .error
            .as_deref()
            .map(|e| format!("  {}", style(e).dim()))
            .unwrap_or_default();
        println!(
            "  {}  {}  {}{}",
            pad_str(&r.domain, DOMAIN_WIDTH, Alignment::Left, Some("..")),
            price,
            availability_label(r.availability),
            note,
        );
    }
    Ok(())
}

// ── Registration records ─────────────────────────────────────────────────────

pub fn print_record(record: &RegistrationRecord, json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(record);
    }

    println!(
        "{}  {}",
        style(&record.domain).bold(),
        status_label(record.status)
    );
    println!("  {} {}", style("record:  ").dim(), record.id);
    println!("  {} {}", style("customer:").dim(), record.customer_id);
    println!(
        "  {} {} EUR for {} year{}",
        style("price:   ").dim(),
        record.sell_price,
        record.period_years,
        if record.period_years == 1 { "" } else { "s" }
    );
    if let Some(previous) = record.supersedes {
        println!("  {} {}", style("retry of:").dim(), previous);
    }
    if let Some(note) = &record.last_error {
        println!("  {} {}", style("note:    ").dim(), style(note).yellow());
    }
    Ok(())
}

pub fn print_records(records: &[RegistrationRecord], json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(records);
    }

    if records.is_empty() {
        println!("{}", style("No registration records.").dim());
        return Ok(());
    }

    for r in records {
        println!(
            "  {}  {}  {}  {}",
            r.id,
            pad_str(&r.domain, DOMAIN_WIDTH, Alignment::Left, Some("..")),
            status_label(r.status),
            style(r.created_at.format("%Y-%m-%d %H:%M")).dim(),
        );
    }
    Ok(())
}

// ── Wizard and catalog ───────────────────────────────────────────────────────

pub fn print_session(session: &WizardSession, json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(session);
    }

    println!(
        "{} {}",
        style(&session.partner.name).bold(),
        style(format!("({})", session.partner.key)).dim()
    );
    println!("  {} {}", style("customer:").dim(), session.customer.name);
    println!("  {} {}", style("id:      ").dim(), session.customer.id);
    println!("  {} {}", style("country: ").dim(), session.customer.country);
    if let Some(industry) = &session.customer.industry {
        println!("  {} {}", style("industry:").dim(), industry);
    }
    Ok(())
}

pub fn print_tlds(tlds: &[TldRecord], json: bool) -> Result<(), BrokerError> {
    if json {
        return print_json(tlds);
    }

    for t in tlds {
        let price = t
            .sell_price
            .map(|p| format!("{:>8} EUR", p.to_string()))
            .unwrap_or_else(|| format!("{:>12}", "no price"));
        println!(
            "  {}  {}  {}  {}",
            pad_str(&format!(".{}", t.tld), 10, Alignment::Left, None),
            price,
            style(format!("priority {:>3}", t.priority)).dim(),
            style(t.groups.join(", ")).dim(),
        );
    }
    Ok(())
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Print an error: a JSON object on stdout in JSON mode, else text on stderr.
pub fn print_error(error: &BrokerError, json: bool) {
    if json {
        let body = serde_json::json!({ "error": error });
        match serde_json::to_string_pretty(&body) {
            Ok(text) => println!("{}", text),
            Err(_) => eprintln!("Error: {}", error),
        }
        return;
    }
    eprintln!("{} {}", style("Error:").for_stderr().red().bold(), error);
}
