//! Interactive laybridge session.
//!
//! ## Purpose
//! Runs the whole lookup pipeline as a terminal session: type a lay term to
//! search, then select, save, reset or unlearn against the loaded result, and
//! export the coded concept.
//!
//! ## Intended use
//! Development companion to the one-shot `laybridge` CLI. The session owns
//! one [`Session`] and one [`SequenceGuard`]; a lookup response is applied
//! only while its request tag is still the latest issued, so a slow response
//! from an earlier search can never overwrite a newer one.
//!
//! # Environment Variables
//! - `LAYBRIDGE_API_BASE`: backend base URL (default: "http://127.0.0.1:8000")

use anyhow::Context;
use api_client::{LookupClient, SequenceGuard};
use laybridge_core::{build_codeable_concept, LookupParams, SaveStatus, Session};
use laybridge_types::NonEmptyText;
use std::io::{BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct App {
    client: LookupClient,
    params: LookupParams,
    guard: SequenceGuard,
    session: Session,
    current_term: Option<NonEmptyText>,
}

impl App {
    fn lookup(&mut self, term: NonEmptyText) {
        let tag = self.guard.issue();
        match self.client.lookup(&term, &self.params) {
            Ok(result) => {
                if !self.guard.is_current(tag) {
                    tracing::debug!(term = %term, "stale lookup response discarded");
                    return;
                }
                self.session.load(result);
                self.current_term = Some(term);
                self.print_summary();
            }
            Err(e) => {
                self.session.clear();
                self.current_term = None;
                eprintln!("Lookup failed: {e}");
            }
        }
    }

    fn save(&mut self) {
        let Some(term) = self.current_term.clone() else {
            println!("Nothing loaded; search for a term first.");
            return;
        };
        let preview = match self.session.begin_save() {
            Ok(preview) => preview,
            Err(e) => {
                println!("Cannot save: {e}");
                return;
            }
        };
        match self.client.commit_selection(&term, &preview, false) {
            Ok(fresh) => {
                self.session.complete_save(fresh);
                println!("Selection committed.");
                self.print_summary();
            }
            Err(e) => {
                self.session.fail_save(e.to_string());
                eprintln!("Save failed: {e}");
            }
        }
    }

    fn unlearn(&mut self) {
        let Some(term) = self.current_term.clone() else {
            println!("Nothing loaded; search for a term first.");
            return;
        };
        if *self.session.save_status() == SaveStatus::Saving {
            println!("A save is in flight; try again when it finishes.");
            return;
        }
        match self.client.unlearn(&term, true) {
            Ok(()) => {
                if self.session.complete_unlearn().is_ok() {
                    println!("Mapping removed.");
                }
                // defer to a fresh lookup for the new saved state
                self.lookup(term);
            }
            Err(e) => eprintln!("Unlearn failed: {e}"),
        }
    }

    fn reset(&mut self) {
        let had_saved = self
            .session
            .result()
            .is_some_and(|r| r.saved_code.is_some());
        match self.session.reset() {
            Ok(()) => {
                if had_saved {
                    println!("Reset to saved.");
                } else {
                    println!("Cleared preview.");
                }
            }
            Err(e) => println!("Cannot reset: {e}"),
        }
    }

    fn select(&mut self, code: &str) {
        if let Err(e) = self.session.select_option(code) {
            println!("Cannot select: {e}");
            return;
        }
        match self.session.preview() {
            Some(preview) => println!("Previewing {} ({})", preview.display, preview.code),
            None if code.trim().is_empty() => println!("Preview cleared."),
            None => println!("Code {code} is not among the current candidates; preview cleared."),
        }
    }

    fn print_concept(&self) {
        let Some(result) = self.session.result() else {
            println!("Nothing loaded; search for a term first.");
            return;
        };
        let fallback = self
            .current_term
            .as_ref()
            .map(NonEmptyText::as_str)
            .unwrap_or_default();
        match build_codeable_concept(result, self.session.preview(), fallback) {
            Some(concept) => match concept.to_pretty_json() {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Could not render concept: {e}"),
            },
            None => println!("No coded concept available."),
        }
    }

    fn print_technical(&self) {
        let Some(result) = self.session.result() else {
            println!("Nothing loaded; search for a term first.");
            return;
        };
        if result.technical.is_empty() {
            println!("No technical candidates.");
            return;
        }
        match serde_json::to_string_pretty(&result.technical.to_json_value()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Could not render technical block: {e}"),
        }
    }

    fn print_summary(&self) {
        let Some(loaded) = self.session.loaded() else {
            println!("Nothing loaded.");
            return;
        };
        let result = loaded.result();

        println!("Lay term: {}", result.text);
        if let Some(view) = &result.patient_view {
            println!("Patient view: {view}");
        }
        if let Some(view) = &result.practitioner_view {
            println!("Practitioner view: {view}");
        }
        if let Some(loinc) = &result.loinc {
            match &loinc.display {
                Some(display) => println!("LOINC: {} — {display}", loinc.code),
                None => println!("LOINC: {}", loinc.code),
            }
        }
        if result.is_loinc_only() {
            println!("Lab-only item (LOINC); no SNOMED picker.");
        }

        match &result.saved_code {
            Some(code) => println!("Saved code: {code}"),
            None => println!("Saved code: none"),
        }
        if loaded.saved_code_unlisted() {
            println!("(note: the saved code is not among the current candidates)");
        }

        if !result.snomed_options.is_empty() {
            println!("SNOMED candidates:");
            for option in &result.snomed_options {
                let marker = match self.session.current_code() {
                    Some(current) if current == option.code.as_str() => " *",
                    _ => "",
                };
                println!("  {} ({}){marker}", option.display, option.code);
            }
        }
    }

    fn print_status(&self) {
        match self.session.loaded() {
            None => println!("State: empty"),
            Some(loaded) => {
                let phase = match loaded.save_status() {
                    SaveStatus::Idle if loaded.preview().is_some() => "previewing".to_owned(),
                    SaveStatus::Idle => "no preview".to_owned(),
                    SaveStatus::Saving => "saving".to_owned(),
                    SaveStatus::Failed(msg) => format!("save failed: {msg}"),
                };
                println!(
                    "State: loaded \"{}\" ({phase}), can save: {}",
                    loaded.result().text,
                    self.session.can_save()
                );
            }
        }
    }
}

fn print_help() {
    println!("Type a lay term to search, or one of:");
    println!("  select <code>  preview a SNOMED candidate (no code clears the preview)");
    println!("  save           persist the previewed code");
    println!("  reset          recompute the preview from the saved code");
    println!("  unlearn        revoke the stored mapping and re-look the term up");
    println!("  concept        print the coded-concept JSON");
    println!("  technical      print the technical candidate sections");
    println!("  status         show the session state");
    println!("  quit           leave");
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base = std::env::var("LAYBRIDGE_API_BASE")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".into());
    let client = LookupClient::new(&base).context("building HTTP client")?;

    match client.health() {
        Ok(true) => println!("API: online ({base})"),
        Ok(false) => println!("API: offline ({base})"),
        Err(e) => println!("API: unreachable ({e})"),
    }

    let mut app = App {
        client,
        params: LookupParams::default(),
        guard: SequenceGuard::new(),
        session: Session::default(),
        current_term: None,
    };

    print_help();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading stdin")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("quit" | "exit", _) => break,
            ("help", _) => print_help(),
            ("select", code) => app.select(code.trim()),
            ("save", _) => app.save(),
            ("reset", _) => app.reset(),
            ("unlearn", _) => app.unlearn(),
            ("concept", _) => app.print_concept(),
            ("technical", _) => app.print_technical(),
            ("status", _) => app.print_status(),
            _ => match NonEmptyText::new(input) {
                Ok(term) => app.lookup(term),
                Err(_) => println!("Enter a term to search."),
            },
        }
    }

    Ok(())
}
