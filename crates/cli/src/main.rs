use api_client::LookupClient;
use clap::{Args, Parser, Subcommand};
use laybridge_core::{build_codeable_concept, LookupParams, Session, SessionError};
use laybridge_types::NonEmptyText;

#[derive(Parser)]
#[command(name = "laybridge")]
#[command(about = "Lay term to clinical terminology (SNOMED CT / LOINC) lookup CLI")]
struct Cli {
    /// Backend base URL (defaults to $LAYBRIDGE_API_BASE, then http://127.0.0.1:8000)
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Lookup tuning flags, mirroring the backend's query parameters.
#[derive(Args)]
struct LookupOpts {
    /// Terminology domain: auto, snomed or loinc
    #[arg(long, default_value = "auto")]
    domain: String,
    /// Skip the technical candidate sections
    #[arg(long)]
    no_technical: bool,
    /// Maximum number of ranked results
    #[arg(long, default_value_t = 5)]
    top_k: u32,
    /// Minimum match score (0-100) for ranked results
    #[arg(long, default_value_t = 70)]
    score_cutoff: u32,
    /// Maximum number of technical candidates per system
    #[arg(long, default_value_t = 8)]
    tech_top_k: u32,
    /// Minimum match score (0-100) for technical candidates
    #[arg(long, default_value_t = 60)]
    tech_score_cutoff: u32,
}

impl LookupOpts {
    fn to_params(&self) -> LookupParams {
        LookupParams {
            domain: self.domain.clone(),
            include_technical: !self.no_technical,
            top_k: self.top_k,
            score_cutoff: self.score_cutoff,
            tech_top_k: self.tech_top_k,
            tech_score_cutoff: self.tech_score_cutoff,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend liveness
    Health,
    /// Look a lay term up and show views, candidates and the coded concept
    Lookup {
        /// Lay term to search, e.g. "watery eyes"
        term: String,
        #[command(flatten)]
        opts: LookupOpts,
    },
    /// Persist a SNOMED code for a term (looks the term up first)
    Save {
        /// Lay term the code belongs to
        term: String,
        /// SNOMED code, which must be among the term's current candidates
        code: String,
        /// Validate without persisting
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        opts: LookupOpts,
    },
    /// Revoke the stored mapping for a term
    Unlearn {
        /// Lay term to unlearn
        term: String,
        /// Also drop the term's alias list
        #[arg(long)]
        drop_aliases: bool,
    },
    /// Print only the coded-concept JSON for a term
    Concept {
        /// Lay term to search
        term: String,
        #[command(flatten)]
        opts: LookupOpts,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let base = cli
        .api_base
        .or_else(|| std::env::var("LAYBRIDGE_API_BASE").ok())
        .unwrap_or_else(|| "http://127.0.0.1:8000".into());
    let client = LookupClient::new(base)?;

    match cli.command {
        Commands::Health => match client.health() {
            Ok(true) => println!("API: online"),
            Ok(false) => println!("API: offline"),
            Err(e) => {
                eprintln!("Health check failed: {e}");
                std::process::exit(1);
            }
        },
        Commands::Lookup { term, opts } => {
            let term = NonEmptyText::new(&term)?;
            let result = client.lookup(&term, &opts.to_params())?;

            let mut session = Session::default();
            session.load(result);
            print_session(&session, &term);
        }
        Commands::Save {
            term,
            code,
            dry_run,
            opts,
        } => {
            let term = NonEmptyText::new(&term)?;
            let result = client.lookup(&term, &opts.to_params())?;

            let mut session = Session::default();
            session.load(result);
            session.select_option(&code)?;
            if session.preview().is_none() {
                eprintln!("Code {code} is not among the current candidates for \"{term}\".");
                print_options(&session);
                std::process::exit(1);
            }

            let preview = match session.begin_save() {
                Ok(preview) => preview,
                Err(SessionError::AlreadySaved) => {
                    println!("Code {code} is already the saved code for \"{term}\".");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            match client.commit_selection(&term, &preview, dry_run) {
                Ok(fresh) => {
                    session.complete_save(fresh);
                    if dry_run {
                        println!("Dry run accepted; nothing persisted.");
                    } else {
                        println!("Selection committed.");
                    }
                    print_session(&session, &term);
                }
                Err(e) => {
                    session.fail_save(e.to_string());
                    eprintln!("Save failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Unlearn { term, drop_aliases } => {
            let term = NonEmptyText::new(&term)?;
            client.unlearn(&term, !drop_aliases)?;
            println!("Mapping removed for \"{term}\".");
        }
        Commands::Concept { term, opts } => {
            let term = NonEmptyText::new(&term)?;
            let result = client.lookup(&term, &opts.to_params())?;

            let mut session = Session::default();
            session.load(result);
            match concept_json(&session, &term) {
                Some(json) => println!("{json}"),
                None => {
                    eprintln!("No coded concept available for \"{term}\".");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn concept_json(session: &Session, term: &NonEmptyText) -> Option<String> {
    let result = session.result()?;
    let concept = build_codeable_concept(result, session.preview(), term.as_str())?;
    concept.to_pretty_json().ok()
}

fn print_options(session: &Session) {
    let Some(result) = session.result() else {
        return;
    };
    if result.snomed_options.is_empty() {
        println!("  (no SNOMED candidates)");
        return;
    }
    let saved = result.saved_code.as_ref().map(|c| c.as_str());
    for option in &result.snomed_options {
        let marker = if saved == Some(option.code.as_str()) {
            " [saved]"
        } else {
            ""
        };
        println!("  {} ({}){marker}", option.display, option.code);
    }
}

fn print_session(session: &Session, term: &NonEmptyText) {
    let Some(loaded) = session.loaded() else {
        return;
    };
    let result = loaded.result();

    println!("Lay term: {}", result.text);
    match &result.saved_code {
        Some(code) => println!("Saved code: {code}"),
        None => println!("Saved code: none"),
    }
    if loaded.saved_code_unlisted() {
        println!("(note: the saved code is not among the current candidates)");
    }

    if let Some(view) = &result.patient_view {
        println!("\nPatient view:\n  {view}");
    }
    if let Some(view) = &result.practitioner_view {
        println!("\nPractitioner view:\n  {view}");
    }
    if let Some(loinc) = &result.loinc {
        match &loinc.display {
            Some(display) => println!("\nLOINC: {} — {display}", loinc.code),
            None => println!("\nLOINC: {}", loinc.code),
        }
        if result.is_loinc_only() {
            println!("This item appears to be lab-only (LOINC).");
        }
    }

    println!("\nSNOMED candidates:");
    print_options(session);

    match concept_json(session, term) {
        Some(json) => println!("\nCodeableConcept:\n{json}"),
        None => println!("\nCodeableConcept: none"),
    }

    if !result.technical.is_empty() {
        println!(
            "\nTechnical matches:\n{}",
            serde_json::to_string_pretty(&result.technical.to_json_value())
                .unwrap_or_else(|_| "{}".into())
        );
    }
}
