//! CLI binary for coursemind.
//!
//! A thin shim over the library crate: flags become a `CoreConfig`, files
//! become material groups, results go to stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use coursemind::{
    generate_author_survey, generate_guide, AuthorAnalyses, AuthorInfo, CoreConfig,
    CorrelationAnalyzer, GuideRequest, GuideStatus, Material, MaterialGroup, MaterialKind,
    PromptAssembler, PromptContext, ProviderModelCaller, SourceDocument,
    TextExtractor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show what text each file yields
  coursemind extract week1.docx midterm.pdf notes.rtf

  # Correlate a past exam with handouts, recording it for the professor
  coursemind analyze --past-test midterm.pdf --handout week1.pdf week2.docx \
      --ledger ada.json --unit midterm-2024

  # Print the assembled prompts without calling a model
  coursemind prompt --system --course "PHYS 101" --handout week1.pdf --note notes.md

  # Generate a study guide using the recorded history
  coursemind guide --course "PHYS 101" --professor "Dr. Ada" --ledger ada.json \
      --past-test midterm.pdf --handout week1.pdf -o guide.md

  # Five tailoring questions about a professor
  coursemind survey --professor "Dr. Ada" --specialties "Classical mechanics"

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY                  OpenAI API key
  ANTHROPIC_API_KEY               Anthropic API key
  GEMINI_API_KEY                  Google Gemini API key
  COURSEMIND_LLM_PROVIDER         Provider (openai, anthropic, gemini, ollama)
  COURSEMIND_MODEL                Model ID
  COURSEMIND_STORAGE_BASE         Base directory for relative document paths
  COURSEMIND_MAX_CHARS_PER_SOURCE Per-document prompt cap
  COURSEMIND_MAX_TOTAL_CHARS      Total prompt cap
  PDFIUM_LIB_PATH                 Existing libpdfium for the last-resort PDF engine
"#;

#[derive(Parser, Debug)]
#[command(
    name = "coursemind",
    version,
    about = "Extract course documents, correlate past exams, and build study-guide prompts",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug-level logs on stderr.
    #[arg(short, long, global = true, env = "COURSEMIND_VERBOSE")]
    verbose: bool,

    /// No spinner, errors only.
    #[arg(short, long, global = true, env = "COURSEMIND_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from documents and report what each one yields.
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Declared format for every file (default: from extension).
        #[arg(long, default_value = "")]
        format: String,
        #[arg(long)]
        json: bool,
    },
    /// Correlate past tests against handouts and notes.
    Analyze {
        #[command(flatten)]
        materials: MaterialArgs,
        #[command(flatten)]
        model: ModelArgs,
        /// Author ledger (JSON) to record the result into.
        #[arg(long, requires = "unit")]
        ledger: Option<PathBuf>,
        /// Unit id the result replaces in the ledger.
        #[arg(long)]
        unit: Option<String>,
    },
    /// Print the assembled prompts without calling a model.
    Prompt {
        #[command(flatten)]
        materials: MaterialArgs,
        #[command(flatten)]
        context: ContextArgs,
        /// Also print the system instruction.
        #[arg(long)]
        system: bool,
    },
    /// Generate a study guide.
    Guide {
        #[command(flatten)]
        materials: MaterialArgs,
        #[command(flatten)]
        context: ContextArgs,
        #[command(flatten)]
        model: ModelArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Generate five survey questions about a professor.
    Survey {
        #[arg(long)]
        professor: String,
        #[arg(long)]
        specialties: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
struct MaterialArgs {
    #[arg(long = "past-test", num_args = 1..)]
    past_tests: Vec<PathBuf>,
    #[arg(long = "handout", num_args = 1..)]
    handouts: Vec<PathBuf>,
    #[arg(long = "note", num_args = 1..)]
    notes: Vec<PathBuf>,
    #[arg(long = "previous", num_args = 1..)]
    previous: Vec<PathBuf>,
    #[arg(long = "other", num_args = 1..)]
    other: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ContextArgs {
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    professor: Option<String>,
    #[arg(long)]
    specialties: Option<String>,
    /// Teaching style and emphasis.
    #[arg(long)]
    description: Option<String>,
    /// Special instructions from the student.
    #[arg(long)]
    instructions: Option<String>,
    /// Author ledger (JSON) supplying history and profile.
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    #[arg(long, env = "COURSEMIND_LLM_PROVIDER")]
    provider: Option<String>,
    #[arg(long, env = "COURSEMIND_MODEL")]
    model: Option<String>,
    #[arg(long, env = "COURSEMIND_TEMPERATURE")]
    temperature: Option<f32>,
}

impl ModelArgs {
    fn apply(&self, config: &mut CoreConfig) {
        if let Some(ref p) = self.provider {
            config.provider_name = Some(p.clone());
        }
        if let Some(ref m) = self.model {
            config.model = Some(m.clone());
        }
        if let Some(t) = self.temperature {
            config.temperature = t.clamp(0.0, 2.0);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = CoreConfig::from_env();
    let extractor = TextExtractor::new(&config.extraction);

    match cli.command {
        Command::Extract { files, format, json } => run_extract(&extractor, &files, &format, json),

        Command::Analyze {
            materials,
            model,
            ledger,
            unit,
        } => {
            model.apply(&mut config);
            let past = load_group(&extractor, MaterialKind::PastTest, &materials.past_tests);
            let mut refs = load_group(&extractor, MaterialKind::Handout, &materials.handouts);
            refs.members
                .extend(load_group(&extractor, MaterialKind::Note, &materials.notes).members);

            let caller = ProviderModelCaller::for_analysis(&config)?;
            let analyzer = CorrelationAnalyzer::new(&config);
            let result = with_spinner(cli.quiet, "Correlating past tests", || {
                analyzer.analyze(&past, &refs, &caller)
            })?;

            if let (Some(path), Some(unit)) = (ledger, unit) {
                let mut analyses = read_ledger(&path)?;
                let profile = analyses.record(unit, result.clone());
                write_json(&path, &analyses)?;
                eprintln!(
                    "{} recorded in {} ({} unit(s), {} topic(s))",
                    green("✔"),
                    path.display(),
                    profile.pairs_analyzed,
                    profile.tested_topics.len()
                );
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Command::Prompt {
            materials,
            context,
            system,
        } => {
            let request = build_request(&extractor, &materials, &context)?;
            let assembler = PromptAssembler::from_config(&config);
            if system {
                println!(
                    "{}\n",
                    assembler.build_system_instruction(
                        request.author.as_ref(),
                        request.author_profile.as_ref()
                    )
                );
                println!("{}", dim("──────── user ────────"));
            }
            let history = (!request.history.is_empty()).then_some(request.history.as_slice());
            let user = assembler.build_user_prompt(
                &request.context,
                request.special_instructions.as_deref(),
                &request.groups,
                history,
            );
            if user.is_empty() {
                bail!("none of the given materials produced usable text");
            }
            println!("{user}");
            Ok(())
        }

        Command::Guide {
            materials,
            context,
            model,
            output,
            json,
        } => {
            model.apply(&mut config);
            let request = build_request(&extractor, &materials, &context)?;
            let caller = ProviderModelCaller::for_generation(&config)?;
            let guide = with_spinner(cli.quiet, "Generating study guide", || {
                generate_guide(&request, &caller, &config)
            })?;
            if guide.status != GuideStatus::Generated {
                eprintln!("{} {}", red("✘"), guide.content);
            }

            let rendered = if json {
                serde_json::to_string_pretty(&guide)?
            } else {
                guide.content
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("{} wrote {}", green("✔"), path.display());
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }

        Command::Survey {
            professor,
            specialties,
            description,
            model,
        } => {
            model.apply(&mut config);
            let author = AuthorInfo {
                name: professor,
                specialties,
                description,
                quiz_qa: Vec::new(),
            };
            let caller = ProviderModelCaller::for_generation(&config)?;
            let questions = with_spinner(cli.quiet, "Drafting survey", || {
                generate_author_survey(&author, &caller, &config.repair)
            })?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
            Ok(())
        }
    }
}

fn run_extract(extractor: &TextExtractor, files: &[PathBuf], format: &str, json: bool) -> Result<()> {
    let mut report = Vec::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in files {
        let doc = SourceDocument::from_path(label_of(file), format, file);
        let result = extractor.extract(&doc);
        if json {
            report.push(serde_json::json!({ "label": doc.label, "format": doc.format().as_str(), "result": result }));
            continue;
        }
        match result {
            Ok(text) => {
                writeln!(
                    out,
                    "{} {}  {}",
                    green("✓"),
                    doc.label,
                    dim(&format!("{} chars", text.chars().count()))
                )?;
                writeln!(out, "{text}\n")?;
            }
            Err(e) => writeln!(out, "{} {}  {}", red("✗"), doc.label, red(&e.to_string()))?,
        }
    }
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn build_request(
    extractor: &TextExtractor,
    materials: &MaterialArgs,
    context: &ContextArgs,
) -> Result<GuideRequest> {
    let groups = vec![
        load_group(extractor, MaterialKind::PastTest, &materials.past_tests),
        load_group(extractor, MaterialKind::Handout, &materials.handouts),
        load_group(extractor, MaterialKind::Note, &materials.notes),
        load_group(extractor, MaterialKind::PreviousOutput, &materials.previous),
        load_group(extractor, MaterialKind::Other, &materials.other),
    ];

    let mut prompt_context = PromptContext::new();
    if let Some(ref c) = context.course {
        prompt_context = prompt_context.field("Course", c.as_str());
    }
    if let Some(ref p) = context.professor {
        prompt_context = prompt_context.field("Professor", p.as_str());
    }

    let author = context.professor.as_ref().map(|name| AuthorInfo {
        name: name.clone(),
        specialties: context.specialties.clone(),
        description: context.description.clone(),
        quiz_qa: Vec::new(),
    });

    let (history, author_profile) = match context.ledger {
        Some(ref path) => {
            let analyses = read_ledger(path)?;
            let history = analyses.results().map(|(_, r)| r.clone()).collect();
            (history, Some(analyses.profile()))
        }
        None => (Vec::new(), None),
    };

    Ok(GuideRequest {
        context: prompt_context,
        special_instructions: context.instructions.clone(),
        groups,
        author,
        author_profile,
        history,
    })
}

fn load_group(extractor: &TextExtractor, kind: MaterialKind, files: &[PathBuf]) -> MaterialGroup {
    let members = files
        .iter()
        .map(|f| {
            let doc = SourceDocument::from_path(label_of(f), "", f);
            Material::from_extraction(doc.label.clone(), extractor.extract(&doc))
        })
        .collect();
    MaterialGroup::new(kind, members)
}

fn label_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_ledger(path: &Path) -> Result<AuthorAnalyses> {
    if !path.exists() {
        return Ok(AuthorAnalyses::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid ledger {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

/// Run a blocking model call behind a spinner.
fn with_spinner<T, E>(quiet: bool, message: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let bar = (!quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("{message}…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });
    let result = f();
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(result?)
}
