//! CLI entry point for Call Minutes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use call_minutes::build_repository;
use call_minutes::database::CallRecord;
use call_minutes::minutes::prompts::{format_duration, format_millis};
use call_minutes::minutes::ExportFormat;
use call_minutes::paths::AppDirs;
use call_minutes::pipeline::derive_stage;
use call_minutes::remote::DEFAULT_BASE_URL;

/// Call Minutes - manage call recordings, transcripts and meeting minutes
#[derive(Parser)]
#[command(name = "call-minutes")]
#[command(about = "Transcribe call recordings and generate structured meeting minutes", long_about = None)]
#[command(version)]
struct Cli {
    /// Override the application data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the API endpoint base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the candidate directories for new recordings
    Scan,
    /// Import one audio file
    Import(ImportArgs),
    /// List records with their pipeline stage
    List,
    /// Search records by contact, phone number or file name
    Search {
        query: String,
    },
    /// Transcribe a record (add --minute to chain minute generation)
    Transcribe(TranscribeArgs),
    /// Generate (or regenerate) the minute for a transcribed record
    Minute {
        /// Record id
        id: i64,
    },
    /// Show a record's transcript and minute
    Show {
        /// Record id
        id: i64,
    },
    /// Generate minutes for all transcribed records that lack one
    Regenerate,
    /// Synthesize a timeline brief from several minutes
    Brief(BriefArgs),
    /// Export a minute document
    Export(ExportArgs),
    /// Delete a record, its file and its transcript/minute
    Delete {
        /// Record id
        id: i64,
    },
    /// Store the API key used for all remote calls
    SetKey {
        key: String,
    },
    /// Rename the contact for every record with a phone number
    RenameContact {
        phone_number: String,
        new_name: String,
    },
    /// Replace a transcript's text after manual editing
    EditTranscript {
        /// Transcript id
        id: i64,
        /// Path to a text file with the corrected transcript
        text_file: PathBuf,
    },
}

#[derive(Parser)]
struct ImportArgs {
    /// Path to the audio file
    input: PathBuf,

    /// Contact name override (wins over the parsed file name)
    #[arg(short, long)]
    contact: Option<String>,
}

#[derive(Parser)]
struct TranscribeArgs {
    /// Record id
    id: i64,

    /// Chain minute generation after a successful transcription
    #[arg(long)]
    minute: bool,
}

#[derive(Parser)]
struct BriefArgs {
    /// Minute ids to include
    ids: Vec<i64>,
}

#[derive(Parser)]
struct ExportArgs {
    /// Minute id
    id: i64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliExportFormat::Md)]
    format: CliExportFormat,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum CliExportFormat {
    /// Markdown document
    #[default]
    Md,
    /// Plain text document
    Txt,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(value: CliExportFormat) -> Self {
        match value {
            CliExportFormat::Md => ExportFormat::Markdown,
            CliExportFormat::Txt => ExportFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let dirs = match &cli.data_dir {
        Some(dir) => AppDirs::new(dir.clone()),
        None => AppDirs::default_dirs(),
    };
    let repo = build_repository(&dirs, &cli.api_base)?;

    match cli.command {
        Commands::Scan => {
            let summary = repo.scan_recordings(&dirs.scan_dirs())?;
            println!(
                "Scan complete: {} recording(s) found, {} newly imported",
                summary.total_found, summary.newly_inserted
            );
        }

        Commands::Import(args) => {
            // Copy into the app-private dir first so the record's file
            // survives the source being moved or deleted.
            let file_name = args
                .input
                .file_name()
                .context("Input path has no file name")?;
            let dest = dirs.imported_recordings_dir()?.join(file_name);
            if dest != args.input {
                std::fs::copy(&args.input, &dest)
                    .with_context(|| format!("Failed to copy {}", args.input.display()))?;
            }
            let record = repo.import_audio_file(&dest, args.contact.as_deref())?;
            println!("Imported record {}: {}", record.id, record.file_name);
        }

        Commands::List => {
            let records = repo.get_all_records()?;
            if records.is_empty() {
                println!("No records. Run `call-minutes scan` or `call-minutes import <file>`.");
            }
            for record in records {
                print_record_line(&repo, &record)?;
            }
        }

        Commands::Search { query } => {
            for record in repo.search_records(&query)? {
                print_record_line(&repo, &record)?;
            }
        }

        Commands::Transcribe(args) => {
            let transcript = repo.transcribe_record(args.id).await?;
            println!(
                "Transcribed record {} ({} chars)",
                args.id,
                transcript.full_text.chars().count()
            );
            if args.minute {
                let record = repo
                    .get_record(args.id)?
                    .context("Record vanished after transcription")?;
                let outcome = repo.generate_minute(&transcript, &record).await?;
                let fallback = outcome.is_fallback();
                let minute = outcome.into_inner();
                println!("Minute {} generated: {}", minute.id, minute.title);
                if fallback {
                    println!("(model output was not valid JSON; a placeholder minute was stored)");
                }
            }
        }

        Commands::Minute { id } => {
            let outcome = repo.regenerate_minute_for_record(id).await?;
            let fallback = outcome.is_fallback();
            let minute = outcome.into_inner();
            println!("Minute {} generated: {}", minute.id, minute.title);
            if fallback {
                println!("(model output was not valid JSON; a placeholder minute was stored)");
            }
        }

        Commands::Show { id } => {
            let record = repo.get_record(id)?.context("Record not found")?;
            println!("Record {}: {}", record.id, record.file_name);
            println!("  Contact:  {}", record.display_name());
            println!("  Captured: {}", format_millis(record.record_time));
            println!("  Duration: {}", format_duration(record.duration_seconds));
            match repo.get_transcript_by_record(id)? {
                Some(transcript) => {
                    println!("  Transcript ({:?}):", transcript.status);
                    println!("{}", transcript.full_text);
                    if let Some(minute) = repo.get_minute_by_transcript(transcript.id)? {
                        println!("\n===== {} =====", minute.title);
                        println!("{}", minute.summary);
                        for (idx, point) in minute.key_points.iter().enumerate() {
                            println!("  {}. {}", idx + 1, point);
                        }
                    }
                }
                None => println!("  Not transcribed yet."),
            }
        }

        Commands::Regenerate => {
            let generated = repo.regenerate_minutes_for_transcribed().await?;
            println!("Generated {} missing minute(s)", generated);
        }

        Commands::Brief(args) => {
            let all = repo.get_all_minutes_with_contact()?;
            let selected: Vec<_> = if args.ids.is_empty() {
                all
            } else {
                all.into_iter().filter(|m| args.ids.contains(&m.id)).collect()
            };
            let outcome = repo.generate_timeline_brief(selected).await?;
            let fallback = outcome.is_fallback();
            let brief = outcome.into_inner();

            println!("===== {} =====", brief.title);
            for node in &brief.timeline_nodes {
                println!("  {} - {}", node.date, node.summary);
            }
            println!("\n趋势分析: {}", brief.trend_analysis);
            println!("当前状态: {}", brief.current_status);
            for suggestion in &brief.follow_up_suggestions {
                println!("  - {}", suggestion);
            }
            if fallback {
                println!("\n(model output was not valid JSON; this is a placeholder brief)");
            }
        }

        Commands::Export(args) => {
            let path =
                repo.export_minute_document(args.id, args.format.into(), &dirs.minutes_export_dir()?)?;
            println!("Exported to {}", path.display());
        }

        Commands::Delete { id } => {
            repo.delete_record(id)?;
            println!("Deleted record {}", id);
        }

        Commands::SetKey { key } => {
            repo.db().set_api_key(&key)?;
            println!("API key saved.");
        }

        Commands::RenameContact {
            phone_number,
            new_name,
        } => {
            let updated = repo.update_contact_name(&phone_number, &new_name)?;
            println!("Updated {} record(s)", updated);
        }

        Commands::EditTranscript { id, text_file } => {
            let text = std::fs::read_to_string(&text_file)
                .with_context(|| format!("Failed to read {}", text_file.display()))?;
            let transcript = repo.update_transcript_text(id, text.trim_end())?;
            println!(
                "Transcript {} updated ({} chars)",
                transcript.id,
                transcript.full_text.chars().count()
            );
        }
    }

    Ok(())
}

fn print_record_line(
    repo: &call_minutes::CallRecordRepository,
    record: &CallRecord,
) -> Result<()> {
    let minute_exists = match record.transcript_id {
        Some(tid) => repo.get_minute_by_transcript(tid)?.is_some(),
        None => false,
    };
    let stage = derive_stage(record.is_transcribed, minute_exists);
    println!(
        "{:>4}  {:<20} {:>16}  {:>8}  {:?}",
        record.id,
        record.display_name(),
        format_millis(record.record_time),
        format_duration(record.duration_seconds),
        stage
    );
    Ok(())
}
