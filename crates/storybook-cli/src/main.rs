use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use storybook_contracts::events::EventWriter;
use storybook_contracts::languages::{LanguageRegistry, NO_LANGUAGE};
use storybook_contracts::session::{parse_intent, Intent, SESSION_HELP_COMMANDS};
use storybook_engine::{
    write_request_outputs, EngineConfig, RequestOutputs, StoryPipeline, StoryReport,
    StoryRequest, StoryServices,
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STORYBOOK_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(
    name = "storybook",
    version,
    about = "Turn a picture into a children's story, with translation and narration"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process one image.
    Run(RunArgs),
    /// Read image paths from stdin, one request per line.
    Session(SessionArgs),
    /// List the supported translation languages.
    Languages,
}

#[derive(Debug, Args)]
struct BackendArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    /// Overrides STORYBOOK_MODEL.
    #[arg(long)]
    model: Option<String>,
    /// Use offline services; no network or credential needed.
    #[arg(long)]
    dryrun: bool,
    /// Command used to play each audio file, e.g. `mpv --no-video`.
    #[arg(long)]
    player: Option<String>,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    image: PathBuf,
    /// Target language name, or `none`.
    #[arg(long)]
    language: Option<String>,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    /// Default language for lines that do not name one.
    #[arg(long)]
    language: Option<String>,
    #[command(flatten)]
    backend: BackendArgs,
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("storybook error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_run_native(args),
        Command::Session(args) => {
            run_session_native(args)?;
            Ok(0)
        }
        Command::Languages => {
            print_languages(&LanguageRegistry::default(), &mut io::stdout().lock())?;
            Ok(0)
        }
    }
}

fn build_pipeline(args: &BackendArgs) -> Result<StoryPipeline> {
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed creating {}", args.out.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let config = EngineConfig::from_env().with_model(args.model.clone());
    let services = if args.dryrun {
        StoryServices::dryrun()
    } else {
        StoryServices::google(&config)?
    };
    if !args.dryrun && config.gemini.api_key.is_none() {
        tracing::warn!("no Gemini credential configured; story generation will fail");
    }
    let events = EventWriter::new(events_path, uuid::Uuid::new_v4().to_string());
    tracing::info!(
        session_id = events.session_id(),
        events_path = ?events.path(),
        "event log opened"
    );
    let pipeline = StoryPipeline::new(services, &config, events);
    tracing::info!(backend = pipeline.backend(), model = %config.gemini.model, "pipeline ready");
    Ok(pipeline)
}

fn run_run_native(args: RunArgs) -> Result<i32> {
    let pipeline = build_pipeline(&args.backend)?;
    let request = StoryRequest::from_path(&args.image, args.language.clone());
    let report = process_request(
        &pipeline,
        &request,
        &args.backend.out,
        args.backend.player.as_deref(),
        &mut io::stdout().lock(),
    )?;
    Ok(if report.has_story() { 0 } else { 1 })
}

fn process_request(
    pipeline: &StoryPipeline,
    request: &StoryRequest,
    out_dir: &Path,
    player: Option<&str>,
    out: &mut impl Write,
) -> Result<StoryReport> {
    let report = pipeline.run(request);
    let outputs = write_request_outputs(&report, out_dir)?;
    render_report(&report, Some(&outputs), out)?;
    if let Some(player) = player {
        play_report_audio(&report, player, out)?;
    }
    Ok(report)
}

fn run_session_native(args: SessionArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.backend)?;
    let stdin = io::stdin();
    run_session_loop(
        &pipeline,
        &args.backend.out,
        args.language.clone(),
        args.backend.player.as_deref(),
        stdin.lock(),
        &mut io::stdout().lock(),
    )
}

fn run_session_loop(
    pipeline: &StoryPipeline,
    out_dir: &Path,
    mut default_language: Option<String>,
    player: Option<&str>,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let mut line = String::new();
    writeln!(out, "Storybook session started. Type /help for commands.")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_intent(&line) {
            Intent::Noop => {}
            Intent::Help => {
                writeln!(out, "Commands: {}", SESSION_HELP_COMMANDS.join("  "))?;
            }
            Intent::Quit => break,
            Intent::ListLanguages => print_languages(pipeline.languages(), out)?,
            Intent::SetLanguage(language) => {
                let language = language.filter(|name| !name.eq_ignore_ascii_case(NO_LANGUAGE));
                match language.as_deref() {
                    None => {
                        writeln!(out, "Translation off")?;
                        default_language = None;
                    }
                    Some(name) => match pipeline.languages().get(name) {
                        Some(target) => {
                            writeln!(out, "Language set to {}", target.display_name)?;
                            default_language = Some(target.display_name.clone());
                        }
                        None => writeln!(
                            out,
                            "Unknown language '{name}'. Choose one of: {}",
                            pipeline.languages().display_names().join(", ")
                        )?,
                    },
                }
            }
            Intent::Story { path, language } => {
                let language = language.or_else(|| default_language.clone());
                let request = StoryRequest::from_path(path, language);
                if let Err(err) = process_request(pipeline, &request, out_dir, player, out) {
                    writeln!(out, "Error: {err:#}")?;
                }
            }
            Intent::Unknown { command } => {
                writeln!(out, "Unknown command: /{command}. Type /help for commands.")?;
            }
        }
    }
    Ok(())
}

fn print_languages(registry: &LanguageRegistry, out: &mut impl Write) -> Result<()> {
    for language in registry.list() {
        writeln!(out, "{:<10} {}", language.display_name, language.code)?;
    }
    writeln!(out, "{NO_LANGUAGE:<10} (no translation)")?;
    Ok(())
}

fn render_report(
    report: &StoryReport,
    outputs: Option<&RequestOutputs>,
    out: &mut impl Write,
) -> Result<()> {
    for warning in &report.warnings {
        writeln!(out, "Warning: {warning}")?;
    }
    for error in &report.errors {
        writeln!(out, "{error}")?;
    }

    if let Some(caption) = report.caption() {
        writeln!(out, "### Generated Caption\n{caption}\n")?;
    }
    if let Some(story) = report.story() {
        writeln!(out, "### Generated Story\n{story}\n")?;
    }
    if let Some(path) = outputs.and_then(|outputs| outputs.english_audio.as_ref()) {
        writeln!(out, "### Story Audio (English)\n{}\n", path.display())?;
    }
    if let (Some(language), Some(translated)) = (&report.language, &report.translated_story) {
        writeln!(
            out,
            "### Translated Story ({})\n{translated}\n",
            language.display_name
        )?;
        if let Some(path) = outputs.and_then(|outputs| outputs.translated_audio.as_ref()) {
            writeln!(
                out,
                "### Translated Audio ({})\n{}\n",
                language.display_name,
                path.display()
            )?;
        }
    }
    if let Some(outputs) = outputs {
        writeln!(out, "Summary: {}", outputs.summary.display())?;
    }
    Ok(())
}

/// Plays each artifact from a temporary copy that is removed afterwards.
/// Player failures are reported but never fail the request.
fn play_report_audio(report: &StoryReport, player: &str, out: &mut impl Write) -> Result<()> {
    let argv = player_argv(player)?;
    for artifact in report.audio() {
        let spool = artifact.spool()?;
        let status = ProcessCommand::new(&argv[0])
            .args(&argv[1..])
            .arg(spool.path())
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => writeln!(out, "Player exited with {status}")?,
            Err(err) => writeln!(out, "Player failed to start ({}): {err}", argv[0])?,
        }
    }
    Ok(())
}

fn player_argv(player: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(player)
        .with_context(|| format!("invalid --player command: {player}"))?;
    if argv.is_empty() {
        bail!("--player command is empty");
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use storybook_contracts::events::EventWriter;
    use storybook_contracts::languages::LanguageRegistry;
    use storybook_engine::{EngineConfig, StoryPipeline, StoryRequest, StoryServices};

    use super::{
        player_argv, print_languages, process_request, run_session_loop, Cli, Command,
    };

    fn dryrun_pipeline() -> StoryPipeline {
        StoryPipeline::new(
            StoryServices::dryrun(),
            &EngineConfig::default(),
            EventWriter::in_memory("cli-test"),
        )
    }

    fn write_sample_image(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        image::RgbImage::from_pixel(12, 18, image::Rgb([30, 30, 200])).save(&path)?;
        Ok(path)
    }

    fn output_text(bytes: Vec<u8>) -> String {
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "storybook", "run", "--image", "dog.png", "--language", "Telugu", "--out", "out",
            "--dryrun",
        ])
        .unwrap_or_else(|err| panic!("{err}"));
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.image, PathBuf::from("dog.png"));
                assert_eq!(args.language.as_deref(), Some("Telugu"));
                assert!(args.backend.dryrun);
                assert!(args.backend.events.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["storybook", "run", "--out", "out"]).is_err());
        assert!(Cli::try_parse_from(["storybook", "languages"]).is_ok());
    }

    #[test]
    fn single_request_prints_every_section() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = write_sample_image(temp.path(), "blue.png")?;
        let mut out = Vec::new();

        let report = process_request(
            &dryrun_pipeline(),
            &StoryRequest::from_path(&image, Some("Tamil".to_string())),
            &temp.path().join("out"),
            None,
            &mut out,
        )?;
        assert!(report.has_story());

        let text = output_text(out);
        assert!(text.contains("### Generated Caption\nA tall picture that is mostly blue."));
        assert!(text.contains("### Generated Story\nOnce upon a time"));
        assert!(text.contains("### Story Audio (English)"));
        assert!(text.contains("english.mp3"));
        assert!(text.contains("### Translated Story (Tamil)\n[ta] Once upon a time"));
        assert!(text.contains("ta.mp3"));
        Ok(())
    }

    #[test]
    fn failed_request_prints_error_and_no_story() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut out = Vec::new();
        let report = process_request(
            &dryrun_pipeline(),
            &StoryRequest::from_path(temp.path().join("missing.png"), None),
            temp.path(),
            None,
            &mut out,
        )?;
        assert!(!report.has_story());

        let text = output_text(out);
        assert!(text.contains("Error processing image:"));
        assert!(!text.contains("### Generated Story"));
        Ok(())
    }

    #[test]
    fn session_handles_commands_and_survives_failures() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = write_sample_image(temp.path(), "park photo.png")?;
        let script = format!(
            "/help\n/language klingon\n/language hindi\nnope.png\n\"{}\"\n/bogus\n/quit\n{}\n",
            image.display(),
            image.display()
        );
        let mut out = Vec::new();

        run_session_loop(
            &dryrun_pipeline(),
            &temp.path().join("out"),
            None,
            None,
            Cursor::new(script),
            &mut out,
        )?;

        let text = output_text(out);
        assert!(text.contains("Commands: "));
        assert!(text.contains("Unknown language 'klingon'"));
        assert!(text.contains("Language set to Hindi"));
        assert!(text.contains("Error processing image:"));
        assert!(text.contains("### Translated Story (Hindi)"));
        assert!(text.contains("Unknown command: /bogus"));
        assert_eq!(
            text.matches("### Generated Story").count(),
            1,
            "lines after /quit are not processed"
        );
        Ok(())
    }

    #[test]
    fn language_listing_includes_none() -> anyhow::Result<()> {
        let mut out = Vec::new();
        print_languages(&LanguageRegistry::default(), &mut out)?;
        let text = output_text(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Telugu") && lines[0].ends_with("te"));
        assert!(lines[5].starts_with("none"));
        Ok(())
    }

    #[test]
    fn player_command_is_split_like_a_shell() -> anyhow::Result<()> {
        assert_eq!(
            player_argv("mpv --no-video")?,
            vec!["mpv".to_string(), "--no-video".to_string()]
        );
        assert!(player_argv("   ").is_err());
        assert!(player_argv("\"unterminated").is_err());
        Ok(())
    }
}
