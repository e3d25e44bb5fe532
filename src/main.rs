//! formcoach — CLI entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Resolve effective log level (CLI `-v` flags > env > config)
//!   5. Init logger once
//!   6. Build the GenAI provider and coach service
//!   7. Dispatch one command (`chat` runs an interactive loop)

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use formcoach::coach::{ChatSession, CoachService, UserProfile};
use formcoach::config;
use formcoach::error::AppError;
use formcoach::genai::{self, MediaBlob};
use formcoach::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref().map(Path::new))?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level)?;

    info!(
        app_name = %config.app_name,
        provider = %config.genai.provider,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let provider = genai::build(&config.genai, config.genai_api_key.clone())?;
    let svc = CoachService::new(provider);

    match args.command {
        Command::Scan { video } => {
            let blob = read_media(&video)?;
            let scan = svc.scan_equipment(blob, print_retry).await?;
            println!("Equipment:");
            for item in &scan.equipment {
                match &item.notes {
                    Some(n) => println!("  - {} ({n})", item.name),
                    None => println!("  - {}", item.name),
                }
            }
            println!("\nSuggested exercises:");
            for s in &scan.suggestions {
                println!("  - {} [{}] — {}", s.name, s.target_muscles.join(", "), s.summary);
            }
        }
        Command::Plan { goal } => {
            let profile = UserProfile {
                goal,
                experience: config.coach.experience.clone(),
                days_per_week: config.coach.days_per_week,
                session_minutes: config.coach.session_minutes,
                available_equipment: Vec::new(),
                constraints: None,
            };
            let plan = svc.workout_plan(&profile, print_retry).await?;
            println!("{}", plan.markdown);
        }
        Command::Pose { photo, exercise } => {
            let blob = read_media(&photo)?;
            let feedback = svc.pose_feedback(blob, &exercise, print_retry).await?;
            println!("{feedback}");
        }
        Command::Ask { question } => {
            let answer = svc.ask(&question, print_retry).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for s in &answer.sources {
                    println!("  - {} <{}>", s.title, s.url);
                }
            }
        }
        Command::Edit { image, output, instruction } => {
            let blob = read_media(&image)?;
            let edited = svc.edit_image(blob, &instruction, print_retry).await?;
            std::fs::write(&output, &edited.data)?;
            println!("wrote {} ({}, {} bytes)", output, edited.mime_type, edited.data.len());
        }
        Command::Demo { exercise } => {
            let url = svc.demo_video(&exercise, print_retry).await?;
            println!("{url}");
        }
        Command::Chat => run_chat(&svc).await?,
    }

    Ok(())
}

/// Retry-progress observer — status goes to stderr so piped stdout stays clean.
fn print_retry(attempt: u32, max_attempts: u32) {
    eprintln!("The AI service is busy — retrying (attempt {attempt}/{max_attempts})…");
}

/// Interactive chat loop on stdin; `/quit` or EOF ends the session.
async fn run_chat(svc: &CoachService) -> Result<(), AppError> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Chat with your coach. /quit to exit.");
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if !line.is_empty() {
            match svc.chat(&mut session, line, print_retry).await {
                Ok(reply) => println!("{reply}\n"),
                // Chat errors are shown, not fatal — the session continues.
                Err(e) => eprintln!("error: {e}"),
            }
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Read a media file and tag it with a MIME type guessed from its extension.
fn read_media(path: &str) -> Result<MediaBlob, AppError> {
    let data = std::fs::read(path)?;
    let mime_type = guess_mime(path).to_string();
    Ok(MediaBlob { mime_type, data })
}

fn guess_mime(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

enum Command {
    Scan { video: String },
    Plan { goal: String },
    Pose { photo: String, exercise: String },
    Ask { question: String },
    Edit { image: String, output: String, instruction: String },
    Demo { exercise: String },
    Chat,
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    command: Command,
}

fn print_help() {
    println!("Usage: formcoach [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  scan <video>                      Identify gym equipment and suggest exercises");
    println!("  plan <goal...>                    Generate a weekly workout plan");
    println!("  pose <photo> <exercise...>        Get form feedback on an exercise photo");
    println!("  ask <question...>                 Ask a grounded fitness question");
    println!("  edit <image> <out> <text...>      Edit an image by instruction, write to <out>");
    println!("  demo <exercise...>                Generate (or fetch cached) demo video URL");
    println!("  chat                              Interactive chat with the coach");
    println!();
    println!("Options:");
    println!("  -h, --help                 Print help");
    println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
    println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => positional.push(arg),
        }
    }

    let command = parse_command(&positional).unwrap_or_else(|msg| {
        eprintln!("error: {msg}");
        eprintln!("run `formcoach --help` for usage");
        std::process::exit(1);
    });

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug
    //   -vvvv+  → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path, command }
}

fn parse_command(positional: &[String]) -> Result<Command, String> {
    let Some((name, rest)) = positional.split_first() else {
        return Err("missing command".into());
    };
    match name.as_str() {
        "scan" => match rest {
            [video] => Ok(Command::Scan { video: video.clone() }),
            _ => Err("scan takes exactly one video file".into()),
        },
        "plan" => {
            if rest.is_empty() {
                Err("plan requires a goal".into())
            } else {
                Ok(Command::Plan { goal: rest.join(" ") })
            }
        }
        "pose" => match rest {
            [photo, exercise @ ..] if !exercise.is_empty() => Ok(Command::Pose {
                photo: photo.clone(),
                exercise: exercise.join(" "),
            }),
            _ => Err("pose requires a photo file and an exercise name".into()),
        },
        "ask" => {
            if rest.is_empty() {
                Err("ask requires a question".into())
            } else {
                Ok(Command::Ask { question: rest.join(" ") })
            }
        }
        "edit" => match rest {
            [image, output, instruction @ ..] if !instruction.is_empty() => Ok(Command::Edit {
                image: image.clone(),
                output: output.clone(),
                instruction: instruction.join(" "),
            }),
            _ => Err("edit requires an image file, an output path, and an instruction".into()),
        },
        "demo" => {
            if rest.is_empty() {
                Err("demo requires an exercise name".into())
            } else {
                Ok(Command::Demo { exercise: rest.join(" ") })
            }
        }
        "chat" => Ok(Command::Chat),
        other => Err(format!("unknown command: {other}")),
    }
}
