use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use serde_json::Value;
use sketchwire_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use sketchwire_contracts::contract::GeneratedResult;
use sketchwire_contracts::session::{SessionPhase, SketchImage};
use sketchwire_engine::SketchEngine;

#[derive(Debug, Parser)]
#[command(name = "sketchwire", version, about = "Sketch-to-code prototyping sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: load a sketch, generate, refine, and talk to the
    /// design assistant.
    Chat(ChatArgs),
    /// One-shot: load a sketch, generate once, print a section to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value = "gemini-3-pro-preview")]
    markup_model: String,
    #[arg(long, default_value = "gemini-2.5-flash")]
    chat_model: String,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    #[arg(long)]
    sketch: PathBuf,
    #[arg(long)]
    brief: Option<String>,
    #[arg(long, default_value = "html")]
    section: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value = "gemini-3-pro-preview")]
    markup_model: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("sketchwire error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Render(args) => run_render(args),
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let events_path = args
        .events
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let mut engine = SketchEngine::new(
        &events_path,
        Some(args.markup_model),
        Some(args.chat_model),
    )?;

    let stdin = io::stdin();
    let mut line = String::new();

    println!("Sketchwire session started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        match intent.action.as_str() {
            "noop" => continue,
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
                println!("Anything else is sent to the design assistant.");
            }
            "load_sketch" => {
                let Some(path) = value_as_non_empty_string(intent.command_args.get("path")) else {
                    println!("/load requires a path");
                    continue;
                };
                match load_sketch_image(Path::new(&path)) {
                    Ok(sketch) => {
                        let label = format!(
                            "{} ({}x{}, {})",
                            sketch.source, sketch.width, sketch.height, sketch.mime_type
                        );
                        if engine.store_sketch(sketch)? {
                            println!("Loaded {label}");
                        } else {
                            println!("A call is in flight; wait for it to finish.");
                        }
                    }
                    Err(err) => println!("Load failed: {err:#}"),
                }
            }
            "generate" => {
                if engine.state().sketch().is_none() {
                    println!("Load a sketch first (/load <path>)");
                    continue;
                }
                let brief = value_as_non_empty_string(intent.command_args.get("brief"));
                println!("Analyzing sketch...");
                if engine.generate(brief.as_deref())? {
                    print_round_outcome(&engine, "Generation");
                } else {
                    println!("Generation skipped; a call is already in flight.");
                }
            }
            "refine" => {
                let Some(instruction) =
                    value_as_non_empty_string(intent.command_args.get("instruction"))
                else {
                    println!("/refine requires an instruction");
                    continue;
                };
                if engine.state().result().is_none() {
                    println!("Nothing to refine yet; run /generate first.");
                    continue;
                }
                println!("Refining...");
                if engine.refine(&instruction)? {
                    print_round_outcome(&engine, "Refinement");
                } else {
                    println!("Refinement skipped; a call is already in flight.");
                }
            }
            "show" => {
                let Some(result) = engine.state().result() else {
                    println!("No generated result yet.");
                    continue;
                };
                let section = value_as_non_empty_string(intent.command_args.get("section"))
                    .unwrap_or_else(|| "html".to_string());
                match section_text(result, &section) {
                    Ok(text) => println!("{text}"),
                    Err(err) => println!("{err:#}"),
                }
            }
            "diff" => match engine.state().rounds().last() {
                Some(round) => match round.html_diff.as_ref().filter(|lines| !lines.is_empty()) {
                    Some(lines) => {
                        for diff_line in lines {
                            println!("{diff_line}");
                        }
                    }
                    None => println!("No differences to show for round {}.", round.index),
                },
                None => println!("No rounds yet."),
            },
            "status" => print_status(&engine),
            "list_models" => {
                for model in engine.known_models() {
                    println!("{model}");
                }
            }
            "set_markup_model" => {
                match value_as_non_empty_string(intent.command_args.get("model")) {
                    Some(model) => {
                        engine.set_markup_model(Some(model.clone()));
                        println!("Markup model set to {model}");
                    }
                    None => println!(
                        "Markup model: {}",
                        engine.markup_model().unwrap_or("(default)")
                    ),
                }
            }
            "set_chat_model" => {
                match value_as_non_empty_string(intent.command_args.get("model")) {
                    Some(model) => {
                        engine.set_chat_model(Some(model.clone()));
                        println!("Chat model set to {model}");
                    }
                    None => println!("Chat model: {}", engine.chat_model().unwrap_or("(default)")),
                }
            }
            "reset" => {
                engine.reset()?;
                println!("Session reset.");
            }
            "quit" => break,
            "unknown" => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                println!("Unknown command /{command}; type /help");
            }
            "chat" => {
                if let Some(message) = intent.message.as_deref() {
                    let reply = engine.chat(message)?;
                    if !reply.is_empty() {
                        println!("{reply}");
                    }
                }
            }
            other => {
                println!("Unhandled action '{other}'");
            }
        }
    }

    engine.finish()?;
    println!("Session closed.");
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let events_path = args
        .events
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let mut engine = SketchEngine::new(&events_path, Some(args.markup_model), None)?;

    let sketch = load_sketch_image(&args.sketch)?;
    if !engine.store_sketch(sketch)? {
        bail!("could not store sketch");
    }
    engine.generate(args.brief.as_deref())?;

    let code = match engine.state().phase() {
        SessionPhase::Success => {
            let result = engine
                .state()
                .result()
                .context("success phase without a result")?;
            println!("{}", section_text(result, &args.section)?);
            0
        }
        _ => {
            eprintln!(
                "render failed: {}",
                engine.state().last_error().unwrap_or("unknown error")
            );
            1
        }
    };
    engine.finish()?;
    Ok(code)
}

fn print_round_outcome(engine: &SketchEngine, label: &str) {
    match engine.state().phase() {
        SessionPhase::Success => {
            if let Some(result) = engine.state().result() {
                println!("{label} complete (round {}).", engine.state().rounds().len());
                println!("{}", result.explanation);
                println!("Use /show html, /show react, or /show explanation to inspect.");
            }
        }
        SessionPhase::Error => {
            println!(
                "{label} failed: {}",
                engine.state().last_error().unwrap_or("unknown error")
            );
        }
        phase => println!("{label} ended in unexpected phase '{phase}'"),
    }
}

fn print_status(engine: &SketchEngine) {
    let state = engine.state();
    println!("Phase: {}", state.phase());
    match state.sketch() {
        Some(sketch) => println!(
            "Sketch: {} ({}x{}, {})",
            sketch.source, sketch.width, sketch.height, sketch.mime_type
        ),
        None => println!("Sketch: none"),
    }
    println!("Rounds: {}", state.rounds().len());
    println!(
        "Models: markup={} chat={}",
        engine.markup_model().unwrap_or("(default)"),
        engine.chat_model().unwrap_or("(default)")
    );
    if !state.refine_instruction().is_empty() {
        println!("Pending instruction: {}", state.refine_instruction());
    }
    if let Some(error) = state.last_error() {
        println!("Last error: {error}");
    }
}

fn section_text<'a>(result: &'a GeneratedResult, section: &str) -> Result<&'a str> {
    match section.trim().to_ascii_lowercase().as_str() {
        "" | "html" => Ok(&result.html),
        "react" => Ok(&result.react),
        "explanation" => Ok(&result.explanation),
        other => bail!("unknown section '{other}' (expected html, react, or explanation)"),
    }
}

fn value_as_non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Sketch intake
// ---------------------------------------------------------------------------

fn mime_for_sketch(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// File → `SketchImage`. The dimension probe doubles as a cheap check that
/// the file really is a decodable raster image before its bytes are shipped.
fn load_sketch_image(path: &Path) -> Result<SketchImage> {
    let Some(mime_type) = mime_for_sketch(path) else {
        bail!(
            "{} is not a recognized sketch image (png, jpg, jpeg, webp, gif)",
            path.display()
        );
    };
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to read image dimensions from {}", path.display()))?;
    let bytes =
        fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    Ok(SketchImage {
        source: path.to_string_lossy().to_string(),
        mime_type: mime_type.to_string(),
        width,
        height,
        payload: BASE64.encode(bytes),
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{load_sketch_image, mime_for_sketch, section_text, value_as_non_empty_string};
    use serde_json::json;
    use sketchwire_contracts::contract::GeneratedResult;

    fn result() -> GeneratedResult {
        GeneratedResult {
            html: "<p>hi</p>".to_string(),
            react: "const C=()=>null;".to_string(),
            explanation: "Done".to_string(),
        }
    }

    #[test]
    fn mime_detection_covers_recognized_extensions() {
        assert_eq!(mime_for_sketch(Path::new("a.png")), Some("image/png"));
        assert_eq!(mime_for_sketch(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_sketch(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_sketch(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_for_sketch(Path::new("a.gif")), Some("image/gif"));
        assert_eq!(mime_for_sketch(Path::new("a.pdf")), None);
        assert_eq!(mime_for_sketch(Path::new("noext")), None);
    }

    #[test]
    fn section_lookup_accepts_known_sections_only() {
        let result = result();
        assert_eq!(section_text(&result, "html").unwrap(), "<p>hi</p>");
        assert_eq!(section_text(&result, " REACT ").unwrap(), "const C=()=>null;");
        assert_eq!(section_text(&result, "explanation").unwrap(), "Done");
        assert_eq!(section_text(&result, "").unwrap(), "<p>hi</p>");
        assert!(section_text(&result, "css").is_err());
    }

    #[test]
    fn non_empty_string_extraction_trims() {
        assert_eq!(
            value_as_non_empty_string(Some(&json!("  hi  "))),
            Some("hi".to_string())
        );
        assert_eq!(value_as_non_empty_string(Some(&json!("   "))), None);
        assert_eq!(value_as_non_empty_string(Some(&json!(5))), None);
        assert_eq!(value_as_non_empty_string(None), None);
    }

    #[test]
    fn intake_encodes_a_real_png() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("sketch.png");
        let mut canvas = image::RgbImage::new(4, 3);
        for pixel in canvas.pixels_mut() {
            *pixel = image::Rgb([200, 120, 40]);
        }
        canvas.save(&path)?;

        let sketch = load_sketch_image(&path)?;
        assert_eq!(sketch.mime_type, "image/png");
        assert_eq!((sketch.width, sketch.height), (4, 3));
        assert!(!sketch.payload.is_empty());
        assert!(!sketch.payload.starts_with("data:"));
        Ok(())
    }

    #[test]
    fn intake_rejects_unrecognized_extension() {
        let err = load_sketch_image(Path::new("/tmp/sketch.txt")).unwrap_err();
        assert!(err.to_string().contains("not a recognized sketch image"));
    }
}
