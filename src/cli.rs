// ============================================================================
// PaintCore CLI - headless batch painting via command-line arguments
// ============================================================================
//
// Usage examples:
//   PaintCore --input photo.png --script strokes.txt --output result.png
//   PaintCore -i photo.jpg -o out.bmp                  (format inferred from output ext)
//   PaintCore -i "shots/*.jpg" -s mark.txt --output-dir marked/ --format png
//   PaintCore --width 800 --height 600 -s sketch.txt -o sketch.png
//
// Each input is opened into a fresh editor sized to the image, the action
// script is replayed against it, and the result is written out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use egui::vec2;

use crate::app::PaintEditor;
use crate::io::SaveFormat;
use crate::script::{self, ScriptAction};
use crate::settings::PaintSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PaintCore headless painter.
///
/// Replays editor action scripts on image files without a window.
#[derive(Parser, Debug)]
#[command(
    name = "PaintCore",
    about = "PaintCore headless batch painter",
    long_about = "Replay drawing action scripts (tool, color, size, click, drag, text,\n\
                  undo, redo, ...) on image files and save the result. Reads and\n\
                  writes PNG, JPEG, BMP and TGA.\n\n\
                  Example:\n  \
                  PaintCore --input photo.png --script strokes.txt --output result.png\n  \
                  PaintCore -i \"*.jpg\" -s mark.txt --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    /// When omitted, a blank canvas of --width x --height is used.
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<String>,

    /// Action script replayed on every input.
    /// If omitted, images are only loaded and re-saved.
    #[arg(short, long, value_name = "ACTIONS.txt")]
    pub script: Option<PathBuf>,

    /// Output file path. Only valid for a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Blank canvas width when no input is given.
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Blank canvas height when no input is given.
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// TTF/OTF font used by the text tool.
    #[arg(long, value_name = "FONT")]
    pub font: Option<PathBuf>,

    /// Settings file (key=value) instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Print per-file timing information and echo warnings to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.verbose {
        crate::logger::set_echo(Some(crate::logger::Level::Warn));
        if let Some(path) = crate::logger::log_path() {
            println!("log: {}", path.display());
        }
    }

    let mut settings = match &args.settings {
        Some(path) => PaintSettings::load_from(path),
        None => PaintSettings::load(),
    };
    if let Some(font) = &args.font {
        settings.font_path = Some(font.clone());
    }

    let format = match args.format.as_deref() {
        Some(name) => match SaveFormat::from_name(name) {
            Some(f) => Some(f),
            None => {
                eprintln!("error: unknown output format '{}'.", name);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let actions: Vec<ScriptAction> = match &args.script {
        Some(path) => {
            let source = match std::fs::read_to_string(path) {
                Ok(src) => src,
                Err(e) => {
                    eprintln!("error: could not read script '{}': {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            match script::parse_script(&source) {
                Ok(actions) => actions,
                Err(e) => {
                    eprintln!("error: {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => Vec::new(),
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    // Blank-canvas mode
    if args.input.is_empty() {
        let Some(output) = args.output.as_deref() else {
            eprintln!("error: --output is required when no --input is given.");
            return ExitCode::FAILURE;
        };
        let start = Instant::now();
        let result = run_blank(&settings, args.width, args.height, &actions, output, format);
        return if report(result, output, start, args.verbose) { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        let result = run_one(&settings, input_path, &actions, &output_path, format);
        if !report(result, &output_path, start, args.verbose || multi) {
            any_failure = true;
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Print the outcome of one file. Returns true on success.
fn report(result: Result<(), String>, output: &Path, start: Instant, verbose: bool) -> bool {
    match result {
        Ok(()) => {
            if verbose {
                println!("  → {} ({:.0}ms)", output.display(), start.elapsed().as_secs_f64() * 1000.0);
            }
            true
        }
        Err(e) => {
            eprintln!("  error: {}", e);
            crate::log_err!("CLI: {}", e);
            false
        }
    }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

/// Open `input` into an editor whose viewport matches the image, replay the
/// actions, and save.
pub fn run_one(
    settings: &PaintSettings,
    input: &Path,
    actions: &[ScriptAction],
    output: &Path,
    format: Option<SaveFormat>,
) -> Result<(), String> {
    let (w, h) = image::image_dimensions(input).map_err(|e| format!("load failed: {}", e))?;
    let mut editor = PaintEditor::new(settings.clone());
    editor.set_viewport_size(vec2(w as f32, h as f32));
    editor.open(input).map_err(|e| format!("load failed: {}", e))?;
    finish(editor, actions, output, format)
}

/// Replay the actions on a blank `width × height` canvas and save.
pub fn run_blank(
    settings: &PaintSettings,
    width: u32,
    height: u32,
    actions: &[ScriptAction],
    output: &Path,
    format: Option<SaveFormat>,
) -> Result<(), String> {
    let settings = PaintSettings { initial_width: width, initial_height: height, ..settings.clone() };
    let editor = PaintEditor::new(settings);
    finish(editor, actions, output, format)
}

fn finish(
    mut editor: PaintEditor,
    actions: &[ScriptAction],
    output: &Path,
    format: Option<SaveFormat>,
) -> Result<(), String> {
    script::run_actions(&mut editor, actions.to_vec()).map_err(|e| format!("script error: {}", e))?;
    editor.save(output, format).map_err(|e| format!("save failed: {}", e))?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand the `--input` arguments into an ordered list of files.
///
/// An argument naming an existing file is taken as-is. Anything else is a
/// glob; its matches are sorted and only files with a PNG, JPEG, BMP or TGA
/// extension are kept. A file named twice is processed once.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let literal = PathBuf::from(pattern);
        let candidates = if literal.is_file() {
            vec![literal]
        } else {
            match glob::glob(pattern) {
                Ok(paths) => {
                    let mut matched: Vec<PathBuf> = paths
                        .flatten()
                        .filter(|p| p.is_file() && SaveFormat::from_path(p).is_some())
                        .collect();
                    matched.sort();
                    matched
                }
                Err(e) => {
                    eprintln!("warning: invalid glob '{}': {}", pattern, e);
                    crate::log_warn!("CLI: invalid glob '{}': {}", pattern, e);
                    continue;
                }
            }
        };

        if candidates.is_empty() {
            eprintln!("warning: '{}' matched no image files.", pattern);
        }
        files.extend(candidates.into_iter().filter(|p| seen.insert(p.clone())));
    }

    files
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input with an `_out` suffix
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: Option<SaveFormat>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format
        .or_else(|| SaveFormat::from_path(input))
        .unwrap_or_default()
        .extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_out.{}", stem, ext)))
}
