// ============================================================================
// RasterVeil CLI — headless transparency masking via command-line arguments
// ============================================================================
//
// Usage examples:
//   rasterveil --input dem.png --keep 10:240 --output masked.png
//   rasterveil -i tile.tif -k 100:4000 -o out.png
//   rasterveil -i "tiles/*.png" --keep 1:254 --output-dir masked/
//
// No GUI is opened in CLI mode. The same range controller that drives the
// dock panel clamps the requested range against each file's value domain.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use crate::components::transparency::TransparencyPanel;
use crate::host::PrefStore;
use crate::io::{load_raster, save_png};

/// RasterVeil headless masker.
///
/// Mark a pixel-value range as opaque and write the result as PNG with
/// everything outside the range fully transparent — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "rasterveil",
    about = "RasterVeil headless raster transparency masker",
    long_about = "Apply a pixel-value transparency range to raster files without\n\
                  opening the GUI. Supports PNG, JPEG, BMP, and TIFF input;\n\
                  output is always PNG (the only listed format with alpha).\n\n\
                  Example:\n  \
                  rasterveil --input dem.png --keep 10:240 --output masked.png\n  \
                  rasterveil -i \"tiles/*.tif\" --keep 1:254 --output-dir masked/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "tiles/*.tif").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Opaque pixel-value range "START:END". Values outside it become fully
    /// transparent. Endpoints are clamped to each file's value domain.
    /// When omitted, nothing is masked (useful for format conversion).
    #[arg(short, long, value_name = "START:END")]
    pub keep: Option<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and a .png extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the per-file value domain, clamped range, and timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// The CLI never touches the on-disk preference store.
struct NoPrefs;

impl PrefStore for NoPrefs {
    fn get_bool(&self, _key: &str, default: bool) -> bool {
        default
    }

    fn set_bool(&mut self, _key: &str, _value: bool) {}
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> i32 {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return 1;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return 1;
    }

    let keep = match args.keep.as_deref().map(parse_keep).transpose() {
        Ok(range) => range,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return 1;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, keep, args.verbose) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { 1 } else { 0 }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    keep: Option<(i32, i32)>,
    verbose: bool,
) -> Result<(), String> {
    let mut layer = load_raster(input)?;
    let (min_val, max_val) = layer.value_domain();

    if let Some((start, end)) = keep {
        // Drive the same controller the dock panel uses so clamping and
        // record generation cannot diverge between GUI and CLI.
        let mut panel = TransparencyPanel::new(&NoPrefs);
        panel.update_bounds(max_val, min_val);
        if max_val <= min_val {
            return Err(format!(
                "'{}' has a flat value domain ({}); nothing to mask",
                input.display(),
                min_val
            ));
        }
        panel.set_end(end);
        panel.set_start(start);
        if verbose {
            println!(
                "  domain {}..{}, keeping {}..{}",
                min_val,
                max_val,
                panel.start(),
                panel.end()
            );
        }
        layer.set_transparency(panel.transparency_list());
        layer.invalidate();
    } else if verbose {
        println!("  domain {}..{}, no --keep range (pass-through)", min_val, max_val);
    }

    save_png(layer.composite(), output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse "START:END" into an ordered integer pair.
fn parse_keep(arg: &str) -> Result<(i32, i32), String> {
    let Some((lo, hi)) = arg.split_once(':') else {
        return Err(format!("--keep expects START:END, got '{}'", arg));
    };
    let start: i32 = lo
        .trim()
        .parse()
        .map_err(|_| format!("--keep start '{}' is not an integer", lo.trim()))?;
    let end: i32 = hi
        .trim()
        .parse()
        .map_err(|_| format!("--keep end '{}' is not an integer", hi.trim()))?;
    if start >= end {
        return Err(format!("--keep range {}:{} is empty or inverted", start, end));
    }
    Ok((start, end))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, `.png` extension
///    (appends `_masked` to the stem if it would collide with the input)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.png", stem));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_masked.png", stem)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_range_parses() {
        assert_eq!(parse_keep("10:240").unwrap(), (10, 240));
        assert_eq!(parse_keep(" -5 : 12 ").unwrap(), (-5, 12));
    }

    #[test]
    fn keep_range_rejects_garbage() {
        assert!(parse_keep("10").is_err());
        assert!(parse_keep("a:b").is_err());
        assert!(parse_keep("240:10").is_err());
        assert!(parse_keep("7:7").is_err());
    }

    #[test]
    fn output_path_prefers_explicit_then_dir() {
        let input = Path::new("tiles/dem.tif");
        assert_eq!(
            build_output_path(input, Some(Path::new("out.png")), None).unwrap(),
            PathBuf::from("out.png")
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("masked"))).unwrap(),
            PathBuf::from("masked/dem.png")
        );
        assert_eq!(
            build_output_path(input, None, None).unwrap(),
            PathBuf::from("tiles/dem.png")
        );
    }

    #[test]
    fn output_path_never_overwrites_input() {
        let input = Path::new("dem.png");
        assert_eq!(
            build_output_path(input, None, None).unwrap(),
            PathBuf::from("dem_masked.png")
        );
    }
}
