// ============================================================================
// VisualType CLI — headless text removal via command-line arguments
// ============================================================================
//
// Usage examples:
//   visualtype --input photo.png --output cleaned.png
//   visualtype -i poster.jpg -o out.png --regions boxes.json
//   visualtype -i photo.png -o out.png --captions --verbose
//
// No GUI is opened in CLI mode. Detection either hits the live model (API
// key from --api-key or GEMINI_API_KEY) or reads a JSON region list from
// --regions for deterministic batch runs. The erased base plus the freshly
// created layers are composited and written as lossless PNG.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use crate::ops::ai::{DetectedRegion, GeminiClient, VisionClient};
use crate::ops::erase::erase_and_layerize;
use crate::ops::render::composite_onto;
use crate::ops::text::FontStore;
use crate::{io, log_info};

/// VisualType headless text eraser.
///
/// Detect text in an image, erase it destructively, and write the
/// re-composited result — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "visualtype",
    about = "VisualType headless automatic text eraser",
    long_about = "Detect text regions in an image, paint them out with sampled background\n\
                  color, re-draw the text as styled layers, and save the composite as PNG.\n\n\
                  Example:\n  \
                  visualtype --input photo.png --output cleaned.png\n  \
                  visualtype -i poster.jpg -o out.png --regions boxes.json"
)]
pub struct CliArgs {
    /// Input image file (PNG, JPEG, WEBP, BMP).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output PNG path.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// JSON file holding a detected-region array
    /// (objects with text/xmin/ymin/xmax/ymax in 0–1000 coordinates).
    /// When given, the live detector is not called.
    #[arg(long, value_name = "FILE.json")]
    pub regions: Option<PathBuf>,

    /// Detection model API key. Falls back to the GEMINI_API_KEY variable.
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Also request caption suggestions and print them.
    #[arg(long)]
    pub captions: bool,

    /// Print per-region and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

/// Run all CLI processing and return an OS exit code.
/// `0` = success, `1` = failure.
pub fn run(args: CliArgs) -> i32 {
    let started = Instant::now();

    let bytes = match std::fs::read(&args.input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", args.input.display(), e);
            return 1;
        }
    };

    let client = args
        .api_key
        .clone()
        .map(GeminiClient::new)
        .or_else(GeminiClient::from_env);

    let regions = match &args.regions {
        Some(path) => match load_regions_file(path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: could not load regions from '{}': {}", path.display(), e);
                return 1;
            }
        },
        None => match &client {
            Some(client) => client.detect_text(&bytes),
            None => {
                eprintln!(
                    "error: no API key configured (use --api-key or GEMINI_API_KEY) \
                     and no --regions file given."
                );
                return 1;
            }
        },
    };

    if args.verbose {
        for region in &regions {
            println!(
                "region '{}' box [{:.0}, {:.0}, {:.0}, {:.0}]",
                region.text, region.xmin, region.ymin, region.xmax, region.ymax
            );
        }
    }

    if regions.is_empty() {
        println!("no text detected; image kept unchanged.");
    }

    let outcome = erase_and_layerize(&bytes, &regions);
    log_info!("cli: erased {} region(s) from {}", outcome.layers.len(), args.input.display());

    let raster = match io::decode_image(&outcome.cleaned) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: could not decode '{}': {}", args.input.display(), e);
            return 1;
        }
    };

    let mut fonts = FontStore::new();
    let composed = composite_onto(raster, &outcome.layers, &mut fonts);
    if let Err(e) = io::write_png(&composed, &args.output) {
        eprintln!("error: could not write '{}': {}", args.output.display(), e);
        return 1;
    }

    if args.captions {
        match &client {
            Some(client) => {
                for caption in client.suggest_captions(&bytes) {
                    println!("caption: {}", caption);
                }
            }
            None => eprintln!("warning: --captions needs an API key; skipped."),
        }
    }

    if args.verbose {
        println!(
            "wrote {} ({} layer(s), {:.2}s)",
            args.output.display(),
            outcome.layers.len(),
            started.elapsed().as_secs_f32()
        );
    }
    0
}

fn load_regions_file(path: &std::path::Path) -> Result<Vec<DetectedRegion>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_file_round_trip() {
        let dir = std::env::temp_dir().join("visualtype_cli_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("regions.json");
        std::fs::write(
            &path,
            r#"[{"text":"SALE","xmin":100,"ymin":200,"xmax":300,"ymax":260}]"#,
        )
        .unwrap();
        let regions = load_regions_file(&path).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "SALE");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_regions_file_is_an_error() {
        let dir = std::env::temp_dir().join("visualtype_cli_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_regions_file(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
