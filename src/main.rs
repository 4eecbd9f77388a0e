//! Headless driver: replay scripted strokes onto a canvas and export a PNG.
//!
//!   tuval --output out.png --stroke 10,10:200,120 --stroke 30,300:400,300
//!   tuval -i photo.jpg --preset 1024x576 --color ff0000 --radius 12 \
//!       --stroke 100,100:900,100 -o marked.png

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tuval::config::{CanvasConfig, CanvasPreset, EngineConfig};
use tuval::editor::{Editor, Response};
use tuval::input::PointerEvent;
use tuval::raster::Rgba;
use tuval::transform::ElementBounds;
use tuval::{CanvasResult, io};

/// Draw on a blank or opened canvas without a window.
#[derive(Parser, Debug)]
#[command(name = "tuval", about = "Headless canvas replay and PNG export")]
struct CliArgs {
    /// Canvas size, e.g. "1024x1024" or "wide1024x576".
    #[arg(short, long, default_value = "1024x1024", value_parser = parse_preset)]
    preset: CanvasPreset,

    /// Image placed centred on the canvas before any stroke.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Brush stroke in raster pixels; repeatable.
    #[arg(short, long, value_name = "X0,Y0:X1,Y1", value_parser = parse_stroke)]
    stroke: Vec<Stroke>,

    /// Brush radius in pixels (1-100).
    #[arg(short, long, default_value_t = 6.0)]
    radius: f32,

    /// Brush colour as RRGGBB.
    #[arg(short, long, default_value = "000000", value_parser = parse_color)]
    color: Rgba,

    /// Where to write the flattened PNG.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Clone, Copy, Debug)]
struct Stroke {
    from: (f64, f64),
    to: (f64, f64),
}

fn parse_preset(s: &str) -> Result<CanvasPreset, String> {
    CanvasPreset::parse(s).map_err(|e| e.to_string())
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y {y:?}: {e}"))?;
    Ok((x, y))
}

fn parse_stroke(s: &str) -> Result<Stroke, String> {
    let (from, to) = s.split_once(':').ok_or_else(|| format!("expected X0,Y0:X1,Y1, got {s:?}"))?;
    Ok(Stroke { from: parse_point(from)?, to: parse_point(to)? })
}

fn parse_color(s: &str) -> Result<Rgba, String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got {s:?}"));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("bad colour {s:?}: {e}"));
    Ok([channel(0)?, channel(2)?, channel(4)?, 255])
}

fn run(args: &CliArgs) -> CanvasResult<()> {
    let config = EngineConfig {
        preset: args.preset,
        brush_color: args.color,
        brush_radius: args.radius,
        ..EngineConfig::default()
    };
    let size = CanvasConfig::from(config.preset);
    let mut editor = Editor::new(config);
    editor.initialize();
    // One CSS pixel per raster pixel.
    editor.set_layout(ElementBounds::new(0.0, 0.0, f64::from(size.width), f64::from(size.height)));

    if let Some(path) = &args.input {
        let bytes = io::read_image(path)?;
        editor.open_image(&bytes)?;
    }

    for stroke in &args.stroke {
        editor.pointer_down(PointerEvent::primary(stroke.from.0, stroke.from.1));
        editor.pointer_move(PointerEvent::primary(stroke.to.0, stroke.to.1));
        if editor.pointer_up(PointerEvent::primary(stroke.to.0, stroke.to.1)) != Response::Committed {
            log::warn!("stroke {stroke:?} was not applied");
        }
    }

    editor.export_png(&args.output)
}

fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tuval: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_stroke_and_colour() {
        let stroke = parse_stroke("10,20:30.5,40").unwrap();
        assert_eq!(stroke.from, (10.0, 20.0));
        assert_eq!(stroke.to, (30.5, 40.0));
        assert!(parse_stroke("10,20").is_err());
        assert_eq!(parse_color("#ff8000").unwrap(), [255, 128, 0, 255]);
        assert!(parse_color("fff").is_err());
        assert!(parse_color("gg0000").is_err());
    }

    #[test]
    fn test_cli_replays_strokes_into_png() {
        let out = std::env::temp_dir().join(format!("tuval_cli_{}.png", std::process::id()));
        let args = CliArgs::parse_from([
            "tuval",
            "--preset",
            "512x512",
            "--stroke",
            "10,10:100,10",
            "--color",
            "ff0000",
            "--output",
            out.to_str().unwrap(),
        ]);
        run(&args).unwrap();
        let raster = io::decode_image(&io::read_image(&out).unwrap()).unwrap();
        assert_eq!(raster.size(), (512, 512));
        assert_eq!(raster.get_pixel(50, 10), Some([255, 0, 0, 255]));
        let _ = std::fs::remove_file(&out);
    }
}
