// Render the name card for a given frame size to a PNG, for checking layout and fonts

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use name_card_merge::{
    composition::blend_overlay,
    config::Config,
    overlay::{OverlayLayout, OverlayRasterizer},
    video::{Frame, FrameSize},
};

#[derive(Parser)]
#[command(name = "overlay_preview", about = "Render the name card overlay to a PNG")]
struct Args {
    /// Frame width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// PNG file to write
    #[arg(short, long, default_value = "overlay_preview.png")]
    output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the background transparent instead of dark grey
    #[arg(long)]
    transparent: bool,

    /// Also outline every text box
    #[arg(long)]
    boxes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let size = FrameSize::new(args.width, args.height);
    let layout = OverlayLayout::compute(size)?;
    let rasterizer = OverlayRasterizer::from_config(&config.overlay)?;
    let bitmap = rasterizer.rasterize(&layout, &config.overlay.text);

    let mut frame = if args.transparent {
        bitmap.as_frame().clone()
    } else {
        let mut background = Frame::new_filled(size.width, size.height, [40, 40, 40, 255]);
        blend_overlay(&mut background, &bitmap);
        background
    };

    if args.boxes {
        for text_box in layout.boxes() {
            let bounds = text_box.rect.pixel_bounds(size);
            if bounds.is_empty() {
                continue;
            }
            for x in bounds.x0..bounds.x1 {
                frame.set_pixel(x, bounds.y0, [255, 0, 255, 255]);
                frame.set_pixel(x, bounds.y1 - 1, [255, 0, 255, 255]);
            }
            for y in bounds.y0..bounds.y1 {
                frame.set_pixel(bounds.x0, y, [255, 0, 255, 255]);
                frame.set_pixel(bounds.x1 - 1, y, [255, 0, 255, 255]);
            }
        }
    }

    frame.save_png(&args.output)?;
    info!(
        "Overlay for {} written to {:?} (square {:.0}px, {} text pixels)",
        size,
        args.output,
        layout.side(),
        bitmap.total_covered_pixels()
    );
    Ok(())
}
