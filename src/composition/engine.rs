use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    composition::{
        compositor::FrameCompositor,
        job::{
            CancelToken, ExportOutcome, ExportRequest, ExportResult, StatusSender, MSG_STARTING,
        },
        timeline::Timeline,
    },
    config::Config,
    error::{ExportError, InputSlot, MergeError, Result},
    overlay::{OverlayBitmap, OverlayLayout, OverlayRasterizer, TextParts},
    timing::{Rational, OUTPUT_FPS},
    video::{ClipDecoder, ClipInfo, EncoderSettings, FrameEncoder, FrameSize, MediaBackend},
};

/// Runs the export pipeline for one job at a time
///
/// The pipeline is strictly sequential:
/// 1. Validate - both inputs exist, the output location is writable
/// 2. Open - decoders for the first and second clip
/// 3. Timeline - the two clips end to end
/// 4. Geometry - output size from the second clip, fixed 30 fps
/// 5. Overlay - layout and rasterize the name card once
/// 6. Render - compose every output frame and push it to the encoder
/// 7. Finalize - close the encoder, or remove the partial file on failure
pub struct CompositionEngine {
    config: Config,
    rasterizer: Option<Arc<OverlayRasterizer>>,
}

impl CompositionEngine {
    /// Create an engine; the overlay font is loaded from `config` on first use
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rasterizer: None,
        }
    }

    /// Use an already loaded rasterizer instead of the configured font
    pub fn with_rasterizer(mut self, rasterizer: OverlayRasterizer) -> Self {
        self.rasterizer = Some(Arc::new(rasterizer));
        self
    }

    /// Text drawn for `request`: its own, or the configured name card
    fn text_parts<'a>(&'a self, request: &'a ExportRequest) -> &'a TextParts {
        request
            .text_parts
            .as_ref()
            .unwrap_or(&self.config.overlay.text)
    }

    /// Run one export to completion, publishing status along the way
    pub fn export(
        &self,
        request: &ExportRequest,
        backend: &dyn MediaBackend,
        cancel: &CancelToken,
        status: &StatusSender,
    ) -> ExportResult {
        status.requested();

        let result = self.run(request, backend, cancel, status);
        match &result {
            Ok(outcome) => {
                info!("🎉 Export complete! Output saved to: {:?}", outcome.output);
                status.completed(format!("Export finished: {}", outcome.output.display()));
            }
            Err(e) => {
                warn!("Export failed: {}", e);
                status.failed(e);
            }
        }
        result
    }

    fn run(
        &self,
        request: &ExportRequest,
        backend: &dyn MediaBackend,
        cancel: &CancelToken,
        status: &StatusSender,
    ) -> ExportResult {
        info!("🎬 Starting name card export");
        info!("   First:  {:?}", request.first);
        info!("   Second: {:?}", request.second);
        info!("   Output: {:?}", request.output);
        info!("   Backend: {}", backend.name());

        // Step 1: Validation
        let inputs = self.validate(request)?;
        status.running(MSG_STARTING);

        // Step 2: Open clips
        let mut decoders = self.open_clips(backend, &inputs)?;
        let infos: Vec<ClipInfo> = decoders.iter().map(|d| d.info().clone()).collect();

        // Step 3: Timeline
        let timeline = self.build_timeline(&infos)?;

        // Step 4: Geometry
        let fps = Rational::from_int(OUTPUT_FPS);
        let output_size = infos[InputSlot::Second.index()].size;
        let total_frames = timeline.total_frames(fps);
        info!("📐 Step 4: Output geometry");
        info!("      Size: {}", output_size);
        info!("      Frames: {} at {} fps", total_frames, OUTPUT_FPS);

        // Step 5: Overlay
        let overlay = self.render_overlay(output_size, self.text_parts(request))?;

        // Step 6 and 7: Render, then finalize
        let duration = timeline.total_duration();
        let compositor = FrameCompositor::new(timeline, fps, output_size, overlay);
        self.render_to_file(
            backend,
            &compositor,
            &mut decoders,
            &request.output,
            total_frames,
            cancel,
            status,
        )?;
        drop(decoders);

        let import = request.library.as_ref().map(|library| {
            library.import(&request.output).map_err(|e| {
                warn!("Library import into {:?} failed: {}", library.location(), e);
                e
            })
        });

        Ok(ExportOutcome {
            output: request.output.clone(),
            size: output_size,
            frames: total_frames,
            duration,
            import,
        })
    }

    // ==========================================
    // STEP 1: VALIDATION
    // ==========================================

    /// Check inputs and output before anything is opened or created
    fn validate(&self, request: &ExportRequest) -> Result<[PathBuf; 2]> {
        info!("🔍 Step 1: Validating request...");

        let first = Self::require_input(request.first.as_deref(), InputSlot::First)?;
        let second = Self::require_input(request.second.as_deref(), InputSlot::Second)?;
        Self::check_output_writable(&request.output)?;

        debug!("Inputs and output location are valid");
        Ok([first, second])
    }

    fn require_input(path: Option<&Path>, which: InputSlot) -> Result<PathBuf> {
        match path {
            Some(path) if path.is_file() => Ok(path.to_path_buf()),
            Some(path) => {
                warn!("The {} input {:?} does not exist", which, path);
                Err(ExportError::InputMissing { which }.into())
            }
            None => Err(ExportError::InputMissing { which }.into()),
        }
    }

    fn check_output_writable(output: &Path) -> Result<()> {
        let not_writable = || -> MergeError {
            ExportError::OutputNotWritable {
                path: output.display().to_string(),
            }
            .into()
        };

        if output.is_dir() || output.file_name().is_none() {
            return Err(not_writable());
        }

        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|_| not_writable())?;

        // Probe with a scratch file so the real output is only created by the encoder
        let probe = parent.join(format!(".name-card-merge-{}.probe", std::process::id()));
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
            .map_err(|_| not_writable())?;
        if let Err(e) = std::fs::remove_file(&probe) {
            debug!("Could not remove write probe {:?}: {}", probe, e);
        }

        Ok(())
    }

    // ==========================================
    // STEP 2: OPEN CLIPS
    // ==========================================

    fn open_clips(
        &self,
        backend: &dyn MediaBackend,
        inputs: &[PathBuf; 2],
    ) -> Result<Vec<Box<dyn ClipDecoder>>> {
        info!("📹 Step 2: Opening clips...");

        let mut decoders = Vec::with_capacity(inputs.len());
        for (index, path) in inputs.iter().enumerate() {
            let which = InputSlot::from_index(index);
            let decoder = backend.open(path).map_err(|e| ExportError::OpenFailed {
                which,
                reason: e.to_string(),
            })?;

            let info = decoder.info();
            info!(
                "      {} clip: {} ({}, {:.2}s, {:.2} fps)",
                which,
                info.file_name(),
                info.size,
                info.duration.to_f64(),
                info.fps.to_f64()
            );
            decoders.push(decoder);
        }

        Ok(decoders)
    }

    // ==========================================
    // STEP 3: TIMELINE
    // ==========================================

    fn build_timeline(&self, infos: &[ClipInfo]) -> Result<Timeline> {
        info!("⏱️  Step 3: Building timeline...");

        let timeline = Timeline::build(infos)?;
        for segment in timeline.segments() {
            debug!(
                "      Segment {}: starts at {:.3}s, lasts {:.3}s",
                segment.clip_index,
                segment.timeline_start.to_f64(),
                segment.duration.to_f64()
            );
        }
        info!("      Total duration: {:.3}s", timeline.total_duration().to_f64());

        Ok(timeline)
    }

    // ==========================================
    // STEP 5: OVERLAY
    // ==========================================

    fn render_overlay(
        &self,
        size: FrameSize,
        text_parts: &TextParts,
    ) -> Result<Arc<OverlayBitmap>> {
        info!("🔤 Step 5: Rendering name card overlay...");

        let rasterizer = match &self.rasterizer {
            Some(rasterizer) => Arc::clone(rasterizer),
            None => Arc::new(OverlayRasterizer::from_config(&self.config.overlay)?),
        };

        let layout = OverlayLayout::compute(size)?;
        let side = layout.side();
        let bitmap = rasterizer.rasterize(&layout, text_parts);

        info!("      Square: {:.0}px, text pixels: {}", side, bitmap.total_covered_pixels());
        Ok(Arc::new(bitmap))
    }

    // ==========================================
    // STEP 6 & 7: RENDER AND FINALIZE
    // ==========================================

    #[allow(clippy::too_many_arguments)]
    fn render_to_file(
        &self,
        backend: &dyn MediaBackend,
        compositor: &FrameCompositor,
        decoders: &mut [Box<dyn ClipDecoder>],
        output: &Path,
        total_frames: u64,
        cancel: &CancelToken,
        status: &StatusSender,
    ) -> Result<()> {
        info!("🎞️  Step 6: Rendering {} frames...", total_frames);

        let settings = EncoderSettings {
            size: compositor.output_size(),
            fps: OUTPUT_FPS as u32,
            codec: self.config.export.codec.clone(),
            preset: self.config.export.preset.clone(),
            quality: self.config.export.quality,
        };

        let mut encoder = match backend.create_encoder(output, &settings) {
            Ok(encoder) => encoder,
            Err(e) => {
                // The backend may have created the file before failing
                Self::remove_partial(output);
                return Err(ExportError::EncodeFailed { reason: e.to_string() }.into());
            }
        };

        let rendered = Self::render_frames(
            compositor,
            decoders,
            encoder.as_mut(),
            total_frames,
            cancel,
            status,
        );

        info!("💾 Step 7: Finalizing output...");
        let finished = match rendered {
            Ok(()) => encoder.finish().map_err(|e| {
                MergeError::from(ExportError::EncodeFailed {
                    reason: e.to_string(),
                })
            }),
            Err(e) => {
                encoder.abort();
                Err(e)
            }
        };

        if let Err(e) = finished {
            Self::remove_partial(output);
            return Err(e);
        }

        info!("   ✅ Output written:");
        info!("      File: {:?}", output);
        if let Ok(metadata) = std::fs::metadata(output) {
            info!("      Size: {:.1} MB", metadata.len() as f64 / 1024.0 / 1024.0);
        }
        Ok(())
    }

    fn render_frames(
        compositor: &FrameCompositor,
        decoders: &mut [Box<dyn ClipDecoder>],
        encoder: &mut dyn FrameEncoder,
        total_frames: u64,
        cancel: &CancelToken,
        status: &StatusSender,
    ) -> Result<()> {
        let fps = Rational::from_int(OUTPUT_FPS);
        status.progress(0, total_frames);

        for index in 0..total_frames {
            if cancel.is_cancelled() {
                info!("Export cancelled after {} frames", index);
                return Err(ExportError::Cancelled.into());
            }

            let t = Rational::frame_time(index as i64, fps);
            let frame = compositor.compose(t, decoders).map_err(|e| ExportError::DecodeFailed {
                frame_index: index,
                reason: e.to_string(),
            })?;

            encoder
                .write_frame(&frame)
                .map_err(|e| ExportError::EncodeFailed {
                    reason: e.to_string(),
                })?;

            status.progress(index + 1, total_frames);
            if (index + 1) % OUTPUT_FPS as u64 == 0 {
                debug!("Rendered {}/{} frames", index + 1, total_frames);
            }
        }

        Ok(())
    }

    fn remove_partial(output: &Path) {
        match std::fs::remove_file(output) {
            Ok(()) => debug!("Removed partial output {:?}", output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial output {:?}: {}", output, e),
        }
    }
}
