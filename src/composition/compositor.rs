use std::sync::Arc;

use image::imageops::FilterType;
use rayon::prelude::*;
use tracing::debug;

use crate::composition::timeline::Timeline;
use crate::error::{Result, VideoError};
use crate::overlay::OverlayBitmap;
use crate::timing::Rational;
use crate::video::backend::ClipDecoder;
use crate::video::types::{Frame, FrameSize};

/// Builds each output frame from the timeline, the source clips and the overlay
pub struct FrameCompositor {
    timeline: Timeline,
    fps: Rational,
    output_size: FrameSize,
    overlay: Arc<OverlayBitmap>,
}

impl FrameCompositor {
    pub fn new(
        timeline: Timeline,
        fps: Rational,
        output_size: FrameSize,
        overlay: Arc<OverlayBitmap>,
    ) -> Self {
        Self {
            timeline,
            fps,
            output_size,
            overlay,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn output_size(&self) -> FrameSize {
        self.output_size
    }

    /// Render the output frame shown at `t_out`
    ///
    /// `decoders` is indexed by the segments' clip index.
    pub fn compose(&self, t_out: Rational, decoders: &mut [Box<dyn ClipDecoder>]) -> Result<Frame> {
        let (index, t_local) = self.timeline.source_at(t_out, self.fps)?;
        let segment = &self.timeline.segments()[index];

        let decoder = decoders
            .get_mut(segment.clip_index)
            .ok_or_else(|| VideoError::FrameProcessingFailed {
                reason: format!("No decoder for clip {}", segment.clip_index),
            })?;

        let source = decoder.frame_at(t_local)?;
        let mut frame = self.fit_to_output(source);
        blend_overlay(&mut frame, &self.overlay);
        Ok(frame)
    }

    /// Bilinear scale to the output size when the source differs
    fn fit_to_output(&self, source: Frame) -> Frame {
        if source.size() == self.output_size {
            return source;
        }

        debug!("Scaling {} source frame to {}", source.size(), self.output_size);
        Frame::new(image::imageops::resize(
            source.as_image(),
            self.output_size.width,
            self.output_size.height,
            FilterType::Triangle,
        ))
    }
}

/// Alpha-blend `overlay` over `frame` in place, leaving every pixel opaque
///
/// Frames of a different size than the overlay are left untouched.
pub fn blend_overlay(frame: &mut Frame, overlay: &OverlayBitmap) {
    let size = frame.size();
    if size != overlay.size() || size.is_empty() {
        return;
    }

    let row_len = size.width as usize * 4;
    let over = overlay.as_frame().as_rgba_bytes();

    frame
        .as_image_mut()
        .par_chunks_mut(row_len)
        .zip(over.par_chunks(row_len))
        .for_each(|(dst_row, over_row)| {
            for (dst, src) in dst_row.chunks_exact_mut(4).zip(over_row.chunks_exact(4)) {
                let alpha = src[3] as u32;
                if alpha != 0 {
                    let inv = 255 - alpha;
                    for c in 0..3 {
                        dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * inv + 127) / 255) as u8;
                    }
                }
                dst[3] = 255;
            }
        });
}
