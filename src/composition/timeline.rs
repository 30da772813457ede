//! Ordered segments of the merged video.

use crate::error::{Result, TimelineError};
use crate::timing::Rational;
use crate::video::types::ClipInfo;

/// A contiguous piece of one source clip placed on the output timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Index of the source clip
    pub clip_index: usize,

    /// Offset into the source clip where the segment begins
    pub source_in: Rational,

    /// Length of the segment
    pub duration: Rational,

    /// Output time at which the segment begins
    pub timeline_start: Rational,
}

impl Segment {
    /// Output time at which the segment ends (exclusive)
    pub fn timeline_end(&self) -> Rational {
        self.timeline_start + self.duration
    }
}

/// Segments laid end to end with no gaps and no overlaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<Segment>,
    total_duration: Rational,
}

impl Timeline {
    /// One full-length segment per clip, in the given order
    pub fn build(clips: &[ClipInfo]) -> Result<Self> {
        if clips.is_empty() {
            return Err(TimelineError::Empty.into());
        }

        let mut segments = Vec::with_capacity(clips.len());
        let mut cursor = Rational::zero();

        for (index, clip) in clips.iter().enumerate() {
            if clip.duration.is_zero() || clip.duration.is_negative() {
                return Err(TimelineError::EmptySegment { index }.into());
            }

            segments.push(Segment {
                clip_index: index,
                source_in: Rational::zero(),
                duration: clip.duration,
                timeline_start: cursor,
            });
            cursor = cursor
                .checked_add(clip.duration)
                .ok_or(TimelineError::Overflow { index })?;
        }

        Ok(Self {
            segments,
            total_duration: cursor,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_duration(&self) -> Rational {
        self.total_duration
    }

    /// Number of output frames at `fps`
    pub fn total_frames(&self, fps: Rational) -> u64 {
        self.total_duration.frames_at(fps).max(0) as u64
    }

    /// Resolve an output time to `(segment index, time local to the segment)`
    ///
    /// Boundaries belong to the later segment.
    pub fn map(&self, t_out: Rational) -> Result<(usize, Rational)> {
        if t_out.is_negative() || t_out >= self.total_duration {
            return Err(TimelineError::OutOfRange {
                time: t_out.to_string(),
                total: self.total_duration.to_string(),
            }
            .into());
        }

        let index = self
            .segments
            .partition_point(|segment| segment.timeline_start <= t_out)
            .saturating_sub(1);
        let segment = &self.segments[index];
        Ok((index, segment.source_in + (t_out - segment.timeline_start)))
    }

    /// Like [`map`](Self::map), but a segment that is not the last one hands
    /// over to its successor for every time strictly after its final frame
    /// slot `end - 1/fps`
    pub fn source_at(&self, t_out: Rational, fps: Rational) -> Result<(usize, Rational)> {
        let (index, local) = self.map(t_out)?;

        if let Some(next) = self.segments.get(index + 1) {
            let last_slot = next
                .timeline_start
                .checked_sub(fps.recip())
                .ok_or(TimelineError::Overflow { index })?;
            if t_out > last_slot {
                let local = (t_out - next.timeline_start).max(Rational::zero());
                return Ok((index + 1, next.source_in + local));
            }
        }

        Ok((index, local))
    }

    /// Segment shown by output frame `frame_index`
    pub fn segment_at_frame(&self, frame_index: u64, fps: Rational) -> Result<usize> {
        let t = Rational::frame_time(frame_index as i64, fps);
        self.source_at(t, fps).map(|(index, _)| index)
    }

    /// First output frame that shows segment `index`
    pub fn first_frame_of(&self, index: usize, fps: Rational) -> Option<u64> {
        if index >= self.segments.len() {
            return None;
        }
        if index == 0 {
            return Some(0);
        }

        // Smallest i with i/fps > end - 1/fps, i.e. floor(end * fps)
        let end = self.segments[index - 1].timeline_end();
        Some((end * fps).floor().max(0) as u64)
    }
}
