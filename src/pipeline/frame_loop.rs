//! Per-tick driver
//!
//! Runs on the host's frame callback: pulls the frame for this tick, keeps the
//! render state in step with it and offers a copy of its pixels to the
//! decode worker. Never blocks on the worker.

use std::time::Instant;

use tracing::{instrument, trace, warn};

use super::slot::{PendingFrame, SlotProducer, SlotStats};
use crate::capture::{Frame, FrameSource};
use crate::error::{Error, Result};
use crate::render::{GraphicsBackend, MaterialKey, RenderState, Viewport};

/// What one successful tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub sequence: u64,
    /// The material changed and the command list was rebuilt
    pub rebuilt: bool,
    /// The off-screen target was reallocated
    pub resized: bool,
    /// The frame was handed to the decode worker
    pub published: bool,
}

pub struct FrameLoop<S, B: GraphicsBackend> {
    source: S,
    render: RenderState<B>,
    producer: SlotProducer,
    rendered: u64,
    missing: u64,
}

impl<S: FrameSource, B: GraphicsBackend> FrameLoop<S, B> {
    pub fn new(source: S, render: RenderState<B>, producer: SlotProducer) -> Self {
        Self {
            source,
            render,
            producer,
            rendered: 0,
            missing: 0,
        }
    }

    /// Process the frame for this tick.
    ///
    /// `NoFrameAvailable` and allocation failures are per-tick and may be
    /// ignored by the caller. A frame whose render update failed is still
    /// offered to the decoder.
    #[instrument(skip_all)]
    pub fn tick(&mut self, viewport: &Viewport) -> Result<TickOutcome> {
        let started = Instant::now();
        let Some(frame) = self.source.next_frame() else {
            self.missing += 1;
            metrics::counter!("argus_frames_missing").increment(1);
            trace!("No frame this tick");
            return Err(Error::NoFrameAvailable);
        };

        let render = self.update_render(&frame, viewport);

        let meta = frame.meta.clone();
        let published = match frame.packed_data() {
            Ok(pixels) => self.producer.try_publish_with(|| {
                PendingFrame::copy_from(
                    &pixels,
                    meta.width,
                    meta.height,
                    meta.format,
                    meta.sequence,
                )
            }),
            Err(e) => {
                warn!("Frame {} not offered for decoding: {}", meta.sequence, e);
                false
            }
        };
        metrics::histogram!("argus_frame_age_us")
            .record(frame.timestamp.elapsed().as_micros() as f64);

        self.source.release(frame);
        metrics::histogram!("argus_tick_time_us").record(started.elapsed().as_micros() as f64);

        let (rebuilt, resized) = render?;
        self.rendered += 1;
        Ok(TickOutcome {
            sequence: meta.sequence,
            rebuilt,
            resized,
            published,
        })
    }

    /// Material, projection and target size, in that order. Each step runs
    /// even if an earlier one failed; the first error is reported.
    fn update_render(&mut self, frame: &Frame, viewport: &Viewport) -> Result<(bool, bool)> {
        let material = self
            .render
            .on_frame_material_changed(MaterialKey::for_frame(&frame.meta));
        let projection = self.render.update_projection(&frame.projection);

        let before = self.render.target_texture();
        let target = self.render.ensure_target_texture(viewport);

        let rebuilt = material?;
        projection?;
        let resized = target?.is_some() && self.render.target_texture() != before;
        Ok((rebuilt, resized))
    }

    pub fn render(&self) -> &RenderState<B> {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut RenderState<B> {
        &mut self.render
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Ticks that rendered a frame
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Ticks without a frame
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.producer.stats()
    }
}
