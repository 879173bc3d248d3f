//! Camera scanner: render path plus background decoding
//!
//! Owns the frame loop, the decode worker and the shared result cell, and
//! runs the teardown sequence in a fixed order: stop and join the worker,
//! then release render resources.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::capture::FrameSource;
use crate::decode::{Decoder, Symbology};
use crate::error::{Error, Result};
use crate::pipeline::{frame_slot, DecodeWorker, FrameLoop, LatestResult, TickOutcome};
use crate::render::{
    DisplayTarget, GraphicsBackend, Phase, RenderMode, RenderState, TextureHandle, Viewport,
};
use crate::{Config, PipelineStats};

pub struct CameraScanner<S: FrameSource, B: GraphicsBackend> {
    frame_loop: FrameLoop<S, B>,
    worker: DecodeWorker,
    results: Arc<LatestResult>,
    shut_down: bool,
}

impl<S: FrameSource, B: GraphicsBackend> CameraScanner<S, B> {
    /// Spawn the decode worker and prepare the render path
    #[instrument(skip_all)]
    pub fn start<D>(source: S, backend: B, decoder: D, config: &Config) -> Result<Self>
    where
        D: Decoder + 'static,
    {
        let (producer, consumer) = frame_slot();
        let results = Arc::new(LatestResult::new());
        let worker = DecodeWorker::start(consumer, decoder, results.clone(), &config.decode)?;
        let render = RenderState::new(backend, &config.render);

        info!(
            "Scanner started, decoding {:?}",
            config.decode.options.formats
        );
        Ok(Self {
            frame_loop: FrameLoop::new(source, render, producer),
            worker,
            results,
            shut_down: false,
        })
    }

    /// Drive one display tick. Refused once render resources are released,
    /// even if the worker has not stopped yet.
    pub fn tick(&mut self, viewport: &Viewport) -> Result<TickOutcome> {
        if self.shut_down || self.frame_loop.render().phase() == Phase::Disposed {
            return Err(Error::Disposed);
        }
        self.frame_loop.tick(viewport)
    }

    /// Text of the last successful decode
    pub fn decoded_text(&self) -> Option<String> {
        self.results.decoded_text()
    }

    /// Symbology of the last successful decode
    pub fn decoded_format(&self) -> Option<Symbology> {
        self.results.decoded_format()
    }

    /// Shared result cell, for readers on other threads
    pub fn results(&self) -> Arc<LatestResult> {
        self.results.clone()
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> Result<()> {
        self.frame_loop.render_mut().set_render_mode(mode)
    }

    /// Switch display target and resize the off-screen target right away
    pub fn set_display_target(
        &mut self,
        target: DisplayTarget,
        viewport: &Viewport,
    ) -> Result<Option<TextureHandle>> {
        let render = self.frame_loop.render_mut();
        render.set_display_target(target)?;
        render.ensure_target_texture(viewport)
    }

    pub fn render(&self) -> &RenderState<B> {
        self.frame_loop.render()
    }

    pub fn source_mut(&mut self) -> &mut S {
        self.frame_loop.source_mut()
    }

    pub fn is_decoding(&self) -> bool {
        self.worker.is_running()
    }

    pub fn stats(&self) -> PipelineStats {
        let slot = self.frame_loop.slot_stats();
        PipelineStats {
            frames_rendered: self.frame_loop.rendered(),
            frames_missing: self.frame_loop.missing(),
            frames_published: slot.published,
            frames_dropped: slot.dropped,
            frames_decoded: slot.taken,
            results_published: self.results.generation(),
        }
    }

    /// Stop the worker, then dispose render resources.
    ///
    /// Render resources are released even if the worker misses its shutdown
    /// bound; the timeout is returned and the call may be repeated.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }

        let stopped = self.worker.stop();
        let render = self.frame_loop.render_mut();
        if render.phase() != Phase::Disposed {
            render.dispose();
        }

        stopped?;
        self.shut_down = true;
        info!("Scanner shut down");
        Ok(())
    }
}

impl<S: FrameSource, B: GraphicsBackend> Drop for CameraScanner<S, B> {
    fn drop(&mut self) {
        if !self.shut_down {
            let _ = self.shutdown();
        }
    }
}
