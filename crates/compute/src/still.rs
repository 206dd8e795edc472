use crate::{ComputeError, ComputeSource, InputState, RenderResolution};

/// In-process source serving a buffer generated by a per-pixel fill
/// function. By default the buffer is produced once per `initialize` and
/// streamed unchanged; with [`StillSource::refresh_every`] the fill is
/// re-run whenever the given interval elapses, covering deployments whose
/// content is refreshed on a slow clock rather than computed per frame.
/// Also doubles as the synthetic module the renderer tests stream from.
pub struct StillSource {
    fill: Box<dyn FnMut(u32, u32) -> [u8; 4] + Send>,
    buffer: Vec<u8>,
    resolution: Option<RenderResolution>,
    refresh_every_ms: Option<f64>,
    last_refresh_ms: f64,
}

impl StillSource {
    /// A source that fills every pixel with one RGBA colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::from_fn(move |_, _| rgba)
    }

    /// A source whose buffer is produced by a per-pixel function of
    /// `(column, row)`, evaluated once per `initialize` (and on refresh,
    /// if a refresh interval is set).
    pub fn from_fn(fill: impl FnMut(u32, u32) -> [u8; 4] + Send + 'static) -> Self {
        Self {
            fill: Box::new(fill),
            buffer: Vec::new(),
            resolution: None,
            refresh_every_ms: None,
            last_refresh_ms: 0.0,
        }
    }

    /// Re-runs the fill whenever `interval_ms` has elapsed since the last
    /// regeneration. Non-positive intervals leave the source static.
    pub fn refresh_every(mut self, interval_ms: f64) -> Self {
        self.refresh_every_ms = if interval_ms.is_finite() && interval_ms > 0.0 {
            Some(interval_ms)
        } else {
            None
        };
        self
    }

    fn regenerate(&mut self, resolution: RenderResolution) {
        let mut buffer = Vec::with_capacity(resolution.byte_len());
        for row in 0..resolution.height() {
            for column in 0..resolution.width() {
                buffer.extend_from_slice(&(self.fill)(column, row));
            }
        }
        self.buffer = buffer;
    }
}

impl ComputeSource for StillSource {
    fn initialize(&mut self, resolution: RenderResolution) -> Result<(), ComputeError> {
        self.regenerate(resolution);
        self.resolution = Some(resolution);
        self.last_refresh_ms = 0.0;
        Ok(())
    }

    fn produce_frame(
        &mut self,
        _input: InputState,
        elapsed_ms: f64,
    ) -> Result<&[u8], ComputeError> {
        let resolution = self.resolution.ok_or(ComputeError::NotInitialized)?;
        if let Some(interval) = self.refresh_every_ms {
            if elapsed_ms - self.last_refresh_ms >= interval {
                self.regenerate(resolution);
                self.last_refresh_ms = elapsed_ms;
            }
        }
        Ok(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_source_streams_one_colour() {
        let resolution = RenderResolution::new(64, 32).unwrap();
        let mut source = StillSource::solid([0x20, 0x40, 0x80, 0xff]);
        source.initialize(resolution).unwrap();

        let frame = source.produce_frame(InputState::default(), 0.0).unwrap();
        assert_eq!(frame.len(), resolution.byte_len());
        for pixel in frame.chunks_exact(4) {
            assert_eq!(pixel, [0x20, 0x40, 0x80, 0xff]);
        }
    }

    #[test]
    fn produce_before_initialize_is_an_error() {
        let mut source = StillSource::solid([0; 4]);
        assert!(matches!(
            source.produce_frame(InputState::default(), 0.0),
            Err(ComputeError::NotInitialized)
        ));
    }

    #[test]
    fn reinitialize_resizes_the_buffer_exactly() {
        let mut source = StillSource::solid([1, 2, 3, 4]);
        source
            .initialize(RenderResolution::new(256, 256).unwrap())
            .unwrap();
        assert_eq!(
            source.produce_frame(InputState::default(), 0.0).unwrap().len(),
            256 * 256 * 4
        );

        source
            .initialize(RenderResolution::new(512, 512).unwrap())
            .unwrap();
        assert_eq!(
            source.produce_frame(InputState::default(), 0.0).unwrap().len(),
            512 * 512 * 4
        );
    }

    #[test]
    fn pattern_source_sees_pixel_coordinates() {
        let mut source = StillSource::from_fn(|column, row| [column as u8, row as u8, 0, 0xff]);
        source
            .initialize(RenderResolution::new(4, 2).unwrap())
            .unwrap();
        let frame = source.produce_frame(InputState::default(), 0.0).unwrap();
        // Row-major, top-left origin: pixel (3, 1) is the last one.
        assert_eq!(&frame[frame.len() - 4..], [3, 1, 0, 0xff]);
    }

    #[test]
    fn static_source_never_regenerates() {
        let mut generation = 0u8;
        let mut source = StillSource::from_fn(move |_, _| {
            generation = generation.wrapping_add(1);
            [generation, 0, 0, 0xff]
        });
        source
            .initialize(RenderResolution::new(1, 1).unwrap())
            .unwrap();

        let first = source.produce_frame(InputState::default(), 0.0).unwrap()[0];
        let later = source
            .produce_frame(InputState::default(), 60_000.0)
            .unwrap()[0];
        assert_eq!(first, later);
    }

    #[test]
    fn refreshing_source_regenerates_on_its_interval() {
        let mut generation = 0u8;
        let mut source = StillSource::from_fn(move |_, _| {
            generation = generation.wrapping_add(1);
            [generation, 0, 0, 0xff]
        })
        .refresh_every(1000.0);
        source
            .initialize(RenderResolution::new(1, 1).unwrap())
            .unwrap();

        // Inside the interval the initialize-time buffer is reused.
        let first = source.produce_frame(InputState::default(), 10.0).unwrap()[0];
        let second = source.produce_frame(InputState::default(), 999.0).unwrap()[0];
        assert_eq!(first, second);

        // Crossing the interval re-runs the fill.
        let third = source
            .produce_frame(InputState::default(), 1000.0)
            .unwrap()[0];
        assert_ne!(second, third);

        // The refresh clock advances, so the next tick is not a refresh.
        let fourth = source
            .produce_frame(InputState::default(), 1500.0)
            .unwrap()[0];
        assert_eq!(third, fourth);
    }

    #[test]
    fn non_positive_refresh_intervals_stay_static() {
        let mut generation = 0u8;
        let mut source = StillSource::from_fn(move |_, _| {
            generation = generation.wrapping_add(1);
            [generation, 0, 0, 0xff]
        })
        .refresh_every(0.0);
        source
            .initialize(RenderResolution::new(1, 1).unwrap())
            .unwrap();

        let first = source.produce_frame(InputState::default(), 0.0).unwrap()[0];
        let later = source
            .produce_frame(InputState::default(), 10_000.0)
            .unwrap()[0];
        assert_eq!(first, later);
    }
}
