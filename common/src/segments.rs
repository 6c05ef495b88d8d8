/// A linear distance split into equally sized segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentedLinearRoute {
    segments: usize,
    length: f64,
}

impl SegmentedLinearRoute {
    pub fn new(segments: usize, length: f64) -> Self {
        Self {
            segments: segments.max(1),
            length: length.max(0.0),
        }
    }

    pub fn number_of_segments(&self) -> usize {
        self.segments
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn segment_length(&self) -> f64 {
        self.length / self.segments as f64
    }

    pub fn position_of_segment_start(&self, segment: usize) -> f64 {
        segment as f64 * self.segment_length()
    }

    /// Segment index containing `position`, clamped to the valid range.
    pub fn segment_for_position(&self, position: f64) -> usize {
        if self.length <= 0.0 || !position.is_finite() || position <= 0.0 {
            return 0;
        }
        let index = (position / self.segment_length()).floor() as usize;
        index.min(self.segments - 1)
    }
}
