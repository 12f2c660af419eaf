//! Typewriter sequence for a freshly generated conversation title.
//!
//! The sequence is data only; the front-end owns the clock and decides when
//! each frame is shown.

use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

const REVEAL_CURSOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTiming {
    /// Pause before the first character appears.
    pub lead_in: Duration,
    /// Pause between characters.
    pub step: Duration,
    /// How long the finished title stays highlighted.
    pub hold: Duration,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            lead_in: Duration::from_millis(100),
            step: Duration::from_millis(50),
            hold: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    pub text: String,
    /// Wait before showing this frame.
    pub delay: Duration,
}

/// Frames: an empty title, one frame per grapheme with a trailing cursor,
/// then the bare title.
#[derive(Debug, Clone)]
pub struct TitleReveal {
    boundaries: Vec<usize>,
    title: String,
    timing: RevealTiming,
    next: usize,
}

impl TitleReveal {
    pub fn new(title: &str, timing: RevealTiming) -> Self {
        let boundaries = title
            .grapheme_indices(true)
            .map(|(index, grapheme)| index + grapheme.len())
            .collect();
        Self {
            boundaries,
            title: title.to_string(),
            timing,
            next: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn hold(&self) -> Duration {
        self.timing.hold
    }

    /// Total time from the first frame until the reveal is over.
    pub fn duration(&self) -> Duration {
        let typed = u32::try_from(self.boundaries.len()).unwrap_or(u32::MAX);
        self.timing.lead_in + self.timing.step * typed + self.timing.hold
    }
}

impl Iterator for TitleReveal {
    type Item = RevealFrame;

    fn next(&mut self) -> Option<RevealFrame> {
        let typed = self.boundaries.len();
        let index = self.next;
        if index > typed + 1 {
            return None;
        }
        self.next += 1;

        let frame = match index {
            0 => RevealFrame {
                text: String::new(),
                delay: Duration::ZERO,
            },
            i if i <= typed => {
                let mut text = self.title[..self.boundaries[i - 1]].to_string();
                text.push(REVEAL_CURSOR);
                RevealFrame {
                    text,
                    delay: if i == 1 {
                        self.timing.lead_in
                    } else {
                        self.timing.step
                    },
                }
            }
            _ => RevealFrame {
                text: self.title.clone(),
                delay: if typed == 0 {
                    self.timing.lead_in
                } else {
                    self.timing.step
                },
            },
        };
        Some(frame)
    }
}
