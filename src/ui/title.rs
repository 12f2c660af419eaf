use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::core::title_reveal::{RevealTiming, TitleReveal};

/// Plays a [`TitleReveal`] against the wall clock.
#[derive(Debug, Clone)]
pub struct RevealPlayback {
    conversation_id: i64,
    /// Frame text paired with its offset from the start.
    frames: Vec<(Duration, String)>,
    started: Instant,
    ends_after: Duration,
}

impl RevealPlayback {
    pub fn start(conversation_id: i64, title: &str, timing: RevealTiming, now: Instant) -> Self {
        let reveal = TitleReveal::new(title, timing);
        let ends_after = reveal.duration();
        let mut offset = Duration::ZERO;
        let frames = reveal
            .map(|frame| {
                offset += frame.delay;
                (offset, frame.text)
            })
            .collect();
        Self {
            conversation_id,
            frames,
            started: now,
            ends_after,
        }
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    /// Text to show at `now`, or `None` once the reveal (hold included) is over.
    pub fn frame_at(&self, now: Instant) -> Option<&str> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.ends_after {
            return None;
        }
        self.frames
            .iter()
            .take_while(|(offset, _)| *offset <= elapsed)
            .last()
            .map(|(_, text)| text.as_str())
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.frame_at(now).is_none()
    }
}

/// Cut `text` to at most `max_width` columns, ending in `…` when shortened.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut truncated = String::new();
    let mut width = 0;
    for grapheme in UnicodeSegmentation::graphemes(text, true) {
        let grapheme_width = UnicodeWidthStr::width(grapheme);
        if width + grapheme_width + 1 > max_width {
            break;
        }
        truncated.push_str(grapheme);
        width += grapheme_width;
    }
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> RevealTiming {
        RevealTiming {
            lead_in: Duration::from_millis(100),
            step: Duration::from_millis(50),
            hold: Duration::from_millis(500),
        }
    }

    #[test]
    fn playback_follows_frame_offsets() {
        let start = Instant::now();
        let playback = RevealPlayback::start(3, "Hi", timing(), start);

        assert_eq!(playback.frame_at(start), Some(""));
        assert_eq!(playback.frame_at(start + Duration::from_millis(99)), Some(""));
        assert_eq!(playback.frame_at(start + Duration::from_millis(100)), Some("H|"));
        assert_eq!(playback.frame_at(start + Duration::from_millis(150)), Some("Hi|"));
        assert_eq!(playback.frame_at(start + Duration::from_millis(200)), Some("Hi"));
        assert_eq!(playback.frame_at(start + Duration::from_millis(699)), Some("Hi"));
        assert!(playback.is_finished(start + Duration::from_millis(700)));
        assert_eq!(playback.conversation_id(), 3);
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("Garden plans", 20), "Garden plans");
        assert_eq!(truncate_to_width("Garden plans", 7), "Garden…");
        assert_eq!(truncate_to_width("日本語のタイトル", 7), "日本語…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }
}
