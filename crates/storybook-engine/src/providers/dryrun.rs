use anyhow::{Context, Result};
use image::GenericImageView;
use storybook_contracts::text::{pack_words, SPEECH_PIECE_CHARS};

use super::{CaptionProvider, SpeechProvider, TranslationProvider};
use crate::intake::EncodedImage;

/// One silent MPEG-1 Layer III frame (128 kbit/s, 44.1 kHz, mono).
pub const SILENT_MP3_FRAME: [u8; 417] = silent_frame();

const fn silent_frame() -> [u8; 417] {
    let mut frame = [0u8; 417];
    frame[0] = 0xFF;
    frame[1] = 0xFB;
    frame[2] = 0x90;
    frame[3] = 0xC4;
    frame
}

/// Describes the image by its average color; never touches the network.
pub struct DryrunCaptioner;

impl CaptionProvider for DryrunCaptioner {
    fn name(&self) -> &str {
        "dryrun-caption"
    }

    fn generate(&self, _prompt: &str, image: &EncodedImage) -> Result<String> {
        let decoded =
            image::load_from_memory(&image.bytes).context("dryrun caption decode failed")?;
        let (width, height) = decoded.dimensions();
        let rgb = decoded.to_rgb8();
        let pixels = u64::from(width) * u64::from(height);
        let mut sums = [0u64; 3];
        for pixel in rgb.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
        }
        let avg = sums.map(|sum| if pixels == 0 { 0 } else { sum / pixels });
        let color = color_name(avg[0] as f64, avg[1] as f64, avg[2] as f64);
        let shape = if width > height {
            "wide"
        } else if height > width {
            "tall"
        } else {
            "square"
        };

        Ok(format!(
            "Caption: A {shape} picture that is mostly {color}.\n\n\
             Story: Once upon a time there was a {shape} {color} picture, \
             {width} pixels across and {height} pixels high. Every morning it \
             looked out of its frame and wondered what story it would tell. \
             One day a curious child found it, smiled, and the picture knew \
             that being looked at kindly was the best story of all. The end."
        ))
    }
}

/// Tags each chunk with the target code instead of translating it.
pub struct DryrunTranslator;

impl TranslationProvider for DryrunTranslator {
    fn name(&self) -> &str {
        "dryrun-translate"
    }

    fn translate(&self, text: &str, _source_code: &str, target_code: &str) -> Result<String> {
        Ok(format!("[{target_code}] {}", text.trim()))
    }
}

/// Emits one silent frame per speech piece.
pub struct DryrunSpeech;

impl SpeechProvider for DryrunSpeech {
    fn name(&self) -> &str {
        "dryrun-speech"
    }

    fn synthesize(&self, text: &str, _language_code: &str) -> Result<Vec<u8>> {
        let pieces = pack_words(text, SPEECH_PIECE_CHARS).len().max(1);
        Ok(SILENT_MP3_FRAME.repeat(pieces))
    }
}

fn color_name(r: f64, g: f64, b: f64) -> &'static str {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max < 50.0 {
        return "black";
    }
    if min > 205.0 {
        return "white";
    }
    if max - min < 25.0 {
        return "gray";
    }
    if r >= g && r >= b {
        if g > b + 60.0 {
            "yellow"
        } else {
            "red"
        }
    } else if g >= r && g >= b {
        "green"
    } else if r > g + 40.0 {
        "purple"
    } else {
        "blue"
    }
}
