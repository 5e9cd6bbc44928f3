//! PNG and GIF output

use crate::canvas::Canvas;
use crate::palette::{IndexedFrame, Palette};
use crate::reduce::Animation;
use crate::RenderError;
use gif::{Encoder, Frame, Repeat};
use image::ImageFormat;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Create the directory that will hold `path`
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Display time of one frame at `fps`
pub fn frame_duration_ms(fps: u32) -> u32 {
    1000 / fps.max(1)
}

pub fn save_png(canvas: &Canvas, path: &Path) -> Result<(), RenderError> {
    ensure_parent_dir(path)?;
    canvas.image().save_with_format(path, ImageFormat::Png)?;
    info!(
        "Saved {} ({}x{})",
        path.display(),
        canvas.width(),
        canvas.height()
    );
    Ok(())
}

/// Write an animated GIF with one global palette.
///
/// `durations_ms` holds one entry per frame.
pub fn encode_gif<W: Write>(
    writer: W,
    palette: &Palette,
    frames: &[IndexedFrame],
    durations_ms: &[u32],
    loop_forever: bool,
) -> Result<(), RenderError> {
    let Some(first) = frames.first() else {
        return Err(RenderError::InvalidAnimation("no frames".to_string()));
    };
    if durations_ms.len() != frames.len() {
        return Err(RenderError::InvalidAnimation(format!(
            "{} frames but {} durations",
            frames.len(),
            durations_ms.len()
        )));
    }
    if palette.is_empty() {
        return Err(RenderError::InvalidAnimation("empty palette".to_string()));
    }

    let (width, height) = gif_dimensions(first.width, first.height)?;
    let mut encoder = Encoder::new(writer, width, height, &palette.to_rgb_bytes())?;
    if loop_forever {
        encoder.set_repeat(Repeat::Infinite)?;
    }

    for (frame, &duration) in frames.iter().zip(durations_ms) {
        if (frame.width, frame.height) != (first.width, first.height) {
            return Err(RenderError::InvalidAnimation(format!(
                "frame is {}x{}, expected {}x{}",
                frame.width, frame.height, first.width, first.height
            )));
        }

        let gif_frame = Frame {
            width,
            height,
            delay: centiseconds(duration),
            buffer: Cow::Borrowed(&frame.pixels),
            ..Frame::default()
        };
        encoder.write_frame(&gif_frame)?;
    }

    Ok(())
}

/// Encode a reduced animation to `path`, every frame shown for `1000 / fps` ms
pub fn save_gif(animation: &Animation, fps: u32, path: &Path) -> Result<(), RenderError> {
    ensure_parent_dir(path)?;
    let durations = vec![frame_duration_ms(fps); animation.indexed.len()];

    let writer = BufWriter::new(File::create(path)?);
    encode_gif(writer, &animation.palette, &animation.indexed, &durations, true)?;

    info!(
        "Saved {} ({} frames, {}x{}, {} colors)",
        path.display(),
        animation.indexed.len(),
        animation.width,
        animation.height,
        animation.palette.len()
    );
    Ok(())
}

fn gif_dimensions(width: u32, height: u32) -> Result<(u16, u16), RenderError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(RenderError::TooLarge { width, height }),
    }
}

/// GIF delays are in hundredths of a second
fn centiseconds(ms: u32) -> u16 {
    u16::try_from((ms + 5) / 10).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termsnap_terminal::Rgb;
    use test_case::test_case;

    #[test_case(10 => 100)]
    #[test_case(6 => 166)]
    #[test_case(0 => 1000; "zero fps treated as one")]
    fn durations(fps: u32) -> u32 {
        frame_duration_ms(fps)
    }

    #[test_case(100 => 10)]
    #[test_case(166 => 17)]
    #[test_case(4 => 0)]
    fn delay_conversion(ms: u32) -> u16 {
        centiseconds(ms)
    }

    fn frame(pixels: Vec<u8>) -> IndexedFrame {
        IndexedFrame {
            width: 2,
            height: 1,
            pixels,
        }
    }

    #[test]
    fn gif_has_header_and_trailer() {
        let palette = Palette::new(vec![Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)]);
        let frames = [frame(vec![0, 1]), frame(vec![1, 0])];
        let mut out = Vec::new();

        encode_gif(&mut out, &palette, &frames, &[100, 100], true).unwrap();

        assert!(out.starts_with(b"GIF89a"));
        assert_eq!(out.last(), Some(&0x3b));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let palette = Palette::new(vec![Rgb::new(0, 0, 0)]);
        let mut out = Vec::new();

        let no_frames = encode_gif(&mut out, &palette, &[], &[], true);
        assert!(matches!(no_frames, Err(RenderError::InvalidAnimation(_))));

        let wrong_durations = encode_gif(&mut out, &palette, &[frame(vec![0, 0])], &[], true);
        assert!(matches!(wrong_durations, Err(RenderError::InvalidAnimation(_))));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        assert!(matches!(
            gif_dimensions(70_000, 10),
            Err(RenderError::TooLarge { .. })
        ));
    }
}
