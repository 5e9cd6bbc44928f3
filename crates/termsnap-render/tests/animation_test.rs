//! Snapshots through emulation, rasterization, reduction and encoding

mod common;

use common::RecordingPainter;
use termsnap_render::{
    save_gif, save_png, FrameReducer, RasterConfig, ReduceConfig, Reduced, Renderer,
};
use termsnap_test_utils::{fixtures::data, init_test_logging, TestFixtures};

fn renderer() -> Renderer<RecordingPainter> {
    Renderer::new(RecordingPainter::default(), RasterConfig::default())
}

#[test]
fn snapshots_are_rendered_in_order() {
    let mut renderer = renderer();
    let canvases = renderer.render_snapshots(["one", "one\ntwo", "one\ntwo\nthree"]);

    let heights: Vec<u32> = canvases.iter().map(|c| c.height()).collect();
    assert_eq!(
        heights,
        vec![
            RecordingPainter::LINE_HEIGHT + 40,
            2 * RecordingPainter::LINE_HEIGHT + 40,
            3 * RecordingPainter::LINE_HEIGHT + 40,
        ]
    );
    assert_eq!(
        renderer.painter().texts(),
        vec!["one", "one", "two", "one", "two", "three"]
    );
}

#[test]
fn unstyled_text_leaves_recorded_canvases_blank() {
    // The recording painter never paints glyphs, so every frame is blank
    let mut renderer = renderer();
    let reduced = renderer.animate(["a", "b"], &FrameReducer::default());
    assert_eq!(reduced, Reduced::Empty);
}

#[test]
fn styled_snapshot_survives_reduction_and_encodes() {
    init_test_logging();
    let fixtures = TestFixtures::new().unwrap();

    let progress = data::progress_bar(4, 10);
    let snapshots = [
        "\x1b[41m   \x1b[0m.".to_string(),
        format!("\x1b[42m{progress}\x1b[0m"),
    ];
    let mut renderer = renderer();
    let reducer = FrameReducer::new(ReduceConfig {
        min_frames: 1,
        ..ReduceConfig::default()
    });

    let Reduced::Animation(animation) =
        renderer.animate(snapshots.iter().map(String::as_str), &reducer)
    else {
        panic!("expected an animation");
    };
    assert_eq!(animation.frames.len(), 2);
    assert!(animation
        .frames
        .iter()
        .all(|f| f.width() == animation.width && f.height() == animation.height));

    let gif_path = fixtures.path().join("nested/out.gif");
    save_gif(&animation, 10, &gif_path).unwrap();
    let bytes = std::fs::read(&gif_path).unwrap();
    assert!(bytes.starts_with(b"GIF89a"));

    let png_path = fixtures.path().join("still/out.png");
    save_png(&animation.frames[0], &png_path).unwrap();
    let png = std::fs::read(&png_path).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}
