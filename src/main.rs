use gravityscene::{NativeCanvas, SceneOptions};

fn main() -> anyhow::Result<()> {
    gravityscene::init_logging();

    println!("Gravity Scene");
    println!("Controls:");
    println!("  Drag - Move a square");
    println!("  Hover - Nudge a square upward");
    println!("  Click - Drop a new square");
    println!();

    let handle = gravityscene::prepare_canvas(SceneOptions {
        canvas: Some(NativeCanvas { title: "Gravity Scene".to_string() }),
        canvas_width: Some(1024.0),
        canvas_height: Some(768.0),
    })?;

    gravityscene::run(handle)
}
