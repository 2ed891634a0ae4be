use clap::Parser;
use macroquad::prelude::*;
use tiled_compose::MapRenderer;

/// Bake a Tiled map into a texture once and show it.
#[derive(Parser, Debug)]
struct Args {
    /// Path to a Tiled JSON map
    #[arg(long, default_value = "assets/map.json")]
    map: String,

    #[arg(long, default_value_t = 1280)]
    width: i32,

    #[arg(long, default_value_t = 720)]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Render Map".into(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        log::error!("{e:#}");
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let renderer = MapRenderer::new(&args.map)?;
    // Baked once; render() into a kept Image if the map ever changes.
    let texture = renderer.make_texture()?;
    let (w, h) = renderer.pixel_size();

    loop {
        clear_background(BLACK);

        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w as f32, h as f32)),
                ..Default::default()
            },
        );

        draw_text(
            &format!("FPS: {}", get_fps()),
            screen_width() - 135.0,
            55.0,
            30.0,
            RED,
        );

        next_frame().await;
    }
}
