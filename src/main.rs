//! Brick Autopilot entry point
//!
//! In the browser this boots the runner and exposes the start/stop exports.
//! Natively there is no page to drive, so it runs a short prediction check.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    log::info!("Brick autopilot loading...");
    brick_autopilot::platform::web::boot();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Brick autopilot (native) starting...");
    log::info!("Native mode has no page to drive - build for wasm32 and load it into the game page");

    println!("\nRunning prediction checks...");
    check_prediction();
    check_shot_plan();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn check_prediction() {
    use brick_autopilot::Sample;
    use brick_autopilot::predict::predict_ball_x;

    let prev = Sample { x: 100.0, y: 50.0, captured_at_ms: 0.0 };
    let curr = Sample { x: 110.0, y: 60.0, captured_at_ms: 100.0 };
    let x = predict_ball_x(&prev, &curr, 400.0, 400.0);

    assert!((x - 350.0).abs() < 1e-3, "Wall fold should land at 350, got {x}");
    println!("✓ Intercept after one wall bounce: {x:.1}");
}

#[cfg(not(target_arch = "wasm32"))]
fn check_shot_plan() {
    use brick_autopilot::sim::{GameState, plan_shot};

    let snapshot = r#"{
        "ball": {"x": 200, "y": 150, "vx": 2, "vy": 4, "r": 6},
        "paddle": {"x": 160, "w": 80, "y": 380},
        "bricks": [
            {"idx": 0, "x": 40, "y": 40, "w": 40, "h": 12, "t": "normal"},
            {"idx": 1, "x": 280, "y": 40, "w": 40, "h": 12, "t": "key"}
        ]
    }"#;
    let Some(state) = GameState::from_json(snapshot) else {
        println!("✗ Sample snapshot did not parse");
        return;
    };
    let plan = plan_shot(&state, 400.0);
    println!(
        "✓ Shot plan: paddle at {:.1}, contact at {:?}, target brick {:?}",
        plan.paddle_x, plan.contact_x, plan.target
    );
}
