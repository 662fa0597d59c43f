//! vgasim frontend v0.3.0.
//!
//! Drives the built-in pattern-generator circuit through the frame
//! synthesizer and shows the reconstructed frames in a window.
//!
//! Two execution modes:
//!
//! - **GUI mode** (default): 640×480 window, keyboard and gamepad button
//!   input, PNG screenshot, stimulus record/replay.
//! - **Headless mode** (`--headless`): runs a fixed number of frames without
//!   a window, with scripted button presses, replay, per-frame diagnostics,
//!   and PNG frame dumps. Used for automated checks of the harness.
//!
//! Batching is selected on the command line: the default simulates one full
//! frame per loop iteration and relies on the window's 60 Hz pacing; with
//! `--batch N`, input is polled every N simulated cycles instead and an
//! optional post-present sleep paces the loop.

use gilrs::{Axis, Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::thread;
use std::time::{Duration, Instant};
use vgasim_core::pattern::PatternGenerator;
use vgasim_core::stimulus::{Player, Recorder};
use vgasim_core::{BatchPolicy, Button, Timing, VgaSim};

/// Analog stick deadzone
const STICK_DEADZONE: f32 = 0.3;

// ─── Keyboard ───────────────────────────────────────────────────────────────

/// The nine recognized button keys. Anything else is ignored.
fn key_to_button(key: Key) -> Option<Button> {
    match key {
        Key::W => Some(Button::Up),
        Key::S => Some(Button::Down),
        Key::A => Some(Button::Left),
        Key::D => Some(Button::Right),
        Key::E => Some(Button::Center),
        Key::Key1 => Some(Button::B1),
        Key::Key2 => Some(Button::B2),
        Key::Key3 => Some(Button::B3),
        Key::Key4 => Some(Button::B4),
        _ => None,
    }
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

struct GamepadState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    center: bool,
    aux: [bool; 4],
    stick_x: f32,
    stick_y: f32,
}

impl GamepadState {
    fn new() -> Self {
        GamepadState {
            up: false,
            down: false,
            left: false,
            right: false,
            center: false,
            aux: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
        }
    }

    /// Effective level for one circuit button signal.
    fn signal(&self, button: Button) -> bool {
        match button {
            Button::Up => self.up || self.stick_y < -STICK_DEADZONE,
            Button::Down => self.down || self.stick_y > STICK_DEADZONE,
            Button::Left => self.left || self.stick_x < -STICK_DEADZONE,
            Button::Right => self.right || self.stick_x > STICK_DEADZONE,
            Button::Center => self.center,
            Button::B1 => self.aux[0],
            Button::B2 => self.aux[1],
            Button::B3 => self.aux[2],
            Button::B4 => self.aux[3],
        }
    }
}

fn init_gamepad(debug: bool) -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => {
            if debug {
                let mut found = false;
                for (id, gp) in gilrs.gamepads() {
                    println!("Gamepad: [{}] \"{}\"", id, gp.name());
                    found = true;
                }
                if !found {
                    println!("No gamepad (hot-plug supported).");
                }
            }
            Some(gilrs)
        }
        Err(e) => {
            eprintln!("Warning: gamepad: {}", e);
            None
        }
    }
}

fn poll_gamepad(gilrs: &mut Gilrs, state: &mut GamepadState, debug: bool) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(state, b, true),
            EventType::ButtonReleased(b, _) => apply_button(state, b, false),
            EventType::AxisChanged(a, v, _) => apply_axis(state, a, v),
            EventType::Connected => {
                if debug {
                    println!("Gamepad connected");
                }
            }
            EventType::Disconnected => {
                if debug {
                    println!("Gamepad disconnected");
                }
                *state = GamepadState::new();
            }
            _ => {}
        }
    }
}

fn apply_button(state: &mut GamepadState, btn: GilrsButton, pressed: bool) {
    match btn {
        GilrsButton::DPadUp => state.up = pressed,
        GilrsButton::DPadDown => state.down = pressed,
        GilrsButton::DPadLeft => state.left = pressed,
        GilrsButton::DPadRight => state.right = pressed,
        GilrsButton::South => state.center = pressed,
        GilrsButton::West => state.aux[0] = pressed,
        GilrsButton::North => state.aux[1] = pressed,
        GilrsButton::East => state.aux[2] = pressed,
        GilrsButton::Start => state.aux[3] = pressed,
        _ => {}
    }
}

fn apply_axis(state: &mut GamepadState, axis: Axis, value: f32) {
    match axis {
        Axis::LeftStickX => state.stick_x = value,
        Axis::LeftStickY => state.stick_y = -value,
        Axis::DPadX => {
            state.left = value < -STICK_DEADZONE;
            state.right = value > STICK_DEADZONE;
        }
        Axis::DPadY => {
            state.up = value < -STICK_DEADZONE;
            state.down = value > STICK_DEADZONE;
        }
        _ => {}
    }
}

// ─── Options ────────────────────────────────────────────────────────────────

struct Options {
    debug: bool,
    frames: usize,
    press: Option<usize>,
    snapshots: Vec<usize>,
    sleep_ms: u64,
    record: Option<String>,
}

fn usage(program: &str) {
    eprintln!("vgasim v0.3.0 - VGA circuit visualization harness");
    eprintln!("Usage: {} [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --headless           Run without a window");
    eprintln!("  --frames N           Frames to run in headless mode (default 60)");
    eprintln!("  --batch N            Simulate N cycles per input poll (default: one full frame)");
    eprintln!("  --record FILE        Record button input to FILE");
    eprintln!("  --replay FILE        Replay button input from FILE");
    eprintln!("  --snapshot F         Write frame F as PNG (repeatable, headless)");
    eprintln!("  --press F            Hold the center button from frame F to F+5 (headless)");
    eprintln!("  --sleep-ms N         Sleep N ms after each presented frame (default 1 with --batch)");
    eprintln!("  --debug              Per-frame diagnostics");
    eprintln!();
    eprintln!("GUI keys: W/A/S/D=directions E=center 1-4=aux buttons");
    eprintln!("          F12=Screenshot Esc=Quit");
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage(&args[0]);
        return;
    }

    let headless = args.iter().any(|a| a == "--headless");
    let debug = args.iter().any(|a| a == "--debug");

    let frames: usize = args
        .iter()
        .position(|a| a == "--frames")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let batch: Option<usize> = args
        .iter()
        .position(|a| a == "--batch")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok());

    let sleep_ms: u64 = args
        .iter()
        .position(|a| a == "--sleep-ms")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(if batch.is_some() { 1 } else { 0 });

    let record: Option<String> = args
        .iter()
        .position(|a| a == "--record")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let replay: Option<String> = args
        .iter()
        .position(|a| a == "--replay")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let press: Option<usize> = args
        .iter()
        .position(|a| a == "--press")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok());

    let mut snapshots: Vec<usize> = Vec::new();
    {
        let mut i = 0;
        while i < args.len() {
            if args[i] == "--snapshot" {
                if let Some(f) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                    snapshots.push(f);
                }
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    let policy = match batch {
        Some(n) => BatchPolicy::FixedBatch(n),
        None => BatchPolicy::FullFrame,
    };

    let mut sim = match VgaSim::new(PatternGenerator::new(), Timing::VGA_640X480, policy) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    sim.debug = debug;
    sim.reset();

    let player = match replay {
        Some(ref path) => match Player::load_from_file(Path::new(path)) {
            Ok(player) => {
                if debug {
                    println!("Replaying {} events from {}", player.remaining(), path);
                }
                Some(player)
            }
            Err(e) => {
                eprintln!("Replay: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    let opts = Options { debug, frames, press, snapshots, sleep_ms, record };

    if headless {
        run_headless(&mut sim, &opts, player);
    } else {
        run_gui(&mut sim, &opts, player);
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui(sim: &mut VgaSim<PatternGenerator>, opts: &Options, mut player: Option<Player>) {
    let w = sim.timing().active_w;
    let h = sim.timing().active_h;

    let mut window = match Window::new("VGA-sim", w, h, WindowOptions::default()) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Window could not be created: {}", e);
            process::exit(1);
        }
    };
    // Full-frame batches lean on the window's own pacing (the vsync
    // analogue). Fixed batches run unpaced; the optional post-present sleep
    // takes that role.
    match sim.policy() {
        BatchPolicy::FullFrame => window.set_target_fps(60),
        BatchPolicy::FixedBatch(_) => window.set_target_fps(0),
    }

    let mut gilrs = init_gamepad(opts.debug);
    let mut gp = GamepadState::new();
    let mut keys = [false; Button::COUNT];
    let mut applied = [false; Button::COUNT];
    let mut recorder = if opts.record.is_some() { Some(Recorder::new()) } else { None };
    let mut screenshot_n = 0u32;
    let start_time = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut fps_frames: u64 = 0;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for key in window.get_keys_pressed(KeyRepeat::No) {
            if key == Key::F12 {
                let name = format!("screenshot_{:04}.png", screenshot_n);
                match fs::write(&name, sim.screenshot_png()) {
                    Ok(()) => {
                        eprintln!("Screenshot: {}", name);
                        screenshot_n += 1;
                    }
                    Err(e) => eprintln!("Screenshot error: {}", e),
                }
            } else if let Some(button) = key_to_button(key) {
                keys[button.index()] = true;
            }
        }
        for key in window.get_keys_released() {
            if let Some(button) = key_to_button(key) {
                keys[button.index()] = false;
            }
        }
        if let Some(ref mut g) = gilrs {
            poll_gamepad(g, &mut gp, opts.debug);
        }

        // Forward level changes to the circuit, stamping each with the cycle
        // it takes effect at.
        for button in Button::ALL {
            let want = keys[button.index()] || gp.signal(button);
            if want != applied[button.index()] {
                applied[button.index()] = want;
                sim.set_input(button, want);
                if let Some(ref mut rec) = recorder {
                    rec.record(sim.cycles(), button, want);
                }
            }
        }
        if let Some(ref mut pl) = player {
            while let Some(ev) = pl.next_due(sim.cycles()) {
                sim.set_input(ev.button, ev.pressed);
            }
        }

        if sim.run_batch() {
            window
                .update_with_buffer(sim.framebuffer(), w, h)
                .expect("window update");
            fps_frames += 1;
            if opts.sleep_ms > 0 {
                thread::sleep(Duration::from_millis(opts.sleep_ms));
            }
        } else {
            // No complete frame yet; keep the event queue moving.
            window.update();
        }

        if last_fps_time.elapsed() >= Duration::from_secs(2) {
            let fps = fps_frames as f64 / last_fps_time.elapsed().as_secs_f64();
            window.set_title(&format!("VGA-sim - {:.0} FPS", fps));
            fps_frames = 0;
            last_fps_time = Instant::now();
        }
    }

    if let (Some(path), Some(rec)) = (opts.record.as_ref(), recorder.as_ref()) {
        match rec.save_to_file(Path::new(path)) {
            Ok(()) => {
                if opts.debug {
                    println!("Recorded {} events to {}", rec.len(), path);
                }
            }
            Err(e) => eprintln!("Record: {}", e),
        }
    }
    if opts.debug {
        let e = start_time.elapsed().as_secs_f64();
        println!(
            "{} frames in {:.1}s ({:.1} FPS), {} cycles",
            sim.frames_completed(),
            e,
            sim.frames_completed() as f64 / e,
            sim.cycles()
        );
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(sim: &mut VgaSim<PatternGenerator>, opts: &Options, mut player: Option<Player>) {
    if opts.debug {
        if let Some(pf) = opts.press {
            println!("Press center on frame {}", pf);
        }
        println!("Running {} frames...", opts.frames);
    }
    for frame in 0..opts.frames {
        if let Some(pf) = opts.press {
            if frame == pf {
                sim.set_input(Button::Center, true);
                if opts.debug {
                    println!("  >> center pressed");
                }
            } else if frame == pf + 5 {
                sim.set_input(Button::Center, false);
                if opts.debug {
                    println!("  >> center released");
                }
            }
        }
        if let Some(ref mut pl) = player {
            while let Some(ev) = pl.next_due(sim.cycles()) {
                sim.set_input(ev.button, ev.pressed);
            }
        }

        let c0 = sim.cycles();
        sim.run_frame();

        if opts.debug {
            let lit = sim.framebuffer().iter().filter(|&&px| px != 0).count();
            println!(
                "  Frame {:3}: +{:6} cyc  lit={:6}  square={:?}",
                frame + 1,
                sim.cycles() - c0,
                lit,
                sim.model().square_pos()
            );
        }
        if opts.snapshots.contains(&(frame + 1)) {
            let name = format!("frame_{:04}.png", frame + 1);
            match fs::write(&name, sim.screenshot_png()) {
                Ok(()) => println!("  Snapshot: {}", name),
                Err(e) => eprintln!("Snapshot error: {}", e),
            }
        }
    }
    if opts.debug {
        println!("\nDone. {} cycles, {} frames.", sim.cycles(), sim.frames_completed());
    }
}
