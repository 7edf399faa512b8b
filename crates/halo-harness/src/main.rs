#![forbid(unsafe_code)]

//! Scripted page session for the Halo overlay.
//!
//! Replays a fixed page timeline against an [`OverlayHost`]: the headline
//! mounts, the page scrolls, the window resizes, the headline reflows, the
//! overlay is hidden and shown again, and finally the headline unmounts.
//! Every rendered frame is written to stdout as one JSON line.
//!
//! # Running
//!
//! ```sh
//! cargo run -p halo-harness > frames.jsonl
//! RUST_LOG=halo_runtime=debug HALO_SEED=7 cargo run -p halo-harness
//! ```
//!
//! # Environment
//!
//! - `HALO_SEED`: seed for the random source.
//! - `HALO_DURATION_MS`: session length (default 20000).
//! - `HALO_FRAME_EVERY`: print every Nth frame only (default 1).
//! - `HALO_LOG_JSON`: emit logs as JSON on stderr.
//! - `RUST_LOG`: log filter (default `info`).
//! - `HALO_*` overlay constants, see [`HaloConfig::from_lookup`].

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::time::Duration;

use halo_core::geometry::{Rect, Size};
use halo_runtime::{Artist, HaloConfig, Roster};
use halo_web::{HostConfig, HostEvent, OverlayHost};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);
const VIEWPORT: Size = Size::new(1280.0, 800.0);
const HEADLINE: Rect = Rect::new(440.0, 340.0, 400.0, 120.0);

/// One scripted page change.
#[derive(Debug, Clone, Copy)]
enum Action {
    /// Move the headline by `dy` and report a scroll.
    Scroll { dy: f64 },
    /// Resize the window; the headline stays centred.
    Resize(Size),
    /// The headline wraps onto another line.
    Reflow { grow: f64 },
    SetActive(bool),
    Unmount,
}

/// Mutable page model the script acts on.
struct Page {
    viewport: Size,
    headline: Option<Rect>,
}

impl Page {
    fn apply(&mut self, action: Action) -> HostEvent {
        match action {
            Action::Scroll { dy } => {
                self.headline = self.headline.map(|r| Rect::new(r.x, r.y + dy, r.width, r.height));
                HostEvent::Scroll
            }
            Action::Resize(viewport) => {
                self.viewport = viewport;
                self.headline = self.headline.map(|r| {
                    Rect::new(
                        (viewport.width - r.width) / 2.0,
                        (viewport.height - r.height) / 2.0,
                        r.width,
                        r.height,
                    )
                });
                HostEvent::Resize { viewport }
            }
            Action::Reflow { grow } => {
                self.headline = self
                    .headline
                    .map(|r| Rect::new(r.x, r.y - grow / 2.0, r.width, r.height + grow));
                HostEvent::Mutation {
                    rect: self.headline,
                }
            }
            Action::SetActive(active) => HostEvent::SetActive(active),
            Action::Unmount => {
                self.headline = None;
                HostEvent::Unmount
            }
        }
    }
}

fn script(duration: Duration) -> Vec<(Duration, Action)> {
    let ms = Duration::from_millis;
    let mut steps = vec![
        (ms(5_000), Action::Scroll { dy: -120.0 }),
        (ms(6_500), Action::Scroll { dy: 60.0 }),
        (ms(8_000), Action::Resize(Size::new(960.0, 720.0))),
        (ms(10_000), Action::Reflow { grow: 48.0 }),
        (ms(12_000), Action::SetActive(false)),
        (ms(13_000), Action::SetActive(true)),
        (duration.saturating_sub(ms(1_000)), Action::Unmount),
    ];
    steps.retain(|(at, _)| *at <= duration);
    steps.sort_by_key(|(at, _)| *at);
    steps
}

fn roster() -> Roster {
    [
        (1, "עומר אדם", "Omer Adam"),
        (2, "נועה קירל", "Noa Kirel"),
        (3, "רביד פלוטניק", "Ravid Plotnik"),
        (4, "אייל גולן", "Eyal Golan"),
        (5, "שרית חדד", "Sarit Hadad"),
    ]
    .into_iter()
    .map(|(id, primary, secondary)| Artist::new(id, primary, secondary))
    .collect()
}

fn env_u64(var: &str) -> Result<Option<u64>, String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{var}={value:?} is not a whole number")),
        _ => Ok(None),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if std::env::var_os("HALO_LOG_JSON").is_some() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let halo = HaloConfig::from_env()?;
    let config = HostConfig {
        halo,
        seed: env_u64("HALO_SEED")?,
        ..HostConfig::default()
    };
    let duration = Duration::from_millis(env_u64("HALO_DURATION_MS")?.unwrap_or(20_000));
    let every = env_u64("HALO_FRAME_EVERY")?.unwrap_or(1).max(1);

    let mut host = OverlayHost::seeded(config, roster(), VIEWPORT)?;
    let mut page = Page {
        viewport: VIEWPORT,
        headline: Some(HEADLINE),
    };
    let mut pending = script(duration).into_iter().peekable();

    info!(
        duration_ms = duration.as_millis() as u64,
        viewport_w = page.viewport.width,
        viewport_h = page.viewport.height,
        "session start"
    );
    host.push_event(HostEvent::Mount {
        rect: page.headline,
    });

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut now = Duration::ZERO;
    let mut frames: u64 = 0;
    while now <= duration {
        host.set_time(now);
        while let Some((_, action)) = pending.next_if(|(at, _)| *at <= now) {
            info!(now_ms = now.as_millis() as u64, ?action, "page change");
            let event = page.apply(action);
            host.push_event(event);
        }
        host.push_event(HostEvent::AnimationFrame {
            rect: page.headline,
        });
        host.step();

        let outputs = host.take_outputs();
        for event in &outputs.events {
            info!(now_ms = now.as_millis() as u64, ?event, "lifecycle");
        }
        if frames % every == 0
            && let Some(frame) = outputs.last_frame
        {
            writeln!(out, "{}", frame.to_json_string()?)?;
        }
        frames += 1;
        now += FRAME;
    }
    out.flush()?;

    info!(frames, "session end");
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "session failed");
            ExitCode::FAILURE
        }
    }
}
