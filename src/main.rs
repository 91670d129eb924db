// Copyright (c) 2026 rezky_nightky

mod cell;
mod charset;
mod cloud;
mod colorfile;
mod config;
mod droplet;
mod frame;
mod maps;
mod message;
mod palette;
mod pools;
mod rng;
mod runtime;
mod sink;
mod terminal;

use std::fs::File;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::thread;

use anyhow::Context;
use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use log::{debug, info};

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::cloud::Cloud;
use crate::config::{color_enabled_stdout, Args, Settings};
use crate::frame::Frame;
use crate::palette::{build_palette, build_user_palette, Palette};
use crate::runtime::ColorScheme;
use crate::terminal::{restore_terminal_best_effort, Terminal};

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

const PROFILE_FILE: &str = "time_profile.txt";
const MAX_SPEED: f32 = 1000.0;
const MIN_DENSITY: f32 = 0.01;
const MAX_DENSITY: f32 = 5.0;

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn build_info() -> String {
    let sha = env!("GLYPHFALL_GIT_SHA");
    if sha.is_empty() {
        env!("GLYPHFALL_BUILD").to_string()
    } else {
        format!("{} ({})", env!("GLYPHFALL_BUILD"), sha)
    }
}

fn install_hooks() {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    #[cfg(unix)]
    {
        if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            thread::spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    restore_terminal_best_effort();
                    std::process::exit(128 + sig);
                }
            });
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            restore_terminal_best_effort();
            std::process::exit(130);
        }) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }
}

fn parse_args() -> Args {
    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();

    if cmd.get_arguments().any(|a| a.get_id().as_str() == "help") {
        cmd = cmd.mut_arg("help", |a| a.help_heading("HELP"));
    }

    let matches = cmd.get_matches();
    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_profile_log() -> anyhow::Result<()> {
    let file = File::create(PROFILE_FILE)
        .with_context(|| format!("could not create {}", PROFILE_FILE))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("could not initialise logging")?;
    Ok(())
}

fn palette_for(settings: &Settings, scheme: ColorScheme) -> Palette {
    if scheme == ColorScheme::User && !settings.user_colors.is_empty() {
        build_user_palette(&settings.user_colors, settings.color_mode)
    } else {
        build_palette(scheme, settings.color_mode, settings.default_background)
    }
}

fn scheme_for_key(c: char) -> Option<ColorScheme> {
    Some(match c {
        '1' => ColorScheme::Green,
        '2' => ColorScheme::Green2,
        '3' => ColorScheme::Green3,
        '4' => ColorScheme::Gold,
        '5' => ColorScheme::Pink2,
        '6' => ColorScheme::Red,
        '7' => ColorScheme::Blue,
        '8' => ColorScheme::Cyan,
        '9' => ColorScheme::Purple,
        '0' => ColorScheme::Gray,
        '!' => ColorScheme::Rainbow,
        '@' => ColorScheme::Yellow,
        '#' => ColorScheme::Orange,
        '$' => ColorScheme::Pink,
        '%' => ColorScheme::Vaporwave,
        _ => return None,
    })
}

fn speed_up(cps: f32) -> f32 {
    let cps = if cps <= 0.5 { cps * 2.0 } else { cps + 1.0 };
    cps.min(MAX_SPEED)
}

fn speed_down(cps: f32) -> f32 {
    if cps <= 1.0 {
        cps / 2.0
    } else {
        cps - 1.0
    }
}

/// What a key press asks of the main loop.
#[derive(Debug, PartialEq)]
enum Action {
    None,
    Quit,
    Reset,
}

fn handle_key(
    code: KeyCode,
    modifiers: KeyModifiers,
    cloud: &mut Cloud,
    settings: &Settings,
    palette: &mut Palette,
    now: Instant,
) -> Action {
    match (code, modifiers) {
        (KeyCode::Esc, _) | (KeyCode::Char('q'), _) => return Action::Quit,
        (KeyCode::Char(' '), _) => return Action::Reset,
        (KeyCode::Char('a'), _) => {
            let on = !cloud.config().async_mode;
            cloud.set_async(on);
        }
        (KeyCode::Char('p'), _) => cloud.toggle_pause(now),
        (KeyCode::Up, _) => {
            let cps = speed_up(cloud.config().chars_per_sec);
            cloud.set_chars_per_sec(cps);
        }
        (KeyCode::Down, _) => {
            let cps = speed_down(cloud.config().chars_per_sec);
            cloud.set_chars_per_sec(cps);
        }
        (KeyCode::Left, _) => {
            if cloud.config().glitchy {
                let gp = (cloud.config().glitch_pct - 0.05).max(0.0);
                cloud.set_glitch_pct(gp);
            }
        }
        (KeyCode::Right, _) => {
            if cloud.config().glitchy {
                let gp = (cloud.config().glitch_pct + 0.05).min(1.0);
                cloud.set_glitch_pct(gp);
            }
        }
        (KeyCode::Tab, _) => {
            let sm = cloud.config().shading_mode.toggled();
            cloud.set_shading_mode(sm);
        }
        (KeyCode::Char('-'), _) => {
            let d = (cloud.config().droplet_density - 0.25).max(MIN_DENSITY);
            cloud.set_droplet_density(d);
        }
        (KeyCode::Char('+'), _) | (KeyCode::Char('='), KeyModifiers::SHIFT) => {
            let d = (cloud.config().droplet_density + 0.25).min(MAX_DENSITY);
            cloud.set_droplet_density(d);
        }
        (KeyCode::Char(c), _) => {
            if let Some(scheme) = scheme_for_key(c) {
                *palette = palette_for(settings, scheme);
                cloud.set_num_pairs(palette.num_pairs());
                debug!("palette switched to {:?}", scheme);
            }
        }
        _ => {}
    }
    Action::None
}

fn run(settings: Settings) -> anyhow::Result<()> {
    let mut palette = palette_for(&settings, settings.scheme);

    let mut term = Terminal::new().context("could not initialise the terminal")?;
    let (w, h) = term.size()?;

    let mut cloud = Cloud::new(
        settings.rain.clone(),
        &settings.chars,
        palette.num_pairs(),
        h,
        w,
        Instant::now(),
    );
    let mut frame = Frame::new(w, h);

    let target_period = Duration::from_secs_f64(1.0 / settings.fps);
    let mut next_frame = Instant::now();
    let mut raining = true;

    while raining {
        let mut pending_reset: Option<(u16, u16)> = None;

        loop {
            while Terminal::poll_event(Duration::from_millis(0))? {
                match Terminal::read_event()? {
                    Event::Resize(nw, nh) => pending_reset = Some((nw, nh)),
                    Event::Key(k) if k.kind == KeyEventKind::Press => {
                        if settings.screensaver {
                            raining = false;
                            break;
                        }
                        let now = Instant::now();
                        match handle_key(k.code, k.modifiers, &mut cloud, &settings, &mut palette, now)
                        {
                            Action::Quit => raining = false,
                            Action::Reset => pending_reset = Some((frame.width, frame.height)),
                            Action::None => {}
                        }
                    }
                    _ => {}
                }
            }

            if !raining || pending_reset.is_some() {
                break;
            }

            let now = Instant::now();
            if now >= next_frame {
                break;
            }
            let _ = Terminal::poll_event(next_frame - now)?;
        }

        if !raining {
            break;
        }

        let now = Instant::now();
        if let Some((nw, nh)) = pending_reset {
            cloud.reset(nh, nw, now);
            frame = Frame::new(nw, nh);
            cloud.force_draw_everything();
        }

        let app_start = Instant::now();
        cloud.rain(&mut frame, now);
        let app_ns = app_start.elapsed().as_nanos();

        let refresh_start = Instant::now();
        if frame.has_changes() {
            term.draw(&mut frame, &palette)?;
        }
        let refresh_ns = refresh_start.elapsed().as_nanos();

        if settings.profile {
            info!(target: "profile", "app_ns={} refresh_ns={}", app_ns, refresh_ns);
        }

        next_frame += target_period;
        let now = Instant::now();
        if now > next_frame {
            next_frame = now;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    install_hooks();

    let args = parse_args();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    let settings = match Settings::from_args(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };

    if settings.profile {
        init_profile_log()?;
    }
    debug!(
        "starting: {} chars, {:?}, {:?}",
        settings.chars.len(),
        settings.color_mode,
        settings.scheme
    );

    run(settings)
}
