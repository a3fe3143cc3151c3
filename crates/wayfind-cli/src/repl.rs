//! REPL – drive a simulated wayfinding session from the terminal.
//!
//! The device side (permission dialog, GPS, camera, AR session, path solver)
//! is a [`SimRig`]; commands poke the rig and then advance the session.
//!
//! Supported slash-commands:
//!   /status                   – access state, surface, floor, route
//!   /grant                    – grant location permission
//!   /fix <lat> <lon>          – set the simulated GPS fix
//!   /gps <on|off|fail|init>   – location service state
//!   /tick [secs]              – advance the session clock (default 1 s)
//!   /retry                    – retry from the error panel
//!   /scan <payload>           – show a marker to the camera
//!   /floor <entrance>         – recenter at a named entrance
//!   /options                  – list destinations on the active floor
//!   /select <n>               – choose destination option n
//!   /toggle                   – show/hide the path
//!   /offset <y>               – vertical path offset in meters
//!   /move <x> <y> <z>         – move the camera
//!   /help                     – show this list
//!   /quit | /exit             – end the session and exit

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use wayfind_hal::LocationStatus;
use wayfind_hal::sim::{PayloadDecoder, SimRig};
use wayfind_middleware::{Topic, TopicReceiver};
use wayfind_perception::RecenterOutcome;
use wayfind_runtime::{RouteStatus, Surface, WayfindSession};
use wayfind_types::{EventPayload, GeoPoint, Vec3};

/// A parsed slash-command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Grant,
    Fix(GeoPoint),
    Gps(GpsMode),
    Tick(Duration),
    Retry,
    Scan(String),
    Floor(String),
    Options,
    Select(usize),
    Toggle,
    Offset(f32),
    Move(Vec3),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsMode {
    On,
    Off,
    Fail,
    Init,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = parts.collect();

        let cmd = match (head, args.as_slice()) {
            ("/status", []) => Self::Status,
            ("/grant", []) => Self::Grant,
            ("/fix", [lat, lon]) => Self::Fix(GeoPoint::new(number(lat)?, number(lon)?)),
            ("/gps", [mode]) => Self::Gps(match *mode {
                "on" => GpsMode::On,
                "off" => GpsMode::Off,
                "fail" => GpsMode::Fail,
                "init" => GpsMode::Init,
                other => return Err(format!("unknown gps mode '{other}' (on|off|fail|init)")),
            }),
            ("/tick", []) => Self::Tick(Duration::from_secs(1)),
            ("/tick", [secs]) => {
                let secs: f64 = number(secs)?;
                Self::Tick(
                    Duration::try_from_secs_f64(secs)
                        .map_err(|_| format!("'{secs}' is not a valid duration"))?,
                )
            }
            ("/retry", []) => Self::Retry,
            ("/scan", payload) => Self::Scan(payload.join(" ")),
            ("/floor", [name]) => Self::Floor(name.to_string()),
            ("/options", []) => Self::Options,
            ("/select", [n]) => Self::Select(number(n)?),
            ("/toggle", []) => Self::Toggle,
            ("/offset", [y]) => Self::Offset(number(y)?),
            ("/move", [x, y, z]) => Self::Move(Vec3::new(number(x)?, number(y)?, number(z)?)),
            ("/help", []) => Self::Help,
            ("/quit" | "/exit", []) => Self::Quit,
            (other, _) => return Err(format!("unknown command or arguments: '{other}'")),
        };
        Ok(cmd)
    }
}

fn number<T: std::str::FromStr>(raw: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid number"))
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The session plus the simulated device it runs on.
pub struct Shell {
    session: WayfindSession,
    rig: SimRig,
    camera: Vec3,
    feeds: Vec<TopicReceiver>,
}

impl Shell {
    pub fn new(session: WayfindSession, rig: SimRig) -> Self {
        let feeds = [Topic::Access, Topic::Scanning, Topic::Navigation]
            .into_iter()
            .map(|t| session.bus().subscribe_to(t))
            .collect();
        Self {
            session,
            rig,
            camera: Vec3::zero(),
            feeds,
        }
    }

    pub fn session(&self) -> &WayfindSession {
        &self.session
    }

    pub fn execute(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Status => self.print_status(),
            Command::Grant => {
                self.rig.permission.grant();
                self.session.tick(Duration::ZERO, self.camera);
            }
            Command::Fix(fix) => {
                self.rig.location.set_fix(fix);
                println!("  GPS fix set to {}", fix.to_string().yellow());
            }
            Command::Gps(mode) => {
                match mode {
                    GpsMode::On => {
                        self.rig.location.set_enabled(true);
                        self.rig.location.set_status(LocationStatus::Running);
                    }
                    GpsMode::Off => self.rig.location.set_enabled(false),
                    GpsMode::Fail => self.rig.location.set_status(LocationStatus::Failed),
                    GpsMode::Init => self.rig.location.set_status(LocationStatus::Initializing),
                }
                println!("  location service: {mode:?}");
            }
            Command::Tick(dt) => {
                let route = self.session.tick(dt, self.camera);
                println!("  advanced {:.1}s – route: {}", dt.as_secs_f64(), describe_route(route));
            }
            Command::Retry => {
                if !self.session.retry() {
                    println!("  {}", "Retry ignored (a check is already running or not allowed).".yellow());
                }
            }
            Command::Scan(payload) => {
                let outcome = self.session.on_frame(&PayloadDecoder::frame_for(&payload));
                print_outcome(&outcome);
            }
            Command::Floor(name) => {
                let outcome = self.session.select_floor(&name);
                print_outcome(&outcome);
            }
            Command::Options => {
                for (i, option) in self.session.destination_options().iter().enumerate() {
                    println!("  {:>2}) {}", i, option);
                }
            }
            Command::Select(index) => match self.session.select_destination(index) {
                Ok(()) => {
                    let route = self.session.tick(Duration::ZERO, self.camera);
                    println!("  route: {}", describe_route(route));
                }
                Err(e) => println!("  {}: {}", "Cannot select".red(), e),
            },
            Command::Toggle => {
                self.session.toggle_visibility();
                let visible = self.session.router().session().visible();
                println!("  path {}", if visible { "shown" } else { "hidden" });
            }
            Command::Offset(y) => {
                self.session.set_vertical_offset(y);
                println!("  vertical offset {y:+.2} m");
            }
            Command::Move(position) => {
                self.camera = position;
                let route = self.session.tick(Duration::ZERO, self.camera);
                println!("  camera at ({:.2}, {:.2}, {:.2}) – route: {}", position.x, position.y, position.z, describe_route(route));
            }
            Command::Help => print_help(),
            Command::Quit => {
                self.session.stop();
                return Flow::Quit;
            }
        }
        self.print_events();
        Flow::Continue
    }

    fn print_status(&self) {
        let nav = self.session.router().session();
        println!("{}", "Session".bold().underline());
        println!("  access   : {}", self.session.status_message().yellow());
        println!("  surface  : {}", describe_surface(self.session.surface()));
        println!("  floor    : {}", nav.active_floor());
        println!(
            "  target   : {}",
            nav.selected_target().map(|t| t.name.as_str()).unwrap_or("–")
        );
        println!("  route    : {}", describe_route(self.session.router().route()));
        if let Some(notice) = self.session.notice() {
            println!("  last scan: {}", notice);
        }
    }

    fn print_events(&mut self) {
        for feed in &mut self.feeds {
            for event in feed.drain() {
                let text = match event.payload {
                    EventPayload::AccessChanged { status } => format!("access: {status}"),
                    EventPayload::SessionUnlocked => "session unlocked".to_string(),
                    EventPayload::Recentered { target, floor } => {
                        format!("recentered at {target} (floor {floor})")
                    }
                    EventPayload::FloorChanged { floor } => format!("active floor {floor}"),
                    EventPayload::RouteUnavailable { target } => {
                        format!("no path to {target}")
                    }
                };
                println!("  {} {}", "•".cyan(), text.dimmed());
            }
        }
    }
}

fn describe_route(route: RouteStatus) -> String {
    match route {
        RouteStatus::Idle => "idle".to_string(),
        RouteStatus::Routed { corners } => format!("{corners} corners"),
        RouteStatus::NoPath => "no path".to_string(),
    }
}

fn describe_surface(surface: &Surface) -> String {
    match surface {
        Surface::Hidden => "hidden".to_string(),
        Surface::Scanner { message } => format!("scanner – {message}"),
        Surface::Error { message } => format!("error – {message}"),
        Surface::Navigation => "navigation".to_string(),
    }
}

fn print_outcome(outcome: &RecenterOutcome) {
    match outcome.status_message() {
        Some(message) if outcome.is_recentered() => println!("  {} {}", "✓".green(), message),
        Some(message) => println!("  {}", message.yellow()),
        None => println!("  {}", format!("({outcome:?})").dimmed()),
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the session is stopped and
/// the REPL exits.
pub fn run(mut shell: Shell, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            shell.execute(Command::Quit);
            break;
        }

        print!("{} ", "wayfind>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                shell.execute(Command::Quit);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                shell.execute(Command::Quit);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(cmd) => {
                if shell.execute(cmd) == Flow::Quit {
                    println!("{}", "Goodbye.".green());
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.yellow(),
                "/help".bold()
            ),
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Wayfind Commands".bold().underline());
    let rows = [
        ("/status", "access state, surface, floor and route"),
        ("/grant", "grant location permission"),
        ("/fix <lat> <lon>", "set the simulated GPS fix"),
        ("/gps <on|off|fail|init>", "location service state"),
        ("/tick [secs]", "advance the session clock"),
        ("/retry", "retry the location check"),
        ("/scan <payload>", "show a marker to the camera"),
        ("/floor <entrance>", "recenter at a named entrance"),
        ("/options", "destinations on the active floor"),
        ("/select <n>", "choose a destination"),
        ("/toggle", "show or hide the path"),
        ("/offset <y>", "vertical path offset in meters"),
        ("/move <x> <y> <z>", "move the camera"),
        ("/quit  /exit", "exit the CLI"),
    ];
    for (cmd, what) in rows {
        println!("  {:<24} – {}", cmd.bold().cyan(), what);
    }
    println!();
}
