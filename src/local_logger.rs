use std::{
    env,
    io::Write,
    sync::Mutex,
    time::{Duration, Instant},
};

use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log};
use simplelog::{CombinedLogger, SharedLogger};

use crate::helpers::format_duration;
use crate::logger::{GroupEvent, get_group_event};
use crate::prelude::*;

pub const LOG_LEVEL_ENV: &str = "PERF_SHARDING_LOG";
pub const ACCENT_U8_COLOR_CODE: u8 = 33; // #0087FF

/// A group being displayed: its spinner (TTY only) and when it started.
struct ActiveGroup {
    name: String,
    started_at: Instant,
    spinner: Option<ProgressBar>,
}

lazy_static! {
    static ref ACTIVE_GROUP: Mutex<Option<ActiveGroup>> = Mutex::new(None);
    static ref IS_TTY: bool = std::io::IsTerminal::is_terminal(&std::io::stdout());
}

fn with_spinner_suspended<R>(f: impl FnOnce() -> R) -> R {
    if let Ok(group) = ACTIVE_GROUP.lock() {
        if let Some(spinner) = group.as_ref().and_then(|g| g.spinner.as_ref()) {
            return spinner.suspend(f);
        }
    }
    f()
}

fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => Style::new().red(),
        Level::Warn => Style::new().yellow(),
        Level::Info => Style::new().white(),
        Level::Debug => Style::new().blue().dim(),
        Level::Trace => Style::new().black().dim(),
    }
}

fn format_record(record: &log::Record) -> String {
    let message = match record.level() {
        Level::Debug | Level::Trace => {
            format!("[{}::{}] {}", record.level(), record.target(), record.args())
        }
        _ => record.args().to_string(),
    };
    level_style(record.level()).apply_to(message).to_string()
}

/// Console logger: warnings and errors on stderr, the rest on stdout, and a
/// spinner while a group (e.g. the timing fetch) is running.
pub struct LocalLogger {
    max_level: LevelFilter,
}

impl LocalLogger {
    pub fn from_env() -> Self {
        Self {
            max_level: parse_level(env::var(LOG_LEVEL_ENV).ok().as_deref()),
        }
    }

    fn open_group(&self, name: String) {
        clean_logger();
        println!(
            "\n{}",
            style(format!("►►► {name}"))
                .bold()
                .color256(ACCENT_U8_COLOR_CODE)
        );

        let spinner = IS_TTY.then(|| {
            let spinner = ProgressBar::new_spinner();
            let template = format!("  {{spinner:.{ACCENT_U8_COLOR_CODE}}} {{wide_msg}}");
            if let Ok(progress_style) = ProgressStyle::with_template(&template) {
                spinner.set_style(progress_style);
            }
            spinner.set_message(format!("{name}..."));
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        });
        if let Ok(mut group) = ACTIVE_GROUP.lock() {
            *group = Some(ActiveGroup {
                name,
                started_at: Instant::now(),
                spinner,
            });
        }
    }

    fn close_group(&self) {
        let Some(group) = ACTIVE_GROUP.lock().ok().and_then(|mut group| group.take()) else {
            return;
        };
        if let Some(spinner) = group.spinner {
            spinner.finish_and_clear();
        }
        if self.max_level >= LevelFilter::Debug {
            let elapsed = group.started_at.elapsed().as_secs_f64();
            println!(
                "{}",
                level_style(Level::Debug)
                    .apply_to(format!("{} took {}", group.name, format_duration(elapsed, None)))
            );
        }
    }
}

impl Log for LocalLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match get_group_event(record) {
            Some(GroupEvent::Start(name)) => self.open_group(name),
            Some(GroupEvent::End) => self.close_group(),
            None => with_spinner_suspended(|| {
                let line = format_record(record);
                match record.level() {
                    Level::Error | Level::Warn => eprintln!("{line}"),
                    _ => println!("{line}"),
                }
            }),
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

impl SharedLogger for LocalLogger {
    fn level(&self) -> LevelFilter {
        self.max_level
    }

    fn config(&self) -> Option<&simplelog::Config> {
        None
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

pub fn init_local_logger() -> Result<()> {
    let logger: Box<dyn SharedLogger> = Box::new(LocalLogger::from_env());
    CombinedLogger::init(vec![logger])?;
    Ok(())
}

/// Clear the spinner of the running group, if any, so that a final error
/// message is not overwritten.
pub fn clean_logger() {
    if let Ok(mut group) = ACTIVE_GROUP.lock() {
        if let Some(spinner) = group.take().and_then(|g| g.spinner) {
            spinner.finish_and_clear();
        }
    }
}
