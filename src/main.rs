// #![forbid(unsafe_code)]
// #![deny(non_upper_case_globals)]
// #![deny(non_camel_case_types)]
// #![deny(non_snake_case)]
// #![deny(unused_mut)]
// #![deny(unused_variables)]
// #![deny(dead_code)]
// #![deny(unused_imports)]
//#![deny(missing_docs)]
//#![deny(warnings)]

extern crate chrono;
extern crate derivative;
extern crate lazy_static;
extern crate serde_derive;
extern crate uuid;

#[macro_use]
extern crate log;

#[macro_use]
extern crate derive_builder;

mod app;
mod configuration;
mod connection;
mod reporter;
mod time;

use log::LevelFilter;
use signal_hook::{iterator::Signals, SIGINT};
use std::{path::PathBuf, process::exit, thread};
use structopt::StructOpt;

use self::app::{cancel::Cancellation, engine::Engine, App};
use self::configuration::command_line::Opt;
use self::connection::websocket::WebSocketDialer;
use self::reporter::Reporter;

fn main() {
    let mut options = Opt::from_args();

    init_logging(options.take_log_level(), &options.log_output_file);

    let cancellation = Cancellation::new();
    let signals = Signals::new(&[SIGINT]).unwrap();
    let on_signal = cancellation.clone();
    thread::spawn(move || {
        for sig in signals.forever() {
            if on_signal.is_cancelled() {
                info!("Received signal {:?} again, exiting", sig);
                exit(0);
            }
            info!("Received signal {:?}, stopping after current runs", sig);
            on_signal.cancel();
        }
    });

    let tests = match options.resolve_tests() {
        Ok(tests) => tests,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };
    let reporter = match Reporter::new(options.dir.clone()) {
        Ok(reporter) => reporter,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let app = App::new(
        Engine::new(WebSocketDialer),
        reporter,
        tests,
        options.runs,
        cancellation,
    );
    app.run();
}

fn init_logging(level: LevelFilter, output: &Option<PathBuf>) {
    let mut dispatcher = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}:{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record
                    .line()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "".to_owned()),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_file) = output {
        dispatcher = dispatcher.chain(fern::log_file(log_file).unwrap())
    }
    dispatcher.apply().unwrap();
    info!("Logging level {} enabled", level);
}
