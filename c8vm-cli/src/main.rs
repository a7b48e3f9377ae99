//! Entrypoint for CLI
use std::{env, error::Error, fs, time::Instant};

use c8vm::{constants::DELAY_FREQUENCY, prelude::*};
use log::{debug, error, info, LevelFilter};

use self::{config::RunConfig, error::AppError};

mod config;
mod error;

static USAGE: &str = r#"
usage: c8vm CMD [OPTIONS] FILE

commands:
    run     Run the target ROM file, then print the final screen
    dis     Disassemble the target ROM into readable assembly

run options:
    --config FILE   Load settings from a YAML file
    --frames N      Number of 60Hz frames to run
    --keys CHARS    Hold down keys for the whole run, using the QWERTY layout
                        1 2 3 4        1 2 3 C
                        Q W E R   =>   4 5 6 D
                        A S D F        7 8 9 E
                        Z X C V        A 0 B F
    --fast          Run frames as fast as possible

examples:
    c8vm run maze.rom
    c8vm run --frames 300 --keys qe pong.rom
    c8vm dis maze.rom

environment:
    RUST_LOG        Log level, ie. trace to see every executed instruction
"#;

fn run_rom(filepath: &str, args: RunArgs) -> Result<(), AppError> {
    let mut config = match args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    if args.fast {
        config.throttle = false;
    }
    config.keys.extend(args.keys);

    let bytecode = fs::read(filepath)?;
    let mut vm = Chip8Vm::new(config.vm.clone());
    vm.load_program(&bytecode)?;
    info!("loaded {filepath} ({} bytes)", bytecode.len());
    debug!("program memory:\n{}", vm.dump_ram(bytecode.len())?);

    for key in &config.keys {
        vm.set_key(*key, true);
    }
    if !config.keys.is_empty() {
        debug!("{}", vm.dump_keys()?);
    }

    let steps_per_frame = vm.config().steps_per_frame();
    let external_timers = vm.config().timers == TimerMode::External;
    let mut clock = Clock::from_hz(Hz(DELAY_FREQUENCY));
    let mut result = Ok(());
    let mut frames_run = 0;

    let start = Instant::now();
    'frames: for frame in 0..config.frames {
        for _ in 0..steps_per_frame {
            match vm.step() {
                Ok(Outcome { flow, tone }) => {
                    if tone {
                        info!("beep (frame {frame})");
                    }
                    // Nothing changes until a key is pressed.
                    if flow == Flow::KeyWait {
                        break;
                    }
                }
                // Already logged by the machine.
                Err(Chip8Error::UnknownOpcode { tone, .. }) => {
                    if tone {
                        info!("beep (frame {frame})");
                    }
                }
                Err(err) => {
                    error!("machine halted at frame {frame}: {err}");
                    result = Err(err);
                    break 'frames;
                }
            }
        }

        if external_timers && vm.tick_timers() {
            info!("beep (frame {frame})");
        }

        if vm.is_display_dirty() {
            debug!("display changed (frame {frame})");
            vm.clear_display_dirty();
        }

        frames_run += 1;
        if config.throttle {
            clock.wait();
        }
    }

    info!(
        "ran {frames_run} frames in {}ms",
        start.elapsed().as_nanos() as f64 / 1000000.0
    );
    println!("{}", vm.dump_display()?);

    result?;

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    let bytecode = fs::read(filepath)?;
    print!("{}", Disassembler::new(&bytecode).listing()?);

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let result = match parse_args(env::args().skip(1)) {
        Ok(Cmd::Run { filepath, args }) => run_rom(&filepath, args),
        Ok(Cmd::Dis { filepath }) => run_disassembler(&filepath),
        Err(err) => Err(err),
    };

    match result {
        Err(err) if err.is_usage() => {
            eprintln!("{}", err.kind);
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
        Err(err) => Err(err.into()),
        Ok(()) => Ok(()),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    match args.next().as_deref() {
        Some("run") => {
            let mut run_args = RunArgs::default();
            loop {
                let arg = consume_arg(&mut args, "missing ROM file")?;
                match arg.as_str() {
                    "--config" => {
                        run_args.config = Some(consume_arg(&mut args, "missing config file")?);
                    }
                    "--frames" => {
                        let frames = consume_arg(&mut args, "missing frame count")?;
                        match frames.parse() {
                            Ok(frames) => run_args.frames = Some(frames),
                            Err(_) => {
                                return Err(AppError::usage(format!("invalid frame count: {frames}")))
                            }
                        }
                    }
                    "--keys" => {
                        let keys = consume_arg(&mut args, "missing keys")?;
                        run_args.keys = parse_keys(&keys)?;
                    }
                    "--fast" => run_args.fast = true,
                    flag if flag.starts_with("--") => {
                        return Err(AppError::usage(format!("unknown option: {flag}")))
                    }
                    _ => {
                        return Ok(Cmd::Run {
                            filepath: arg,
                            args: run_args,
                        })
                    }
                }
            }
        }
        Some("dis") => Ok(Cmd::Dis {
            filepath: consume_arg(&mut args, "missing ROM file")?,
        }),
        Some(cmd) => Err(AppError::usage(format!("unknown command: {cmd}"))),
        None => Err(AppError::usage("missing command")),
    }
}

/// Consumes the next argument, failing with a usage error if it doesn't exist.
fn consume_arg(
    args: &mut impl Iterator<Item = String>,
    missing: &str,
) -> Result<String, AppError> {
    args.next().ok_or_else(|| AppError::usage(missing))
}

fn parse_keys(chars: &str) -> Result<Vec<KeyCode>, AppError> {
    chars
        .chars()
        .map(|c| {
            KeyCode::from_qwerty(c)
                .ok_or_else(|| AppError::usage(format!("no keypad key mapped to '{c}'")))
        })
        .collect()
}

fn print_usage() {
    println!("c8vm v{}", env!("CARGO_PKG_VERSION"));
    println!("{USAGE}");
}

#[derive(Debug, PartialEq, Eq)]
enum Cmd {
    /// Run file
    Run { filepath: String, args: RunArgs },
    /// Disassemble
    Dis { filepath: String },
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunArgs {
    config: Option<String>,
    frames: Option<u64>,
    keys: Vec<KeyCode>,
    fast: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(line: &str) -> impl Iterator<Item = String> + '_ {
        line.split_whitespace().map(String::from)
    }

    #[test]
    fn test_parse_run() {
        let cmd = parse_args(args("run --frames 30 --keys wV --fast maze.rom")).unwrap();
        assert_eq!(
            cmd,
            Cmd::Run {
                filepath: "maze.rom".to_string(),
                args: RunArgs {
                    config: None,
                    frames: Some(30),
                    keys: vec![KeyCode::Key5, KeyCode::KeyF],
                    fast: true,
                }
            }
        );
    }

    #[test]
    fn test_parse_dis() {
        let cmd = parse_args(args("dis maze.rom")).unwrap();
        assert_eq!(
            cmd,
            Cmd::Dis {
                filepath: "maze.rom".to_string()
            }
        );
    }

    #[test]
    fn test_usage_errors() {
        for line in [
            "",
            "asm maze.asm",
            "run",
            "run --frames",
            "run --frames ten maze.rom",
            "run --keys t maze.rom",
            "run --turbo maze.rom",
            "dis",
        ] {
            let err = parse_args(args(line)).unwrap_err();
            assert!(err.is_usage(), "{line}");
        }
    }
}
