//! Server configuration.
//!
//! A small flat TOML file holds everything the process needs to start.
//! When the file is missing and stdin is a terminal, a short first-run
//! dialog creates it in place; otherwise startup fails so a service
//! manager never blocks on a prompt.

use crate::err::Result;
use crate::fs::util::expand_tilde;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{IsTerminal, Write};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 14400;
const DEFAULT_CONFIG_PATH: &str = "netdisc.toml";

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub machine_name: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub mount_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_tilde(path);
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("cannot read configuration '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("cannot parse configuration '{}': {}", path, e))?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let path = expand_tilde(path);
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, toml::to_string(self)?)?;
        Ok(())
    }
}

/// Answer checks for the first-run dialog. Each returns a message the
/// dialog shows before asking again.
fn check_machine_name(answer: &str) -> std::result::Result<(), String> {
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._ -]{0,63}$")
        .map_err(|e| e.to_string())?;
    if pattern.is_match(answer) {
        Ok(())
    } else {
        Err(format!(
            "names start with a letter or digit and may contain '.', '_', '-', spaces; '{}' does not",
            answer
        ))
    }
}

fn check_port(answer: &str) -> std::result::Result<(), String> {
    match answer.parse::<u16>() {
        Ok(p) if p >= 1024 => Ok(()),
        Ok(p) => Err(format!("port {} is reserved; pick one from 1024 up", p)),
        Err(_) => Err(format!("'{}' is not a port number", answer)),
    }
}

fn check_mount_dir(answer: &str) -> std::result::Result<(), String> {
    let expanded = expand_tilde(answer);
    if Path::new(&expanded).is_dir() {
        Ok(())
    } else {
        Err(format!("'{}' is not an existing directory", answer))
    }
}

/// Ask one question, retrying on rejected answers. An empty answer takes
/// the default when there is one. Gives up after a handful of attempts
/// rather than looping forever on garbage input.
fn ask(
    question: &str,
    default: Option<&str>,
    check: fn(&str) -> std::result::Result<(), String>,
) -> Result<String> {
    for _ in 0..5 {
        match default {
            Some(d) => print!("{} [{}]: ", question, d),
            None => print!("{}: ", question),
        }
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let mut answer = line.trim();
        if answer.is_empty() {
            if let Some(d) = default {
                answer = d;
            }
        }
        match check(answer) {
            Ok(()) => return Ok(answer.to_string()),
            Err(why) => eprintln!("  {}", why),
        }
    }
    Err(format!("no acceptable answer for '{}', giving up", question).into())
}

/// First-run dialog: collect the three settings and write the file.
pub fn bootstrap_config(save_path: &str) -> Result<Config> {
    println!("No configuration found; answer a few questions to create one.");

    let mount_dir = ask("Directory to share", None, check_mount_dir)?;
    let machine_name = ask("Name for this server", None, check_machine_name)?;
    let default_port = DEFAULT_PORT.to_string();
    let port = ask("Listen port", Some(&default_port), check_port)?
        .parse::<u16>()
        .map_err(|e| format!("port parse failed after validation: {}", e))?;

    let config = Config {
        machine_name,
        port,
        mount_dir,
    };
    config.save(save_path)?;
    println!("Configuration written to {}", save_path);
    Ok(config)
}

pub fn get_or_create_config(config_path: Option<&str>) -> Result<Config> {
    let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
    if Path::new(&expand_tilde(path)).exists() {
        return Config::load(path);
    }
    if !std::io::stdin().is_terminal() {
        return Err(format!(
            "configuration file '{}' not found and stdin is not a terminal; point --config at an existing file or run interactively once to create it",
            path
        )
        .into());
    }
    bootstrap_config(path)
}
