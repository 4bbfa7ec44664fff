// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Command-line surface
//!
//! Pipes are selected with `+name` and skipped with `-name`. Those tokens are
//! not options clap understands, so they are split out of argv first and the
//! remainder goes through an ordinary clap command built from the registered
//! presets.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::ConfigPreset;
use crate::errors::{PipeflowError, PipeflowResult};
use crate::pipeline::Registry;

/// Long options every pipeline defines itself
pub const RESERVED_OPTIONS: &[&str] = &[
    "help",
    "version",
    "config-file",
    "configure",
    "dump-config",
    "verbose",
    "quiet",
];

/// Text shown around the generated usage
#[derive(Debug, Clone, Default)]
pub struct CommandInfo {
    pub name: String,
    pub version: String,
    pub about: Option<String>,
    pub epilog: Option<String>,
}

/// Everything a command line asked for
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Pipes selected with `+name`, in the order given
    pub include: Vec<String>,
    /// Pipes skipped with `-name`
    pub exclude: Vec<String>,
    /// Long names of the presets whose flags were given
    pub presets: Vec<String>,
    pub config_file: Option<PathBuf>,
    /// Raw `Section.Key=value` overrides
    pub overrides: Vec<String>,
    pub dump_config: Option<PathBuf>,
    /// Net `-v` count, negative for `-q`
    pub verbosity: i8,
}

/// Split `+pipe` and `-pipe` tokens out of `args`
///
/// The first element is the program name and always stays. `+name` is always
/// a selection; it is mapped to the registered name when the argument form
/// matches and kept verbatim otherwise, so the resolver can warn about it.
/// `-name` is only an exclusion when it names a registered pipe, which keeps
/// short option clusters like `-vv` intact. Everything after `--` is passed
/// through untouched.
pub fn split_selections<I, T>(args: I, registry: &Registry) -> (Vec<OsString>, Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut remaining = Vec::new();
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut passthrough = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if i == 0 || passthrough {
            remaining.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            remaining.push(arg);
            continue;
        };

        if text == "--" {
            passthrough = true;
            remaining.push(arg);
        } else if let Some(name) = text.strip_prefix('+').filter(|n| !n.is_empty()) {
            include.push(canonical_name(registry, name));
        } else if let Some(pipe) = text
            .strip_prefix('-')
            .filter(|n| !n.starts_with('-') && n.chars().count() > 1)
            .and_then(|n| lookup(registry, n))
        {
            exclude.push(pipe);
        } else {
            remaining.push(arg);
        }
    }

    (remaining, include, exclude)
}

fn lookup(registry: &Registry, name: &str) -> Option<String> {
    registry
        .get(name)
        .or_else(|| registry.find_arg(name))
        .map(|p| p.name().to_string())
}

fn canonical_name(registry: &Registry, name: &str) -> String {
    lookup(registry, name).unwrap_or_else(|| name.to_string())
}

/// Build the clap command for a pipeline
pub fn build_command(info: &CommandInfo, registry: &Registry, presets: &[ConfigPreset]) -> Command {
    let mut cmd = Command::new(info.name.clone())
        .version(info.version.clone())
        .override_usage(format!("{} [OPTIONS] [+pipe ...] [-pipe ...]", info.name))
        .after_help(pipe_listing(registry, info.epilog.as_deref()))
        .arg(
            Arg::new("config-file")
                .short('c')
                .long("config-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file merged over the defaults"),
        )
        .arg(
            Arg::new("configure")
                .long("configure")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Override a configuration value, e.g. Build.Jobs=4"),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Write the active configuration to FILE"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More output, repeat for more detail"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only show warnings and errors"),
        );

    if let Some(about) = &info.about {
        cmd = cmd.about(about.clone());
    }

    for preset in presets {
        let mut arg = Arg::new(preset_id(preset))
            .long(preset.long.clone())
            .action(ArgAction::SetTrue);
        if let Some(short) = preset.short {
            arg = arg.short(short);
        }
        arg = match &preset.help {
            Some(help) => arg.help(help.clone()),
            None => arg.hide(true),
        };
        cmd = cmd.arg(arg);
    }

    cmd
}

fn preset_id(preset: &ConfigPreset) -> String {
    format!("preset:{}", preset.long)
}

fn pipe_listing(registry: &Registry, epilog: Option<&str>) -> String {
    let entries: Vec<(String, String)> = registry
        .iter()
        .filter_map(|p| p.help().map(|help| (format!("+{}", p.arg()), help)))
        .collect();

    let width = entries.iter().map(|(arg, _)| arg.len()).max().unwrap_or(0) + 2;
    let mut text = String::from("Pipes:\n");
    for (arg, help) in &entries {
        text.push_str(&format!("  {:<width$}{}\n", arg, help, width = width));
    }
    text.push_str("\n  +pipe runs a pipe and everything it needs; -pipe skips a pipe");

    if let Some(epilog) = epilog {
        text.push_str("\n\n");
        text.push_str(epilog);
    }
    text
}

/// Parse a full command line
///
/// `--help` and `--version` print and exit the process the way clap normally
/// does; every other clap error is returned.
pub fn parse_invocation<I, T>(
    info: &CommandInfo,
    registry: &Registry,
    presets: &[ConfigPreset],
    args: I,
) -> PipeflowResult<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let (remaining, include, exclude) = split_selections(args, registry);
    let cmd = build_command(info, registry, presets);

    let matches = match cmd.try_get_matches_from(remaining) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            return Err(PipeflowError::Arguments {
                message: e.render().to_string(),
            })
        }
    };

    Ok(invocation_from(&matches, presets, include, exclude))
}

fn invocation_from(
    matches: &ArgMatches,
    presets: &[ConfigPreset],
    include: Vec<String>,
    exclude: Vec<String>,
) -> Invocation {
    let verbose = matches.get_count("verbose").min(i8::MAX as u8) as i8;
    let verbosity = if matches.get_flag("quiet") { -1 } else { verbose };

    Invocation {
        include,
        exclude,
        presets: presets
            .iter()
            .filter(|p| matches.get_flag(&preset_id(p)))
            .map(|p| p.long.clone())
            .collect(),
        config_file: matches.get_one::<PathBuf>("config-file").cloned(),
        overrides: matches
            .get_many::<String>("configure")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        dump_config: matches.get_one::<PathBuf>("dump-config").cloned(),
        verbosity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipe;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert(Pipe::builder("fetch").build().unwrap()).unwrap();
        registry
            .insert(Pipe::builder("run_tests").help("Run the test suite").build().unwrap())
            .unwrap();
        registry
            .insert(Pipe::builder("secret").hide_help().build().unwrap())
            .unwrap();
        registry
    }

    fn info() -> CommandInfo {
        CommandInfo {
            name: "demo".into(),
            version: "1.0".into(),
            ..Default::default()
        }
    }

    fn presets() -> Vec<ConfigPreset> {
        vec![ConfigPreset::from_yaml("dry-run", "System: {DryRun: true}")
            .unwrap()
            .short('n')
            .help("Print the plan without running it")]
    }

    #[test]
    fn test_split_selections() {
        let registry = registry();
        let (rest, include, exclude) =
            split_selections(["demo", "+fetch", "-vv", "+run-tests", "-fetch", "+nope"], &registry);

        assert_eq!(rest, vec![OsString::from("demo"), OsString::from("-vv")]);
        assert_eq!(include, vec!["fetch", "run_tests", "nope"]);
        assert_eq!(exclude, vec!["fetch"]);
    }

    #[test]
    fn test_double_dash_passthrough() {
        let registry = registry();
        let (rest, include, _) = split_selections(["demo", "--", "+fetch"], &registry);
        assert!(include.is_empty());
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_parse_invocation() {
        let registry = registry();
        let invocation = parse_invocation(
            &info(),
            &registry,
            &presets(),
            [
                "demo",
                "+fetch",
                "-n",
                "-c",
                "pipeline.yaml",
                "--configure",
                "Build.Jobs=4",
                "--configure",
                "Build.Target=release",
                "-v",
            ],
        )
        .unwrap();

        assert_eq!(invocation.include, vec!["fetch"]);
        assert_eq!(invocation.presets, vec!["dry-run"]);
        assert_eq!(invocation.config_file, Some(PathBuf::from("pipeline.yaml")));
        assert_eq!(invocation.overrides, vec!["Build.Jobs=4", "Build.Target=release"]);
        assert_eq!(invocation.verbosity, 1);
    }

    #[test]
    fn test_quiet() {
        let invocation = parse_invocation(&info(), &registry(), &[], ["demo", "-q"]).unwrap();
        assert_eq!(invocation.verbosity, -1);
    }

    #[test]
    fn test_unknown_option_is_an_error() {
        let err = parse_invocation(&info(), &registry(), &[], ["demo", "--bogus"]).unwrap_err();
        assert!(matches!(err, PipeflowError::Arguments { .. }));
    }

    #[test]
    fn test_help_lists_visible_pipes() {
        let listing = pipe_listing(&registry(), Some("See the docs."));
        assert!(listing.contains("+fetch"));
        assert!(listing.contains("pipe fetch"));
        assert!(listing.contains("+run-tests"));
        assert!(listing.contains("Run the test suite"));
        assert!(!listing.contains("secret"));
        assert!(listing.ends_with("See the docs."));
    }

    #[test]
    fn test_command_is_well_formed() {
        build_command(&info(), &registry(), &presets()).debug_assert();
    }
}
