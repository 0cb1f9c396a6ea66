use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use streamgrab_core::BROWSER_USER_AGENT;
use streamgrab_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Args;

/// Which flags the operator typed; config file values never override these.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) engine: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
    pub(crate) settle_ms: bool,
    pub(crate) api_timeout_secs: bool,
    pub(crate) no_mobile: bool,
    pub(crate) chrome: bool,
}

/// HTTP identity and download timeouts after merging config defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpSettings {
    pub(crate) user_agent: String,
    pub(crate) referer: Option<String>,
    pub(crate) download_connect_timeout: Duration,
    pub(crate) download_read_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            referer: None,
            download_connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            download_read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    (args, sources_from_matches(&matches))
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        output_dir: is_commandline_value(matches, "output_dir"),
        engine: is_commandline_value(matches, "engine"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
        settle_ms: is_commandline_value(matches, "settle_ms"),
        api_timeout_secs: is_commandline_value(matches, "api_timeout_secs"),
        no_mobile: is_commandline_value(matches, "no_mobile"),
        chrome: is_commandline_value(matches, "chrome"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills every flag the operator did not type from the config file.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.output_dir
        && let Some(output_dir) = &file_config.output_dir
    {
        args.output_dir = Some(output_dir.clone());
    }

    if !cli_sources.engine
        && let Some(engine) = file_config.engine
    {
        args.engine = engine;
    }

    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(verbosity) = file_config.verbosity
    {
        apply_config_verbosity(&mut args, verbosity);
    }

    if !cli_sources.settle_ms
        && let Some(settle_ms) = file_config.settle_ms
    {
        args.settle_ms = settle_ms;
    }

    if !cli_sources.api_timeout_secs
        && let Some(api_timeout_secs) = file_config.api_timeout_secs
    {
        args.api_timeout_secs = api_timeout_secs;
    }

    if !cli_sources.no_mobile
        && let Some(mobile_rewrite) = file_config.mobile_rewrite
    {
        args.no_mobile = !mobile_rewrite;
    }

    if !cli_sources.chrome
        && let Some(chrome_path) = &file_config.chrome_path
    {
        args.chrome = Some(chrome_path.clone());
    }

    args
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.verbose = 0;
        }
        VerbositySetting::Verbose => {
            args.quiet = false;
            args.verbose = 1;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.verbose = 0;
        }
    }
}

pub(crate) fn resolve_http_settings(file_config: Option<&FileConfig>) -> HttpSettings {
    let mut settings = HttpSettings::default();
    let Some(file_config) = file_config else {
        return settings;
    };

    if let Some(user_agent) = &file_config.user_agent {
        settings.user_agent.clone_from(user_agent);
    }
    if let Some(referer) = &file_config.referer {
        settings.referer = Some(referer.clone());
    }
    if let Some(value) = file_config.download_connect_timeout_secs {
        settings.download_connect_timeout = Duration::from_secs(value);
    }
    if let Some(value) = file_config.download_read_timeout_secs {
        settings.download_read_timeout = Duration::from_secs(value);
    }
    settings
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

pub(crate) fn resolve_output_dir(args: &Args) -> PathBuf {
    args.output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Parses argv the same way [`parse_cli_with_sources`] does, without exiting.
#[cfg(test)]
fn try_parse_with_sources(argv: &[&str]) -> anyhow::Result<(Args, CliValueSources)> {
    let matches = Args::command().try_get_matches_from(argv)?;
    let args = Args::from_arg_matches(&matches)?;
    Ok((args, sources_from_matches(&matches)))
}
