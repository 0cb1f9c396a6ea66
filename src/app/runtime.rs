use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::{Context, Result};
use streamgrab_core::download::{DownloadOptions, MediaDownloader, output_path};
use streamgrab_core::resolver::{Choice, HttpEndpointProbe};
use streamgrab_core::session::{StaticPageSession, StaticSessionConfig};
use streamgrab_core::{
    MediaKind, PageSession, Resolution, ResolveError, Selector, SessionError, SiteProfile,
    build_default_pipeline, resolve_and_close,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::config_runtime::{self, HttpSettings};
use crate::app::{progress_manager, selection_prompt, terminal};
use crate::app_config;
use crate::cli::{Args, Engine};

pub(crate) async fn run() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();

    let loaded = app_config::load_default_file_config()?;
    let file_config = loaded.config.as_ref();
    let args = config_runtime::apply_config_defaults(cli, &cli_sources, file_config);
    let http = config_runtime::resolve_http_settings(file_config);

    let default_level = config_runtime::resolve_default_log_level(&args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let no_color = terminal::is_no_color_requested(args.no_color);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");
    info!(page_url = %args.page_url, engine = args.engine.as_str(), "Streamgrab starting");

    let mut profile = SiteProfile::for_page_url(&args.page_url);
    if let Some(referer) = &http.referer {
        profile.referer = Some(referer.clone());
    }

    let resolution = resolve(&args, &http, &profile).await?;
    info!(
        source = resolution.source.as_str(),
        candidates = resolution.candidates.len(),
        strategies_run = resolution.strategies_run,
        "Resolution complete"
    );

    if args.resolve_only {
        print_resolution(&resolution, args.json)?;
        return Ok(ProcessExit::Success);
    }

    download_selected(&args, &http, &profile, &resolution).await?;
    Ok(ProcessExit::Success)
}

async fn resolve(args: &Args, http: &HttpSettings, profile: &SiteProfile) -> Result<Resolution> {
    let mut pipeline = build_default_pipeline(profile)
        .with_mobile_rewrite(!args.no_mobile)
        .with_endpoint_timeout(Duration::from_secs(args.api_timeout_secs));
    if let Some(path) = &args.dump_source {
        pipeline = pipeline.with_source_dump(path.clone());
    }

    let probe = HttpEndpointProbe::with_user_agent(
        profile,
        Duration::from_secs(args.api_timeout_secs),
        &http.user_agent,
    )
    .map_err(|e| ResolveError::session(&args.page_url, e))?;

    let session = open_session(args, http, profile)
        .await
        .map_err(|e| ResolveError::session(&args.page_url, e))?;

    Ok(resolve_and_close(&pipeline, &args.page_url, session, &probe).await?)
}

async fn open_session(
    args: &Args,
    http: &HttpSettings,
    profile: &SiteProfile,
) -> Result<Box<dyn PageSession>, SessionError> {
    match args.engine {
        Engine::Static => {
            let session = StaticPageSession::new(StaticSessionConfig {
                user_agent: http.user_agent.clone(),
                referer: profile.referer.clone(),
                ..StaticSessionConfig::default()
            })?;
            Ok(Box::new(session))
        }
        Engine::Chromium => launch_chromium(args, http, profile).await,
    }
}

#[cfg(feature = "chromium")]
async fn launch_chromium(
    args: &Args,
    http: &HttpSettings,
    profile: &SiteProfile,
) -> Result<Box<dyn PageSession>, SessionError> {
    use streamgrab_core::session::{ChromiumSession, ChromiumSessionConfig};

    let session = ChromiumSession::launch(ChromiumSessionConfig {
        chrome_path: args.chrome.clone(),
        headful: args.headful,
        settle: Duration::from_millis(args.settle_ms),
        user_agent: http.user_agent.clone(),
        referer: profile.referer.clone(),
    })
    .await?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "chromium"))]
async fn launch_chromium(
    _args: &Args,
    _http: &HttpSettings,
    _profile: &SiteProfile,
) -> Result<Box<dyn PageSession>, SessionError> {
    Err(SessionError::launch(
        "this build has no `chromium` feature; rerun with --engine static",
    ))
}

fn print_resolution(resolution: &Resolution, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(resolution).context("Failed to render resolution")?;
        println!("{rendered}");
    } else {
        print!(
            "{}",
            selection_prompt::format_candidates(&resolution.candidates)
        );
        println!("Source: {}", resolution.source.as_str());
    }
    Ok(())
}

async fn download_selected(
    args: &Args,
    http: &HttpSettings,
    profile: &SiteProfile,
    resolution: &Resolution,
) -> Result<()> {
    let candidates = &resolution.candidates;
    let choice = if candidates.len() > 1 {
        print!("{}", selection_prompt::format_candidates(candidates));
        let interactive = io::stdin().is_terminal();
        if args.select.is_none() && !interactive {
            warn!(
                "Several candidates found and stdin is not a terminal; using the first (pass --select N to choose)"
            );
        }
        let stdin = io::stdin();
        selection_prompt::decide_choice(
            args.select.as_deref(),
            interactive,
            candidates.len(),
            stdin.lock(),
            io::stdout(),
        )
        .context("Failed to read candidate selection")?
    } else {
        Choice::Default
    };

    let selection = Selector::new(&resolution.page_url).select(candidates, &choice)?;
    if let Some(warning) = &selection.warning {
        eprintln!("Warning: {warning}");
    }
    let candidate = &selection.candidate;
    if candidate.media_kind == MediaKind::Hls {
        warn!(
            url = %candidate.url,
            "Selected candidate is an HLS playlist; saving the playlist file as-is"
        );
    }

    let output_dir = config_runtime::resolve_output_dir(args);
    let destination = output_path(&output_dir, args.filename.as_deref(), &profile.name);
    info!(url = %candidate.url, path = %destination.display(), "Downloading");

    let downloader = MediaDownloader::new(DownloadOptions {
        user_agent: http.user_agent.clone(),
        referer: Some(profile.referer_for(&resolution.page_url)),
        connect_timeout: http.download_connect_timeout,
        read_timeout: http.download_read_timeout,
    })?;

    let use_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let label = destination
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
    let reporter = progress_manager::ProgressReporter::new(use_bar, &label);

    let result = downloader
        .download(&candidate.url, &destination, |progress| {
            reporter.update(progress);
        })
        .await;
    reporter.finish();
    let result = result?;

    if !args.quiet {
        println!(
            "Saved {} ({} bytes)",
            result.path.display(),
            result.bytes_downloaded
        );
    }
    Ok(())
}
