//! Scripted listening session against the virtual engine
//!
//! Builds a synthetic book, wires a [`PlaybackSession`] the way an app's
//! composition root would and lets it play in real time, printing the
//! player state once per second and every notice as it arrives.

use anyhow::{Context, Result};
use chapterline_config::Config;
use chapterline_core::{
    Book, Chapter, Duration as CoreDuration, PlaybackPhase, PlaybackState, Validator,
};
use chapterline_media_engine::VirtualEngineFactory;
use chapterline_session::{
    ChannelNotifier, GuestFlag, PlayOutcome, PlaybackSession, SessionNotice, SharedSilenceSensor,
};
use clap::ArgMatches;
use console::style;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::{interval, Instant};

/// Knobs for one simulated session
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    pub chapters: usize,
    pub chapter_secs: u64,
    pub guest: bool,
    pub sleep_minutes: Option<u32>,
    pub silent_after_secs: Option<u64>,
    pub confirm_silent: bool,
    pub run_secs: u64,
    pub rate: Option<f32>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            chapters: 3,
            chapter_secs: 20,
            guest: false,
            sleep_minutes: None,
            silent_after_secs: None,
            confirm_silent: false,
            run_secs: 30,
            rate: None,
        }
    }
}

impl SimulationOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            chapters: matches
                .get_one::<usize>("chapters")
                .copied()
                .unwrap_or(defaults.chapters),
            chapter_secs: matches
                .get_one::<u64>("chapter-secs")
                .copied()
                .unwrap_or(defaults.chapter_secs),
            guest: matches.get_flag("guest"),
            sleep_minutes: matches.get_one::<u32>("sleep-minutes").copied(),
            silent_after_secs: matches.get_one::<u64>("silent-after-secs").copied(),
            confirm_silent: matches.get_flag("confirm-silent"),
            run_secs: matches
                .get_one::<u64>("run-secs")
                .copied()
                .unwrap_or(defaults.run_secs),
            rate: matches.get_one::<f32>("rate").copied(),
        })
    }
}

/// What happened during a simulation
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub final_state: PlaybackState,
    pub notices: Vec<String>,
    pub handles_created: usize,
    pub peak_live_handles: usize,
}

fn synthetic_book(options: &SimulationOptions) -> Book {
    let chapters = (1..=options.chapters)
        .map(|n| {
            Chapter::new(
                format!("Chapter {}", n),
                format!("virtual://chapter-{}", n),
                CoreDuration::from_seconds(options.chapter_secs),
            )
        })
        .collect();
    Book::new("A Simulated Audiobook", chapters).with_author("Chapterline")
}

pub async fn run_simulation(config: &Config, options: &SimulationOptions) -> Result<SimulationReport> {
    let book = synthetic_book(options);
    if let Err(problems) = book.validate() {
        anyhow::bail!("Invalid book: {}", problems.join("; "));
    }
    let book = Arc::new(book);
    let factory = Arc::new(VirtualEngineFactory::new());
    for chapter in &book.chapters {
        factory.register(chapter.source.clone(), chapter.duration.as_secs_f64());
    }

    let (notifier, mut notices) = ChannelNotifier::new();
    let silence = SharedSilenceSensor::new(false);
    let session = PlaybackSession::builder(factory.clone())
        .config(config)
        .guest_flag(GuestFlag::new(options.guest))
        .silence_sensor(silence.clone())
        .notifier(notifier)
        .build();

    session
        .load_book(book.clone(), 0)
        .await
        .context("Failed to load the first chapter")?;

    if let Some(rate) = options.rate {
        session
            .set_playback_rate(rate)
            .await
            .context("Failed to set playback rate")?;
    }
    if let Some(minutes) = options.sleep_minutes {
        session
            .set_sleep_timer(minutes)
            .await
            .context("Failed to set sleep timer")?;
    }

    match session.play().await.context("Failed to start playback")? {
        PlayOutcome::Started => log::info!("Playback started"),
        outcome => log::warn!("Playback did not start: {:?}", outcome),
    }

    let started = Instant::now();
    let deadline = tokio::time::sleep(StdDuration::from_secs(options.run_secs));
    tokio::pin!(deadline);
    let mut ticker = interval(StdDuration::from_secs(1));
    let mut went_silent = false;
    let mut seen = Vec::new();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                let elapsed = started.elapsed().as_secs();
                if let Some(after) = options.silent_after_secs {
                    if !went_silent && elapsed >= after {
                        went_silent = true;
                        println!("  {} device muted", style("~").dim());
                        silence.set_silent(true);
                    }
                }
                println!("{}", format_status_line(elapsed, &session.snapshot()));
            }
            Some(notice) = notices.recv() => {
                let line = describe_notice(&notice);
                println!("  {} {}", style("!").yellow().bold(), line);
                seen.push(line);

                if let SessionNotice::SilentPlaybackDetected(prompt) = notice {
                    if options.confirm_silent {
                        let outcome = session
                            .confirm_silent_playback(prompt)
                            .await
                            .context("Failed to resume after silence prompt")?;
                        log::info!("Listener confirmed silent playback: {:?}", outcome);
                    }
                }
            }
        }
    }

    let final_state = session.snapshot();
    session.stop_playback().await;

    Ok(SimulationReport {
        final_state,
        notices: seen,
        handles_created: factory.created_count(),
        peak_live_handles: factory.peak_live_handles(),
    })
}

pub async fn simulate(config: &Config, matches: &ArgMatches) -> Result<()> {
    let options = SimulationOptions::from_matches(matches)?;
    println!(
        "\n{} {} chapters x {}s, running for {}s{}",
        style("Simulating").bold().cyan(),
        options.chapters,
        options.chapter_secs,
        options.run_secs,
        if options.guest { " as a guest" } else { "" }
    );

    let report = run_simulation(config, &options).await?;

    println!("\n{}", style("Summary").bold());
    println!(
        "  Ended on chapter {} at {}",
        report.final_state.current_chapter_index + 1,
        CoreDuration::from_secs_f64(report.final_state.position).as_hms()
    );
    println!("  Notices: {}", report.notices.len());
    println!(
        "  Engine handles: {} created, {} live at most",
        report.handles_created, report.peak_live_handles
    );
    Ok(())
}

fn describe_notice(notice: &SessionNotice) -> String {
    match notice {
        SessionNotice::GuestLimitReached(reason) => {
            format!("Guest {} limit reached, sign in to keep listening", reason)
        }
        SessionNotice::SilentPlaybackDetected(prompt) => {
            format!("Device is silent ({:?}), playback held", prompt.trigger())
        }
    }
}

fn format_status_line(elapsed: u64, state: &PlaybackState) -> String {
    let phase = match state.phase() {
        PlaybackPhase::Idle => style("idle   ").dim(),
        PlaybackPhase::Playing => style("playing").green(),
        PlaybackPhase::Paused => style("paused ").yellow(),
    };

    let chapter = match (&state.current_book, state.current_chapter()) {
        (Some(book), Some(chapter)) => format!(
            "{}/{} {}",
            state.current_chapter_index + 1,
            book.chapter_count(),
            chapter.title
        ),
        _ => "-".to_string(),
    };

    let mut line = format!(
        "[{:>4}s] {} {}  {} / {}  {:.2}x  vol {:>3}%",
        elapsed,
        phase,
        chapter,
        CoreDuration::from_secs_f64(state.position).as_hms(),
        CoreDuration::from_secs_f64(state.duration).as_hms(),
        state.playback_rate,
        (state.volume * 100.0).round() as u32
    );

    if let Some(end_time) = state.sleep_timer.end_time {
        let remaining = chapterline_core::Timestamp::now().millis_until(end_time) / 1000;
        line.push_str(&format!("  sleep in {}s", remaining));
    }

    line
}
