// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! User-controlled playback next to autoplay.
//!
//! A header video with a manual controller sits above an automatic clip.
//! Manual slots win the selection, so while the header is on screen it holds
//! the selection and waits for the user; the clip stays paused.
//!
//! Run:
//! - `cargo run -p understory_demos --example manual_controls`

use std::time::Duration;

use kurbo::Rect;
use tracing_subscriber::EnvFilter;
use understory_playback::adapters::containers::ScrollContainer;
use understory_playback::adapters::scene::Scene;
use understory_playback::{
    Arbiter, Axes, Binding, ContainerId, Controller, GroupConfig, ManagerOptions, MediaBridge,
    MediaId, SlotConfig,
};

const PAGE: ContainerId = ContainerId(1);
const HEADER: MediaId = MediaId(1);
const CLIP: MediaId = MediaId(2);

struct Printer(&'static str);

impl MediaBridge for Printer {
    fn prepare(&mut self, _resume: Option<Duration>, _preload: bool) {}

    fn play(&mut self) {
        println!("  {}: play", self.0);
    }

    fn pause(&mut self) {
        println!("  {}: pause", self.0);
    }

    fn reset(&mut self, _keep_state: bool) {}

    fn release(&mut self) {
        println!("  {}: release", self.0);
    }
}

fn main() -> Result<(), understory_playback::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut scene = Scene::new(Rect::new(0.0, 0.0, 360.0, 800.0));
    scene.add_root(PAGE, Rect::new(0.0, 0.0, 360.0, 800.0));
    scene.add_child(PAGE, ContainerId(10), Rect::new(0.0, 0.0, 360.0, 200.0));
    scene.add_child(PAGE, ContainerId(11), Rect::new(0.0, 220.0, 360.0, 420.0));

    let mut arbiter = Arbiter::default();
    let group = arbiter.add_group(GroupConfig::default());
    let manager = arbiter.add_manager(group, ManagerOptions::default())?;
    arbiter.add_bucket(manager, Box::new(ScrollContainer::list(PAGE, Axes::VERTICAL)))?;

    arbiter.add_media(HEADER, Box::new(Printer("header")))?;
    arbiter.add_media(CLIP, Box::new(Printer("clip")))?;
    let manual = SlotConfig {
        controller: Some(Controller {
            can_auto_start: false,
            can_auto_pause: false,
        }),
        ..SlotConfig::default()
    };
    arbiter.bind(
        &scene,
        manager,
        Binding::new(HEADER, ContainerId(10)).with_config(manual),
    )?;
    arbiter.bind(&scene, manager, Binding::new(CLIP, ContainerId(11)))?;

    let mut now = Duration::ZERO;
    let mut tick = |arbiter: &mut Arbiter, label: &str| -> Result<(), understory_playback::Error> {
        println!("{label}");
        now += Duration::from_millis(50);
        arbiter.advance(now, &scene)?;
        for media in [HEADER, CLIP] {
            let status = arbiter.media_status(media);
            println!("  {media:?} playing: {:?}", status.map(|s| s.playing));
        }
        Ok(())
    };

    tick(&mut arbiter, "initial layout: the header waits for the user")?;
    arbiter.play(HEADER)?;
    tick(&mut arbiter, "user starts the header")?;
    arbiter.pause(HEADER)?;
    tick(&mut arbiter, "user pauses the header")?;
    Ok(())
}
