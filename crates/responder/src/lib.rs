//! Automated responder for the messaging web client.
//!
//! A [`Controller`] owns one browser session and a background loop. Each
//! tick runs a [`Cycle`]: find the first unread conversation, read what the
//! customer wrote since our last reply, extract part codes, answer them via
//! the [`CodeResolver`], and hand anything else to a human by marking the
//! conversation unread and alerting an admin.
//!
//! All UI access goes through the [`ChatSurface`] trait; [`WebChatSurface`]
//! is the Chromium-backed implementation.

pub mod bridge;
pub mod codes;
pub mod controller;
pub mod cooldown;
pub mod cycle;
pub mod error;
pub mod escalate;
pub mod hours;
pub mod ready;
pub mod resolver;
pub mod send;
pub mod surface;
pub mod ui;
pub mod web;

#[cfg(test)]
mod fake;

pub use {
    bridge::{CodeResolver, ReplyBridge, ResolveRequest},
    codes::{CodeExtractor, CodeToken, Extraction},
    controller::{Controller, ControllerDeps, ControllerStatus},
    cycle::{Cycle, CycleOutcome, SendReport},
    error::{Error, Result},
    hours::{BusinessHours, FileSettings, SettingsSource, TickSettings},
    ready::Readiness,
    resolver::HttpResolver,
    surface::{ChatSurface, ConversationHandle, Direction, MessageRecord, SessionLauncher},
    web::{ChromiumLauncher, WebChatSurface},
};
