// Skyline: feed, thread and notification aggregation for Bluesky.
//
// This is the library root. Each module is one stage of turning raw
// paginated AT Protocol responses into render-ready lists.

pub mod backend;
pub mod bluesky;
pub mod config;
pub mod feed;
pub mod hydrate;
pub mod interaction;
pub mod language;
pub mod moderation;
pub mod notifications;
pub mod output;
pub mod thread;
