// Bluesky API surface: lexicon view types, the agent trait, and the XRPC client.
//
// Everything above this module talks to the network only through the
// `BskyApi` trait, so pipelines can run against the live AppView or a fake.

pub mod api;
pub mod client;
pub mod types;
