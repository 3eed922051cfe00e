// Auxiliary backend clients: services the app reaches outside the AT
// Protocol: GIF search via Tenor, feed generator search, and post
// translation.

pub mod feed_search;
pub mod tenor;
pub mod translate;
