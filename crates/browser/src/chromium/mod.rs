mod events;
mod launcher;
mod page;

pub use events::network_events;
pub use launcher::{launch, open_page, LaunchedBrowser, ProfileDir};
pub use page::ChromiumPage;
