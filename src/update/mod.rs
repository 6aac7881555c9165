//! Release feed access and self-update.
//!
//! Fetches release metadata, downloads archives into scratch directories,
//! replaces the running executable in place, and periodically tells the
//! operator when a newer CLI release exists.

pub mod applier;
pub mod archive;
pub mod checker;
pub mod download;
pub mod release;
pub mod state;

pub use applier::{SelfUpdate, UpdateOutcome, self_update};
pub use checker::{UpdateCheck, UpdateChecker, is_newer};
pub use download::DownloadSession;
pub use release::{Asset, Release, ReleaseFeed, ReleaseRef};
pub use state::UpdateCheckState;
