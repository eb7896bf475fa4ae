//! GitHub implementation of the hosting platform seam.
//!
//! Calls made as the bot account go through `octocrab`; calls made on a
//! user's behalf (listing forks, inviting collaborators, checking labels)
//! are raw `reqwest` requests carrying that user's token.

mod client;
mod error;

pub use client::{GitHubClient, RateLimitInfo, create_client};
pub use error::{GitHubError, body_message};
