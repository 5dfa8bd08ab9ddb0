//! Push and pull request processing, independent of the HTTP layer.

mod pull;
mod push;

pub use pull::{handle_pull, PullRequest, PULL_VERSION};
pub use push::{handle_push, PushRequest, PUSH_VERSION};
