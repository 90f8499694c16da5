//! Integration tests for the payload binary

mod helpers;
mod test_bundle;
mod test_decrypt;
mod test_groups;
mod test_publish_guard;
mod test_push;
