//! The library code for the `blogit` static blog generator. The architecture
//! can be generally broken down into three steps:
//!
//! 1. Resolving the configuration for an environment ([`crate::config`])
//! 2. Parsing posts from date-named source files on disk and linking them in
//!    chronological order ([`crate::post`], [`crate::site`])
//! 3. Rendering the posts through layouts to disk, along with an Atom feed
//!    ([`crate::write`], [`crate::feed`])
//!
//! Rendering a post body is itself two steps: the markdown is converted to
//! HTML ([`crate::markdown`]) and the HTML is then executed as a template
//! ([`crate::template`]) with the site configuration and the post bound.
//! [`crate::build::build_site`] runs the whole thing.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod attributes;
pub mod build;
pub mod config;
pub mod feed;
pub mod markdown;
pub mod post;
pub mod site;
pub mod template;
pub mod value;
pub mod write;
