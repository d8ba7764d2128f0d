//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::site`]), rendering post and index pages ([`crate::write`]), and
//! generating the Atom feed ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::site::{Error as SiteError, Site};
use crate::write::{Error as WriteError, Writer};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the feed file written to the blog directory.
pub const FEED_FILE_NAME: &str = "feed.atom";

/// Builds the site from a [`Config`]. The configuration must name the
/// `posts_dir`, `layouts_dir` and `blog_dir` directories.
pub fn build_site(config: &Config) -> Result<()> {
    let layouts_directory = required_path(config, "layouts_dir")?;
    let blog_directory = required_path(config, "blog_dir")?;

    // collect all posts
    let site = Site::from_config(config)?;

    // write the post and index pages
    let writer = Writer {
        site: &site,
        layouts_directory: &layouts_directory,
        output_directory: &blog_directory,
    };
    let written = writer.write_site()?;
    log::info!(
        "wrote {} pages to `{}`",
        written.len(),
        blog_directory.display()
    );

    // create the atom feed
    let feed_path = blog_directory.join(FEED_FILE_NAME);
    write_feed(
        FeedConfig::from_site(&site),
        &site,
        create(&feed_path)?,
    )?;
    log::info!("wrote `{}`", feed_path.display());

    Ok(())
}

fn required_path(config: &Config, key: &'static str) -> Result<PathBuf> {
    config.get_path(key).ok_or(Error::MissingKey(key))
}

fn create(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|err| Error::Create {
            path: dir.to_owned(),
            err,
        })?;
    }
    File::create(path).map_err(|err| Error::Create {
        path: path.to_owned(),
        err,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// creating output files, and generating the feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when a required configuration key is missing.
    MissingKey(&'static str),

    /// Returned for errors generating the site's posts.
    Site(SiteError),

    /// Returned for errors writing pages to disk.
    Write(WriteError),

    /// Returned for I/O problems while creating output files.
    Create { path: PathBuf, err: std::io::Error },

    /// Returned for errors writing the feed.
    Feed(FeedError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingKey(key) => {
                write!(f, "missing configuration key `{}`", key)
            }
            Error::Site(err) => fmt::Display::fmt(err, f),
            Error::Write(err) => fmt::Display::fmt(err, f),
            Error::Create { path, err } => {
                write!(f, "Creating '{}': {}", path.display(), err)
            }
            Error::Feed(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingKey(_) => None,
            Error::Site(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Create { path: _, err } => Some(err),
            Error::Feed(err) => Some(err),
        }
    }
}

impl From<SiteError> for Error {
    /// Converts [`SiteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: SiteError) -> Error {
        Error::Site(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}
