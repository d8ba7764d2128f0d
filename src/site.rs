//! Defines the [`Site`] type: the ordered collection of posts parsed from a
//! posts directory, newest first, with each post linked to its neighbours.

use crate::attributes::Attributes;
use crate::config::Config;
use crate::post::{self, Post};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The posts of a site, newest first. The site owns the posts; the
/// `newer`/`older` links of each [`Post`] are positions in [`Site::posts`].
#[derive(Debug)]
pub struct Site<'a> {
    pub config: &'a Config,
    pub posts: Vec<Post<'a>>,
}

impl<'a> Site<'a> {
    /// Generates the site from the directory named by the `posts_dir`
    /// configuration key.
    pub fn from_config(config: &'a Config) -> Result<Site<'a>> {
        match config.get_path("posts_dir") {
            Some(dir) => Site::generate(config, &dir),
            None => Err(Error::MissingKey("posts_dir")),
        }
    }

    /// Parses every post file in `posts_directory` (non-recursively), in
    /// descending file name order, and links adjacent posts. Since file
    /// names start with `YYYY-MM-DD[.NN]`, this is newest first. Files that
    /// don't follow the naming pattern are skipped, with a warning when the
    /// `warn_unmatched` configuration key is `true`. Symlinked files are
    /// followed.
    pub fn generate(config: &'a Config, posts_directory: &Path) -> Result<Site<'a>> {
        if !posts_directory.is_dir() {
            return Err(Error::DirectoryNotFound(posts_directory.to_owned()));
        }

        let warn_unmatched = config.get_bool("warn_unmatched").unwrap_or(false);
        let defaults = Attributes::default();
        let mut posts = Vec::new();
        for result in WalkDir::new(posts_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by(|a, b| b.file_name().cmp(a.file_name()))
        {
            let entry = result?;
            // Follows symlinks, which `entry.file_type()` doesn't.
            if !entry.path().is_file() {
                continue;
            }

            let post = Post::from_file(entry.path(), config, &defaults)?;
            if post.identity.is_none() {
                if warn_unmatched {
                    log::warn!("skipping `{}`: not a post file", entry.path().display());
                } else {
                    log::debug!("skipping `{}`: not a post file", entry.path().display());
                }
                continue;
            }
            posts.push(post);
        }

        link(&mut posts);
        log::info!(
            "parsed {} posts from `{}`",
            posts.len(),
            posts_directory.display()
        );
        Ok(Site { config, posts })
    }

    /// The post at `i`'s next newer neighbour.
    pub fn newer(&self, i: usize) -> Option<&Post<'a>> {
        self.posts.get(i)?.newer().and_then(|j| self.posts.get(j))
    }

    /// The post at `i`'s next older neighbour.
    pub fn older(&self, i: usize) -> Option<&Post<'a>> {
        self.posts.get(i)?.older().and_then(|j| self.posts.get(j))
    }

    /// Posts whose publication date has passed, with their positions.
    pub fn published(&self) -> impl Iterator<Item = (usize, &Post<'a>)> {
        self.posts
            .iter()
            .enumerate()
            .filter(|(_, post)| !post.is_future())
    }
}

/// Links each post of an ordered slice to its neighbours: post `i` gets
/// `newer = i - 1` and `older = i + 1` where those exist.
pub fn link(posts: &mut [Post]) {
    let len = posts.len();
    for (i, post) in posts.iter_mut().enumerate() {
        let newer = if i > 0 { Some(i - 1) } else { None };
        let older = if i + 1 < len { Some(i + 1) } else { None };
        post.set_links(newer, older);
    }
}

/// The result of a fallible site operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error generating a [`Site`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the posts directory doesn't exist.
    DirectoryNotFound(PathBuf),

    /// Returned when a required configuration key is missing.
    MissingKey(&'static str),

    /// Returned for errors parsing a post.
    Post(post::Error),

    /// Returned for errors listing the posts directory.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DirectoryNotFound(path) => {
                write!(f, "posts directory `{}` not found", path.display())
            }
            Error::MissingKey(key) => {
                write!(f, "missing configuration key `{}`", key)
            }
            Error::Post(err) => fmt::Display::fmt(err, f),
            Error::WalkDir(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DirectoryNotFound(_) => None,
            Error::MissingKey(_) => None,
            Error::Post(err) => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while listing directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_posts(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), format!("title: {}\n...\nbody of {}\n", name, name)).unwrap();
        }
    }

    #[test]
    fn test_generate_orders_newest_first() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_posts(
            dir.path(),
            &[
                "2012-01-01-first.markdown",
                "2012-01-02-second.markdown",
                "2012-01-02.01-second-again.markdown",
                "2011-12-31-oldest.markdown",
                "badregex",
                "notes.txt",
            ],
        );
        fs::create_dir(dir.path().join("2013-01-01-dir.markdown")).unwrap();

        let config = Config::default();
        let site = Site::generate(&config, dir.path())?;
        let ids: Vec<&str> = site.posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "2012-01-02.01-second-again",
                "2012-01-02-second",
                "2012-01-01-first",
                "2011-12-31-oldest",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_links() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_posts(
            dir.path(),
            &[
                "2012-01-01-a.markdown",
                "2012-01-02-b.markdown",
                "2012-01-03-c.markdown",
            ],
        );

        let config = Config::default();
        let site = Site::generate(&config, dir.path())?;
        let n = site.posts.len();
        assert_eq!(n, 3);
        assert_eq!(site.posts[0].newer(), None);
        assert_eq!(site.posts[n - 1].older(), None);
        for i in 1..n - 1 {
            assert_eq!(site.posts[i].newer(), Some(i - 1));
            assert_eq!(site.posts[i].older(), Some(i + 1));
        }
        assert_eq!(site.older(0).map(|p| p.post_id.as_str()), Some("2012-01-02-b"));
        assert_eq!(site.newer(2).map(|p| p.post_id.as_str()), Some("2012-01-02-b"));
        assert!(site.newer(0).is_none());
        Ok(())
    }

    #[test]
    fn test_single_and_empty() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        assert!(Site::generate(&config, dir.path())?.posts.is_empty());

        write_posts(dir.path(), &["2012-01-01-only.markdown"]);
        let site = Site::generate(&config, dir.path())?;
        assert_eq!(site.posts[0].newer(), None);
        assert_eq!(site.posts[0].older(), None);
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let config = Config::default();
        match Site::generate(&config, Path::new("/definitely/not/here")) {
            Err(Error::DirectoryNotFound(path)) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here"))
            }
            other => panic!("wanted missing directory, got {:?}", other.map(|s| s.posts.len())),
        }
        match Site::from_config(&config) {
            Err(Error::MissingKey("posts_dir")) => {}
            other => panic!("wanted missing key, got {:?}", other.map(|s| s.posts.len())),
        }
    }

    #[test]
    fn test_warn_unmatched_still_skips() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_posts(dir.path(), &["2012-01-01-a.markdown", "README.md", "draft.markdown"]);
        for text in &["default:\n  warn_unmatched: true\n", "default:\n  warn_unmatched: false\n"] {
            let config = Config::resolve(text, "default").unwrap();
            let site = Site::generate(&config, dir.path())?;
            let ids: Vec<&str> = site.posts.iter().map(|p| p.post_id.as_str()).collect();
            assert_eq!(ids, vec!["2012-01-01-a"]);
        }
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_posts_are_followed() -> Result<()> {
        let drafts = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write_posts(drafts.path(), &["2012-01-02-linked.markdown"]);
        write_posts(dir.path(), &["2012-01-01-plain.markdown"]);
        std::os::unix::fs::symlink(
            drafts.path().join("2012-01-02-linked.markdown"),
            dir.path().join("2012-01-02-linked.markdown"),
        )
        .unwrap();
        std::os::unix::fs::symlink(drafts.path(), dir.path().join("2013-01-01-dir.markdown"))
            .unwrap();

        let config = Config::default();
        let site = Site::generate(&config, dir.path())?;
        let ids: Vec<&str> = site.posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["2012-01-02-linked", "2012-01-01-plain"]);
        assert_eq!(site.posts[0].title.as_deref(), Some("2012-01-02-linked.markdown"));
        Ok(())
    }

    #[test]
    fn test_from_config_and_published() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_posts(dir.path(), &["2999-01-01-later.markdown", "2012-01-01-now.markdown"]);
        let config = Config::resolve(
            &format!("default:\n  posts_dir: '{}'\n", dir.path().display()),
            "default",
        )
        .unwrap();

        let site = Site::from_config(&config)?;
        assert_eq!(site.posts.len(), 2);
        let published: Vec<usize> = site.published().map(|(i, _)| i).collect();
        assert_eq!(published, vec![1]);
        Ok(())
    }
}
