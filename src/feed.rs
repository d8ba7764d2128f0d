//! Support for creating Atom feeds from the published posts of a site.

use crate::post::Post;
use crate::site::Site;
use atom_syndication::{Content, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::io::Write;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<String>,
    pub home_page: String,
}

impl FeedConfig {
    /// Reads the feed settings from the `title`, `author` and `blog_url`
    /// configuration keys.
    pub fn from_site(site: &Site) -> FeedConfig {
        let home_page = site.config.get_str("blog_url").unwrap_or_default().to_owned();
        FeedConfig {
            title: site.config.get_str("title").unwrap_or_default().to_owned(),
            id: home_page.clone(),
            author: site.config.get_str("author").map(str::to_owned),
            home_page,
        }
    }
}

/// Creates a feed from some configuration ([`FeedConfig`]) and the published
/// posts of a [`Site`] and writes the result to a [`std::io::Write`].
pub fn write_feed<W: Write>(config: FeedConfig, site: &Site, w: W) -> Result<()> {
    feed(config, site).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, site: &Site) -> Feed {
    let posts: Vec<&Post> = site.published().map(|(_, post)| post).collect();
    let updated = posts
        .iter()
        .filter_map(|post| post.updated)
        .max()
        .map(to_fixed)
        .unwrap_or_else(|| Utc::now().into());

    let mut feed = Feed::default();
    feed.set_title(config.title.as_str());
    feed.set_id(config.id.as_str());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(&config.author));
    feed.set_links(vec![alternate(&config.home_page)]);
    feed.set_entries(
        posts
            .iter()
            .map(|post| feed_entry(&config, post))
            .collect::<Vec<Entry>>(),
    );
    feed
}

/// Builds the entry for one post. The full content is only embedded when
/// the post is RSS safe; the summary is always present.
fn feed_entry(config: &FeedConfig, post: &Post) -> Entry {
    let mut entry = Entry::default();
    entry.set_id(entry_id(post));
    entry.set_title(post.title.clone().unwrap_or_else(|| post.post_id.clone()));
    if let Some(updated) = post.updated.or(post.published) {
        entry.set_updated(to_fixed(updated));
    }
    entry.set_published(post.published.map(to_fixed));
    entry.set_links(vec![alternate(&post.url)]);
    entry.set_categories(
        post.tags
            .iter()
            .map(|tag| {
                let mut category = atom_syndication::Category::default();
                category.set_term(tag.as_str());
                category
            })
            .collect::<Vec<_>>(),
    );

    let author = post.author.clone().or_else(|| config.author.clone());
    entry.set_authors(author_to_people(&author));
    entry.set_summary(Some(Text::html(post.get_summary())));
    if post.is_rss_safe() {
        let mut content = Content::default();
        content.set_content_type(Some("html".to_owned()));
        content.set_value(Some(post.get_html()));
        entry.set_content(Some(content));
    }
    entry
}

/// The Atom id of a post's entry: its uid as a `urn:sha256` IRI.
fn entry_id(post: &Post) -> String {
    format!("urn:sha256:{}", post.uid)
}

fn alternate(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn to_fixed(date: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&date).into()
}

fn author_to_people(author: &Option<String>) -> Vec<Person> {
    match author {
        Some(name) => {
            let mut person = Person::default();
            person.set_name(name.as_str());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => fmt::Display::fmt(err, f),
            Error::Atom(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
