//! Defines the [`Post`] type and the logic for parsing posts from source files
//! or raw text. A post source file is named `YYYY-MM-DD[.NN]-stub.markdown`
//! and looks like this:
//!
//! ```md
//! title: Hello, world!
//! tags: [greet]
//! ...
//! Some summary text.
//!
//! <!--more-->
//!
//! The rest of the post, which can refer to {{.site.url}} or {{.post.url}}.
//! ```
//!
//! Everything above the `...` line is YAML front-matter. Rendering a post is
//! a two step pipeline: the body is converted from markdown to HTML
//! ([`crate::markdown::to_html`]) and the result is executed as a template
//! ([`crate::template::render`]) with `site` and `post` bound. See
//! [`Post::try_html`] and [`Post::try_summary`].

use crate::attributes::Attributes;
use crate::config::Config;
use crate::{markdown, template, value};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use gtmpl_value::Value;
use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::Value as Yaml;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Separates the summary from the rest of a post body.
pub const MORE: &str = "<!--more-->";

/// Replaces [`MORE`] in the full rendering of a post.
pub const REPLACE_MORE: &str = "<a id=\"more\">&nbsp;</a>";

/// The default format for [`Post::get_published`] and [`Post::get_updated`].
pub const DATE_FORMAT: &str = "%A, %B %d, %Y";

/// The extension of post source files.
pub const POST_EXTENSION: &str = ".markdown";

lazy_static! {
    static ref FILE_NAME_REGEX: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(\.\d{2})?-(.+?)\.markdown$").unwrap();
    static ref END_OF_HEADER_REGEX: Regex = Regex::new(r"(?m)^\.\.\.[ \t]*\r?$").unwrap();
    static ref RSS_UNSAFE_REGEX: Regex =
        Regex::new(r"(?i)<\s*(iframe|script|object|embed)\b").unwrap();
}

/// The fields which identify a post. They are encoded in the source file
/// name or supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub year: i32,
    pub month: u32,
    pub day: u32,

    /// Disambiguates posts published on the same day. Either empty or a dot
    /// followed by two digits (e.g., `.01`).
    pub idx: String,

    /// The URL-safe slug of the post.
    pub stub: String,
}

impl Identity {
    /// Parses an identity from a file name like `2012-01-01.01-test.markdown`.
    /// Returns `None` when the name doesn't follow the pattern or encodes an
    /// impossible date.
    pub fn from_file_name(file_name: &str) -> Option<Identity> {
        let caps = FILE_NAME_REGEX.captures(file_name)?;
        Some(Identity {
            year: caps[1].parse().ok()?,
            month: caps[2].parse().ok()?,
            day: caps[3].parse().ok()?,
            idx: caps.get(4).map_or("", |m| m.as_str()).to_owned(),
            stub: caps[5].to_owned(),
        })
        .filter(|identity| identity.published().is_some())
    }

    /// Builds an identity from attributes; all of year, month, day and stub
    /// must be present.
    pub fn from_attributes(attrs: &Attributes) -> Option<Identity> {
        let idx = match attrs.idx.as_deref() {
            None | Some("") => String::new(),
            Some(idx) if idx.starts_with('.') => idx.to_owned(),
            Some(idx) => format!(".{}", idx),
        };
        Some(Identity {
            year: attrs.year?,
            month: attrs.month?,
            day: attrs.day?,
            idx,
            stub: attrs.stub.clone()?,
        })
        .filter(|identity| identity.published().is_some())
    }

    /// The post ID, e.g. `2012-01-01.01-test`. This is the source file name
    /// without its extension.
    pub fn post_id(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}{}-{}",
            self.year, self.month, self.day, self.idx, self.stub
        )
    }

    /// Midnight of the encoded date.
    pub fn published(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

/// A stable identifier derived from a post ID: the hex SHA-256 digest.
pub fn uid(post_id: &str) -> String {
    format!("{:x}", Sha256::digest(post_id.as_bytes()))
}

/// Returns `true` if `file_name` follows the post naming pattern.
pub fn is_post_file_name(file_name: &str) -> bool {
    Identity::from_file_name(file_name).is_some()
}

/// Represents a blog post. A post borrows the site [`Config`] it was built
/// with so that it can be rendered against it at any time.
#[derive(Clone, Debug)]
pub struct Post<'a> {
    site: &'a Config,

    /// The source file, if the post was loaded from disk.
    pub source: Option<PathBuf>,

    /// `None` for files which don't follow the naming pattern and for raw
    /// content built without identity attributes.
    pub identity: Option<Identity>,

    pub post_id: String,
    pub uid: String,
    pub url: String,

    pub published: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,

    /// The post body with front-matter removed.
    pub markdown: String,

    pub title: Option<String>,
    pub author: Option<String>,
    pub layout: Option<String>,
    pub tags: Vec<String>,

    /// The URL of the first image in `img_dir` whose name starts with the
    /// post ID.
    pub thumbnail: Option<String>,

    /// Front-matter attributes with no dedicated field.
    pub extra: BTreeMap<String, Yaml>,

    // Positions of the adjacent posts in the owning
    // [`crate::site::Site::posts`].
    newer: Option<usize>,
    older: Option<usize>,
}

impl<'a> Post<'a> {
    fn empty(site: &'a Config) -> Post<'a> {
        Post {
            site,
            source: None,
            identity: None,
            post_id: String::new(),
            uid: String::new(),
            url: String::new(),
            published: None,
            updated: None,
            markdown: String::new(),
            title: None,
            author: None,
            layout: None,
            tags: Vec::new(),
            thumbnail: None,
            extra: BTreeMap::new(),
            newer: None,
            older: None,
        }
    }

    /// Constructs a post from `content`, which is either the path of a post
    /// file or the raw post text. See [`Post::from_file`] and
    /// [`Post::from_str`].
    pub fn new(content: &str, site: &'a Config, defaults: &Attributes) -> Result<Post<'a>> {
        let path = Path::new(content);
        if !content.is_empty() && path.is_file() {
            Post::from_file(path, site, defaults)
        } else {
            Post::from_str(content, site, defaults)
        }
    }

    /// Loads a post file. The identity comes from the file name and
    /// `updated` defaults to the file's modification time. A file whose name
    /// doesn't follow the naming pattern yields an empty post without
    /// reading the file.
    pub fn from_file(path: &Path, site: &'a Config, defaults: &Attributes) -> Result<Post<'a>> {
        let mut post = Post::empty(site);
        post.source = Some(path.to_owned());

        let identity = match path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Identity::from_file_name)
        {
            Some(identity) => identity,
            None => return Ok(post),
        };
        post.updated = modified(path);

        let annotate = |e: Error| Error::Annotated(format!("parsing post `{}`", path.display()), Box::new(e));
        let content = std::fs::read_to_string(path).map_err(|e| annotate(Error::Io(e)))?;
        post.parse(&content, Some(identity), defaults).map_err(annotate)?;
        Ok(post)
    }

    /// Parses a post from raw text. The identity, if any, comes from
    /// `defaults`.
    pub fn from_str(content: &str, site: &'a Config, defaults: &Attributes) -> Result<Post<'a>> {
        let mut post = Post::empty(site);
        post.parse(content, None, defaults)?;
        Ok(post)
    }

    fn parse(
        &mut self,
        content: &str,
        identity: Option<Identity>,
        defaults: &Attributes,
    ) -> Result<()> {
        let (header, body) = split_frontmatter(content);
        let frontmatter = Attributes::from_yaml(header)
            .map_err(Error::Frontmatter)?
            .without_identity();

        let attrs = Attributes::from_mapping(self.site.post_defaults())
            .map_err(Error::Defaults)?
            .merge(defaults.clone());

        if let Some(identity) = identity.or_else(|| Identity::from_attributes(&attrs)) {
            self.post_id = identity.post_id();
            self.uid = uid(&self.post_id);
            self.url = format!(
                "{}/{}/{:02}/{}.html",
                self.site.get_str("blog_url").unwrap_or_default(),
                identity.year,
                identity.month,
                identity.stub
            );
            self.published = identity.published();
            self.thumbnail = find_thumbnail(self.site, &self.post_id);
            self.identity = Some(identity);
        }
        if self.updated.is_none() {
            self.updated = self.published;
        }

        let attrs = attrs.merge(frontmatter);
        if let Some(updated) = &attrs.updated {
            match parse_date(updated) {
                Some(updated) => self.updated = Some(updated),
                None => log::warn!(
                    "{}: ignoring unparseable `updated` date `{}`",
                    self.name(),
                    updated
                ),
            }
        }
        self.title = attrs.title;
        self.author = attrs.author;
        self.layout = attrs.layout;
        self.tags = attrs.tags.unwrap_or_default();
        self.extra = attrs.extra;
        self.markdown = body.to_owned();
        Ok(())
    }

    /// A name for the post in log messages.
    pub fn name(&self) -> String {
        match (&self.source, self.post_id.is_empty()) {
            (Some(path), _) => path.display().to_string(),
            (None, false) => self.post_id.clone(),
            (None, true) => String::from("<anonymous post>"),
        }
    }

    /// The position of the next newer post in the owning site, if any.
    pub fn newer(&self) -> Option<usize> {
        self.newer
    }

    /// The position of the next older post in the owning site, if any.
    pub fn older(&self) -> Option<usize> {
        self.older
    }

    pub(crate) fn set_links(&mut self, newer: Option<usize>, older: Option<usize>) {
        self.newer = newer;
        self.older = older;
    }

    /// Returns `true` if the body contains [`MORE`].
    pub fn has_more(&self) -> bool {
        self.markdown.contains(MORE)
    }

    /// The part of the body before [`MORE`], or all of it.
    pub fn summary_markdown(&self) -> &str {
        match self.markdown.find(MORE) {
            Some(i) => &self.markdown[..i],
            None => &self.markdown,
        }
    }

    /// Converts `body` to HTML and executes the result as a template with
    /// `site` and `post` bound.
    fn render(&self, body: &str) -> template::Result<String> {
        let html = markdown::to_html(body);
        template::render(&html, self.bindings())
    }

    /// Renders the full post, replacing [`MORE`] with [`REPLACE_MORE`].
    pub fn try_html(&self) -> template::Result<String> {
        self.render(&self.markdown.replace(MORE, REPLACE_MORE))
    }

    /// Renders the part of the post before [`MORE`].
    pub fn try_summary(&self) -> template::Result<String> {
        self.render(self.summary_markdown())
    }

    /// Like [`Post::try_html`], but a rendering error is logged and yields
    /// an empty string.
    pub fn get_html(&self) -> String {
        self.try_html().unwrap_or_else(|e| {
            log::error!("{}: {}", self.name(), e);
            String::new()
        })
    }

    /// Like [`Post::try_summary`], but a rendering error is logged and
    /// yields an empty string.
    pub fn get_summary(&self) -> String {
        self.try_summary().unwrap_or_else(|e| {
            log::error!("{}: {}", self.name(), e);
            String::new()
        })
    }

    /// Returns `false` if the body embeds an `iframe`, `script`, `object` or
    /// `embed` element.
    pub fn is_rss_safe(&self) -> bool {
        !RSS_UNSAFE_REGEX.is_match(&self.markdown)
    }

    /// Returns `true` if the post is dated after the current time.
    pub fn is_future(&self) -> bool {
        match self.published {
            Some(published) => published > Local::now().naive_local(),
            None => false,
        }
    }

    /// Returns `true` if the post was modified after its publication date.
    pub fn is_updated(&self) -> bool {
        match (self.updated, self.published) {
            (Some(updated), Some(published)) => updated > published,
            _ => false,
        }
    }

    /// The publication date formatted with `format` (see
    /// [`chrono::format::strftime`]), or `None` if the post has no date.
    pub fn get_published(&self, format: &str) -> Option<String> {
        self.published.map(|date| date.format(format).to_string())
    }

    /// The update date formatted with `format`. A post that wasn't updated
    /// reports its publication date.
    pub fn get_updated(&self, format: &str) -> Option<String> {
        match (self.is_updated(), self.updated) {
            (true, Some(updated)) => Some(updated.format(format).to_string()),
            _ => self.get_published(format),
        }
    }

    /// Converts a post into a template [`Value`]. Extra attributes are
    /// exposed next to the known fields.
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = self
            .extra
            .iter()
            .map(|(key, yaml)| (key.clone(), value::from_yaml(yaml)))
            .collect();

        match &self.identity {
            Some(identity) => {
                m.insert("year".to_owned(), Value::from(identity.year as i64));
                m.insert("month".to_owned(), Value::from(identity.month as i64));
                m.insert("day".to_owned(), Value::from(identity.day as i64));
                m.insert("idx".to_owned(), Value::from(identity.idx.as_str()));
                m.insert("stub".to_owned(), Value::from(identity.stub.as_str()));
            }
            None => {
                for key in &["year", "month", "day", "idx", "stub"] {
                    m.insert((*key).to_owned(), Value::Nil);
                }
            }
        }
        m.insert("post_id".to_owned(), Value::from(self.post_id.as_str()));
        m.insert("uid".to_owned(), Value::from(self.uid.as_str()));
        m.insert("url".to_owned(), Value::from(self.url.as_str()));
        m.insert("title".to_owned(), value::from_option(&self.title));
        m.insert("author".to_owned(), value::from_option(&self.author));
        m.insert("layout".to_owned(), value::from_option(&self.layout));
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(|t| Value::from(t.as_str())).collect()),
        );
        m.insert("thumbnail".to_owned(), value::from_option(&self.thumbnail));
        m.insert(
            "published".to_owned(),
            value::from_option(&self.get_published(DATE_FORMAT)),
        );
        m.insert(
            "updated".to_owned(),
            value::from_option(&self.get_updated(DATE_FORMAT)),
        );
        m.insert("is_updated".to_owned(), Value::from(self.is_updated()));
        m.insert("has_more".to_owned(), Value::from(self.has_more()));
        Value::Object(m)
    }

    /// The binding context of the body template: `site` and `post`.
    pub fn bindings(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), Value::from(self.site));
        m.insert("post".to_owned(), self.to_value());
        Value::Object(m)
    }
}

impl PartialEq for Post<'_> {
    /// Posts are compared by content. The navigation links and the site
    /// reference don't take part.
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.post_id == other.post_id
            && self.url == other.url
            && self.published == other.published
            && self.updated == other.updated
            && self.markdown == other.markdown
            && self.title == other.title
            && self.author == other.author
            && self.layout == other.layout
            && self.tags == other.tags
            && self.thumbnail == other.thumbnail
            && self.extra == other.extra
    }
}

/// Splits raw post text at the first `...` line into front-matter and body.
/// Without such a line the whole text is the body.
fn split_frontmatter(content: &str) -> (&str, &str) {
    match END_OF_HEADER_REGEX.find(content) {
        Some(m) => (&content[..m.start()], &content[m.end()..]),
        None => ("", content),
    }
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn modified(path: &Path) -> Option<NaiveDateTime> {
    let time = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(time).naive_local())
}

/// Finds the first file (by name) in the configured `img_dir` whose name
/// starts with `post_id` and returns its URL under `img_url`.
fn find_thumbnail(site: &Config, post_id: &str) -> Option<String> {
    let dir = site.get_path("img_dir")?;
    if !dir.is_dir() {
        log::debug!("image directory `{}` not found", dir.display());
        return None;
    }

    let img_url = site.get_str("img_url").unwrap_or_default();
    WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find_map(|entry| {
            let name = entry.file_name().to_str()?;
            if name.starts_with(post_id) {
                Some(format!("{}/{}", img_url, name))
            } else {
                None
            }
        })
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the post file can't be read.
    Io(std::io::Error),

    /// Returned when the front-matter isn't a YAML mapping of attributes.
    Frontmatter(serde_yaml::Error),

    /// Returned when the configured `default_*` attributes are malformed.
    Defaults(serde_yaml::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => fmt::Display::fmt(err, f),
            Error::Frontmatter(err) => write!(f, "front-matter: {}", err),
            Error::Defaults(err) => write!(f, "default attributes: {}", err),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Frontmatter(err) => Some(err),
            Error::Defaults(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
