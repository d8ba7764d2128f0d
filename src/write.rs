//! Renders the posts of a [`Site`] through layout templates and writes the
//! resulting HTML pages to disk.

use crate::post::Post;
use crate::site::Site;
use crate::template;
use gtmpl_value::Value;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The layout applied to posts which don't name one.
pub const DEFAULT_LAYOUT: &str = "post";

/// The layout of the index page. The index page is only written if this
/// layout exists.
pub const INDEX_LAYOUT: &str = "index";

const LAYOUT_EXTENSION: &str = "html";

/// Responsible for templating and writing HTML pages to disk from the posts
/// of a [`Site`].
pub struct Writer<'a> {
    /// The site whose posts are written.
    pub site: &'a Site<'a>,

    /// The directory holding `{layout}.html` templates.
    pub layouts_directory: &'a Path,

    /// The directory in which pages are written. A post is written to
    /// `{output_directory}/{year}/{month}/{stub}.html`.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes a page for every published post and, if the index layout
    /// exists, the index page. Returns the paths written.
    pub fn write_site(&self) -> Result<Vec<PathBuf>> {
        let mut layouts = Layouts::new(self.layouts_directory);
        let mut written = Vec::new();

        // Neighbours are taken from the published posts so that no page
        // links to an unwritten one.
        let published: Vec<&Post> = self.site.published().map(|(_, post)| post).collect();
        for (i, post) in published.iter().enumerate() {
            let newer = i.checked_sub(1).and_then(|j| published.get(j)).copied();
            let older = published.get(i + 1).copied();
            written.push(self.write_post(&mut layouts, post, newer, older)?);
        }
        if let Some(path) = self.write_index(&mut layouts)? {
            written.push(path);
        }
        Ok(written)
    }

    /// Output location for `post`, relative to the output directory.
    pub fn post_path(post: &Post) -> Option<PathBuf> {
        let identity = post.identity.as_ref()?;
        Some(
            PathBuf::from(identity.year.to_string())
                .join(format!("{:02}", identity.month))
                .join(format!("{}.html", identity.stub)),
        )
    }

    fn write_post(
        &self,
        layouts: &mut Layouts,
        post: &Post,
        newer: Option<&Post>,
        older: Option<&Post>,
    ) -> Result<PathBuf> {
        let relative = Writer::post_path(post)
            .ok_or_else(|| Error::Unidentified(post.name()))?;
        let layout = post.layout.as_deref().unwrap_or(DEFAULT_LAYOUT);

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), Value::from(self.site.config));
        m.insert("post".to_owned(), page_value(post));
        m.insert("newer".to_owned(), neighbour_value(newer));
        m.insert("older".to_owned(), neighbour_value(older));

        let html = layouts.render(layout, Value::Object(m))?;
        let path = self.output_directory.join(relative);
        write_file(&path, &html)?;
        log::debug!("wrote `{}`", path.display());
        Ok(path)
    }

    fn write_index(&self, layouts: &mut Layouts) -> Result<Option<PathBuf>> {
        if !layouts.exists(INDEX_LAYOUT) {
            log::debug!("no `{}` layout, skipping index page", INDEX_LAYOUT);
            return Ok(None);
        }

        let posts: Vec<Value> = self.site.published().map(|(_, post)| page_value(post)).collect();
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), Value::from(self.site.config));
        m.insert("posts".to_owned(), Value::Array(posts));

        let html = layouts.render(INDEX_LAYOUT, Value::Object(m))?;
        let path = self.output_directory.join("index.html");
        write_file(&path, &html)?;
        Ok(Some(path))
    }
}

/// A post's template value with its rendered `html` and `summary`.
fn page_value(post: &Post) -> Value {
    let mut value = post.to_value();
    if let Value::Object(m) = &mut value {
        m.insert("html".to_owned(), Value::String(post.get_html()));
        m.insert("summary".to_owned(), Value::String(post.get_summary()));
    }
    value
}

fn neighbour_value(post: Option<&Post>) -> Value {
    match post {
        Some(post) => post.to_value(),
        None => Value::Nil,
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|err| Error::Io {
            path: dir.to_owned(),
            err,
        })?;
    }
    std::fs::write(path, contents).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

/// Loads layout templates on first use.
struct Layouts<'a> {
    directory: &'a Path,
    loaded: HashMap<String, String>,
}

impl<'a> Layouts<'a> {
    fn new(directory: &'a Path) -> Layouts<'a> {
        Layouts {
            directory,
            loaded: HashMap::new(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.directory.join(name).with_extension(LAYOUT_EXTENSION)
    }

    fn exists(&self, name: &str) -> bool {
        self.loaded.contains_key(name) || self.path(name).is_file()
    }

    fn render(&mut self, name: &str, bindings: Value) -> Result<String> {
        if !self.loaded.contains_key(name) {
            let path = self.path(name);
            let text = std::fs::read_to_string(&path).map_err(|err| Error::OpenLayout {
                path: path.clone(),
                err,
            })?;
            self.loaded.insert(name.to_owned(), text);
        }
        let text = &self.loaded[name];
        template::render(text, bindings).map_err(|err| Error::Template {
            layout: name.to_owned(),
            err,
        })
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// Returned when a layout file can't be read.
    OpenLayout { path: PathBuf, err: io::Error },

    /// Returned when a layout can't be rendered.
    Template { layout: String, err: template::Error },

    /// Returned when a post without identity has no output location.
    Unidentified(String),

    /// An error writing the output files.
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenLayout { path, err } => {
                write!(f, "opening layout `{}`: {}", path.display(), err)
            }
            Error::Template { layout, err } => {
                write!(f, "layout `{}`: {}", layout, err)
            }
            Error::Unidentified(name) => {
                write!(f, "post `{}` has no date or stub", name)
            }
            Error::Io { path, err } => {
                write!(f, "writing `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenLayout { path: _, err } => Some(err),
            Error::Template { layout: _, err } => Some(err),
            Error::Unidentified(_) => None,
            Error::Io { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        posts: TempDir,
        layouts: TempDir,
        output: TempDir,
    }

    fn fixture() -> Fixture {
        let fixture = Fixture {
            posts: TempDir::new().unwrap(),
            layouts: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
        };
        for (name, body) in &[
            ("2012-01-01-a.markdown", "title: A\n...\nfirst {{.site.url}}\n<!--more-->\nrest"),
            ("2012-01-02-b.markdown", "title: B\nlayout: bare\n...\nsecond"),
            ("2999-01-01-c.markdown", "title: C\n...\nnot yet"),
        ] {
            fs::write(fixture.posts.path().join(name), body).unwrap();
        }
        fs::write(
            fixture.layouts.path().join("post.html"),
            "<h1>{{.post.title}}</h1>{{.post.html}}|{{if .newer}}{{.newer.url}}{{end}}|{{if .older}}{{.older.url}}{{end}}",
        )
        .unwrap();
        fs::write(fixture.layouts.path().join("bare.html"), "{{.post.html}}").unwrap();
        fixture
    }

    fn config() -> Config {
        Config::resolve("default:\n  url: //x\n  blog_url: '{url}/blog'\n", "default").unwrap()
    }

    #[test]
    fn test_write_posts() -> Result<()> {
        let fixture = fixture();
        let config = config();
        let site = Site::generate(&config, fixture.posts.path()).unwrap();
        let writer = Writer {
            site: &site,
            layouts_directory: fixture.layouts.path(),
            output_directory: fixture.output.path(),
        };

        let written = writer.write_site()?;
        assert_eq!(written.len(), 2);

        let a = fs::read_to_string(fixture.output.path().join("2012/01/a.html")).unwrap();
        assert!(a.starts_with("<h1>A</h1><p>first //x\n<a id=\"more\">"), "{}", a);
        assert!(a.ends_with("</a>\nrest</p>|//x/blog/2012/01/b.html|"), "{}", a);

        let b = fs::read_to_string(fixture.output.path().join("2012/01/b.html")).unwrap();
        assert_eq!(b, "<p>second</p>");

        assert!(!fixture.output.path().join("2999").exists());
        assert!(!fixture.output.path().join("index.html").exists());
        Ok(())
    }

    #[test]
    fn test_write_index() -> Result<()> {
        let fixture = fixture();
        fs::write(
            fixture.layouts.path().join("index.html"),
            "{{range .posts}}[{{.title}}:{{.summary}}]{{end}}",
        )
        .unwrap();
        let config = config();
        let site = Site::generate(&config, fixture.posts.path()).unwrap();
        let writer = Writer {
            site: &site,
            layouts_directory: fixture.layouts.path(),
            output_directory: fixture.output.path(),
        };
        writer.write_site()?;

        let index = fs::read_to_string(fixture.output.path().join("index.html")).unwrap();
        assert_eq!(index, "[B:<p>second</p>][A:<p>first //x</p>]");
        Ok(())
    }

    #[test]
    fn test_future_posts_are_not_linked() -> Result<()> {
        let posts = TempDir::new().unwrap();
        let layouts = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(posts.path().join("2012-01-01-a.markdown"), "a").unwrap();
        fs::write(posts.path().join("2999-01-01-later.markdown"), "later").unwrap();
        fs::write(
            layouts.path().join("post.html"),
            "newer={{if .newer}}{{.newer.url}}{{end}}",
        )
        .unwrap();

        let config = Config::resolve("default:\n  blog_url: /blog\n", "default").unwrap();
        let site = Site::generate(&config, posts.path()).unwrap();
        assert_eq!(site.newer(1).map(|p| p.post_id.as_str()), Some("2999-01-01-later"));

        let writer = Writer {
            site: &site,
            layouts_directory: layouts.path(),
            output_directory: output.path(),
        };
        assert_eq!(writer.write_site()?.len(), 1);

        let a = fs::read_to_string(output.path().join("2012/01/a.html")).unwrap();
        assert_eq!(a, "newer=");
        assert!(!output.path().join("2999").exists());
        Ok(())
    }

    #[test]
    fn test_missing_layout() {
        let fixture = fixture();
        fs::remove_file(fixture.layouts.path().join("bare.html")).unwrap();
        let config = config();
        let site = Site::generate(&config, fixture.posts.path()).unwrap();
        let writer = Writer {
            site: &site,
            layouts_directory: fixture.layouts.path(),
            output_directory: fixture.output.path(),
        };
        match writer.write_site() {
            Err(Error::OpenLayout { path, .. }) => assert!(path.ends_with("bare.html")),
            other => panic!("wanted missing layout, got {:?}", other),
        }
    }
}
