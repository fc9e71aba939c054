//! Text-region formatter.
//!
//! Turns the markdown source of one note field into the HTML stored in an
//! Anki field. The steps run in a fixed order so later steps never see the
//! output of earlier substitutions:
//!
//! 1. `$$..$$` / `$..$` become `\[..\]` / `\(..\)`
//! 2. Math regions are masked with placeholder tokens
//! 3. Mermaid fences are masked and wrapped in `<pre class="mermaid">`
//! 4. Curly cloze spans are converted (when enabled)
//! 5. Wiki links and embeds are rewritten to plain markdown or HTML
//! 6. `pulldown-cmark` renders the result; links, images and tags are
//!    rewritten on the event stream
//! 7. Placeholders are restored (math HTML-escaped, diagrams verbatim)
//!
//! Media found along the way accumulates on the [`Formatter`] for the whole
//! document scan.

mod cloze;
mod media;

pub use cloze::{ClozeStyle, curly_to_cloze, has_cloze, highlights_to_curly, highlights_to_mark};
pub use media::{MediaKind, is_external, media_file_name, pdf_page};

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$([\s\S]+?)\$\$").expect("Invalid display math regex"));

static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([^\s$](?:[^$]*?[^\s$])?)\$").expect("Invalid inline math regex")
});

static ANKI_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\\[[\s\S]*?\\\]|\\\([\s\S]*?\\\)").expect("Invalid anki math regex")
});

static MERMAID_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^```mermaid[ \t]*\n(.*?)^```[ \t]*$").expect("Invalid mermaid regex")
});

static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\[\]|\n]+)(?:\|([^\[\]\n]*))?\]\]").expect("Invalid wiki link regex")
});

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)#([\w/-]+)").expect("Invalid tag regex"));

const MATH_TOKEN: &str = "MDANKIMATH";
const DIAGRAM_TOKEN: &str = "MDANKIDIAGRAM";

/// Per-call switches, derived from the settings and the note type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Convert curly spans, and how.
    pub cloze: Option<ClozeStyle>,
    /// Treat `==highlights==` as cloze spans (only with `cloze`).
    pub highlights_to_cloze: bool,
    /// Strip `#tags` from the text and return them.
    pub collect_tags: bool,
}

/// One rendered field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub tags: Vec<String>,
}

/// Markdown to Anki HTML converter for one document scan.
#[derive(Debug, Clone)]
pub struct Formatter {
    vault_name: String,
    detected_media: Vec<String>,
}

impl Formatter {
    #[must_use]
    pub fn new(vault_name: impl Into<String>) -> Self {
        Self {
            vault_name: vault_name.into(),
            detected_media: Vec::new(),
        }
    }

    /// Media links seen so far, in first-seen order.
    #[must_use]
    pub fn detected_media(&self) -> &[String] {
        &self.detected_media
    }

    /// Deep link that opens `path` in the vault.
    #[must_use]
    pub fn obsidian_url(&self, path: &str) -> String {
        format!(
            "obsidian://open?vault={}&file={}",
            urlencoding::encode(&self.vault_name),
            urlencoding::encode(path)
        )
    }

    /// Render one field.
    pub fn format(&mut self, source: &str, options: FormatOptions) -> Formatted {
        let text = convert_math(source);
        let (text, math) = mask(&text, &ANKI_MATH, MATH_TOKEN, |m| m[0].to_string());
        let (text, diagrams) = mask(&text, &MERMAID_FENCE, DIAGRAM_TOKEN, |m| {
            format!("<pre class=\"mermaid\">\n{}</pre>", &m[1])
        });

        let text = match options.cloze {
            Some(style) => {
                let text = if options.highlights_to_cloze {
                    highlights_to_curly(&text)
                } else {
                    highlights_to_mark(&text)
                };
                curly_to_cloze(&text, style)
            }
            None => highlights_to_mark(&text),
        };

        let text = self.rewrite_wiki_links(&text);
        let (html, tags) = self.render(&text, options.collect_tags);
        let html = unwrap_single_paragraph(&html);

        let html = unmask(&html, DIAGRAM_TOKEN, &diagrams, false);
        let html = unmask(&html, MATH_TOKEN, &math, true);

        Formatted { text: html, tags }
    }

    fn register_media(&mut self, link: &str) {
        if !self.detected_media.iter().any(|m| m == link) {
            self.detected_media.push(link.to_string());
        }
    }

    fn rewrite_wiki_links(&mut self, text: &str) -> String {
        let mut found = Vec::new();
        let rewritten = WIKI_LINK.replace_all(text, |caps: &Captures| {
            let target = caps[2].trim();
            let alias = caps.get(3).map(|m| m.as_str());

            if caps[1].is_empty() {
                let display = alias.map_or_else(
                    || {
                        target
                            .split('#')
                            .filter(|part| !part.is_empty())
                            .collect::<Vec<_>>()
                            .join(" > ")
                    },
                    ToString::to_string,
                );
                return format!("[{display}](<{target}>)");
            }

            let name = media_file_name(target.split('#').next().unwrap_or(target));
            match MediaKind::from_link(target) {
                Some(MediaKind::Image) => format!("![{name}](<{target}>)"),
                Some(MediaKind::Audio) => {
                    found.push(target.to_string());
                    format!("<audio controls src=\"{name}\"></audio>")
                }
                Some(MediaKind::Video) => {
                    found.push(target.to_string());
                    format!("<video controls src=\"{name}\"></video>")
                }
                Some(MediaKind::Pdf) => {
                    let file = target.split('#').next().unwrap_or(target);
                    found.push(file.to_string());
                    format!(
                        "<canvas id=\"pdf\" data-src=\"/{name}\" data-page=\"{}\"></canvas>\
                         <img src=\"{name}\" hidden=\"hidden\">",
                        pdf_page(target)
                    )
                }
                None => {
                    warn!(embed = %target, "Unsupported embed left unconverted");
                    caps[0].to_string()
                }
            }
        });
        let rewritten = rewritten.into_owned();

        for link in found {
            self.register_media(&link);
        }
        rewritten
    }

    fn render(&mut self, text: &str, collect_tags: bool) -> (String, Vec<String>) {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        let parser = TextMergeStream::new(Parser::new_ext(text, options));
        let mut tags = Vec::new();
        let mut in_code_block = false;
        let mut events = Vec::new();

        for event in parser {
            let event = match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    Event::Start(Tag::CodeBlock(kind))
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    Event::End(TagEnd::CodeBlock)
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) if !is_external(&dest_url) && !dest_url.starts_with('#') => {
                    Event::Start(Tag::Link {
                        link_type,
                        dest_url: CowStr::from(self.internal_link_url(&dest_url)),
                        title,
                        id,
                    })
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) if !is_external(&dest_url) => {
                    let link = decode(&dest_url);
                    self.register_media(&link);
                    Event::Start(Tag::Image {
                        link_type,
                        dest_url: CowStr::from(media_file_name(&link).to_string()),
                        title,
                        id,
                    })
                }
                Event::Text(content) if collect_tags && !in_code_block => {
                    Event::Text(CowStr::from(strip_tags(&content, &mut tags)))
                }
                other => other,
            };
            events.push(event);
        }

        let mut out = String::with_capacity(text.len() * 2);
        html::push_html(&mut out, events.into_iter());
        (out, tags)
    }

    fn internal_link_url(&self, dest: &str) -> String {
        let dest = decode(dest);
        match dest.split_once('#') {
            Some((path, heading)) if !heading.is_empty() => format!(
                "{}%23{}",
                self.obsidian_url(path),
                urlencoding::encode(heading)
            ),
            Some((path, _)) => self.obsidian_url(path),
            None => self.obsidian_url(&dest),
        }
    }
}

fn decode(link: &str) -> String {
    urlencoding::decode(link).map_or_else(|_| link.to_string(), |s| s.into_owned())
}

fn strip_tags(text: &str, tags: &mut Vec<String>) -> String {
    INLINE_TAG
        .replace_all(text, |caps: &Captures| {
            let tag = &caps[2];
            if tag.chars().all(|c| c.is_ascii_digit()) {
                return caps[0].to_string();
            }
            tags.push(tag.to_string());
            caps[1].to_string()
        })
        .into_owned()
}

fn convert_math(text: &str) -> String {
    let text = DISPLAY_MATH.replace_all(text, r"\[${1}\]");
    INLINE_MATH.replace_all(&text, r"\(${1}\)").into_owned()
}

fn mask(
    text: &str,
    pattern: &Regex,
    token: &str,
    keep: impl Fn(&Captures) -> String,
) -> (String, Vec<String>) {
    let mut saved = Vec::new();
    let masked = pattern.replace_all(text, |caps: &Captures| {
        let placeholder = format!("{token}{}Z", saved.len());
        saved.push(keep(caps));
        placeholder
    });
    (masked.into_owned(), saved)
}

fn unmask(text: &str, token: &str, saved: &[String], escape: bool) -> String {
    let mut out = text.to_string();
    for (i, original) in saved.iter().enumerate() {
        let placeholder = format!("{token}{i}Z");
        let replacement = if escape {
            escape_html(original)
        } else {
            original.clone()
        };
        let wrapped = format!("<p>{placeholder}</p>");
        if !escape && out.contains(&wrapped) {
            out = out.replacen(&wrapped, &replacement, 1);
        } else {
            out = out.replacen(&placeholder, &replacement, 1);
        }
    }
    out
}

/// A field that renders to a single paragraph is stored without the `<p>`.
fn unwrap_single_paragraph(html: &str) -> String {
    let trimmed = html.trim_end();
    if let Some(inner) = trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        if !inner.contains("<p>") {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String can't fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(source: &str) -> String {
        Formatter::new("Vault").format(source, FormatOptions::default()).text
    }

    #[test]
    fn test_single_paragraph_is_unwrapped() {
        assert_eq!(plain("Q"), "Q");
        assert_eq!(plain("**bold**"), "<strong>bold</strong>");
    }

    #[test]
    fn test_multiple_paragraphs_are_kept() {
        assert_eq!(plain("one\n\ntwo"), "<p>one</p>\n<p>two</p>");
    }

    #[test]
    fn test_math_is_converted_and_protected() {
        assert_eq!(plain("$a_1 < b_2$"), r"\(a_1 &lt; b_2\)");
        assert_eq!(plain("$$x*y*z$$"), r"\[x*y*z\]");
        // A lone dollar sign is not math.
        assert_eq!(plain("costs $5"), "costs $5");
    }

    #[test]
    fn test_mermaid_is_kept_verbatim() {
        let out = plain("```mermaid\ngraph TD\nA-->B\n```");
        assert_eq!(out, "<pre class=\"mermaid\">\ngraph TD\nA-->B\n</pre>");
    }

    #[test]
    fn test_cloze_runs_before_rendering() {
        let mut f = Formatter::new("Vault");
        let out = f.format(
            "The {capital} is **{Paris}**",
            FormatOptions {
                cloze: Some(ClozeStyle::Numbered),
                ..FormatOptions::default()
            },
        );
        assert_eq!(
            out.text,
            "The {{c1::capital}} is <strong>{{c2::Paris}}</strong>"
        );
    }

    #[test]
    fn test_highlights_become_cloze_or_mark() {
        let mut f = Formatter::new("Vault");
        let cloze = f.format(
            "a ==b==",
            FormatOptions {
                cloze: Some(ClozeStyle::Numbered),
                highlights_to_cloze: true,
                ..FormatOptions::default()
            },
        );
        assert_eq!(cloze.text, "a {{c1::b}}");
        assert_eq!(plain("a ==b=="), "a <mark>b</mark>");
    }

    #[test]
    fn test_wiki_links_become_deep_links() {
        let out = plain("see [[My Note#Part 2|here]]");
        assert_eq!(
            out,
            "see <a href=\"obsidian://open?vault=Vault&amp;file=My%20Note%23Part%202\">here</a>"
        );
    }

    #[test]
    fn test_images_are_registered_and_flattened() {
        let mut f = Formatter::new("Vault");
        let out = f.format("![[img/cat.png|300]] and ![](img/cat.png)", FormatOptions::default());
        assert!(out.text.contains("src=\"cat.png\""));
        assert!(!out.text.contains("img/cat.png"));
        assert_eq!(f.detected_media(), ["img/cat.png"]);
    }

    #[test]
    fn test_media_accumulates_across_calls() {
        let mut f = Formatter::new("Vault");
        f.format("![[a.png]]", FormatOptions::default());
        f.format("![[song.mp3]]", FormatOptions::default());
        f.format("![[a.png]]", FormatOptions::default());
        assert_eq!(f.detected_media(), ["a.png", "song.mp3"]);
    }

    #[test]
    fn test_pdf_embed() {
        let mut f = Formatter::new("Vault");
        let out = f.format("![[docs/book.pdf#page=4]]", FormatOptions::default());
        assert!(out.text.contains("<canvas id=\"pdf\" data-src=\"/book.pdf\" data-page=\"4\">"));
        assert!(out.text.contains("<img src=\"book.pdf\" hidden=\"hidden\">"));
        assert_eq!(f.detected_media(), ["docs/book.pdf"]);
    }

    #[test]
    fn test_unsupported_embed_is_left_alone() {
        let mut f = Formatter::new("Vault");
        let out = f.format("![[Other note]]", FormatOptions::default());
        assert_eq!(out.text, "![[Other note]]");
        assert!(f.detected_media().is_empty());
    }

    #[test]
    fn test_tags_are_collected_outside_code() {
        let mut f = Formatter::new("Vault");
        let out = f.format(
            "Answer #rust/async here #2024\n\n```\n#not_a_tag\n```",
            FormatOptions {
                collect_tags: true,
                ..FormatOptions::default()
            },
        );
        assert_eq!(out.tags, vec!["rust/async"]);
        assert!(out.text.contains("#2024"));
        assert!(out.text.contains("#not_a_tag"));
        assert!(!out.text.contains("#rust"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href='x'&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_html("\"q\" < 1"), "&quot;q&quot; &lt; 1");
    }
}
