use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

// ── Lazy static regexes ──────────────────────────────────────────────────────

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").unwrap());

static STRONG_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

static STRONG_UNDERSCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());

static EM_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+?)\*").unwrap());

static EM_UNDERSCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_\n]+?)_").unwrap());

static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:([-*])|(\d+)\.)[ \t]+(.+)$").unwrap());

static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

static HR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:---|\*\*\*)[ \t]*$").unwrap());

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\n]+)\)").unwrap());

static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]\n]*)\]\(([^)\n]+)\)").unwrap());

static UL_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</ul>\s*<ul>").unwrap());

static OL_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</ol>\s*<ol>").unwrap());

// ── Public types ─────────────────────────────────────────────────────────────

/// A converted summary ready for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub html: String,
    pub is_right_to_left: bool,
}

impl RenderedDocument {
    pub fn from_markdown(markdown: &str) -> Self {
        Self {
            html: convert(markdown),
            is_right_to_left: is_right_to_left(markdown),
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

type Pass = fn(&str) -> String;

/// Joins the lines of an emitted blockquote until the list pass has run, so
/// swallowed lines are never read as list items. Private-use code point.
const QUOTE_BREAK: char = '\u{E000}';

/// Rewrite passes in application order. Later passes see the HTML emitted by
/// earlier ones, so reordering changes the output.
const PASSES: [Pass; 12] = [
    decode_entities,
    headings,
    strong,
    emphasis,
    blockquotes,
    lists,
    restore_quote_breaks,
    inline_code,
    horizontal_rules,
    links,
    images,
    merge_adjacent_lists,
];

/// Convert the markdown subset produced by the summarizer into HTML.
///
/// Never fails: anything that does not match a construct is passed through
/// untouched, including raw HTML. The output is not sanitized.
pub fn convert(markdown: &str) -> String {
    PASSES
        .iter()
        .fold(markdown.to_string(), |text, pass| pass(&text))
}

/// True when the text contains any character of the Arabic block
/// (U+0600..=U+06FF), which covers Persian script.
pub fn is_right_to_left(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

// ── Passes ───────────────────────────────────────────────────────────────────

/// Undo upstream escaping so `&gt;` can act as a blockquote marker.
/// `&amp;` goes first so `&amp;gt;` collapses all the way to `>`.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
}

fn headings(text: &str) -> String {
    HEADING_RE
        .replace_all(text, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>", &caps[2])
        })
        .into_owned()
}

fn strong(text: &str) -> String {
    let text = STRONG_STAR_RE.replace_all(text, "<strong>${1}</strong>");
    STRONG_UNDERSCORE_RE
        .replace_all(&text, "<strong>${1}</strong>")
        .into_owned()
}

fn emphasis(text: &str) -> String {
    let text = EM_STAR_RE.replace_all(text, "<em>${1}</em>");
    EM_UNDERSCORE_RE
        .replace_all(&text, "<em>${1}</em>")
        .into_owned()
}

/// A line starting with `>` opens a quote that swallows the following
/// non-empty lines that do not start with `>`. An empty line closes it and
/// another `>` line opens a new one.
fn blockquotes(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let Some(first) = line.strip_prefix('>') else {
            out.push(line.to_string());
            continue;
        };

        // `> > nested` loses both markers.
        let first = strip_quote_marker(first.strip_prefix(' ').unwrap_or(first));
        let mut quoted = vec![first];
        while let Some(next) = lines.next_if(|l| !l.is_empty() && !l.starts_with('>')) {
            quoted.push(next);
        }

        let mut body = String::new();
        for (i, part) in quoted.iter().enumerate() {
            if i > 0 {
                body.push(QUOTE_BREAK);
            }
            body.push_str(part);
        }
        out.push(format!("<blockquote>{}</blockquote>", body));
    }

    out.join("\n")
}

fn lists(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut run: Option<ListRun> = None;

    for line in text.split('\n') {
        let Some((kind, body)) = list_item(line) else {
            if let Some(done) = run.take() {
                out.push(done.close());
            }
            out.push(line.to_string());
            continue;
        };

        match run.as_mut() {
            Some(current) if current.kind == kind => current.push(body),
            _ => {
                if let Some(done) = run.take() {
                    out.push(done.close());
                }
                run = Some(ListRun::open(kind, body));
            }
        }
    }

    if let Some(done) = run {
        out.push(done.close());
    }
    out.join("\n")
}

fn restore_quote_breaks(text: &str) -> String {
    text.replace(QUOTE_BREAK, "\n")
}

fn inline_code(text: &str) -> String {
    INLINE_CODE_RE
        .replace_all(text, "<code>${1}</code>")
        .into_owned()
}

fn horizontal_rules(text: &str) -> String {
    HR_RE.replace_all(text, "<hr>").into_owned()
}

/// `[label](url)` not preceded by `!`; image syntax is left for [`images`].
fn links(text: &str) -> String {
    LINK_RE
        .replace_all(text, |caps: &Captures| {
            let start = caps.get(0).map_or(0, |m| m.start());
            if text[..start].ends_with('!') {
                caps[0].to_string()
            } else {
                format!("<a href=\"{}\">{}</a>", &caps[2], &caps[1])
            }
        })
        .into_owned()
}

fn images(text: &str) -> String {
    IMAGE_RE
        .replace_all(text, "<img alt=\"${1}\" src=\"${2}\">")
        .into_owned()
}

fn merge_adjacent_lists(text: &str) -> String {
    let text = UL_BOUNDARY_RE.replace_all(text, "");
    OL_BOUNDARY_RE.replace_all(&text, "").into_owned()
}

// ── List helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Consecutive item lines of one kind, collected until the run breaks.
struct ListRun {
    kind: ListKind,
    items: String,
}

impl ListRun {
    fn open(kind: ListKind, body: &str) -> Self {
        let mut run = Self {
            kind,
            items: String::new(),
        };
        run.push(body);
        run
    }

    fn push(&mut self, body: &str) {
        self.items.push_str("<li>");
        self.items.push_str(body);
        self.items.push_str("</li>");
    }

    fn close(self) -> String {
        let tag = self.kind.tag();
        format!("<{tag}>{}</{tag}>", self.items)
    }
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    let caps = LIST_ITEM_RE.captures(line)?;
    let kind = if caps.get(1).is_some() {
        ListKind::Unordered
    } else {
        ListKind::Ordered
    };
    Some((kind, caps.get(3)?.as_str()))
}

fn strip_quote_marker(line: &str) -> &str {
    match line.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}
