use std::fs;
use std::path::Path;

use bytes::Bytes;

use super::Representation;

/// Renders a directory as a minimal HTML index.
///
/// Entries are sorted by name; directories get a trailing `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDirectoryListing;

impl Representation for HtmlDirectoryListing {
    fn render(&self, path: &Path) -> Option<Bytes> {
        let mut names: Vec<String> = fs::read_dir(path)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    name.push('/');
                }
                name
            })
            .collect();
        names.sort();

        let title = escape(&path.to_string_lossy());
        let mut html = format!(
            "<!DOCTYPE html>\n<html><head><title>Index of {title}</title></head>\n<body><h1>Index of {title}</h1>\n<ul>\n"
        );
        for name in &names {
            let link = urlencoding::encode(name.trim_end_matches('/'));
            let slash = if name.ends_with('/') { "/" } else { "" };
            html.push_str(&format!(
                "<li><a href=\"{link}{slash}\">{}</a></li>\n",
                escape(name)
            ));
        }
        html.push_str("</ul></body></html>\n");

        Some(Bytes::from(html))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
