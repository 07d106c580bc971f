//! Directory listing module
//!
//! Renders the HTML index shown for directories that have no index file.

use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

/// One row of the listing
#[derive(Debug, PartialEq, Eq)]
struct ListingEntry {
    name: String,
    display_name: String,
    link: String,
}

/// Render the listing for `dir`, titled with the decoded request path
pub async fn render_listing(dir: &Path, display_path: &str) -> std::io::Result<String> {
    let mut entries = read_entries(dir).await?;
    entries.sort_by_key(|e| e.name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    html.push_str("<hr>\n<ul>\n");
    for entry in &entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&entry.link),
            escape_html(&entry.display_name)
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Ok(html)
}

async fn read_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_symlink = entry.file_type().await.is_ok_and(|t| t.is_symlink());
        // Follows symlinks, so a link to a directory still gets a trailing slash
        let is_dir = fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir());

        let encoded = urlencoding::encode(&name);
        let link = if is_dir {
            format!("{encoded}/")
        } else {
            encoded.into_owned()
        };
        let display_name = if is_symlink {
            format!("{name}@")
        } else if is_dir {
            format!("{name}/")
        } else {
            name.clone()
        };

        entries.push(ListingEntry {
            name,
            display_name,
            link,
        });
    }

    Ok(entries)
}

/// Escape text for use in HTML content and double-quoted attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
