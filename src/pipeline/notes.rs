//! Release body rendering for published bundles.

use crate::github::RepoRef;

/// A recorded source whose repository has published a newer release since the
/// last bundle.
#[derive(Debug, Clone)]
pub struct DriftedSource {
    /// The upstream repository.
    pub repo: RepoRef,
    /// Tag of the newly resolved release.
    pub tag_name: String,
    /// Web page of the newly resolved release.
    pub html_url: String,
    /// Markdown body of the newly resolved release, if any.
    pub body: Option<String>,
}

/// Renders the release body: a fixed heading followed by one collapsible
/// section per updated source, quoting the upstream release notes.
pub fn render(drifted: &[DriftedSource]) -> String {
    let blocks = drifted.iter().map(block).collect::<Vec<_>>().join("\n\n");
    format!("# Payload auto-update\n\n{blocks}")
}

fn block(source: &DriftedSource) -> String {
    let quoted = match source.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => body
            .lines()
            .map(|line| format!("> {}", line.trim_end()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "No release notes provided.".to_string(),
    };

    format!(
        "<details>\n<summary>Update {} to {}</summary>\n\n\
         ## [Release notes]({})\n\n\
         {}\n\n\
         </details>",
        source.repo.slug(),
        source.tag_name,
        source.html_url,
        quoted
    )
}
