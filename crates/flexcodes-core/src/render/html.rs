use std::fmt::Write;

use super::{escape_html, MapLinks};
use crate::filter::{CommunityGroup, FilterResult};
use crate::models::AccessCodeRecord;
use crate::storage::CollapseLookup;

/// Placeholder shown when no group survives filtering
pub const NO_MATCHES: &str = r#"<div class="sub" style="padding: 14px 16px;">No matches.</div>"#;

/// Render the grouped list. Collapsed groups come out with the `collapsed`
/// class and `aria-expanded="false"`.
pub fn render_groups(result: &FilterResult<'_>, collapse: &impl CollapseLookup) -> String {
    if result.is_empty() {
        return NO_MATCHES.to_string();
    }

    let mut out = String::new();
    for group in &result.groups {
        render_group(&mut out, group, collapse.is_collapsed(group.community));
    }
    out
}

fn render_group(out: &mut String, group: &CommunityGroup<'_>, collapsed: bool) {
    let community = escape_html(group.community);
    let class = if collapsed { "group collapsed" } else { "group" };

    // Writing into a String cannot fail
    let _ = write!(
        out,
        r#"<section class="{class}" data-community="{community}">
  <div class="group-header" role="button" tabindex="0" aria-expanded="{expanded}">
    <div class="group-title">{community}</div>
    <div class="group-meta">
      <span>{count}</span>
      <span class="chev" aria-hidden="true"></span>
    </div>
  </div>
  <div class="items">
"#,
        expanded = !collapsed,
        count = group.len(),
    );
    for item in &group.items {
        render_card(out, item);
    }
    out.push_str("  </div>\n</section>\n");
}

fn render_card(out: &mut String, record: &AccessCodeRecord) {
    let links = MapLinks::for_address(&record.address);
    let _ = write!(
        out,
        r#"    <div class="card">
      <div class="addr">{address}</div>
      <div class="sub">{kind}</div>
      <div class="pills">
        <span class="pill primary mono">{gate}</span>
        <a class="pill" href="{maps}" target="_blank" rel="noopener">Maps</a>
        <a class="pill" href="{street}" target="_blank" rel="noopener">Street View</a>
      </div>
    </div>
"#,
        address = escape_html(&record.address),
        kind = escape_html(&record.kind),
        gate = escape_html(record.gate_label()),
        maps = escape_html(&links.maps),
        street = escape_html(&links.street_view),
    );
}

/// Placeholder replacing the list when the dataset is missing
pub fn render_load_error(dataset_name: &str) -> String {
    format!(
        r#"<div class="sub" style="padding: 14px 16px;">Couldn't load <b>{}</b>. Put it next to <b>index.html</b>.</div>"#,
        escape_html(dataset_name)
    )
}

/// Standalone document around a rendered list, for exports
pub fn render_page(title: &str, summary: &str, status: &str, list: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1"/>
  <title>{title}</title>
  <link rel="stylesheet" href="style.css"/>
</head>
<body>
  <header class="ios-header">
    <h1>{title}</h1>
    <div class="meta"><span id="counts">{summary}</span> <span id="lastUpdated">{status}</span></div>
  </header>
  <main id="list">
{list}  </main>
</body>
</html>
"#,
        title = escape_html(title),
        summary = escape_html(summary),
        status = escape_html(status),
        list = list,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::apply;
    use crate::models::TypeFilter;
    use crate::storage::{CollapseState, MemoryStore};

    fn expanded() -> CollapseState<MemoryStore> {
        CollapseState::new(MemoryStore::new())
    }

    #[test]
    fn test_empty_result_renders_placeholder() {
        let records: Vec<AccessCodeRecord> = Vec::new();
        let result = apply(&records, &TypeFilter::All, "");
        assert_eq!(render_groups(&result, &expanded()), NO_MATCHES);
    }

    #[test]
    fn test_untrusted_fields_are_escaped() {
        let records = vec![AccessCodeRecord::new(
            "<b>Evil</b>",
            "<script>",
            "\"1'2\"",
            "<i>Apartments</i>",
        )];
        let result = apply(&records, &TypeFilter::All, "");
        let html = render_groups(&result, &expanded());

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>Evil</b>"));
        assert!(html.contains("data-community=\"&lt;b&gt;Evil&lt;/b&gt;\""));
        assert!(html.contains("&quot;1&#039;2&quot;"));
        assert!(html.contains("&lt;i&gt;Apartments&lt;/i&gt;"));
    }

    #[test]
    fn test_group_header_and_cards() {
        let records = vec![
            AccessCodeRecord::new("Oakwood", "123 Main St", "4521", "Apartments"),
            AccessCodeRecord::new("Oakwood", "125 Main St", "", "Apartments"),
        ];
        let result = apply(&records, &TypeFilter::All, "");
        let html = render_groups(&result, &expanded());

        assert_eq!(html.matches("<section").count(), 1);
        assert_eq!(html.matches("class=\"card\"").count(), 2);
        assert!(html.contains("<span>2</span>"));
        assert!(html.contains(">4521</span>"));
        assert!(html.contains(">No Code</span>"));
        assert!(html.contains("https://maps.apple.com/?q=123%20Main%20St"));
        assert!(html.contains("layer=c&amp;cbll=0,0"));
        assert!(html.contains("aria-expanded=\"true\""));
    }

    #[test]
    fn test_collapsed_group_markup() {
        let records = vec![AccessCodeRecord::new("Oakwood", "1 A St", "", "Apartments")];
        let result = apply(&records, &TypeFilter::All, "");
        let mut state = expanded();
        state.set_collapsed("Oakwood", true).unwrap();

        let html = render_groups(&result, &state);
        assert!(html.contains("class=\"group collapsed\""));
        assert!(html.contains("aria-expanded=\"false\""));
    }

    #[test]
    fn test_load_error_placeholder() {
        let html = render_load_error("codes.csv");
        assert!(html.contains("Couldn't load <b>codes.csv</b>"));
        assert!(html.contains("index.html"));
    }

    #[test]
    fn test_render_page_wraps_list() {
        let page = render_page("Flex <Codes>", "2 locations", "Ready", NO_MATCHES);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Flex &lt;Codes&gt;</title>"));
        assert!(page.contains(NO_MATCHES));
    }
}
