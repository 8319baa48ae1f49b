use crate::core::report::BatchSummary;
use crate::core::session::BatchRequest;
use crate::domain::model::{AccountId, AudienceFilter, ConflictPolicy, SeedAudience};
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; color: #111827; }
.layout { display: flex; min-height: 100vh; }
aside { width: 300px; padding: 20px; background: #F9FAFB; border-right: 1px solid #E5E7EB; }
main { flex: 1; padding: 20px 32px; }
label { display: block; margin: 12px 0 4px; font-size: 13px; color: #374151; }
input[type=text], input[type=password], input[type=number], select { width: 100%; box-sizing: border-box; padding: 6px; }
.pill { display: inline-block; padding: 2px 8px; border: 1px solid #E5E7EB; border-radius: 999px; font-size: 12px; color: #374151; }
.small { color: #6B7280; font-size: 12px; }
.notice { padding: 10px 14px; border-radius: 6px; margin: 10px 0; }
.success { background: #ECFDF5; } .info { background: #EFF6FF; } .warning { background: #FFFBEB; } .error { background: #FEF2F2; }
.filters { display: flex; gap: 12px; align-items: flex-end; }
.filters > div { flex: 1; }
"#;

const PROGRESS_SCRIPT: &str = r#"
document.getElementById('batch-form').addEventListener('submit', function () {
  var bar = document.getElementById('progress');
  bar.hidden = false;
  setInterval(function () {
    fetch('/progress').then(function (r) { return r.json(); }).then(function (p) {
      if (p.total > 0) { bar.max = p.total; bar.value = p.done; }
    });
  }, 500);
});
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeKind {
    fn class(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// 已連線時才顯示的區塊
pub struct ConnectedView<'a> {
    pub account_id: &'a AccountId,
    pub loaded: usize,
    pub filtered: Vec<&'a SeedAudience>,
}

pub struct PageView<'a> {
    pub account_input: &'a str,
    pub form: &'a BatchRequest,
    pub filter: &'a AudienceFilter,
    pub connected: Option<ConnectedView<'a>>,
    pub notices: Vec<Notice>,
    pub summary: Option<BatchSummary>,
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn count_or_empty(value: u64) -> String {
    if value == 0 {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Lookalike Builder</title>
<style>{style}</style>
</head>
<body>
<div class="layout">
{sidebar}
<main>
<h1>🔁 Facebook Lookalike Audience Builder</h1>
<p class="small">Naming rule: <span class="pill">{{COUNTRY}}-{{PCT}}%-{{SOURCE_NAME}}</span></p>
"#,
        style = STYLE,
        sidebar = render_sidebar(view),
    );

    for notice in &view.notices {
        html.push_str(&render_notice(notice));
    }

    match &view.connected {
        Some(connected) => html.push_str(&render_audience_picker(view, connected)),
        None => html.push_str(
            "<p class=\"small\">Enter an access token and an ad account, then connect to load audiences.</p>\n",
        ),
    }

    if let Some(summary) = &view.summary {
        html.push_str(&render_summary(summary));
    }

    html.push_str("</main>\n</div>\n");
    if view.connected.is_some() {
        let _ = writeln!(html, "<script>{}</script>", PROGRESS_SCRIPT);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_notice(notice: &Notice) -> String {
    format!(
        "<div class=\"notice {}\">{}</div>\n",
        notice.kind.class(),
        escape_html(&notice.text)
    )
}

fn render_sidebar(view: &PageView<'_>) -> String {
    format!(
        r#"<aside>
<h2>🔐 Connection</h2>
<form method="post" action="/connect">
<label for="access_token">Access token</label>
<input type="password" id="access_token" name="access_token" autocomplete="off">
<label for="account_id">Ad account id</label>
<input type="text" id="account_id" name="account_id" value="{account}" placeholder="act_1234567890">
<p><button type="submit">🔌 Connect and load audiences</button></p>
</form>
</aside>"#,
        account = escape_html(view.account_input),
    )
}

fn render_policy_radios(selected: ConflictPolicy) -> String {
    let mut html = String::new();
    for policy in ConflictPolicy::ALL {
        let checked = if policy == selected { " checked" } else { "" };
        let _ = writeln!(
            html,
            "<label><input type=\"radio\" name=\"policy\" value=\"{}\"{}> {}</label>",
            policy.as_str(),
            checked,
            escape_html(policy.label())
        );
    }
    html
}

fn render_audience_picker(view: &PageView<'_>, connected: &ConnectedView<'_>) -> String {
    let mut options = String::new();
    for audience in &connected.filtered {
        let selected = if view.form.seed_ids.contains(&audience.id) {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            options,
            "<option value=\"{}\"{}>{}</option>",
            escape_html(&audience.id),
            selected,
            escape_html(&audience.label())
        );
    }

    format!(
        r#"<p class="small">Account {account}: {loaded} audiences loaded, {shown} shown.</p>
<form method="get" action="/" class="filters">
<div><label for="q">Search audiences (name contains)</label>
<input type="text" id="q" name="q" value="{keyword}"></div>
<div><label for="min_count">Minimum size (optional)</label>
<input type="number" id="min_count" name="min_count" min="0" step="100" value="{min}"></div>
<div><label for="max_count">Maximum size (0 = no limit)</label>
<input type="number" id="max_count" name="max_count" min="0" step="100" value="{max}"></div>
<div><button type="submit">Filter</button></div>
</form>
<form method="post" action="/batches" id="batch-form">
<label for="audience_id">Source audiences (multi-select) <span class="small">format: name (size) — ID</span></label>
<select id="audience_id" name="audience_id" multiple size="14">
{options}</select>
<label for="countries">Country codes (comma separated)</label>
<input type="text" id="countries" name="countries" value="{countries}">
<label for="ratios">Ratios (comma separated decimals, 0.01 = 1%)</label>
<input type="text" id="ratios" name="ratios" value="{ratios}">
<label>Name conflicts</label>
{policies}<p><button type="submit">🚀 Create Lookalike Audiences</button></p>
<progress id="progress" hidden value="0" max="1"></progress>
</form>
"#,
        account = escape_html(connected.account_id.as_str()),
        loaded = connected.loaded,
        shown = connected.filtered.len(),
        keyword = escape_html(&view.filter.keyword),
        min = count_or_empty(view.filter.min_count),
        max = count_or_empty(view.filter.max_count),
        options = options,
        countries = escape_html(&view.form.countries),
        ratios = escape_html(&view.form.ratios),
        policies = render_policy_radios(view.form.policy),
    )
}

/// 結果：成功全部列出，略過與失敗只列前 20 筆
pub fn render_summary(summary: &BatchSummary) -> String {
    let mut html = String::from("<section id=\"results\">\n<h2>Results</h2>\n");
    let _ = writeln!(
        html,
        "<p class=\"small\">{} combinations processed. <a href=\"/report.csv\">Download CSV</a></p>",
        summary.total
    );

    if !summary.successes.is_empty() {
        let _ = writeln!(
            html,
            "<div class=\"notice success\">✅ Created {}:</div>\n<ul>",
            summary.successes.len()
        );
        for (name, id) in &summary.successes {
            let _ = writeln!(
                html,
                "<li>{} (ID: {})</li>",
                escape_html(name),
                escape_html(id)
            );
        }
        html.push_str("</ul>\n");
    }

    if summary.skipped.total() > 0 {
        let _ = writeln!(
            html,
            "<div class=\"notice warning\">⏭️ Skipped {} existing names:</div>\n<ul>",
            summary.skipped.total()
        );
        for name in &summary.skipped.shown {
            let _ = writeln!(html, "<li>{}</li>", escape_html(name));
        }
        if summary.skipped.remaining > 0 {
            let _ = writeln!(html, "<li>…and {} more</li>", summary.skipped.remaining);
        }
        html.push_str("</ul>\n");
    }

    if summary.failures.total() > 0 {
        let _ = writeln!(
            html,
            "<div class=\"notice error\">❌ Failed {} (first {} shown):</div>\n<ul>",
            summary.failures.total(),
            summary.failures.shown.len()
        );
        for (name, error) in &summary.failures.shown {
            let _ = writeln!(
                html,
                "<li>{} | reason: {}</li>",
                escape_html(name),
                escape_html(error)
            );
        }
        if summary.failures.remaining > 0 {
            let _ = writeln!(html, "<li>…and {} more</li>", summary.failures.remaining);
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</section>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::Truncated;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"VIP" & 'co'</b>"#),
            "&lt;b&gt;&quot;VIP&quot; &amp; &#39;co&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_summary_shows_remaining_counts() {
        let summary = BatchSummary {
            total: 30,
            successes: vec![("TW-1%-VIP".to_string(), "2381".to_string())],
            skipped: Truncated {
                shown: vec!["US-1%-VIP".to_string()],
                remaining: 7,
            },
            failures: Truncated {
                shown: vec![("JP-1%-<VIP>".to_string(), "Invalid parameter".to_string())],
                remaining: 0,
            },
        };

        let html = render_summary(&summary);

        assert!(html.contains("TW-1%-VIP (ID: 2381)"));
        assert!(html.contains("Skipped 8 existing names"));
        assert!(html.contains("…and 7 more"));
        assert!(html.contains("JP-1%-&lt;VIP&gt; | reason: Invalid parameter"));
    }

    #[test]
    fn test_page_without_session_has_connect_form_only() {
        let form = BatchRequest::default();
        let filter = AudienceFilter::default();
        let view = PageView {
            account_input: "act_1",
            form: &form,
            filter: &filter,
            connected: None,
            notices: vec![Notice::new(NoticeKind::Error, "Access token is required")],
            summary: None,
        };

        let html = render_page(&view);

        assert!(html.contains("action=\"/connect\""));
        assert!(html.contains("value=\"act_1\""));
        assert!(html.contains("Access token is required"));
        assert!(!html.contains("action=\"/batches\""));
    }

    #[test]
    fn test_picker_marks_selected_and_policy() {
        let audiences = [
            SeedAudience {
                id: "1".to_string(),
                name: "VIP List".to_string(),
                approximate_count: Some(1200),
            },
            SeedAudience {
                id: "2".to_string(),
                name: "Cart".to_string(),
                approximate_count: None,
            },
        ];
        let account: AccountId = "act_9".parse().unwrap();
        let form = BatchRequest {
            seed_ids: vec!["2".to_string()],
            ratios: "0.01".to_string(),
            countries: "TW".to_string(),
            policy: ConflictPolicy::Skip,
        };
        let filter = AudienceFilter::default();
        let view = PageView {
            account_input: "act_9",
            form: &form,
            filter: &filter,
            connected: Some(ConnectedView {
                account_id: &account,
                loaded: 2,
                filtered: audiences.iter().collect(),
            }),
            notices: vec![],
            summary: None,
        };

        let html = render_page(&view);

        assert!(html.contains("<option value=\"1\">VIP List (1200) — 1</option>"));
        assert!(html.contains("<option value=\"2\" selected>Cart (N/A) — 2</option>"));
        assert!(html.contains("value=\"skip\" checked"));
        assert!(html.contains("2 audiences loaded, 2 shown"));
    }
}
