use crate::naming::{JobId, display_job_id};
use std::fmt::Write;
use urlencoding::encode;

const HEAD: &str = r#"<link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/4.3.1/css/bootstrap.min.css">"#;

pub fn job_list(jobs: &[JobId]) -> String {
    let mut items = String::new();
    for job in jobs {
        let href = encode(job.as_str());
        let _ = write!(
            items,
            r#"<div class="d-flex justify-content-between align-items-center list-group-item">
<a href="/requests/{href}" class="flex-grow-1 mr-3">{text}</a>
<a href="/delete/{href}" class="btn btn-danger btn-sm" onclick="return confirm('해당 분석 결과를 모두 삭제하시겠습니까?');">삭제</a>
</div>
"#,
            text = escape_html(&display_job_id(job)),
        );
    }
    page("Lighthouse 분석 요청 목록", &items)
}

pub fn report_list(job: &JobId, files: &[String]) -> String {
    let job_href = encode(job.as_str());
    let mut items = String::new();
    for file in files {
        let _ = write!(
            items,
            r#"<a href="/report/{job_href}/{href}" class="list-group-item list-group-item-action">{text}</a>
"#,
            href = encode(file),
            text = escape_html(file),
        );
    }
    page(
        &format!("Lighthouse 분석 결과 목록 ({})", display_job_id(job)),
        &items,
    )
}

fn page(title: &str, items: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
{HEAD}
</head>
<body>
<div class="container d-flex justify-content-center align-items-center" style="height: 100vh;">
<div class="card" style="min-width: 500px;">
<div class="card-body">
<h5 class="card-title">{title}</h5>
<div class="list-group" style="max-height:500px; overflow-y:scroll">
{items}</div>
</div>
</div>
</div>
</body>
</html>
"#
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
