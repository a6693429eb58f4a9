//! XSS filter benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use networking::{HeaderMap, LoadChannel, Request};
use std::sync::Arc;
use url::Url;
use xss_filter::{
    registrable_domain, unescape_loop, Detector, Findings, HeaderPolicy, ParameterSet,
    SharedConfig, ViolationReporter, XssFilter,
};

/// Flags parameters that appear verbatim in the inspected text.
struct SubstringDetector;

impl Detector for SubstringDetector {
    fn check_inline(&self, content: &str, params: &ParameterSet) -> Findings {
        params
            .iter()
            .filter(|p| !p.value.is_empty() && content.contains(p.value.as_str()))
            .map(|p| p.name.clone())
            .collect()
    }

    fn check_external(&self, target: &Url, _page: &Url, params: &ParameterSet) -> Findings {
        self.check_inline(target.as_str(), params)
    }
}

/// Benchmark header parsing.
fn bench_header_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_parsing");

    for value in ["0", "1", "1; mode=block", "1 ;\tMODE = Block", "1; report=/xss"] {
        group.bench_with_input(BenchmarkId::from_parameter(value), &value, |b, value| {
            b.iter(|| HeaderPolicy::parse(black_box(Some(*value))))
        });
    }

    group.finish();
}

/// Benchmark domain grouping and unescaping.
fn bench_url_helpers(c: &mut Criterion) {
    let urls: Vec<Url> = [
        "https://example.com/a.js",
        "https://static.cdn.example.co.uk/b.js",
        "http://192.168.1.10/c.js",
        "data:text/html,hello",
    ]
    .iter()
    .filter_map(|s| Url::parse(s).ok())
    .collect();

    let mut group = c.benchmark_group("url_helpers");

    group.bench_function("registrable_domain", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(registrable_domain(url));
            }
        })
    });

    group.bench_function("unescape_loop", |b| {
        b.iter(|| unescape_loop(black_box("javascript:alert%252528document.cookie%252529")))
    });

    group.finish();
}

/// Benchmark permission checks on a page with reflected parameters.
fn bench_permission_checks(c: &mut Criterion) {
    let Ok(page) = Url::parse("https://example.com/search?q=alert(1)&lang=en&page=2") else {
        return;
    };
    let Ok(script) = Url::parse("https://cdn.example.com/app.js") else {
        return;
    };

    let new_filter = || {
        let channel = LoadChannel::new(Request::get(page.clone()), HeaderMap::new());
        XssFilter::new(page.clone(), SharedConfig::default(), Arc::new(SubstringDetector))
            .with_channel(Arc::new(channel))
            .with_reporter(ViolationReporter::tracing_only())
    };

    let mut group = c.benchmark_group("permission_checks");

    group.bench_function("inline_script_clean", |b| {
        let filter = new_filter();
        b.iter(|| filter.permits_inline_script(black_box("document.title = 'Search';")))
    });

    group.bench_function("external_script_cached", |b| {
        let mut filter = new_filter();
        b.iter(|| filter.permits_external_script(black_box(Some(&script)), false))
    });

    group.bench_function("first_check", |b| {
        b.iter(|| {
            let filter = new_filter();
            filter.permits_inline_script(black_box("render()"))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_header_parsing,
    bench_url_helpers,
    bench_permission_checks,
);

criterion_main!(benches);
