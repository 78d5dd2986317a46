use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use quick_html::{Config, Event, Reader};

static SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Sample &amp; friends</title>
<style>p > a { color: red }</style>
</head>
<body>
<p>Lorem ipsum <b>dolor</b> sit amet, consectetur &lt;adipiscing&gt; elit.</p>
<ul><li>one<li>two<li>three</ul>
<table><tr><td>a</td><td>b</td><tr><td>c</td><td>d</td></table>
<p>caf&eacute; &#8364; 42</p>
</body>
</html>
"#;

static SOUP: &str = "<b><i>one</b>two</i><table><td>x<li>y</table><p>z";

fn count_events(bytes: &[u8], config: Config) -> usize {
    let mut reader = Reader::with_config(bytes, config);
    let mut count = 0;
    loop {
        match reader.read_event().unwrap() {
            Event::EndDocument => return count,
            _ => count += 1,
        }
    }
}

/// Raw tokenizing without the balancer.
fn scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));
    group.bench_function("sample_document", |b| {
        b.iter(|| {
            let mut config = Config::default();
            config.balance_tags = false;
            count_events(SAMPLE.as_bytes(), config)
        })
    });
    group.finish();
}

/// The full pipeline including tag repair.
fn balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("balance");
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));
    group.bench_function("sample_document", |b| {
        b.iter(|| count_events(SAMPLE.as_bytes(), Config::default()))
    });
    group.bench_function("tag_soup", |b| {
        b.iter(|| count_events(SOUP.as_bytes(), Config::default()))
    });
    group.finish();
}

/// Incremental named-reference resolution through the scanner.
fn entities(c: &mut Criterion) {
    let doc: String = "&amp;&lt;&gt;&nbsp;&copy;&eacute;&notin;&hearts;".repeat(64);
    let mut group = c.benchmark_group("entities");
    group.throughput(Throughput::Bytes(doc.len() as u64));
    group.bench_function("named_references", |b| {
        b.iter(|| {
            let mut config = Config::default();
            config.balance_tags = false;
            count_events(doc.as_bytes(), config)
        })
    });
    group.finish();
}

criterion_group!(benches, scan, balance, entities);
criterion_main!(benches);
